//! Integration tests for the user profile editor.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use storepanel_client::{FormStatus, ProfileForm, SelectedFile, ToastLevel};
use storepanel_integration_tests::{FakeBackend, ReceivedField, TestContext, VALID_TOKEN};

const REDIRECT_DELAY: Duration = Duration::from_millis(50);

async fn backend_with_user() -> (FakeBackend, TestContext) {
    let backend = FakeBackend::start().await;
    backend.set_user(json!({
        "email": "nimal@example.com",
        "phone": "0771234567",
        "dob": "1990-05-17T00:00:00.000Z",
        "avatar": "/uploads/avatars/nimal.jpg"
    }));
    let test = backend.context(Some(("token", VALID_TOKEN)), REDIRECT_DELAY);
    (backend, test)
}

// =============================================================================
// Load
// =============================================================================

#[tokio::test]
async fn test_load_populates_fields_and_avatar() {
    let (backend, test) = backend_with_user().await;

    let form = ProfileForm::open(test.ctx.clone()).await;

    assert_eq!(form.fields().phone, "0771234567");
    assert_eq!(form.fields().dob, "1990-05-17");
    assert_eq!(
        form.preview().url(),
        Some(format!("{}/uploads/avatars/nimal.jpg", backend.origin()).as_str())
    );
    assert_eq!(form.status(), FormStatus::Idle);
    assert!(!form.is_busy());
    assert!(test.toasts.toasts().is_empty());
}

#[tokio::test]
async fn test_load_passes_absolute_avatar_through() {
    let backend = FakeBackend::start().await;
    backend.set_user(json!({"avatar": "https://cdn.example.com/a.png", "phone": 771234567}));
    let test = backend.context(Some(("token", VALID_TOKEN)), REDIRECT_DELAY);

    let form = ProfileForm::open(test.ctx.clone()).await;

    assert_eq!(form.preview().url(), Some("https://cdn.example.com/a.png"));
    assert_eq!(form.fields().phone, "771234567");
    assert_eq!(form.fields().dob, "");
}

#[tokio::test]
async fn test_load_with_legacy_token_key() {
    let backend = FakeBackend::start().await;
    backend.set_user(json!({"phone": "011"}));
    let test = backend.context(Some(("jwtToken", VALID_TOKEN)), REDIRECT_DELAY);

    let form = ProfileForm::open(test.ctx.clone()).await;

    assert_eq!(form.fields().phone, "011");
    assert!(test.toasts.messages(ToastLevel::Error).is_empty());
}

#[tokio::test]
async fn test_load_without_token_sends_nothing() {
    let backend = FakeBackend::start().await;
    let test = backend.context(None, REDIRECT_DELAY);

    let mut form = ProfileForm::new(test.ctx.clone());
    let err = form.load().await.unwrap_err();

    assert!(err.is_missing_token());
    assert!(backend.requests().is_empty());
    assert_eq!(
        test.toasts.messages(ToastLevel::Error),
        vec!["Authentication required. Please log in."]
    );
}

#[tokio::test]
async fn test_load_rejected_token_reports_session_expired() {
    let backend = FakeBackend::start().await;
    let test = backend.context(Some(("token", "expired")), REDIRECT_DELAY);

    let form = ProfileForm::open(test.ctx.clone()).await;

    assert!(form.preview().is_empty());
    assert_eq!(
        test.toasts.messages(ToastLevel::Error),
        vec!["Session expired or unauthorized. Please log in again."]
    );
}

#[tokio::test]
async fn test_load_forbidden_reports_session_expired() {
    let (backend, test) = backend_with_user().await;
    backend.fail_next(StatusCode::FORBIDDEN, Some("Admins only"));

    let _form = ProfileForm::open(test.ctx.clone()).await;

    assert_eq!(
        test.toasts.messages(ToastLevel::Error),
        vec!["Session expired or unauthorized. Please log in again."]
    );
}

#[tokio::test]
async fn test_load_server_error_includes_message() {
    let (backend, test) = backend_with_user().await;
    backend.fail_next(StatusCode::INTERNAL_SERVER_ERROR, Some("Database unavailable"));

    let _form = ProfileForm::open(test.ctx.clone()).await;

    assert_eq!(
        test.toasts.messages(ToastLevel::Error),
        vec!["Failed to load profile data: Database unavailable"]
    );
}

#[tokio::test]
async fn test_load_without_user_object_is_reported() {
    let (backend, test) = backend_with_user().await;
    let mut form = ProfileForm::open(test.ctx.clone()).await;
    assert_eq!(form.fields().phone, "0771234567");

    backend.set_profile_body(json!({"message": "ok"}));
    let err = form.load().await.unwrap_err();

    assert!(!err.is_missing_token());
    assert_eq!(
        test.toasts.messages(ToastLevel::Error),
        vec!["Failed to load profile data: Failed to decode response: missing user"]
    );
    assert_eq!(form.fields().phone, "0771234567");
    assert_eq!(
        form.existing_avatar().map(|p| p.as_str()),
        Some("/uploads/avatars/nimal.jpg")
    );
}

#[tokio::test]
async fn test_status_is_loading_while_request_in_flight() {
    let (backend, test) = backend_with_user().await;
    backend.delay_next(Duration::from_millis(150));

    let mut form = ProfileForm::new(test.ctx.clone());
    let mut status = form.status_watch();

    let (result, (saw_loading, back_to_idle)) = tokio::join!(form.load(), async {
        let loading = status
            .wait_for(|s| *s == FormStatus::Loading)
            .await
            .is_ok();
        let idle = status.wait_for(|s| *s == FormStatus::Idle).await.is_ok();
        (loading, idle)
    });

    result.unwrap();
    assert!(saw_loading);
    assert!(back_to_idle);
    assert!(!form.is_busy());
}

// =============================================================================
// Submit
// =============================================================================

#[tokio::test]
async fn test_submit_resends_existing_avatar() {
    let (backend, test) = backend_with_user().await;

    let mut form = ProfileForm::open(test.ctx.clone()).await;
    form.set_phone("0712223333");
    form.submit().await.unwrap();

    let request = backend.last_request().unwrap();
    assert_eq!(request.method, "PUT");
    assert_eq!(request.path, "/api/profile");
    assert_eq!(request.text("phone"), Some("0712223333"));
    assert_eq!(request.text("dob"), Some("1990-05-17"));
    assert_eq!(
        request.text("existingAvatar"),
        Some("/uploads/avatars/nimal.jpg")
    );
    assert!(!request.has_field("avatar"));

    assert_eq!(
        test.toasts.messages(ToastLevel::Success),
        vec!["Profile updated successfully"]
    );
    assert!(test.routes.routes().is_empty());
}

#[tokio::test]
async fn test_submit_new_avatar_refreshes_preview() {
    let (backend, test) = backend_with_user().await;

    let mut form = ProfileForm::open(test.ctx.clone()).await;
    form.select_avatar(Some(
        SelectedFile::new("me.webp", "image/webp", vec![1; 16]).unwrap(),
    ));
    assert!(form.preview().is_local());

    form.submit().await.unwrap();

    let request = backend.last_request().unwrap();
    assert_eq!(
        request.file("avatar"),
        Some(&ReceivedField::File {
            file_name: Some("me.webp".to_string()),
            content_type: Some("image/webp".to_string()),
            len: 16,
        })
    );
    assert!(!request.has_field("existingAvatar"));

    assert!(form.selected_avatar().is_none());
    assert_eq!(
        form.existing_avatar().map(|p| p.as_str()),
        Some("/uploads/avatars/me.webp")
    );
    assert_eq!(
        form.preview().url(),
        Some(format!("{}/uploads/avatars/me.webp", backend.origin()).as_str())
    );
}

#[tokio::test]
async fn test_submit_clears_dob() {
    let (backend, test) = backend_with_user().await;

    let mut form = ProfileForm::open(test.ctx.clone()).await;
    form.set_dob("");
    form.submit().await.unwrap();

    assert_eq!(backend.last_request().unwrap().text("dob"), Some(""));

    let reloaded = ProfileForm::open(test.ctx.clone()).await;
    assert_eq!(reloaded.fields().dob, "");
}

#[tokio::test]
async fn test_submit_dismisses_previous_toasts() {
    let (backend, test) = backend_with_user().await;
    backend.fail_next(StatusCode::INTERNAL_SERVER_ERROR, None);

    let mut form = ProfileForm::open(test.ctx.clone()).await;
    assert_eq!(test.toasts.toasts().len(), 1);

    form.submit().await.unwrap();
    assert_eq!(test.toasts.toasts().len(), 1);
    assert_eq!(test.toasts.last().unwrap().level, ToastLevel::Success);
}

#[tokio::test]
async fn test_submit_failure_uses_update_prefix() {
    let (backend, test) = backend_with_user().await;

    let mut form = ProfileForm::open(test.ctx.clone()).await;
    backend.fail_next(StatusCode::BAD_REQUEST, Some("Phone number is invalid"));

    assert!(form.submit().await.is_err());
    assert!(!form.is_busy());
    assert_eq!(
        test.toasts.messages(ToastLevel::Error),
        vec!["Failed to update profile: Phone number is invalid"]
    );
    assert_eq!(
        form.preview().url(),
        Some(format!("{}/uploads/avatars/nimal.jpg", backend.origin()).as_str())
    );
}

#[tokio::test]
async fn test_submit_invalid_dob_sends_nothing() {
    let (backend, test) = backend_with_user().await;

    let mut form = ProfileForm::open(test.ctx.clone()).await;
    let before = backend.requests().len();
    form.set_dob("17/05/1990");

    assert!(form.submit().await.is_err());
    assert_eq!(backend.requests().len(), before);
    assert_eq!(test.toasts.messages(ToastLevel::Error).len(), 1);
}

#[tokio::test]
async fn test_status_is_submitting_while_request_in_flight() {
    let (backend, test) = backend_with_user().await;
    let mut form = ProfileForm::open(test.ctx.clone()).await;
    let mut status = form.status_watch();
    backend.delay_next(Duration::from_millis(150));

    let (result, saw_submitting) = tokio::join!(form.submit(), async {
        status
            .wait_for(|s| *s == FormStatus::Submitting)
            .await
            .is_ok()
    });

    result.unwrap();
    assert!(saw_submitting);
    assert_eq!(form.status(), FormStatus::Idle);
}
