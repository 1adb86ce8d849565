//! Integration tests for the admin product editor.
//!
//! Each test starts a fresh [`FakeBackend`] and drives a real
//! [`ProductForm`] against it over HTTP.

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use storepanel_client::{FormStatus, ProductForm, SelectedFile, ToastLevel};
use storepanel_core::ProductId;
use storepanel_integration_tests::{FakeBackend, ReceivedField, VALID_TOKEN};

const REDIRECT_DELAY: Duration = Duration::from_millis(50);

fn tea() -> serde_json::Value {
    json!({
        "name": "Ceylon Tea",
        "description": "Loose leaf",
        "price": 1250.5,
        "quantity": 0,
        "image": "uploads\\products\\tea.png"
    })
}

fn png(name: &str) -> SelectedFile {
    SelectedFile::new(name, "image/png", vec![0x89, 0x50, 0x4e, 0x47]).unwrap()
}

// =============================================================================
// Load
// =============================================================================

#[tokio::test]
async fn test_load_populates_fields_and_preview() {
    let backend = FakeBackend::start().await;
    backend.put_product_record(7, tea());
    let test = backend.context(Some(("token", VALID_TOKEN)), REDIRECT_DELAY);

    let form = ProductForm::open(test.ctx.clone(), ProductId::new(7)).await;

    assert_eq!(form.fields().name, "Ceylon Tea");
    assert_eq!(form.fields().description, "Loose leaf");
    assert_eq!(form.fields().price, "1250.5");
    assert_eq!(form.fields().quantity, "0");
    assert_eq!(form.status(), FormStatus::Idle);
    assert_eq!(
        form.preview().url(),
        Some(format!("{}/uploads/products/tea.png", backend.origin()).as_str())
    );
    assert!(test.toasts.toasts().is_empty());

    let request = backend.last_request().unwrap();
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/api/admin/product/7");
    assert_eq!(
        request.authorization.as_deref(),
        Some(format!("Bearer {VALID_TOKEN}").as_str())
    );
}

#[tokio::test]
async fn test_load_without_image_leaves_preview_empty() {
    let backend = FakeBackend::start().await;
    backend.put_product_record(3, json!({"name": "Mug", "price": 900, "quantity": 2}));
    let test = backend.context(Some(("token", VALID_TOKEN)), REDIRECT_DELAY);

    let form = ProductForm::open(test.ctx.clone(), ProductId::new(3)).await;

    assert_eq!(form.fields().name, "Mug");
    assert!(form.preview().is_empty());
    assert!(form.existing_image().is_none());
}

#[tokio::test]
async fn test_load_without_token_sends_nothing() {
    let backend = FakeBackend::start().await;
    backend.put_product_record(7, tea());
    let test = backend.context(None, REDIRECT_DELAY);

    let mut form = ProductForm::new(test.ctx.clone(), ProductId::new(7));
    let err = form.load().await.unwrap_err();

    assert!(err.is_missing_token());
    assert!(backend.requests().is_empty());
    assert_eq!(test.toasts.messages(ToastLevel::Error), vec!["Not authenticated"]);
}

#[tokio::test]
async fn test_load_missing_product_shows_server_message() {
    let backend = FakeBackend::start().await;
    let test = backend.context(Some(("token", VALID_TOKEN)), REDIRECT_DELAY);

    let form = ProductForm::open(test.ctx.clone(), ProductId::new(404)).await;

    assert_eq!(form.fields().name, "");
    assert_eq!(test.toasts.messages(ToastLevel::Error), vec!["Product not found"]);
}

#[tokio::test]
async fn test_load_failure_without_message_uses_fallback() {
    let backend = FakeBackend::start().await;
    backend.put_product_record(7, tea());
    backend.fail_next(StatusCode::INTERNAL_SERVER_ERROR, None);
    let test = backend.context(Some(("token", VALID_TOKEN)), REDIRECT_DELAY);

    let _form = ProductForm::open(test.ctx.clone(), ProductId::new(7)).await;

    assert_eq!(
        test.toasts.messages(ToastLevel::Error),
        vec!["Failed to load product"]
    );
}

#[tokio::test]
async fn test_status_is_loading_while_request_in_flight() {
    let backend = FakeBackend::start().await;
    backend.put_product_record(7, tea());
    backend.delay_next(Duration::from_millis(150));
    let test = backend.context(Some(("token", VALID_TOKEN)), REDIRECT_DELAY);

    let mut form = ProductForm::new(test.ctx.clone(), ProductId::new(7));
    let mut status = form.status_watch();

    let (result, saw_loading) = tokio::join!(form.load(), async {
        status
            .wait_for(|s| *s == FormStatus::Loading)
            .await
            .is_ok()
    });

    result.unwrap();
    assert!(saw_loading);
    assert_eq!(form.status(), FormStatus::Idle);
}

// =============================================================================
// Submit
// =============================================================================

#[tokio::test]
async fn test_submit_resends_existing_image() {
    let backend = FakeBackend::start().await;
    backend.put_product_record(7, tea());
    let test = backend.context(Some(("token", VALID_TOKEN)), REDIRECT_DELAY);

    let mut form = ProductForm::open(test.ctx.clone(), ProductId::new(7)).await;
    form.set_price("1300");
    form.set_quantity("12");
    let redirect = form.submit().await.unwrap();

    let request = backend.last_request().unwrap();
    assert_eq!(request.method, "PUT");
    assert_eq!(request.text("name"), Some("Ceylon Tea"));
    assert_eq!(request.text("price"), Some("1300"));
    assert_eq!(request.text("quantity"), Some("12"));
    assert_eq!(request.text("existingImage"), Some("uploads\\products\\tea.png"));
    assert!(!request.has_field("image"));

    let stored = backend.product_record(7).unwrap();
    assert_eq!(stored["quantity"], json!(12));
    assert_eq!(stored["image"], json!("uploads\\products\\tea.png"));

    redirect.cancel();
}

#[tokio::test]
async fn test_submit_uploads_new_image() {
    let backend = FakeBackend::start().await;
    backend.put_product_record(7, tea());
    let test = backend.context(Some(("token", VALID_TOKEN)), REDIRECT_DELAY);

    let mut form = ProductForm::open(test.ctx.clone(), ProductId::new(7)).await;
    form.select_image(Some(png("green.png")));
    assert!(form.preview().is_local());

    let redirect = form.submit().await.unwrap();

    let request = backend.last_request().unwrap();
    assert_eq!(
        request.file("image"),
        Some(&ReceivedField::File {
            file_name: Some("green.png".to_string()),
            content_type: Some("image/png".to_string()),
            len: 4,
        })
    );
    assert!(!request.has_field("existingImage"));
    assert_eq!(
        backend.product_record(7).unwrap()["image"],
        json!("uploads\\products\\green.png")
    );

    redirect.cancel();
}

#[tokio::test]
async fn test_submit_image_from_disk() {
    let backend = FakeBackend::start().await;
    backend.put_product_record(7, tea());
    let test = backend.context(Some(("token", VALID_TOKEN)), REDIRECT_DELAY);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("oolong.jpg");
    tokio::fs::write(&path, [0xff, 0xd8, 0xff]).await.unwrap();

    let mut form = ProductForm::open(test.ctx.clone(), ProductId::new(7)).await;
    form.select_image_path(&path).await.unwrap();
    let redirect = form.submit().await.unwrap();

    let request = backend.last_request().unwrap();
    match request.file("image") {
        Some(ReceivedField::File {
            content_type, len, ..
        }) => {
            assert_eq!(content_type.as_deref(), Some("image/jpeg"));
            assert_eq!(*len, 3);
        }
        other => panic!("expected an image upload, got {other:?}"),
    }

    redirect.cancel();
}

#[tokio::test]
async fn test_submit_success_redirects_after_delay() {
    let backend = FakeBackend::start().await;
    backend.put_product_record(7, tea());
    let test = backend.context(Some(("token", VALID_TOKEN)), REDIRECT_DELAY);

    let mut form = ProductForm::open(test.ctx.clone(), ProductId::new(7)).await;
    let redirect = form.submit().await.unwrap();

    assert_eq!(
        test.toasts.messages(ToastLevel::Success),
        vec!["Product updated successfully!"]
    );
    assert_eq!(redirect.route(), "/admin/dashboard");
    assert!(test.routes.routes().is_empty());

    redirect.wait().await;
    assert_eq!(test.routes.routes(), vec!["/admin/dashboard"]);
}

#[tokio::test]
async fn test_submit_without_token_sends_nothing() {
    let backend = FakeBackend::start().await;
    backend.put_product_record(7, tea());
    let test = backend.context(Some(("token", VALID_TOKEN)), REDIRECT_DELAY);

    let mut form = ProductForm::open(test.ctx.clone(), ProductId::new(7)).await;
    test.ctx.api.tokens().clear().unwrap();
    let before = backend.requests().len();

    let err = form.submit().await.unwrap_err();

    assert!(err.is_missing_token());
    assert_eq!(backend.requests().len(), before);
    assert_eq!(test.toasts.messages(ToastLevel::Error), vec!["Not authenticated"]);
    assert!(test.routes.routes().is_empty());
}

#[tokio::test]
async fn test_submit_failure_shows_server_message_and_stays() {
    let backend = FakeBackend::start().await;
    backend.put_product_record(7, tea());
    let test = backend.context(Some(("token", VALID_TOKEN)), REDIRECT_DELAY);

    let mut form = ProductForm::open(test.ctx.clone(), ProductId::new(7)).await;
    backend.fail_next(StatusCode::UNPROCESSABLE_ENTITY, Some("Price too low"));

    assert!(form.submit().await.is_err());
    assert_eq!(test.toasts.messages(ToastLevel::Error), vec!["Price too low"]);

    tokio::time::sleep(REDIRECT_DELAY * 3).await;
    assert!(test.routes.routes().is_empty());
}

#[tokio::test]
async fn test_rejected_token_uses_server_message() {
    let backend = FakeBackend::start().await;
    backend.put_product_record(7, tea());
    let test = backend.context(Some(("token", "stale")), REDIRECT_DELAY);

    let mut form = ProductForm::new(test.ctx.clone(), ProductId::new(7));
    assert!(form.load().await.is_err());
    assert_eq!(
        test.toasts.messages(ToastLevel::Error),
        vec!["Invalid or expired token"]
    );

    test.set_token(VALID_TOKEN);
    form.load().await.unwrap();
    assert_eq!(form.fields().name, "Ceylon Tea");
}

#[tokio::test]
async fn test_status_is_submitting_while_request_in_flight() {
    let backend = FakeBackend::start().await;
    backend.put_product_record(7, tea());
    let test = backend.context(Some(("token", VALID_TOKEN)), REDIRECT_DELAY);

    let mut form = ProductForm::open(test.ctx.clone(), ProductId::new(7)).await;
    let mut status = form.status_watch();
    backend.delay_next(Duration::from_millis(150));

    let (result, saw_submitting) = tokio::join!(form.submit(), async {
        status
            .wait_for(|s| *s == FormStatus::Submitting)
            .await
            .is_ok()
    });

    result.unwrap().cancel();
    assert!(saw_submitting);
    assert_eq!(form.status(), FormStatus::Idle);
}
