//! Integration tests for Storepanel.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p storepanel-integration-tests
//! ```
//!
//! The tests run the real form sessions against [`FakeBackend`], an in-process
//! `axum` server bound to an ephemeral port that mimics the panel's REST API:
//!
//! - `GET|PUT /api/admin/product/{id}`
//! - `GET|PUT /api/profile`
//!
//! Every request the backend sees is recorded so tests can assert on what was
//! (or was not) sent.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::unwrap_used)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{Value, json};
use storepanel_client::{
    ClientConfig, FormContext, KeyValueStore, MemoryStorage, RouteLog, ToastLog, TokenStore,
};

/// Token the fake backend accepts.
pub const VALID_TOKEN: &str = "valid-test-token";

/// A multipart field as received by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivedField {
    Text(String),
    File {
        file_name: Option<String>,
        content_type: Option<String>,
        len: usize,
    },
}

/// One request seen by the backend.
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub fields: Vec<(String, ReceivedField)>,
}

impl ReceivedRequest {
    /// Text value of a multipart field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|(n, field)| match field {
            ReceivedField::Text(value) if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// File field, if present.
    #[must_use]
    pub fn file(&self, name: &str) -> Option<&ReceivedField> {
        self.fields.iter().find_map(|(n, field)| match field {
            ReceivedField::File { .. } if n == name => Some(field),
            _ => None,
        })
    }

    /// Whether any field with this name was sent.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }
}

#[derive(Debug, Default)]
struct BackendState {
    products: Vec<(i64, Value)>,
    user: Value,
    requests: Vec<ReceivedRequest>,
    /// Status and optional `message` returned for the next request.
    fail_next: Option<(StatusCode, Option<String>)>,
    /// How long the next request waits before it is answered.
    delay_next: Option<Duration>,
    /// Body returned by `GET /api/profile` instead of `{"user": ...}`.
    profile_body: Option<Value>,
}

type Shared = Arc<Mutex<BackendState>>;

/// In-process stand-in for the panel backend.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    addr: SocketAddr,
    state: Shared,
}

impl FakeBackend {
    /// Start the backend on an ephemeral port.
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState {
            user: json!({}),
            ..BackendState::default()
        }));

        let app = Router::new()
            .route("/api/admin/product/{id}", get(get_product).put(put_product))
            .route("/api/profile", get(get_profile).put(put_profile))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Fake backend has no address");

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    /// `http://127.0.0.1:<port>`
    #[must_use]
    pub fn origin(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Seed a product record.
    pub fn put_product_record(&self, id: i64, record: Value) {
        let mut state = self.state.lock().unwrap();
        state.products.retain(|(existing, _)| *existing != id);
        state.products.push((id, record));
    }

    /// Current product record.
    #[must_use]
    pub fn product_record(&self, id: i64) -> Option<Value> {
        let state = self.state.lock().unwrap();
        state
            .products
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, record)| record.clone())
    }

    /// Seed the signed-in user's record.
    pub fn set_user(&self, user: Value) {
        self.state.lock().unwrap().user = user;
    }

    /// Make the next request fail with `status` and an optional message body.
    pub fn fail_next(&self, status: StatusCode, message: Option<&str>) {
        self.state.lock().unwrap().fail_next = Some((status, message.map(String::from)));
    }

    /// Hold the next request for `delay` before answering it.
    pub fn delay_next(&self, delay: Duration) {
        self.state.lock().unwrap().delay_next = Some(delay);
    }

    /// Answer `GET /api/profile` with `body` verbatim.
    pub fn set_profile_body(&self, body: Value) {
        self.state.lock().unwrap().profile_body = Some(body);
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<ReceivedRequest> {
        self.requests().pop()
    }

    /// Form collaborators pointed at this backend.
    ///
    /// `token` is an optional `(storage key, value)` pair written before the
    /// context is built.
    #[must_use]
    pub fn context(&self, token: Option<(&str, &str)>, redirect_delay: Duration) -> TestContext {
        let mut config = ClientConfig::with_origin(&self.origin(), PathBuf::from("/unused.json"))
            .expect("Fake backend origin is valid");
        config.redirect.delay = redirect_delay;

        let storage = Arc::new(MemoryStorage::new());
        if let Some((key, value)) = token {
            storage.set(key, value).unwrap();
        }
        let tokens = TokenStore::new(storage, config.token_keys());

        let toasts = ToastLog::new();
        let routes = RouteLog::new();
        let ctx = FormContext::new(
            &config,
            tokens,
            Arc::new(toasts.clone()),
            Arc::new(routes.clone()),
        )
        .expect("HTTP client builds");

        TestContext { ctx, toasts, routes }
    }
}

/// Form collaborators plus handles to observe them.
#[derive(Debug, Clone)]
pub struct TestContext {
    pub ctx: FormContext,
    pub toasts: ToastLog,
    pub routes: RouteLog,
}

impl TestContext {
    /// Replace the stored token.
    pub fn set_token(&self, token: &str) {
        self.ctx
            .api
            .tokens()
            .set_token(&SecretString::from(token.to_string()))
            .unwrap();
    }
}

// =============================================================================
// Handlers
// =============================================================================

fn error(status: StatusCode, message: Option<String>) -> Response {
    match message {
        Some(message) => (status, Json(json!({ "message": message }))).into_response(),
        None => status.into_response(),
    }
}

/// Record the request and apply failure injection and auth.
fn admit(
    state: &Shared,
    method: &str,
    path: String,
    headers: &HeaderMap,
    fields: Vec<(String, ReceivedField)>,
) -> Result<ReceivedRequest, Response> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let request = ReceivedRequest {
        method: method.to_string(),
        path,
        authorization: authorization.clone(),
        fields,
    };

    let mut guard = state.lock().unwrap();
    guard.requests.push(request.clone());

    if let Some((status, message)) = guard.fail_next.take() {
        return Err(error(status, message));
    }

    let expected = format!("Bearer {VALID_TOKEN}");
    if authorization.as_deref() != Some(expected.as_str()) {
        return Err(error(
            StatusCode::UNAUTHORIZED,
            Some("Invalid or expired token".to_string()),
        ));
    }

    Ok(request)
}

/// Apply a pending `delay_next`.
async fn hold(state: &Shared) {
    let delay = state.lock().unwrap().delay_next.take();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

async fn read_fields(mut multipart: Multipart) -> Result<Vec<(String, ReceivedField)>, Response> {
    let mut fields = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error(StatusCode::BAD_REQUEST, Some(e.to_string())))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(String::from);
        let content_type = field.content_type().map(String::from);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| error(StatusCode::BAD_REQUEST, Some(e.to_string())))?;

        let value = if file_name.is_some() {
            ReceivedField::File {
                file_name,
                content_type,
                len: bytes.len(),
            }
        } else {
            ReceivedField::Text(String::from_utf8_lossy(&bytes).into_owned())
        };
        fields.push((name, value));
    }
    Ok(fields)
}

async fn get_product(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Response {
    hold(&state).await;
    let path = format!("/api/admin/product/{id}");
    if let Err(rejection) = admit(&state, "GET", path, &headers, Vec::new()) {
        return rejection;
    }

    let guard = state.lock().unwrap();
    match guard.products.iter().find(|(existing, _)| *existing == id) {
        Some((_, record)) => Json(record.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, Some("Product not found".to_string())),
    }
}

async fn put_product(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let fields = match read_fields(multipart).await {
        Ok(fields) => fields,
        Err(rejection) => return rejection,
    };
    hold(&state).await;
    let path = format!("/api/admin/product/{id}");
    let received = match admit(&state, "PUT", path, &headers, fields) {
        Ok(received) => received,
        Err(rejection) => return rejection,
    };

    let mut guard = state.lock().unwrap();
    let Some((_, record)) = guard.products.iter_mut().find(|(existing, _)| *existing == id) else {
        return error(StatusCode::NOT_FOUND, Some("Product not found".to_string()));
    };

    for key in ["name", "description"] {
        if let Some(value) = received.text(key) {
            record[key] = json!(value);
        }
    }
    if let Some(price) = received.text("price").and_then(|p| p.parse::<f64>().ok()) {
        record["price"] = json!(price);
    }
    if let Some(quantity) = received.text("quantity").and_then(|q| q.parse::<i64>().ok()) {
        record["quantity"] = json!(quantity);
    }
    match (received.file("image"), received.text("existingImage")) {
        (Some(ReceivedField::File { file_name, .. }), _) => {
            let name = file_name.clone().unwrap_or_default();
            record["image"] = json!(format!("uploads\\products\\{name}"));
        }
        (_, Some(existing)) => record["image"] = json!(existing),
        _ => record["image"] = Value::Null,
    }

    Json(json!({ "message": "Product updated", "product": record.clone() })).into_response()
}

async fn get_profile(State(state): State<Shared>, headers: HeaderMap) -> Response {
    hold(&state).await;
    if let Err(rejection) = admit(&state, "GET", "/api/profile".to_string(), &headers, Vec::new()) {
        return rejection;
    }
    let guard = state.lock().unwrap();
    let body = guard
        .profile_body
        .clone()
        .unwrap_or_else(|| json!({ "user": guard.user.clone() }));
    Json(body).into_response()
}

async fn put_profile(
    State(state): State<Shared>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let fields = match read_fields(multipart).await {
        Ok(fields) => fields,
        Err(rejection) => return rejection,
    };
    hold(&state).await;
    let received = match admit(&state, "PUT", "/api/profile".to_string(), &headers, fields) {
        Ok(received) => received,
        Err(rejection) => return rejection,
    };

    let mut guard = state.lock().unwrap();
    if let Some(phone) = received.text("phone") {
        guard.user["phone"] = json!(phone);
    }
    if let Some(dob) = received.text("dob") {
        guard.user["dob"] = if dob.is_empty() {
            Value::Null
        } else {
            json!(format!("{dob}T00:00:00.000Z"))
        };
    }
    match (received.file("avatar"), received.text("existingAvatar")) {
        (Some(ReceivedField::File { file_name, .. }), _) => {
            let name = file_name.clone().unwrap_or_default();
            guard.user["avatar"] = json!(format!("/uploads/avatars/{name}"));
        }
        (_, Some(existing)) => guard.user["avatar"] = json!(existing),
        _ => guard.user["avatar"] = Value::Null,
    }

    Json(json!({
        "message": "Profile updated successfully",
        "user": guard.user.clone()
    }))
    .into_response()
}
