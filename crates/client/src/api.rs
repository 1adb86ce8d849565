//! Authenticated REST client for the panel backend.
//!
//! Every request reads the bearer token from the shared [`TokenStore`] first;
//! a missing token fails with [`ApiError::MissingToken`] before any request is
//! built, so no network call is made.

use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use storepanel_core::ImagePath;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::preview::{SelectedFile, resolve_image_url};
use crate::storage::{StorageError, TokenStore};

/// Errors that can occur when talking to the panel backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No bearer token is stored.
    #[error("No bearer token - authentication required")]
    MissingToken,

    /// The token store could not be read.
    #[error("Token storage error: {0}")]
    Storage(#[from] StorageError),

    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("API error: {status}{}", .message.as_deref().map(|m| format!(" - {m}")).unwrap_or_default())]
    Status {
        status: StatusCode,
        /// `message` field of the JSON error body, when present.
        message: Option<String>,
    },

    /// The response body was not the expected JSON.
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A multipart part could not be built.
    #[error("Invalid upload: {0}")]
    Upload(String),
}

impl ApiError {
    /// Whether the backend rejected the credentials (401 or 403).
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Self::Status { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }

    /// The message the server put in its error body, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// HTTP status of a rejected request.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Error body shape used by the backend.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// =============================================================================
// Multipart payload
// =============================================================================

/// One field of a multipart update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadField {
    Text { name: String, value: String },
    File { name: String, file: SelectedFile },
}

impl PayloadField {
    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Text { name, .. } | Self::File { name, .. } => name,
        }
    }
}

/// An inspectable multipart body, converted to a `reqwest` form on send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartPayload {
    fields: Vec<PayloadField>,
}

impl MultipartPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    #[must_use]
    pub fn text(mut self, name: &str, value: impl Into<String>) -> Self {
        self.fields.push(PayloadField::Text {
            name: name.to_string(),
            value: value.into(),
        });
        self
    }

    /// Append a file field.
    #[must_use]
    pub fn file(mut self, name: &str, file: SelectedFile) -> Self {
        self.fields.push(PayloadField::File {
            name: name.to_string(),
            file,
        });
        self
    }

    /// Append the image source for an update: the new file under
    /// `file_field` when one was chosen, else the stored path under
    /// `existing_field`, else nothing.
    #[must_use]
    pub fn image_source(
        self,
        file_field: &str,
        new_file: Option<&SelectedFile>,
        existing_field: &str,
        existing: Option<&ImagePath>,
    ) -> Self {
        match (new_file, existing) {
            (Some(file), _) => self.file(file_field, file.clone()),
            (None, Some(path)) => self.text(existing_field, path.as_str()),
            (None, None) => self,
        }
    }

    /// Fields in insertion order.
    #[must_use]
    pub fn fields(&self) -> &[PayloadField] {
        &self.fields
    }

    /// Value of a text field.
    #[must_use]
    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|field| match field {
            PayloadField::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// File carried in a file field.
    #[must_use]
    pub fn file_value(&self, name: &str) -> Option<&SelectedFile> {
        self.fields.iter().find_map(|field| match field {
            PayloadField::File { name: n, file } if n == name => Some(file),
            _ => None,
        })
    }

    /// Whether a field with this name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.name() == name)
    }

    fn into_form(self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for field in self.fields {
            form = match field {
                PayloadField::Text { name, value } => form.text(name, value),
                PayloadField::File { name, file } => {
                    let part = Part::bytes(file.bytes().to_vec())
                        .file_name(file.file_name().to_string())
                        .mime_str(file.content_type())
                        .map_err(|e| ApiError::Upload(e.to_string()))?;
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}

// =============================================================================
// Client
// =============================================================================

/// REST client shared by both forms.
///
/// Owns the API origin and attaches the bearer token from the token store to
/// every request.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    origin: Url,
    tokens: TokenStore,
}

impl ApiClient {
    /// Create a client for the configured origin.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig, tokens: TokenStore) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            origin: config.api_origin.clone(),
            tokens,
        })
    }

    /// Backend origin.
    #[must_use]
    pub const fn origin(&self) -> &Url {
        &self.origin
    }

    /// Token store this client reads from.
    #[must_use]
    pub const fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Absolute URL for a stored image path.
    #[must_use]
    pub fn image_url(&self, path: &ImagePath) -> String {
        resolve_image_url(&self.origin, path)
    }

    /// The stored bearer token.
    ///
    /// Reads the token store synchronously (see [`TokenStore::token`]).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::MissingToken` if nothing is stored, or
    /// `ApiError::Storage` if the store cannot be read.
    pub fn bearer_token(&self) -> Result<SecretString, ApiError> {
        self.tokens.token()?.ok_or(ApiError::MissingToken)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.origin.join(path.trim_start_matches('/'))?)
    }

    /// `GET` a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::MissingToken` without sending anything if no token
    /// is stored; otherwise transport, status or decode errors.
    #[instrument(skip(self))]
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let token = self.bearer_token()?;
        let url = self.endpoint(path)?;

        let response = self
            .client
            .get(url)
            .bearer_auth(token.expose_secret())
            .send()
            .await?;

        Self::decode(response).await
    }

    /// `PUT` a multipart body and decode the JSON reply.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::MissingToken` without sending anything if no token
    /// is stored; otherwise upload, transport, status or decode errors.
    #[instrument(skip(self, payload), fields(fields = payload.fields().len()))]
    pub async fn put_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        payload: MultipartPayload,
    ) -> Result<T, ApiError> {
        let token = self.bearer_token()?;
        let url = self.endpoint(path)?;
        let form = payload.into_form()?;

        let response = self
            .client
            .put(url)
            .bearer_auth(token.expose_secret())
            .multipart(form)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.trim().is_empty());
            warn!(status = %status, message = ?message, "Backend rejected request");
            return Err(ApiError::Status { status, message });
        }

        debug!(status = %status, bytes = body.len(), "Backend response received");

        // Empty success bodies decode as JSON null
        let body: &[u8] = if body.is_empty() { b"null" } else { &body[..] };
        serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use super::*;
    use crate::storage::MemoryStorage;

    fn png(name: &str) -> SelectedFile {
        SelectedFile::new(name, "image/png", vec![1, 2, 3]).unwrap()
    }

    fn client_without_token() -> ApiClient {
        let config =
            ClientConfig::with_origin("http://127.0.0.1:9", PathBuf::from("/unused.json"))
                .unwrap();
        let tokens = TokenStore::new(Arc::new(MemoryStorage::new()), ["token"]);
        ApiClient::new(&config, tokens).unwrap()
    }

    #[test]
    fn test_image_source_prefers_new_file() {
        let existing = ImagePath::new("uploads/old.png").unwrap();
        let payload = MultipartPayload::new().image_source(
            "image",
            Some(&png("new.png")),
            "existingImage",
            Some(&existing),
        );

        assert_eq!(payload.file_value("image").unwrap().file_name(), "new.png");
        assert!(!payload.contains("existingImage"));
    }

    #[test]
    fn test_image_source_falls_back_to_existing() {
        let existing = ImagePath::new(r"uploads\old.png").unwrap();
        let payload =
            MultipartPayload::new().image_source("image", None, "existingImage", Some(&existing));

        assert_eq!(payload.text_value("existingImage"), Some(r"uploads\old.png"));
        assert!(!payload.contains("image"));
    }

    #[test]
    fn test_image_source_none() {
        let payload = MultipartPayload::new().image_source("image", None, "existingImage", None);
        assert!(payload.fields().is_empty());
    }

    #[test]
    fn test_payload_converts_to_form() {
        let payload = MultipartPayload::new()
            .text("name", "Shoe")
            .file("image", png("a.png"));
        assert!(payload.into_form().is_ok());
    }

    #[test]
    fn test_unauthorized_detection() {
        let err = ApiError::Status {
            status: StatusCode::FORBIDDEN,
            message: None,
        };
        assert!(err.is_unauthorized());

        let err = ApiError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: Some("db down".to_string()),
        };
        assert!(!err.is_unauthorized());
        assert_eq!(err.server_message(), Some("db down"));
        assert_eq!(err.to_string(), "API error: 500 Internal Server Error - db down");
    }

    #[test]
    fn test_endpoint_joins_origin() {
        let client = client_without_token();
        let url = client.endpoint("/api/admin/product/7").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9/api/admin/product/7");
    }

    #[tokio::test]
    async fn test_missing_token_short_circuits() {
        // Port 9 is never contacted: the token check fails first.
        let client = client_without_token();
        let result: Result<serde_json::Value, _> = client.get_json("/api/profile").await;
        assert!(matches!(result, Err(ApiError::MissingToken)));

        let result: Result<serde_json::Value, _> = client
            .put_multipart("/api/profile", MultipartPayload::new())
            .await;
        assert!(matches!(result, Err(ApiError::MissingToken)));
    }
}
