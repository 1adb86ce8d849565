//! Editable record forms.
//!
//! Each form follows the same lifecycle:
//!
//! 1. **Load** - read the stored token, fetch the record, populate the fields
//!    and derive the image preview.
//! 2. **Edit** - setters play the role of controlled-input change handlers;
//!    [`select_image`](ProductForm::select_image) swaps the preview for a
//!    local reference without any I/O.
//! 3. **Submit** - check the token, build a multipart payload (new file over
//!    stored path), send it and report the outcome.
//!
//! Every failure is turned into an error toast before it is returned, so a
//! caller that ignores the `Result` still leaves the user informed.

mod product;
mod profile;

use std::sync::Arc;

use thiserror::Error;

use crate::api::{ApiClient, ApiError};
use crate::config::{ClientConfig, RedirectConfig};
use crate::navigate::Navigator;
use crate::notify::Notifier;
use crate::preview::SelectionError;
use crate::storage::TokenStore;

pub use product::{PRODUCT_TOAST_DURATION, ProductFields, ProductForm};
pub use profile::{PROFILE_TOAST_DURATION, ProfileFields, ProfileForm, normalize_dob};

/// Errors returned by form operations.
#[derive(Debug, Error)]
pub enum FormError {
    /// The backend call failed (including a missing token).
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A field failed local validation; nothing was sent.
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// The chosen image could not be used.
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

impl FormError {
    /// Whether the failure was the missing-token precondition.
    #[must_use]
    pub const fn is_missing_token(&self) -> bool {
        matches!(self, Self::Api(ApiError::MissingToken))
    }
}

/// What a form is currently doing. UIs disable the submit button while this
/// is not `Idle`.
///
/// Each form publishes its status on a `tokio::sync::watch` channel; the
/// receiver from `status_watch()` observes `Loading`/`Submitting` while the
/// form itself is mutably borrowed by the in-flight call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormStatus {
    #[default]
    Idle,
    Loading,
    Submitting,
}

/// Collaborators shared by every form: the authenticated API client, the
/// notification sink, the navigator and the redirect settings.
#[derive(Clone)]
pub struct FormContext {
    pub api: ApiClient,
    pub notifier: Arc<dyn Notifier>,
    pub navigator: Arc<dyn Navigator>,
    pub redirect: RedirectConfig,
}

impl std::fmt::Debug for FormContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormContext")
            .field("api", &self.api)
            .field("redirect", &self.redirect)
            .finish_non_exhaustive()
    }
}

impl FormContext {
    /// Build the shared collaborators from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(
        config: &ClientConfig,
        tokens: TokenStore,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            api: ApiClient::new(config, tokens)?,
            notifier,
            navigator,
            redirect: config.redirect.clone(),
        })
    }
}

/// A JSON scalar rendered as it would appear in an input.
///
/// Strings pass through, numbers keep the server's formatting, `null` and
/// missing values become empty.
pub(crate) fn scalar_to_text(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Error detail for a toast: server message, else the error text, else
/// `fallback`.
pub(crate) fn error_detail(err: &FormError, fallback: &str) -> String {
    if let FormError::Api(api) = err
        && let Some(message) = api.server_message()
    {
        return message.to_string();
    }

    let text = err.to_string();
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_scalar_to_text() {
        assert_eq!(scalar_to_text(None), "");
        assert_eq!(scalar_to_text(Some(&json!(null))), "");
        assert_eq!(scalar_to_text(Some(&json!("abc"))), "abc");
        assert_eq!(scalar_to_text(Some(&json!(1500))), "1500");
        assert_eq!(scalar_to_text(Some(&json!(19.5))), "19.5");
        assert_eq!(scalar_to_text(Some(&json!(0))), "0");
    }

    #[test]
    fn test_error_detail_prefers_server_message() {
        let err = FormError::Api(ApiError::Status {
            status: StatusCode::BAD_REQUEST,
            message: Some("Price too high".to_string()),
        });
        assert_eq!(error_detail(&err, "Server error"), "Price too high");
    }

    #[test]
    fn test_error_detail_uses_error_text() {
        let err = FormError::Api(ApiError::Status {
            status: StatusCode::BAD_GATEWAY,
            message: None,
        });
        assert_eq!(error_detail(&err, "Server error"), "API error: 502 Bad Gateway");
    }

    #[test]
    fn test_missing_token_detection() {
        assert!(FormError::Api(ApiError::MissingToken).is_missing_token());
        let err = FormError::Invalid {
            field: "price",
            reason: "nope".to_string(),
        };
        assert!(!err.is_missing_token());
    }
}
