//! CLI command implementations.

pub mod product;
pub mod profile;
pub mod token;

use std::sync::Arc;

use storepanel_client::{
    ClientConfig, ConfigError, FormContext, StorageError, TokenStore, TracingNavigator,
    TracingNotifier,
};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Token storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The form reported a failure (already shown as a notification).
    #[error("{0}")]
    Form(#[from] storepanel_client::FormError),

    /// The HTTP client could not be created.
    #[error("Client error: {0}")]
    Client(#[from] storepanel_client::ApiError),

    /// The form could not be loaded, so there is nothing to edit.
    #[error("Nothing loaded; not submitting")]
    NotLoaded,
}

/// Configuration and token store from the environment.
fn load_config() -> Result<(ClientConfig, TokenStore), CommandError> {
    let config = ClientConfig::from_env()?;
    let tokens = TokenStore::from_config(&config);
    tracing::debug!(
        origin = %config.api_origin,
        storage = %config.storage_path.display(),
        "Configuration loaded"
    );
    Ok((config, tokens))
}

/// Form collaborators wired to tracing output.
fn form_context() -> Result<FormContext, CommandError> {
    let (config, tokens) = load_config()?;
    Ok(FormContext::new(
        &config,
        tokens,
        Arc::new(TracingNotifier),
        Arc::new(TracingNavigator),
    )?)
}
