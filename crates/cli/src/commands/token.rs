//! Bearer token management.
//!
//! # Usage
//!
//! ```bash
//! sp-cli token set eyJhbGciOi...
//! sp-cli token show
//! sp-cli token clear
//! ```

use secrecy::{ExposeSecret, SecretString};

use super::{CommandError, load_config};

/// Store a token under the configured key.
pub fn set(value: &str) -> Result<(), CommandError> {
    let (_, tokens) = load_config()?;
    tokens.set_token(&SecretString::from(value.to_string()))?;
    tracing::info!(key = %tokens.primary_key(), "Token stored");
    Ok(())
}

/// Remove the token under every known key.
pub fn clear() -> Result<(), CommandError> {
    let (_, tokens) = load_config()?;
    tokens.clear()?;
    tracing::info!("Token cleared");
    Ok(())
}

/// Report whether a token is stored, showing only its last characters.
pub fn show() -> Result<(), CommandError> {
    let (_, tokens) = load_config()?;
    match tokens.token()? {
        Some(token) => tracing::info!(token = %mask(token.expose_secret()), "Token stored"),
        None => tracing::warn!("No token stored"),
    }
    Ok(())
}

/// `****abcd` for a token, keeping at most four trailing characters.
fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let keep = if chars.len() > 8 { 4 } else { 0 };
    let tail: String = chars.iter().skip(chars.len() - keep).collect();
    format!("****{tail}")
}
