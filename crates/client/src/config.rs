//! Client configuration loaded from environment variables.
//!
//! Both forms share one configuration so the API origin and the token storage
//! key live in a single place.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `PANEL_API_ORIGIN` - Backend origin (default: `http://localhost:4000`)
//! - `PANEL_STORAGE_PATH` - Token storage file (default: `<data dir>/storepanel/storage.json`)
//! - `PANEL_TOKEN_KEY` - Storage key holding the bearer token (default: `token`)
//! - `PANEL_REQUEST_TIMEOUT_SECS` - HTTP timeout in seconds (default: 30)
//! - `PANEL_REDIRECT_DELAY_MS` - Delay before leaving the product editor (default: 1200)
//! - `PANEL_DASHBOARD_ROUTE` - Route opened after a product update (default: `/admin/dashboard`)

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_API_ORIGIN: &str = "http://localhost:4000";
const DEFAULT_TOKEN_KEY: &str = "token";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REDIRECT_DELAY_MS: u64 = 1200;
const DEFAULT_DASHBOARD_ROUTE: &str = "/admin/dashboard";

/// Storage keys read when the primary key holds nothing.
///
/// The profile editor historically stored its token under `jwtToken`.
pub const LEGACY_TOKEN_KEYS: &[&str] = &["jwtToken"];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Shared client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Origin of the REST backend; also the prefix for relative image paths
    pub api_origin: Url,
    /// File holding the persisted key/value storage
    pub storage_path: PathBuf,
    /// Storage key holding the bearer token
    pub token_key: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Product editor redirect settings
    pub redirect: RedirectConfig,
}

/// Where to go after a successful product update, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectConfig {
    /// Route to navigate to
    pub route: String,
    /// Fixed delay before navigating
    pub delay: Duration,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            route: DEFAULT_DASHBOARD_ROUTE.to_string(),
            delay: Duration::from_millis(DEFAULT_REDIRECT_DELAY_MS),
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at `api_origin` with every other value defaulted.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the origin is not a valid URL.
    pub fn with_origin(api_origin: &str, storage_path: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self {
            api_origin: parse_origin("PANEL_API_ORIGIN", api_origin)?,
            storage_path,
            token_key: DEFAULT_TOKEN_KEY.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            redirect: RedirectConfig::default(),
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid, or if no
    /// storage location can be determined.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let origin = get_or_default(&lookup, "PANEL_API_ORIGIN", DEFAULT_API_ORIGIN);
        let api_origin = parse_origin("PANEL_API_ORIGIN", &origin)?;

        let storage_path = match lookup("PANEL_STORAGE_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_storage_path()?,
        };

        let token_key = get_or_default(&lookup, "PANEL_TOKEN_KEY", DEFAULT_TOKEN_KEY);
        if token_key.trim().is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "PANEL_TOKEN_KEY".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let timeout_secs = parse_u64(&lookup, "PANEL_REQUEST_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let delay_ms = parse_u64(&lookup, "PANEL_REDIRECT_DELAY_MS", DEFAULT_REDIRECT_DELAY_MS)?;
        let route = get_or_default(&lookup, "PANEL_DASHBOARD_ROUTE", DEFAULT_DASHBOARD_ROUTE);

        Ok(Self {
            api_origin,
            storage_path,
            token_key,
            request_timeout: Duration::from_secs(timeout_secs),
            redirect: RedirectConfig {
                route,
                delay: Duration::from_millis(delay_ms),
            },
        })
    }

    /// Storage keys to try, primary first.
    #[must_use]
    pub fn token_keys(&self) -> Vec<&str> {
        let mut keys = vec![self.token_key.as_str()];
        keys.extend(
            LEGACY_TOKEN_KEYS
                .iter()
                .copied()
                .filter(|key| *key != self.token_key),
        );
        keys
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a variable with a default value.
fn get_or_default<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn parse_u64<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Parse an origin, requiring an `http`/`https` scheme and a host.
///
/// API paths and image paths are both resolved against the bare origin, so a
/// path, query or fragment is rejected rather than silently dropped.
fn parse_origin(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected an http(s) origin, got {raw}"),
        ));
    }

    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected an origin without a path, got {raw}"),
        ));
    }

    Ok(url)
}

/// `<data dir>/storepanel/storage.json`, falling back to the home directory.
fn default_storage_path() -> Result<PathBuf, ConfigError> {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| ConfigError::MissingEnvVar("PANEL_STORAGE_PATH".to_string()))?;

    path.push("storepanel");
    path.push("storage.json");
    Ok(path)
}
