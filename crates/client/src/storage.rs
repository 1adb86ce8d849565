//! Persistent client-side storage and the bearer token kept in it.
//!
//! [`KeyValueStore`] plays the role browser local storage plays for a web
//! panel: a small string map that survives restarts. [`TokenStore`] reads the
//! bearer token out of it under the configured key, falling back to legacy
//! aliases.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::ClientConfig;

/// Errors raised by the storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the storage file failed.
    #[error("Storage I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The storage file is not a JSON string map.
    #[error("Storage file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A previous holder of the storage lock panicked.
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// A persistent string map.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// File-backed storage
// =============================================================================

/// JSON file storage (`{"key": "value", ...}`).
///
/// Every operation re-reads the file so separate processes (for example two
/// CLI invocations) observe each other's writes.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    /// Storage at `path`. The file and its parent directories are created on
    /// first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the storage file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(map).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        // Write to a sibling file and rename so readers never see a torn file
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(self.read_map()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::Poisoned)?;
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

// =============================================================================
// In-memory storage
// =============================================================================

/// Process-local storage, used by tests and embedders that manage
/// persistence themselves.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().map_err(|_| StorageError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

// =============================================================================
// Token store
// =============================================================================

/// The bearer token, as held in client storage.
///
/// Implements `Debug` manually so the storage keys are visible but the token
/// never is.
#[derive(Clone)]
pub struct TokenStore {
    storage: Arc<dyn KeyValueStore>,
    /// Primary key first, then read-only aliases.
    keys: Vec<String>,
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    /// Token store over `storage`, reading `keys` in order and writing the
    /// first one.
    #[must_use]
    pub fn new<I, S>(storage: Arc<dyn KeyValueStore>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            storage,
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// File-backed token store at the configured location and keys.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        let storage: Arc<dyn KeyValueStore> = Arc::new(FileStorage::new(&config.storage_path));
        Self::new(storage, config.token_keys())
    }

    /// Key that [`TokenStore::set_token`] writes.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        self.keys.first().map_or("token", String::as_str)
    }

    /// The stored token, if any. Blank values count as absent.
    ///
    /// With [`FileStorage`] this is a synchronous read of a file of a few
    /// hundred bytes. Async callers invoke it directly rather than through
    /// `spawn_blocking`; a store backed by slow I/O should cache its values.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage cannot be read.
    #[instrument(skip(self))]
    pub fn token(&self) -> Result<Option<SecretString>, StorageError> {
        for key in &self.keys {
            if let Some(value) = self.storage.get(key)?
                && !value.trim().is_empty()
            {
                debug!(key = %key, "Bearer token found in storage");
                return Ok(Some(SecretString::from(value.trim().to_string())));
            }
        }
        debug!("No bearer token in storage");
        Ok(None)
    }

    /// Persist a token under the primary key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage cannot be written.
    pub fn set_token(&self, token: &SecretString) -> Result<(), StorageError> {
        self.storage
            .set(self.primary_key(), token.expose_secret().trim())
    }

    /// Remove the token under every known key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage cannot be written.
    pub fn clear(&self) -> Result<(), StorageError> {
        for key in &self.keys {
            self.storage.remove(key)?;
        }
        Ok(())
    }
}
