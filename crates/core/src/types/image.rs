//! Server-relative image paths.

use core::fmt;

use serde::{Deserialize, Serialize};

/// An image path as stored by the backend (e.g. `uploads\\products\\a.png` or
/// `/uploads/avatars/b.jpg`).
///
/// The raw value is kept untouched because it is what gets resent on update so
/// the server does not clear the image. [`ImagePath::to_url_path`] gives the
/// slash-normalised form used when building a display URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImagePath(String);

impl ImagePath {
    /// Wrap a server path. Returns `None` for an empty or blank string, which
    /// the backend uses to mean "no image".
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            None
        } else {
            Some(Self(raw))
        }
    }

    /// The path exactly as the server sent it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the path is already an absolute `http(s)` URL.
    #[must_use]
    pub fn is_absolute_url(&self) -> bool {
        let lower = self.0.to_ascii_lowercase();
        lower.starts_with("http://") || lower.starts_with("https://")
    }

    /// The path with Windows separators replaced, suitable for a URL.
    #[must_use]
    pub fn to_url_path(&self) -> String {
        self.0.replace('\\', "/")
    }
}

impl fmt::Display for ImagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ImagePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
