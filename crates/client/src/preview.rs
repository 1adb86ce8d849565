//! Image selection and preview references.
//!
//! A preview is display-only: it is never persisted and never sent to the
//! server. The image that is actually submitted is decided separately by the
//! form (new file first, stored path otherwise).

use std::path::Path;

use storepanel_core::ImagePath;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

/// Errors raised while picking an image file.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// The file could not be read.
    #[error("Could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file is not an image.
    #[error("{0} is not an image file")]
    NotAnImage(String),

    /// The file is empty.
    #[error("{0} is empty")]
    Empty(String),
}

/// A newly chosen image file, held in memory until submit.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl SelectedFile {
    /// Wrap in-memory image bytes.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::NotAnImage` if `content_type` is not `image/*`,
    /// or `SelectionError::Empty` if there are no bytes.
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<Self, SelectionError> {
        let file_name = file_name.into();
        let content_type = content_type.into();

        if !content_type.to_ascii_lowercase().starts_with("image/") {
            return Err(SelectionError::NotAnImage(file_name));
        }
        if bytes.is_empty() {
            return Err(SelectionError::Empty(file_name));
        }

        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    /// Read an image from disk, inferring its content type from the
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError` if the file cannot be read, is empty, or does
    /// not have an image extension.
    pub async fn from_path(path: &Path) -> Result<Self, SelectionError> {
        let display = path.display().to_string();
        let content_type =
            image_content_type(path).ok_or_else(|| SelectionError::NotAnImage(display.clone()))?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| SelectionError::Read {
                path: display.clone(),
                source,
            })?;

        let file_name = path
            .file_name()
            .map_or_else(|| display.clone(), |n| n.to_string_lossy().into_owned());

        Self::new(file_name, content_type, bytes)
    }

    /// Original file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// MIME type sent with the upload.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// File contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false for a constructed file; present for API symmetry with `len`.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// MIME type for common image extensions.
#[must_use]
pub fn image_content_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        _ => return None,
    };
    Some(mime)
}

/// Where the image shown next to a form comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Preview {
    /// Nothing to show.
    #[default]
    Empty,
    /// A freshly selected file, addressed by a local `blob:` reference.
    Local(String),
    /// An image already stored on the server, as an absolute URL.
    Remote(String),
}

impl Preview {
    /// Local preview for a newly selected file. No I/O happens here.
    #[must_use]
    pub fn local_blob(origin: &Url) -> Self {
        let origin = origin.origin().ascii_serialization();
        Self::Local(format!("blob:{origin}/{}", Uuid::new_v4()))
    }

    /// Remote preview for a stored path.
    #[must_use]
    pub fn remote(origin: &Url, path: &ImagePath) -> Self {
        Self::Remote(resolve_image_url(origin, path))
    }

    /// Displayable URL, if any.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Empty => None,
            Self::Local(url) | Self::Remote(url) => Some(url),
        }
    }

    /// Whether there is nothing to show.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Whether this preview points at a not-yet-uploaded file.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Local(_))
    }
}

/// Absolute URL for a stored image path.
///
/// Absolute `http(s)` URLs pass through unchanged. Relative paths have their
/// backslashes normalised and are joined to the origin with exactly one `/`.
#[must_use]
pub fn resolve_image_url(origin: &Url, path: &ImagePath) -> String {
    if path.is_absolute_url() {
        return path.as_str().to_string();
    }

    let base = origin.as_str().trim_end_matches('/');
    let relative = path.to_url_path();
    format!("{base}/{}", relative.trim_start_matches('/'))
}
