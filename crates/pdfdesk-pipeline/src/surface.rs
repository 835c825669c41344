//! Annotation surface interface
//!
//! The surface is the host's interactive editor: it shows the first page of
//! a document as a background, lets the user draw on it, and exports the
//! result as a single flattened image.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

/// Opaque reference to a loaded surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SurfaceHandle(pub u64);

/// Exported composite: raw image bytes or a `data:` URL.
#[derive(Debug, Clone, PartialEq)]
pub enum CompositeImage {
    Bytes { content: Bytes, mime_type: String },
    DataUrl(String),
}

impl CompositeImage {
    /// Decode to image bytes and their MIME type.
    pub fn into_bytes(self) -> Result<(Bytes, String), SurfaceError> {
        match self {
            Self::Bytes { content, mime_type } => Ok((content, mime_type)),
            Self::DataUrl(url) => decode_data_url(&url),
        }
    }
}

fn decode_data_url(url: &str) -> Result<(Bytes, String), SurfaceError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| SurfaceError::DataUrl("missing data: prefix".into()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| SurfaceError::DataUrl("missing payload".into()))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| SurfaceError::DataUrl("only base64 payloads are supported".into()))?;
    let content = STANDARD
        .decode(payload.trim())
        .map_err(|e| SurfaceError::DataUrl(e.to_string()))?;
    Ok((Bytes::from(content), mime_type.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("Failed to load surface background: {0}")]
    Load(String),

    #[error("Failed to export composite: {0}")]
    Export(String),

    #[error("Invalid data URL: {0}")]
    DataUrl(String),
}

#[async_trait]
pub trait AnnotationSurface: Send + Sync {
    /// Show the first page of `document` as the editing background.
    async fn load_background(&self, document: Bytes) -> Result<SurfaceHandle, SurfaceError>;

    /// Flatten the background and the user's markup into one image.
    async fn export_composite(&self, handle: SurfaceHandle) -> Result<CompositeImage, SurfaceError>;
}
