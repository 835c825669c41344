//! Transform provider interface
//!
//! A provider turns the staged files plus validated options into one or more
//! output files. The dispatcher only ever sees [`RawOutput`] and
//! [`ProviderError`]; whatever a provider does internally stays behind this
//! trait.

use crate::intake::FileSet;
use crate::options::OptionValues;
use async_trait::async_trait;
use bytes::Bytes;
use pdfdesk_core::PdfDeskError;
use thiserror::Error;

/// MIME types of the files providers produce.
pub mod mime {
    pub const PDF: &str = "application/pdf";
    pub const JPEG: &str = "image/jpeg";
    pub const PNG: &str = "image/png";
    pub const MSWORD: &str = "application/msword";
    pub const PPTX: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";
    pub const ZIP: &str = "application/zip";
}

/// One output file.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOutput {
    pub content: Bytes,
    pub file_name: String,
    pub mime_type: String,
}

impl BinaryOutput {
    pub fn new(
        content: impl Into<Bytes>,
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            file_name: file_name.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// What a provider returns: one file, or a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum RawOutput {
    Single(BinaryOutput),
    Multi(Vec<BinaryOutput>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The transform itself failed.
    Transform,
    /// An input file could not be read at all.
    UnreadableInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{detail}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub detail: String,
}

impl ProviderError {
    pub fn transform(detail: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::Transform,
            detail: detail.into(),
        }
    }

    pub fn unreadable(detail: impl Into<String>) -> Self {
        Self {
            kind: ProviderErrorKind::UnreadableInput,
            detail: detail.into(),
        }
    }

    /// Options of the wrong shape for this provider.
    pub(crate) fn unexpected_options(provider: &str, options: &OptionValues) -> Self {
        Self::transform(format!("{} received unexpected options: {:?}", provider, options))
    }
}

impl From<PdfDeskError> for ProviderError {
    fn from(err: PdfDeskError) -> Self {
        if err.is_unreadable_input() {
            Self::unreadable(err.to_string())
        } else {
            Self::transform(err.to_string())
        }
    }
}

#[async_trait]
pub trait TransformProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn invoke(&self, files: &FileSet, options: &OptionValues) -> Result<RawOutput, ProviderError>;
}

/// Run CPU-bound transform work off the async runtime.
pub async fn blocking<T, F>(work: F) -> Result<T, ProviderError>
where
    F: FnOnce() -> Result<T, ProviderError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ProviderError::transform(format!("Transform task failed: {}", e)))?
}
