//! Built-in transform providers
//!
//! Each provider adapts one `pdfdesk_core` transform to the
//! [`TransformProvider`](crate::provider::TransformProvider) interface and
//! names its output file. The CPU work runs on the blocking pool.

pub mod convert;
pub mod pdf;
pub mod raster;

use crate::intake::FileSet;
use crate::provider::ProviderError;
use bytes::Bytes;

/// Content of the first staged file.
pub(crate) fn first_content(files: &FileSet) -> Result<Bytes, ProviderError> {
    files
        .first()
        .map(|file| file.content.clone())
        .ok_or_else(|| ProviderError::transform("No input file"))
}

/// Content of every staged file, in order. Cloning `Bytes` shares the
/// buffers.
pub(crate) fn all_contents(files: &FileSet) -> Result<Vec<Bytes>, ProviderError> {
    if files.is_empty() {
        return Err(ProviderError::transform("No input files"));
    }
    Ok(files.iter().map(|file| file.content.clone()).collect())
}
