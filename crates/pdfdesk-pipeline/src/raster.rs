//! Page rasterizer interface
//!
//! Rendering PDF pages needs a full renderer. With the `pdfium` feature the
//! crate ships [`PdfiumRasterizer`]; hosts can also plug in their own. The
//! page-image and slide operations stay disabled without a rasterizer.

use crate::provider::ProviderError;
use async_trait::async_trait;
use bytes::Bytes;
use image::RgbaImage;
use thiserror::Error;

#[cfg(feature = "pdfium")]
mod pdfium;

#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumRasterizer;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RasterError {
    #[error("Cannot read document: {0}")]
    Unreadable(String),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Renderer unavailable: {0}")]
    Unavailable(String),
}

impl From<RasterError> for ProviderError {
    fn from(err: RasterError) -> Self {
        match err {
            RasterError::Unreadable(_) => ProviderError::unreadable(err.to_string()),
            RasterError::Render(_) | RasterError::Unavailable(_) => {
                ProviderError::transform(err.to_string())
            }
        }
    }
}

#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Render every page of `pdf`, in order. `scale` 1.0 renders one pixel
    /// per point.
    async fn render_pages(&self, pdf: Bytes, scale: f32) -> Result<Vec<RgbaImage>, RasterError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderErrorKind;

    #[test]
    fn test_only_unreadable_documents_clear_input() {
        let unreadable = ProviderError::from(RasterError::Unreadable("bad xref".into()));
        assert_eq!(unreadable.kind, ProviderErrorKind::UnreadableInput);

        let missing = ProviderError::from(RasterError::Unavailable("libpdfium.so".into()));
        assert_eq!(missing.kind, ProviderErrorKind::Transform);
        assert_eq!(missing.detail, "Renderer unavailable: libpdfium.so");
    }
}
