//! Providers that need rendered pages: page images, slide decks and
//! rasterized compression.

use super::first_content;
use crate::config::{PipelineConfig, RenderConfig};
use crate::intake::FileSet;
use crate::options::OptionValues;
use crate::provider::{blocking, mime, BinaryOutput, ProviderError, RawOutput, TransformProvider};
use crate::raster::PageRasterizer;
use async_trait::async_trait;
use image::RgbaImage;
use pdfdesk_core::SlideImage;
use std::sync::Arc;
use tracing::debug;

pub struct RasterProviders {
    pub page_images: Arc<dyn TransformProvider>,
    pub slides: Arc<dyn TransformProvider>,
    pub compress: Arc<dyn TransformProvider>,
}

pub fn all(config: &PipelineConfig, rasterizer: Arc<dyn PageRasterizer>) -> RasterProviders {
    RasterProviders {
        page_images: Arc::new(PageImagesProvider {
            rasterizer: Arc::clone(&rasterizer),
            render: config.render.clone(),
        }),
        compress: Arc::new(RasterCompressProvider {
            rasterizer: Arc::clone(&rasterizer),
            scale: config.render.page_image_scale,
        }),
        slides: Arc::new(SlidesProvider {
            rasterizer,
            scale: config.render.slide_scale,
        }),
    }
}

async fn render(
    rasterizer: &dyn PageRasterizer,
    files: &FileSet,
    scale: f32,
) -> Result<Vec<RgbaImage>, ProviderError> {
    let document = first_content(files)?;
    let pages = rasterizer.render_pages(document, scale).await?;
    if pages.is_empty() {
        return Err(ProviderError::transform("Document has no pages to render"));
    }
    debug!(pages = pages.len(), scale, "Rendered pages");
    Ok(pages)
}

/// One JPEG per page, named `page_1.jpg`, `page_2.jpg`, ...
pub struct PageImagesProvider {
    rasterizer: Arc<dyn PageRasterizer>,
    render: RenderConfig,
}

#[async_trait]
impl TransformProvider for PageImagesProvider {
    fn name(&self) -> &'static str {
        "page-images"
    }

    async fn invoke(&self, files: &FileSet, _options: &OptionValues) -> Result<RawOutput, ProviderError> {
        let pages = render(self.rasterizer.as_ref(), files, self.render.page_image_scale).await?;
        let quality = self.render.jpeg_quality;
        let outputs = blocking(move || {
            pages
                .iter()
                .enumerate()
                .map(|(i, page)| -> Result<BinaryOutput, ProviderError> {
                    let jpeg = pdfdesk_core::encode_jpeg(page, quality)?;
                    Ok(BinaryOutput::new(jpeg, format!("page_{}.jpg", i + 1), mime::JPEG))
                })
                .collect::<Result<Vec<_>, _>>()
        })
        .await?;
        Ok(RawOutput::Multi(outputs))
    }
}

/// One full-slide picture per page.
pub struct SlidesProvider {
    rasterizer: Arc<dyn PageRasterizer>,
    scale: f32,
}

#[async_trait]
impl TransformProvider for SlidesProvider {
    fn name(&self) -> &'static str {
        "slides"
    }

    async fn invoke(&self, files: &FileSet, _options: &OptionValues) -> Result<RawOutput, ProviderError> {
        let pages = render(self.rasterizer.as_ref(), files, self.scale).await?;
        let deck = blocking(move || {
            let slides = pages
                .iter()
                .map(|page| -> Result<SlideImage, ProviderError> {
                    Ok(SlideImage {
                        png: pdfdesk_core::encode_png(page)?,
                        width_px: page.width(),
                        height_px: page.height(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(pdfdesk_core::build_slide_deck(&slides)?)
        })
        .await?;
        Ok(RawOutput::Single(BinaryOutput::new(deck, "presentation.pptx", mime::PPTX)))
    }
}

/// Rebuilds the document from JPEG renderings of its pages, one image per
/// page, at the chosen compression quality.
pub struct RasterCompressProvider {
    rasterizer: Arc<dyn PageRasterizer>,
    scale: f32,
}

#[async_trait]
impl TransformProvider for RasterCompressProvider {
    fn name(&self) -> &'static str {
        "raster-compress"
    }

    async fn invoke(&self, files: &FileSet, options: &OptionValues) -> Result<RawOutput, ProviderError> {
        let quality = options
            .compression_quality()
            .ok_or_else(|| ProviderError::transform("Compression level not set"))?;
        let original_bytes = first_content(files)?.len();
        let pages = render(self.rasterizer.as_ref(), files, self.scale).await?;
        let rebuilt = blocking(move || {
            let jpegs = pages
                .iter()
                .map(|page| pdfdesk_core::encode_jpeg(page, quality))
                .collect::<Result<Vec<_>, _>>()?;
            let refs: Vec<&[u8]> = jpegs.iter().map(Vec::as_slice).collect();
            Ok(pdfdesk_core::images_to_pdf(&refs)?)
        })
        .await?;
        debug!(
            original_bytes,
            compressed_bytes = rebuilt.len(),
            quality,
            "Rebuilt PDF from page images"
        );
        Ok(RawOutput::Single(BinaryOutput::new(
            rebuilt,
            "compressed_toolbar.pdf",
            mime::PDF,
        )))
    }
}
