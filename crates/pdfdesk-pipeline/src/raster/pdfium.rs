//! Page rendering through the pdfium C library.
//!
//! pdfium is not safe to call from async tasks. Every render binds the
//! library on a blocking-pool thread and drops it before returning.

use super::{PageRasterizer, RasterError};
use crate::config::RenderConfig;
use async_trait::async_trait;
use bytes::Bytes;
use image::RgbaImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};

/// Environment override for the library location.
const LIBRARY_ENV: &str = "PDFIUM_LIB_PATH";

pub struct PdfiumRasterizer {
    library: Option<PathBuf>,
    max_pixels: u32,
}

impl PdfiumRasterizer {
    /// Fails with [`RasterError::Unavailable`] when the library cannot be
    /// bound.
    pub fn new(render: &RenderConfig) -> Result<Self, RasterError> {
        let library = render
            .pdfium_library
            .clone()
            .or_else(|| std::env::var_os(LIBRARY_ENV).map(PathBuf::from));
        let rasterizer = Self {
            library,
            max_pixels: render.max_pixels.max(1),
        };
        bind(rasterizer.library.as_ref())?;
        info!(library = ?rasterizer.library, max_pixels = rasterizer.max_pixels, "pdfium rasterizer ready");
        Ok(rasterizer)
    }
}

#[async_trait]
impl PageRasterizer for PdfiumRasterizer {
    async fn render_pages(&self, pdf: Bytes, scale: f32) -> Result<Vec<RgbaImage>, RasterError> {
        let library = self.library.clone();
        let max_pixels = self.max_pixels;
        tokio::task::spawn_blocking(move || render_blocking(library.as_ref(), &pdf, scale, max_pixels))
            .await
            .map_err(|e| RasterError::Render(format!("Render task panicked: {}", e)))?
    }
}

fn bind(library: Option<&PathBuf>) -> Result<Pdfium, RasterError> {
    let bindings = match library {
        Some(path) => Pdfium::bind_to_library(path),
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| RasterError::Unavailable(e.to_string()))?;
    Ok(Pdfium::new(bindings))
}

fn render_blocking(
    library: Option<&PathBuf>,
    pdf: &[u8],
    scale: f32,
    max_pixels: u32,
) -> Result<Vec<RgbaImage>, RasterError> {
    let pdfium = bind(library)?;
    let document = pdfium
        .load_pdf_from_byte_slice(pdf, None)
        .map_err(|e| RasterError::Unreadable(format!("{:?}", e)))?;

    let render_config = PdfRenderConfig::new()
        .scale_page_by_factor(scale)
        .set_maximum_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let pages = document.pages();
    let mut images = Vec::with_capacity(pages.len() as usize);
    for (index, page) in pages.iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| RasterError::Render(format!("page {}: {:?}", index + 1, e)))?;
        let image = bitmap.as_image().to_rgba8();
        debug!(page = index + 1, width = image.width(), height = image.height(), "Rendered page");
        images.push(image);
    }
    Ok(images)
}
