//! Shared fixtures for the pipeline integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use image::{ImageFormat, Rgba, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use pdfdesk_pipeline::provider::mime;
use pdfdesk_pipeline::{
    AnnotationSurface, BinaryOutput, CompositeImage, FileSet, IncomingFile, OptionValues,
    ProviderError, RawOutput, SurfaceError, SurfaceHandle, TransformProvider,
};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Route pipeline logs to the test harness output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Build a PDF with `num_pages` Letter pages, each labelled with its number.
pub fn create_test_pdf(num_pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids = Vec::new();
    for n in 1..=num_pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(18)]),
                Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                Operation::new("Tj", vec![Object::string_literal(format!("Page {}", n))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => num_pages as i64,
            "Kids" => kids,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

pub fn page_count(pdf: &[u8]) -> usize {
    Document::load_mem(pdf).unwrap().get_pages().len()
}

pub fn pdf_file(name: &str, pages: u32) -> IncomingFile {
    IncomingFile::new(name, create_test_pdf(pages)).with_mime("application/pdf")
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 13 % 256) as u8, 90, (y * 17 % 256) as u8, 255])
    });
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// A provider that blocks inside `invoke` until released, so tests can
/// observe a session while it is `Running`.
#[derive(Default)]
pub struct GatedProvider {
    pub started: Notify,
    pub release: Notify,
    pub calls: AtomicUsize,
}

impl GatedProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransformProvider for GatedProvider {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn invoke(&self, files: &FileSet, _options: &OptionValues) -> Result<RawOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(RawOutput::Single(BinaryOutput::new(
            Bytes::from(files.names().join(",")),
            "gated.pdf",
            mime::PDF,
        )))
    }
}

/// Annotation surface that exports its composite as a PNG data URL, the
/// way a browser canvas does.
#[derive(Default)]
pub struct CanvasSurface {
    pub loaded: AtomicUsize,
}

#[async_trait]
impl AnnotationSurface for CanvasSurface {
    async fn load_background(&self, document: Bytes) -> Result<SurfaceHandle, SurfaceError> {
        if !document.starts_with(b"%PDF") {
            return Err(SurfaceError::Load("Background is not a PDF".into()));
        }
        let n = self.loaded.fetch_add(1, Ordering::SeqCst);
        Ok(SurfaceHandle(n as u64 + 1))
    }

    async fn export_composite(&self, _handle: SurfaceHandle) -> Result<CompositeImage, SurfaceError> {
        Ok(CompositeImage::DataUrl(format!(
            "data:image/png;base64,{}",
            STANDARD.encode(png_bytes(40, 30))
        )))
    }
}

/// Annotation surface whose `load_background` waits until released, so
/// tests can change the staged input mid-load.
#[derive(Default)]
pub struct GatedSurface {
    pub started: Notify,
    pub release: Notify,
}

#[async_trait]
impl AnnotationSurface for GatedSurface {
    async fn load_background(&self, _document: Bytes) -> Result<SurfaceHandle, SurfaceError> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(SurfaceHandle(7))
    }

    async fn export_composite(&self, _handle: SurfaceHandle) -> Result<CompositeImage, SurfaceError> {
        Ok(CompositeImage::DataUrl(format!(
            "data:image/png;base64,{}",
            STANDARD.encode(png_bytes(8, 8))
        )))
    }
}
