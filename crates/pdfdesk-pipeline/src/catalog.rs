//! Operation catalog
//!
//! The fixed table of operations the toolbar offers. Each entry says what
//! files it takes, which option form it shows, whether it needs the
//! annotation surface, and which provider performs the transform. Entries
//! without a provider are advertised but cannot run.

use crate::config::PipelineConfig;
use crate::options::OptionSchemaId;
use crate::provider::TransformProvider;
use crate::providers;
use crate::raster::PageRasterizer;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Identifier of a catalog operation. Serialized in kebab-case
/// (`merge-pdf`, `pdf-to-jpg`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationId {
    MergePdf,
    SplitPdf,
    CompressPdf,
    PdfToWord,
    WordToPdf,
    PdfToPptx,
    PdfToJpg,
    JpgToPdf,
    EditPdf,
    SignPdf,
    WatermarkPdf,
    RotatePdf,
    PdfToExcel,
    ExcelToPdf,
    PptxToPdf,
    UnlockPdf,
    ProtectPdf,
    OrganizePdf,
    PdfToPdfa,
    RepairPdf,
    NumberPages,
    ScanToPdf,
    OcrPdf,
    ComparePdf,
    RedactPdf,
    SharePdf,
    HtmlToPdf,
}

impl OperationId {
    /// Every operation, in display order.
    pub const ALL: [OperationId; 27] = [
        Self::MergePdf,
        Self::SplitPdf,
        Self::CompressPdf,
        Self::PdfToWord,
        Self::WordToPdf,
        Self::PdfToPptx,
        Self::PdfToJpg,
        Self::JpgToPdf,
        Self::EditPdf,
        Self::SignPdf,
        Self::WatermarkPdf,
        Self::RotatePdf,
        Self::PdfToExcel,
        Self::ExcelToPdf,
        Self::PptxToPdf,
        Self::UnlockPdf,
        Self::ProtectPdf,
        Self::OrganizePdf,
        Self::PdfToPdfa,
        Self::RepairPdf,
        Self::NumberPages,
        Self::ScanToPdf,
        Self::OcrPdf,
        Self::ComparePdf,
        Self::RedactPdf,
        Self::SharePdf,
        Self::HtmlToPdf,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MergePdf => "merge-pdf",
            Self::SplitPdf => "split-pdf",
            Self::CompressPdf => "compress-pdf",
            Self::PdfToWord => "pdf-to-word",
            Self::WordToPdf => "word-to-pdf",
            Self::PdfToPptx => "pdf-to-pptx",
            Self::PdfToJpg => "pdf-to-jpg",
            Self::JpgToPdf => "jpg-to-pdf",
            Self::EditPdf => "edit-pdf",
            Self::SignPdf => "sign-pdf",
            Self::WatermarkPdf => "watermark-pdf",
            Self::RotatePdf => "rotate-pdf",
            Self::PdfToExcel => "pdf-to-excel",
            Self::ExcelToPdf => "excel-to-pdf",
            Self::PptxToPdf => "pptx-to-pdf",
            Self::UnlockPdf => "unlock-pdf",
            Self::ProtectPdf => "protect-pdf",
            Self::OrganizePdf => "organize-pdf",
            Self::PdfToPdfa => "pdf-to-pdfa",
            Self::RepairPdf => "repair-pdf",
            Self::NumberPages => "number-pages",
            Self::ScanToPdf => "scan-to-pdf",
            Self::OcrPdf => "ocr-pdf",
            Self::ComparePdf => "compare-pdf",
            Self::RedactPdf => "redact-pdf",
            Self::SharePdf => "share-pdf",
            Self::HtmlToPdf => "html-to-pdf",
        }
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no catalog operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown operation: {0}")]
pub struct UnknownOperation(pub String);

impl FromStr for OperationId {
    type Err = UnknownOperation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}

/// The kind of file an operation takes as input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    PdfDocument,
    Image,
    WordDocument,
    /// The operation takes no files; its input comes from options.
    None,
}

const IMAGE_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff"];
const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

impl FileKind {
    /// Value for a file picker's `accept` attribute.
    pub fn accept_attribute(self) -> &'static str {
        match self {
            Self::PdfDocument => ".pdf",
            Self::Image => "image/*",
            Self::WordDocument => ".docx",
            Self::None => "",
        }
    }

    /// Whether a file looks like this kind, by MIME hint first and then by
    /// file extension.
    pub fn matches(self, name: &str, mime_hint: Option<&str>) -> bool {
        if let Some(mime) = mime_hint.map(str::trim).filter(|m| !m.is_empty()) {
            let mime = mime.to_ascii_lowercase();
            let by_mime = match self {
                Self::PdfDocument => mime == "application/pdf",
                Self::Image => mime.starts_with("image/"),
                Self::WordDocument => mime == DOCX_MIME,
                Self::None => false,
            };
            if by_mime {
                return true;
            }
        }

        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match self {
            Self::PdfDocument => extension == "pdf",
            Self::Image => IMAGE_EXTENSIONS.contains(&extension.as_str()),
            Self::WordDocument => extension == "docx",
            Self::None => false,
        }
    }
}

/// Immutable description of one catalog operation.
#[derive(Clone)]
pub struct OperationDescriptor {
    pub id: OperationId,
    pub title: String,
    pub description: String,
    pub accepts_multiple_files: bool,
    pub accepted_kind: FileKind,
    pub options: Option<OptionSchemaId>,
    pub requires_surface: bool,
    pub provider: Option<Arc<dyn TransformProvider>>,
}

impl OperationDescriptor {
    /// A single-PDF operation with no options and no provider.
    pub fn new(id: OperationId, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            accepts_multiple_files: false,
            accepted_kind: FileKind::PdfDocument,
            options: None,
            requires_surface: false,
            provider: None,
        }
    }

    pub fn multiple(mut self) -> Self {
        self.accepts_multiple_files = true;
        self
    }

    pub fn kind(mut self, kind: FileKind) -> Self {
        self.accepted_kind = kind;
        self
    }

    pub fn options(mut self, schema: OptionSchemaId) -> Self {
        self.options = Some(schema);
        self
    }

    pub fn surface(mut self) -> Self {
        self.requires_surface = true;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn TransformProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Advertised but not runnable.
    pub fn is_coming_soon(&self) -> bool {
        self.provider.is_none()
    }

    pub fn summary(&self) -> OperationSummary {
        OperationSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            enabled: !self.is_coming_soon(),
            accept: self.accepted_kind.accept_attribute(),
            multiple: self.accepts_multiple_files,
            takes_files: self.accepted_kind != FileKind::None,
            options: self.options,
            requires_surface: self.requires_surface,
        }
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("accepts_multiple_files", &self.accepts_multiple_files)
            .field("accepted_kind", &self.accepted_kind)
            .field("options", &self.options)
            .field("requires_surface", &self.requires_surface)
            .field("provider", &self.provider.as_ref().map(|p| p.name()))
            .finish()
    }
}

/// Display data for one catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationSummary {
    pub id: OperationId,
    pub title: String,
    pub description: String,
    pub enabled: bool,
    pub accept: &'static str,
    pub multiple: bool,
    pub takes_files: bool,
    pub options: Option<OptionSchemaId>,
    pub requires_surface: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Operation {0} is registered twice")]
    Duplicate(OperationId),

    #[error("Operation {0} uses the annotation surface and cannot take multiple files")]
    MultiFileSurface(OperationId),

    #[error("Operation {0} takes no files but is marked as accepting multiple")]
    MultiFileWithoutInput(OperationId),
}

/// Validates descriptors as they are registered.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    entries: Vec<Arc<OperationDescriptor>>,
    seen: HashSet<OperationId>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, descriptor: OperationDescriptor) -> Result<Self, CatalogError> {
        let id = descriptor.id;
        if !self.seen.insert(id) {
            return Err(CatalogError::Duplicate(id));
        }
        if descriptor.requires_surface && descriptor.accepts_multiple_files {
            return Err(CatalogError::MultiFileSurface(id));
        }
        if descriptor.accepted_kind == FileKind::None && descriptor.accepts_multiple_files {
            return Err(CatalogError::MultiFileWithoutInput(id));
        }
        self.entries.push(Arc::new(descriptor));
        Ok(self)
    }

    pub fn build(self) -> Catalog {
        Catalog {
            entries: self.entries,
        }
    }
}

/// Optional rendering backends the host can supply.
#[derive(Clone, Default)]
pub struct Backends {
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,
}

impl Backends {
    pub fn with_rasterizer(rasterizer: Arc<dyn PageRasterizer>) -> Self {
        Self {
            rasterizer: Some(rasterizer),
        }
    }

    /// Backends rendering through pdfium, located as configured in
    /// `[render]`.
    #[cfg(feature = "pdfium")]
    pub fn pdfium(render: &crate::config::RenderConfig) -> Result<Self, crate::raster::RasterError> {
        let rasterizer = crate::raster::PdfiumRasterizer::new(render)?;
        Ok(Self::with_rasterizer(Arc::new(rasterizer)))
    }
}

/// Read-only operation table, in registration order.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<Arc<OperationDescriptor>>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::new()
    }

    /// The full toolbar catalog, wired to the built-in providers.
    ///
    /// Page-rendering operations only get a provider when `backends`
    /// supplies a rasterizer. With `render.rasterize_compression` set, that
    /// rasterizer also drives compression.
    pub fn standard(config: &PipelineConfig, backends: Backends) -> Result<Self, CatalogError> {
        use FileKind::{Image, WordDocument};
        use OperationId::*;

        let pdf = providers::pdf::all(config);
        let convert = providers::convert::all(config);
        let mut compress = pdf.compress;

        let mut pdf_to_pptx = OperationDescriptor::new(
            PdfToPptx,
            "PDF to PowerPoint",
            "Convert PDF pages to slides.",
        );
        let mut pdf_to_jpg = OperationDescriptor::new(PdfToJpg, "PDF to JPG", "Convert pages to images.");
        if let Some(rasterizer) = backends.rasterizer {
            let raster = providers::raster::all(config, rasterizer);
            pdf_to_pptx = pdf_to_pptx.provider(raster.slides);
            pdf_to_jpg = pdf_to_jpg.provider(raster.page_images);
            if config.render.rasterize_compression {
                compress = raster.compress;
            }
        }

        let builder = CatalogBuilder::new()
            .register(
                OperationDescriptor::new(MergePdf, "Merge PDF", "Combine multiple PDFs into one file.")
                    .multiple()
                    .provider(pdf.merge),
            )?
            .register(
                OperationDescriptor::new(SplitPdf, "Split PDF", "Extract pages from a PDF file.")
                    .options(OptionSchemaId::PageRange)
                    .provider(pdf.split),
            )?
            .register(
                OperationDescriptor::new(
                    CompressPdf,
                    "Compress PDF",
                    "Reduce file size by recompressing images.",
                )
                .options(OptionSchemaId::Compression)
                .provider(compress),
            )?
            .register(
                OperationDescriptor::new(PdfToWord, "PDF to Word", "Convert PDF content to .doc text.")
                    .provider(convert.pdf_to_word),
            )?
            .register(
                OperationDescriptor::new(WordToPdf, "Word to PDF", "Convert DOCX to PDF.")
                    .kind(WordDocument)
                    .provider(convert.word_to_pdf),
            )?
            .register(pdf_to_pptx)?
            .register(pdf_to_jpg)?
            .register(
                OperationDescriptor::new(JpgToPdf, "JPG to PDF", "Convert images to PDF.")
                    .multiple()
                    .kind(Image)
                    .provider(convert.images_to_pdf),
            )?
            .register(
                OperationDescriptor::new(EditPdf, "Edit PDF", "Add text and drawings to PDF.")
                    .surface()
                    .provider(convert.flatten.clone()),
            )?
            .register(
                OperationDescriptor::new(SignPdf, "Sign PDF", "Draw your signature on a PDF.")
                    .surface()
                    .provider(convert.flatten),
            )?
            .register(
                OperationDescriptor::new(WatermarkPdf, "Watermark PDF", "Add text overlay to pages.")
                    .options(OptionSchemaId::Watermark)
                    .provider(pdf.watermark),
            )?
            .register(
                OperationDescriptor::new(RotatePdf, "Rotate PDF", "Rotate PDF pages.")
                    .options(OptionSchemaId::Rotation)
                    .provider(pdf.rotate),
            )?;

        let coming_soon = [
            (PdfToExcel, "PDF to Excel", "Convert table data (simple)."),
            (ExcelToPdf, "Excel to PDF", "Convert spreadsheets."),
            (PptxToPdf, "PPT to PDF", "Convert presentations."),
            (UnlockPdf, "Unlock PDF", "Remove passwords."),
            (ProtectPdf, "Protect PDF", "Add password security."),
            (OrganizePdf, "Organize PDF", "Sort and delete pages."),
            (PdfToPdfa, "PDF to PDF/A", "Archive format conversion."),
            (RepairPdf, "Repair PDF", "Fix damaged files."),
            (NumberPages, "Page Numbers", "Add page numbers."),
            (ScanToPdf, "Scan to PDF", "From camera to PDF."),
            (OcrPdf, "OCR PDF", "Make text searchable."),
            (ComparePdf, "Compare PDF", "Show differences."),
            (RedactPdf, "Redact PDF", "Hide sensitive info."),
            (SharePdf, "Share PDF", "Generate link."),
        ];
        let builder = coming_soon
            .into_iter()
            .try_fold(builder, |builder, (id, title, description)| {
                builder.register(OperationDescriptor::new(id, title, description))
            })?;

        let builder = builder.register(
            OperationDescriptor::new(HtmlToPdf, "HTML to PDF", "Convert web pages.")
                .kind(FileKind::None)
                .options(OptionSchemaId::Markup)
                .provider(convert.markup_to_pdf),
        )?;

        Ok(builder.build())
    }

    pub fn lookup(&self, operation_id: &str) -> Result<Arc<OperationDescriptor>, UnknownOperation> {
        let id = OperationId::from_str(operation_id)?;
        self.get(id)
            .ok_or_else(|| UnknownOperation(operation_id.to_string()))
    }

    pub fn get(&self, id: OperationId) -> Option<Arc<OperationDescriptor>> {
        self.entries.iter().find(|d| d.id == id).cloned()
    }

    /// All entries in display order.
    pub fn list_all(&self) -> Vec<(OperationId, Arc<OperationDescriptor>)> {
        self.entries.iter().map(|d| (d.id, Arc::clone(d))).collect()
    }

    pub fn summaries(&self) -> Vec<OperationSummary> {
        self.entries.iter().map(|d| d.summary()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixedProvider, StubRasterizer};
    use pretty_assertions::assert_eq;

    fn standard() -> Catalog {
        Catalog::standard(&PipelineConfig::default(), Backends::default()).unwrap()
    }

    #[test]
    fn test_standard_catalog_lists_every_operation_in_order() {
        let ids: Vec<OperationId> = standard().list_all().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, OperationId::ALL.to_vec());
    }

    #[test]
    fn test_lookup_round_trips_every_listed_id() {
        let catalog = standard();
        for (id, descriptor) in catalog.list_all() {
            let found = catalog.lookup(id.as_str()).unwrap();
            assert_eq!(found.id, id);
            assert!(Arc::ptr_eq(&found, &descriptor));
        }
    }

    #[test]
    fn test_lookup_unknown_id() {
        let err = standard().lookup("frobnicate-pdf").unwrap_err();
        assert_eq!(err, UnknownOperation("frobnicate-pdf".into()));
    }

    #[test]
    fn test_coming_soon_entries_have_no_provider() {
        let catalog = standard();
        let disabled: Vec<OperationId> = catalog
            .list_all()
            .into_iter()
            .filter(|(_, d)| d.is_coming_soon())
            .map(|(id, _)| id)
            .collect();
        assert_eq!(disabled.len(), 16);
        assert!(disabled.contains(&OperationId::PdfToJpg));
        assert!(disabled.contains(&OperationId::SharePdf));
        assert!(!disabled.contains(&OperationId::HtmlToPdf));
    }

    #[test]
    fn test_rasterizer_enables_page_rendering_operations() {
        let backends = Backends::with_rasterizer(Arc::new(StubRasterizer::default()));
        let catalog = Catalog::standard(&PipelineConfig::default(), backends).unwrap();
        assert!(!catalog.get(OperationId::PdfToJpg).unwrap().is_coming_soon());
        assert!(!catalog.get(OperationId::PdfToPptx).unwrap().is_coming_soon());
    }

    fn compress_provider(config: &PipelineConfig, backends: Backends) -> &'static str {
        let catalog = Catalog::standard(config, backends).unwrap();
        let compress = catalog.get(OperationId::CompressPdf).unwrap();
        compress.provider.as_ref().unwrap().name()
    }

    #[test]
    fn test_rasterized_compression_is_opt_in() {
        let stub = || Backends::with_rasterizer(Arc::new(StubRasterizer::default()));
        let mut config = PipelineConfig::default();
        assert_eq!(compress_provider(&config, stub()), "compress");

        config.render.rasterize_compression = true;
        assert_eq!(compress_provider(&config, stub()), "raster-compress");
        assert_eq!(compress_provider(&config, Backends::default()), "compress");
    }

    #[test]
    fn test_descriptor_shapes() {
        let catalog = standard();
        let merge = catalog.get(OperationId::MergePdf).unwrap();
        assert!(merge.accepts_multiple_files);
        assert_eq!(merge.accepted_kind, FileKind::PdfDocument);

        let html = catalog.get(OperationId::HtmlToPdf).unwrap();
        assert_eq!(html.accepted_kind, FileKind::None);
        assert_eq!(html.options, Some(OptionSchemaId::Markup));

        let sign = catalog.get(OperationId::SignPdf).unwrap();
        assert!(sign.requires_surface);
        assert!(!sign.accepts_multiple_files);
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let err = CatalogBuilder::new()
            .register(OperationDescriptor::new(OperationId::MergePdf, "a", "b"))
            .unwrap()
            .register(OperationDescriptor::new(OperationId::MergePdf, "c", "d"))
            .unwrap_err();
        assert_eq!(err, CatalogError::Duplicate(OperationId::MergePdf));
    }

    #[test]
    fn test_builder_rejects_multi_file_surface() {
        let err = CatalogBuilder::new()
            .register(
                OperationDescriptor::new(OperationId::EditPdf, "Edit", "")
                    .surface()
                    .multiple()
                    .provider(Arc::new(FixedProvider::pdf("x.pdf"))),
            )
            .unwrap_err();
        assert_eq!(err, CatalogError::MultiFileSurface(OperationId::EditPdf));
    }

    #[test]
    fn test_file_kind_matching() {
        assert!(FileKind::PdfDocument.matches("report.PDF", None));
        assert!(FileKind::PdfDocument.matches("blob", Some("application/pdf")));
        assert!(FileKind::Image.matches("scan.bin", Some("image/png")));
        assert!(FileKind::Image.matches("photo.jpeg", Some("application/octet-stream")));
        assert!(FileKind::WordDocument.matches("letter.docx", Some("")));
        assert!(!FileKind::PdfDocument.matches("photo.jpg", Some("image/jpeg")));
        assert!(!FileKind::None.matches("anything.pdf", Some("application/pdf")));
    }

    #[test]
    fn test_summaries_serialize_kebab_case_ids() {
        let summaries = standard().summaries();
        let json = serde_json::to_value(&summaries[0]).unwrap();
        assert_eq!(json["id"], "merge-pdf");
        assert_eq!(json["accept"], ".pdf");
        assert_eq!(json["multiple"], true);
        assert_eq!(json["enabled"], true);
    }

    #[test]
    fn test_operation_id_parses_from_display() {
        for id in OperationId::ALL {
            assert_eq!(id.to_string().parse::<OperationId>().unwrap(), id);
        }
    }
}
