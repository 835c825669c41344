//! PDF to PDF providers: merge, split, compress, watermark, rotate.

use super::{all_contents, first_content};
use crate::config::PipelineConfig;
use crate::intake::FileSet;
use crate::options::OptionValues;
use crate::provider::{blocking, mime, BinaryOutput, ProviderError, RawOutput, TransformProvider};
use async_trait::async_trait;
use pdfdesk_core::WatermarkStyle;
use std::sync::Arc;
use tracing::info;

/// The PDF providers, ready to register.
pub struct PdfProviders {
    pub merge: Arc<dyn TransformProvider>,
    pub split: Arc<dyn TransformProvider>,
    pub compress: Arc<dyn TransformProvider>,
    pub watermark: Arc<dyn TransformProvider>,
    pub rotate: Arc<dyn TransformProvider>,
}

pub fn all(config: &PipelineConfig) -> PdfProviders {
    PdfProviders {
        merge: Arc::new(MergeProvider),
        split: Arc::new(SplitProvider),
        compress: Arc::new(CompressProvider),
        watermark: Arc::new(WatermarkProvider {
            style: config.watermark.clone(),
        }),
        rotate: Arc::new(RotateProvider),
    }
}

fn pdf_output(content: Vec<u8>, file_name: &str) -> RawOutput {
    RawOutput::Single(BinaryOutput::new(content, file_name, mime::PDF))
}

/// Concatenates every staged PDF in staging order.
pub struct MergeProvider;

#[async_trait]
impl TransformProvider for MergeProvider {
    fn name(&self) -> &'static str {
        "merge"
    }

    async fn invoke(&self, files: &FileSet, _options: &OptionValues) -> Result<RawOutput, ProviderError> {
        let documents = all_contents(files)?;
        let merged = blocking(move || {
            let slices: Vec<&[u8]> = documents.iter().map(|d| &d[..]).collect();
            Ok(pdfdesk_core::merge_documents(&slices)?)
        })
        .await?;
        Ok(pdf_output(merged, "merged_toolbar.pdf"))
    }
}

/// Keeps the selected pages.
pub struct SplitProvider;

#[async_trait]
impl TransformProvider for SplitProvider {
    fn name(&self) -> &'static str {
        "split"
    }

    async fn invoke(&self, files: &FileSet, options: &OptionValues) -> Result<RawOutput, ProviderError> {
        let selection = options
            .page_selection()
            .cloned()
            .ok_or_else(|| ProviderError::unexpected_options(self.name(), options))?;
        let document = first_content(files)?;
        let split = blocking(move || Ok(pdfdesk_core::extract_pages(&document, &selection)?)).await?;
        Ok(pdf_output(split, "split_toolbar.pdf"))
    }
}

/// Re-encodes embedded images at the requested JPEG quality.
pub struct CompressProvider;

#[async_trait]
impl TransformProvider for CompressProvider {
    fn name(&self) -> &'static str {
        "compress"
    }

    async fn invoke(&self, files: &FileSet, options: &OptionValues) -> Result<RawOutput, ProviderError> {
        let quality = options
            .compression_quality()
            .ok_or_else(|| ProviderError::unexpected_options(self.name(), options))?;
        let document = first_content(files)?;
        let original_len = document.len();
        let (compressed, report) =
            blocking(move || Ok(pdfdesk_core::recompress(&document, quality)?)).await?;
        info!(
            quality,
            images_seen = report.images_seen,
            images_reencoded = report.images_reencoded,
            original_bytes = original_len,
            compressed_bytes = compressed.len(),
            "Compressed PDF"
        );
        Ok(pdf_output(compressed, "compressed_toolbar.pdf"))
    }
}

pub struct WatermarkProvider {
    style: WatermarkStyle,
}

#[async_trait]
impl TransformProvider for WatermarkProvider {
    fn name(&self) -> &'static str {
        "watermark"
    }

    async fn invoke(&self, files: &FileSet, options: &OptionValues) -> Result<RawOutput, ProviderError> {
        let text = options
            .watermark_text()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::unexpected_options(self.name(), options))?;
        let document = first_content(files)?;
        let style = self.style.clone();
        let stamped =
            blocking(move || Ok(pdfdesk_core::watermark(&document, &text, &style)?)).await?;
        Ok(pdf_output(stamped, "watermarked.pdf"))
    }
}

/// Sets every page to the chosen angle, replacing any existing rotation.
pub struct RotateProvider;

#[async_trait]
impl TransformProvider for RotateProvider {
    fn name(&self) -> &'static str {
        "rotate"
    }

    async fn invoke(&self, files: &FileSet, options: &OptionValues) -> Result<RawOutput, ProviderError> {
        let angle = options
            .rotation()
            .ok_or_else(|| ProviderError::unexpected_options(self.name(), options))?;
        let document = first_content(files)?;
        let degrees = i64::from(angle.degrees());
        let rotated = blocking(move || Ok(pdfdesk_core::rotate_pages(&document, degrees)?)).await?;
        Ok(pdf_output(rotated, "rotated.pdf"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::IncomingFile;
    use crate::options::RotationAngle;
    use crate::provider::ProviderErrorKind;
    use crate::testing::{fixture_pdf, single_output};
    use lopdf::Document;
    use pdfdesk_core::PageSelection;
    use pretty_assertions::assert_eq;

    fn files(docs: &[(&str, Vec<u8>)]) -> FileSet {
        docs.iter()
            .map(|(name, content)| IncomingFile::new(*name, content.clone()))
            .collect::<Vec<_>>()
            .into()
    }

    fn page_count(bytes: &[u8]) -> usize {
        Document::load_mem(bytes).unwrap().get_pages().len()
    }

    #[tokio::test]
    async fn test_merge_names_output_and_keeps_pages() {
        let input = files(&[("a.pdf", fixture_pdf(2)), ("b.pdf", fixture_pdf(3))]);
        let output = single_output(MergeProvider.invoke(&input, &OptionValues::None).await.unwrap());
        assert_eq!(output.file_name, "merged_toolbar.pdf");
        assert_eq!(output.mime_type, "application/pdf");
        assert_eq!(page_count(&output.content), 5);
    }

    #[tokio::test]
    async fn test_split_uses_selection() {
        let input = files(&[("a.pdf", fixture_pdf(5))]);
        let options = OptionValues::PageRange {
            selection: PageSelection::parse("1, 3-4"),
        };
        let output = single_output(SplitProvider.invoke(&input, &options).await.unwrap());
        assert_eq!(output.file_name, "split_toolbar.pdf");
        assert_eq!(page_count(&output.content), 3);
    }

    #[tokio::test]
    async fn test_split_with_nothing_selected_fails() {
        let input = files(&[("a.pdf", fixture_pdf(5))]);
        let options = OptionValues::PageRange {
            selection: PageSelection::parse("9"),
        };
        let err = SplitProvider.invoke(&input, &options).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Transform);
    }

    #[tokio::test]
    async fn test_rotate_sets_page_rotation() {
        let input = files(&[("a.pdf", fixture_pdf(1))]);
        let options = OptionValues::Rotation {
            angle: RotationAngle::Half,
        };
        let output = single_output(RotateProvider.invoke(&input, &options).await.unwrap());
        assert_eq!(output.file_name, "rotated.pdf");

        let doc = Document::load_mem(&output.content).unwrap();
        let page_id = doc.get_pages()[&1];
        let rotate = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Rotate")
            .unwrap()
            .as_i64()
            .unwrap();
        assert_eq!(rotate, 180);
    }

    #[tokio::test]
    async fn test_watermark_and_compress_name_outputs() {
        let input = files(&[("a.pdf", fixture_pdf(1))]);
        let providers = all(&PipelineConfig::default());

        let stamped = providers
            .watermark
            .invoke(&input, &OptionValues::Watermark { text: "DRAFT".into() })
            .await
            .unwrap();
        assert_eq!(single_output(stamped).file_name, "watermarked.pdf");

        let compressed = providers
            .compress
            .invoke(&input, &OptionValues::Compression { quality: 0.5 })
            .await
            .unwrap();
        assert_eq!(single_output(compressed).file_name, "compressed_toolbar.pdf");
    }

    #[tokio::test]
    async fn test_unreadable_input_is_reported_as_such() {
        let input = files(&[("a.pdf", b"not a pdf".to_vec())]);
        let options = OptionValues::Rotation {
            angle: RotationAngle::Quarter,
        };
        let err = RotateProvider.invoke(&input, &options).await.unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::UnreadableInput);
    }

    #[tokio::test]
    async fn test_wrong_option_shape_is_rejected() {
        let input = files(&[("a.pdf", fixture_pdf(1))]);
        let err = SplitProvider
            .invoke(&input, &OptionValues::None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::Transform);
        assert!(err.detail.contains("split"));
    }
}
