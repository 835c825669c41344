//! Format conversion providers.

use super::{all_contents, first_content};
use crate::config::PipelineConfig;
use crate::intake::FileSet;
use crate::options::OptionValues;
use crate::provider::{blocking, mime, BinaryOutput, ProviderError, RawOutput, TransformProvider};
use async_trait::async_trait;
use pdfdesk_core::PageLayout;
use std::sync::Arc;
use tracing::debug;

pub struct ConvertProviders {
    pub pdf_to_word: Arc<dyn TransformProvider>,
    pub word_to_pdf: Arc<dyn TransformProvider>,
    pub images_to_pdf: Arc<dyn TransformProvider>,
    /// Shared by every annotation-surface operation.
    pub flatten: Arc<dyn TransformProvider>,
    pub markup_to_pdf: Arc<dyn TransformProvider>,
}

pub fn all(_config: &PipelineConfig) -> ConvertProviders {
    ConvertProviders {
        pdf_to_word: Arc::new(PdfToWordProvider),
        word_to_pdf: Arc::new(WordToPdfProvider {
            layout: PageLayout::default(),
        }),
        images_to_pdf: Arc::new(ImagesToPdfProvider {
            file_name: "images_combined.pdf",
        }),
        flatten: Arc::new(ImagesToPdfProvider {
            file_name: "edited_toolbar.pdf",
        }),
        markup_to_pdf: Arc::new(MarkupToPdfProvider {
            layout: PageLayout::default(),
        }),
    }
}

/// Extracted page text, saved as a `.doc` plain text file.
pub struct PdfToWordProvider;

#[async_trait]
impl TransformProvider for PdfToWordProvider {
    fn name(&self) -> &'static str {
        "pdf-to-word"
    }

    async fn invoke(&self, files: &FileSet, _options: &OptionValues) -> Result<RawOutput, ProviderError> {
        let document = first_content(files)?;
        let text = blocking(move || Ok(pdfdesk_core::extract_text(&document)?)).await?;
        debug!(chars = text.len(), "Extracted text");
        Ok(RawOutput::Single(BinaryOutput::new(
            text.into_bytes(),
            "converted.doc",
            mime::MSWORD,
        )))
    }
}

pub struct WordToPdfProvider {
    layout: PageLayout,
}

#[async_trait]
impl TransformProvider for WordToPdfProvider {
    fn name(&self) -> &'static str {
        "word-to-pdf"
    }

    async fn invoke(&self, files: &FileSet, _options: &OptionValues) -> Result<RawOutput, ProviderError> {
        let document = first_content(files)?;
        let layout = self.layout.clone();
        let pdf = blocking(move || {
            let paragraphs = pdfdesk_core::docx_paragraphs(&document)?;
            Ok(pdfdesk_core::layout_text(&paragraphs, &layout)?)
        })
        .await?;
        Ok(RawOutput::Single(BinaryOutput::new(pdf, "word_converted.pdf", mime::PDF)))
    }
}

/// One page per image. Also flattens annotation-surface composites, which
/// arrive as a single image.
pub struct ImagesToPdfProvider {
    file_name: &'static str,
}

#[async_trait]
impl TransformProvider for ImagesToPdfProvider {
    fn name(&self) -> &'static str {
        "images-to-pdf"
    }

    async fn invoke(&self, files: &FileSet, _options: &OptionValues) -> Result<RawOutput, ProviderError> {
        let images = all_contents(files)?;
        let pdf = blocking(move || {
            let slices: Vec<&[u8]> = images.iter().map(|image| &image[..]).collect();
            Ok(pdfdesk_core::images_to_pdf(&slices)?)
        })
        .await?;
        Ok(RawOutput::Single(BinaryOutput::new(pdf, self.file_name, mime::PDF)))
    }
}

/// Pasted HTML, reduced to paragraphs of text.
pub struct MarkupToPdfProvider {
    layout: PageLayout,
}

#[async_trait]
impl TransformProvider for MarkupToPdfProvider {
    fn name(&self) -> &'static str {
        "markup-to-pdf"
    }

    async fn invoke(&self, _files: &FileSet, options: &OptionValues) -> Result<RawOutput, ProviderError> {
        let markup = options
            .markup()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::unexpected_options(self.name(), options))?;
        let layout = self.layout.clone();
        let pdf = blocking(move || {
            let paragraphs = pdfdesk_core::markup_paragraphs(&markup);
            Ok(pdfdesk_core::layout_text(&paragraphs, &layout)?)
        })
        .await?;
        Ok(RawOutput::Single(BinaryOutput::new(pdf, "web_converted.pdf", mime::PDF)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::IncomingFile;
    use crate::provider::ProviderErrorKind;
    use crate::testing::{fixture_pdf, sample_png, single_output};
    use lopdf::Document;
    use pretty_assertions::assert_eq;

    fn one(name: &str, content: Vec<u8>) -> FileSet {
        vec![IncomingFile::new(name, content)].into()
    }

    #[tokio::test]
    async fn test_pdf_to_word_outputs_doc() {
        let output = single_output(
            PdfToWordProvider
                .invoke(&one("a.pdf", fixture_pdf(2)), &OptionValues::None)
                .await
                .unwrap(),
        );
        assert_eq!(output.file_name, "converted.doc");
        assert_eq!(output.mime_type, "application/msword");
        let text = String::from_utf8(output.content.to_vec()).unwrap();
        assert!(text.contains("Page 1"));
        assert!(text.contains("Page 2"));
    }

    #[tokio::test]
    async fn test_word_to_pdf_rejects_non_docx_as_unreadable() {
        let providers = all(&PipelineConfig::default());
        let err = providers
            .word_to_pdf
            .invoke(&one("a.docx", b"plain text".to_vec()), &OptionValues::None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::UnreadableInput);
    }

    #[tokio::test]
    async fn test_images_to_pdf_one_page_per_image() {
        let files: FileSet = vec![
            IncomingFile::new("a.png", sample_png(8, 6)),
            IncomingFile::new("b.png", sample_png(4, 4)),
        ]
        .into();
        let providers = all(&PipelineConfig::default());
        let output = single_output(
            providers
                .images_to_pdf
                .invoke(&files, &OptionValues::None)
                .await
                .unwrap(),
        );
        assert_eq!(output.file_name, "images_combined.pdf");
        assert_eq!(Document::load_mem(&output.content).unwrap().get_pages().len(), 2);
    }

    #[tokio::test]
    async fn test_flatten_names_edited_output() {
        let providers = all(&PipelineConfig::default());
        let output = single_output(
            providers
                .flatten
                .invoke(&one("composite.png", sample_png(10, 10)), &OptionValues::None)
                .await
                .unwrap(),
        );
        assert_eq!(output.file_name, "edited_toolbar.pdf");
    }

    #[tokio::test]
    async fn test_markup_to_pdf() {
        let providers = all(&PipelineConfig::default());
        let options = OptionValues::Markup {
            markup: "<h1>Title</h1><p>Body &amp; more</p>".into(),
        };
        let output = single_output(
            providers
                .markup_to_pdf
                .invoke(&FileSet::new(), &options)
                .await
                .unwrap(),
        );
        assert_eq!(output.file_name, "web_converted.pdf");
        assert!(output.content.starts_with(b"%PDF"));
    }
}
