//! Result packaging
//!
//! Normalizes provider output into a flat list of downloadable artifacts.

use crate::config::PackagingConfig;
use crate::provider::{mime, BinaryOutput, RawOutput};
use bytes::Bytes;
use pdfdesk_core::PdfDeskError;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a batch of outputs is delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundlePolicy {
    /// One artifact per output.
    #[default]
    Separate,
    /// Batches of more than one output are zipped into a single artifact.
    Archive,
}

/// A named, downloadable result. Only the packager creates these.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    content: Bytes,
    file_name: String,
    mime_type: String,
}

impl Artifact {
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl From<BinaryOutput> for Artifact {
    fn from(output: BinaryOutput) -> Self {
        Self {
            content: output.content,
            file_name: output.file_name,
            mime_type: output.mime_type,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResultPackager {
    policy: BundlePolicy,
    archive_name: String,
}

impl ResultPackager {
    pub fn new(config: &PackagingConfig) -> Self {
        Self {
            policy: config.bundle,
            archive_name: config.archive_name.clone(),
        }
    }

    /// Single output gives one artifact; a batch gives one per element, in
    /// order, unless the archive policy bundles it.
    pub fn package(&self, raw: RawOutput) -> Result<Vec<Artifact>, PdfDeskError> {
        let outputs = match raw {
            RawOutput::Single(output) => return Ok(vec![output.into()]),
            RawOutput::Multi(outputs) => outputs,
        };

        if self.policy == BundlePolicy::Archive && outputs.len() > 1 {
            debug!(entries = outputs.len(), archive = %self.archive_name, "Bundling outputs");
            let archive = pdfdesk_core::bundle(
                outputs
                    .iter()
                    .map(|output| (output.file_name.as_str(), &output.content[..])),
            )?;
            return Ok(vec![Artifact {
                content: Bytes::from(archive),
                file_name: self.archive_name.clone(),
                mime_type: mime::ZIP.to_string(),
            }]);
        }

        Ok(outputs.into_iter().map(Artifact::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn jpg(n: usize) -> BinaryOutput {
        BinaryOutput::new(vec![n as u8; 4], format!("page_{}.jpg", n), mime::JPEG)
    }

    #[test]
    fn test_single_output_is_one_artifact() {
        let packager = ResultPackager::default();
        let artifacts = packager
            .package(RawOutput::Single(BinaryOutput::new(
                b"%PDF".to_vec(),
                "merged_toolbar.pdf",
                mime::PDF,
            )))
            .unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].file_name(), "merged_toolbar.pdf");
        assert_eq!(artifacts[0].mime_type(), "application/pdf");
    }

    #[test]
    fn test_multi_output_keeps_order() {
        let packager = ResultPackager::default();
        let artifacts = packager
            .package(RawOutput::Multi((1..=3).map(jpg).collect()))
            .unwrap();
        let names: Vec<&str> = artifacts.iter().map(Artifact::file_name).collect();
        assert_eq!(names, vec!["page_1.jpg", "page_2.jpg", "page_3.jpg"]);
        assert_eq!(&artifacts[1].content()[..], &[2u8; 4]);
    }

    #[test]
    fn test_archive_policy_zips_batches() {
        let packager = ResultPackager::new(&PackagingConfig {
            bundle: BundlePolicy::Archive,
            archive_name: "pages.zip".into(),
        });
        let artifacts = packager
            .package(RawOutput::Multi((1..=2).map(jpg).collect()))
            .unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].file_name(), "pages.zip");
        assert_eq!(artifacts[0].mime_type(), mime::ZIP);
        assert!(artifacts[0].content().starts_with(b"PK"));
    }

    #[test]
    fn test_archive_policy_leaves_single_batch_entry_alone() {
        let packager = ResultPackager::new(&PackagingConfig {
            bundle: BundlePolicy::Archive,
            archive_name: "pages.zip".into(),
        });
        let artifacts = packager.package(RawOutput::Multi(vec![jpg(1)])).unwrap();
        assert_eq!(artifacts[0].file_name(), "page_1.jpg");
    }

    #[test]
    fn test_empty_batch_gives_no_artifacts() {
        let artifacts = ResultPackager::default().package(RawOutput::Multi(vec![])).unwrap();
        assert!(artifacts.is_empty());
    }
}
