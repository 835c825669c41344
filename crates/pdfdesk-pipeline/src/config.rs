//! Pipeline configuration
//!
//! Loaded from TOML. Every section and field has a default, so an empty
//! file (or no file at all) gives the stock toolbar behaviour.

use crate::options::{CompressionLevel, RotationAngle};
use crate::packager::BundlePolicy;
use anyhow::Context;
use pdfdesk_core::WatermarkStyle;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub intake: IntakeConfig,
    pub options: OptionDefaults,
    pub watermark: WatermarkStyle,
    pub render: RenderConfig,
    pub packaging: PackagingConfig,
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// ```
    /// use pdfdesk_pipeline::config::PipelineConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = PipelineConfig::from_str(r#"
    ///     [intake]
    ///     strict_kinds = true
    /// "#)?;
    /// assert!(config.intake.strict_kinds);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("Failed to parse TOML configuration")
    }
}

/// File intake checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Reject files whose type does not match the operation instead of
    /// accepting them with a warning.
    pub strict_kinds: bool,
}

/// Values option forms start with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionDefaults {
    /// Used when the watermark text is left blank.
    pub default_watermark_text: String,
    pub default_compression: CompressionLevel,
    pub default_rotation: RotationAngle,
}

impl Default for OptionDefaults {
    fn default() -> Self {
        Self {
            default_watermark_text: "CONFIDENTIAL".to_string(),
            default_compression: CompressionLevel::Medium,
            default_rotation: RotationAngle::Quarter,
        }
    }
}

/// Page rendering for the image and slide conversions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Render scale for page images (1.0 = 72 dpi). Also used when
    /// compression rasterizes pages.
    pub page_image_scale: f32,
    pub slide_scale: f32,
    /// JPEG quality for page images, 0.0 to 1.0.
    pub jpeg_quality: f32,
    /// Longest edge of a rendered page, in pixels.
    pub max_pixels: u32,
    /// Compress by rendering every page to a JPEG at the chosen quality and
    /// rebuilding the PDF from those images. Needs a rasterizer; without one
    /// compression re-encodes embedded images instead.
    pub rasterize_compression: bool,
    /// Path to the pdfium shared library. Falls back to `PDFIUM_LIB_PATH`,
    /// then the system library search path.
    pub pdfium_library: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page_image_scale: 1.5,
            slide_scale: 1.0,
            jpeg_quality: 0.92,
            max_pixels: 4096,
            rasterize_compression: false,
            pdfium_library: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackagingConfig {
    pub bundle: BundlePolicy,
    /// File name of the archive when `bundle = "archive"`.
    pub archive_name: String,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            bundle: BundlePolicy::Separate,
            archive_name: "pages.zip".to_string(),
        }
    }
}
