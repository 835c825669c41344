//! Option schemas and collection
//!
//! Each operation with parameters names one schema. The schema describes the
//! form fields (for rendering) and `collect` turns the raw string values a
//! form submits into typed [`OptionValues`].

use crate::config::OptionDefaults;
use crate::error::ErrorKind;
use pdfdesk_core::PageSelection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const RANGE_KEY: &str = "range";
pub const LEVEL_KEY: &str = "level";
pub const TEXT_KEY: &str = "text";
pub const DEGREES_KEY: &str = "degrees";
pub const MARKUP_KEY: &str = "markup";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionSchemaId {
    PageRange,
    Compression,
    Watermark,
    Rotation,
    Markup,
}

/// Compression preset. The name says how hard to compress, so `Low` keeps
/// the most quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl CompressionLevel {
    pub fn quality(self) -> f32 {
        match self {
            Self::Low => 0.8,
            Self::Medium => 0.5,
            Self::High => 0.2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for CompressionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown compression level {:?}", other)),
        }
    }
}

/// Clockwise page rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum RotationAngle {
    #[default]
    Quarter,
    Half,
    ThreeQuarters,
}

impl RotationAngle {
    pub fn degrees(self) -> u16 {
        match self {
            Self::Quarter => 90,
            Self::Half => 180,
            Self::ThreeQuarters => 270,
        }
    }
}

impl TryFrom<u16> for RotationAngle {
    type Error = String;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            90 => Ok(Self::Quarter),
            180 => Ok(Self::Half),
            270 => Ok(Self::ThreeQuarters),
            other => Err(format!("rotation must be 90, 180 or 270 degrees, got {}", other)),
        }
    }
}

impl From<RotationAngle> for u16 {
    fn from(angle: RotationAngle) -> Self {
        angle.degrees()
    }
}

impl fmt::Display for RotationAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degrees())
    }
}

/// Raw form values keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawOptions(BTreeMap<String, String>);

impl RawOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Trimmed value, `None` when absent or blank.
    fn non_blank(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Validated option values, one shape per schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptionValues {
    /// The operation takes no options.
    None,
    PageRange { selection: PageSelection },
    Compression { quality: f32 },
    Watermark { text: String },
    Rotation { angle: RotationAngle },
    Markup { markup: String },
}

impl OptionValues {
    pub fn page_selection(&self) -> Option<&PageSelection> {
        match self {
            Self::PageRange { selection } => Some(selection),
            _ => None,
        }
    }

    pub fn compression_quality(&self) -> Option<f32> {
        match self {
            Self::Compression { quality } => Some(*quality),
            _ => None,
        }
    }

    pub fn watermark_text(&self) -> Option<&str> {
        match self {
            Self::Watermark { text } => Some(text),
            _ => None,
        }
    }

    pub fn rotation(&self) -> Option<RotationAngle> {
        match self {
            Self::Rotation { angle } => Some(*angle),
            _ => None,
        }
    }

    pub fn markup(&self) -> Option<&str> {
        match self {
            Self::Markup { markup } => Some(markup),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("Missing required option: {key}")]
    MissingInput { key: &'static str },

    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl OptionError {
    /// The user-facing taxonomy has no separate category for bad values, so
    /// an out-of-range or unparseable value is reported as `MissingInput`:
    /// the option still needs a usable value before the run can start.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingInput { .. } | Self::InvalidValue { .. } => ErrorKind::MissingInput,
        }
    }
}

/// Form description of a schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionSchema {
    pub id: OptionSchemaId,
    pub fields: Vec<OptionField>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionField {
    pub key: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub default: String,
    #[serde(flatten)]
    pub input: FieldInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "input", rename_all = "snake_case")]
pub enum FieldInput {
    Text { placeholder: &'static str },
    TextArea { rows: u32 },
    Choice { choices: Vec<FieldChoice> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChoice {
    pub value: String,
    pub label: &'static str,
}

fn choice(value: impl Into<String>, label: &'static str) -> FieldChoice {
    FieldChoice {
        value: value.into(),
        label,
    }
}

/// Builds schemas and validates raw values against them.
#[derive(Debug, Clone, Default)]
pub struct OptionCollector {
    defaults: OptionDefaults,
}

impl OptionCollector {
    pub fn new(defaults: OptionDefaults) -> Self {
        Self { defaults }
    }

    pub fn schema_for(&self, id: OptionSchemaId) -> OptionSchema {
        let field = match id {
            OptionSchemaId::PageRange => OptionField {
                key: RANGE_KEY,
                label: "Page Ranges (e.g., 1-3, 5)",
                required: false,
                default: String::new(),
                input: FieldInput::Text {
                    placeholder: "1, 2-4",
                },
            },
            OptionSchemaId::Compression => OptionField {
                key: LEVEL_KEY,
                label: "Compression Level (Quality)",
                required: false,
                default: self.defaults.default_compression.as_str().to_string(),
                input: FieldInput::Choice {
                    choices: vec![
                        choice("low", "Low Compression (High Quality)"),
                        choice("medium", "Medium Compression"),
                        choice("high", "High Compression (Low Quality)"),
                    ],
                },
            },
            OptionSchemaId::Watermark => OptionField {
                key: TEXT_KEY,
                label: "Watermark Text",
                required: false,
                default: self.defaults.default_watermark_text.clone(),
                input: FieldInput::Text { placeholder: "" },
            },
            OptionSchemaId::Rotation => OptionField {
                key: DEGREES_KEY,
                label: "Rotation Degrees",
                required: false,
                default: self.defaults.default_rotation.to_string(),
                input: FieldInput::Choice {
                    choices: vec![
                        choice("90", "90\u{b0} Clockwise"),
                        choice("180", "180\u{b0}"),
                        choice("270", "270\u{b0} Clockwise"),
                    ],
                },
            },
            OptionSchemaId::Markup => OptionField {
                key: MARKUP_KEY,
                label: "Paste HTML here",
                required: true,
                default: String::new(),
                input: FieldInput::TextArea { rows: 5 },
            },
        };
        OptionSchema {
            id,
            fields: vec![field],
        }
    }

    /// Raw values a freshly opened form starts with.
    pub fn defaults_for(&self, id: OptionSchemaId) -> RawOptions {
        self.schema_for(id)
            .fields
            .into_iter()
            .fold(RawOptions::new(), |raw, field| raw.with(field.key, field.default))
    }

    pub fn collect(&self, id: OptionSchemaId, raw: &RawOptions) -> Result<OptionValues, OptionError> {
        match id {
            OptionSchemaId::PageRange => Ok(OptionValues::PageRange {
                selection: PageSelection::parse(raw.get(RANGE_KEY).unwrap_or_default()),
            }),
            OptionSchemaId::Compression => {
                let quality = match raw.non_blank(LEVEL_KEY) {
                    None => self.defaults.default_compression.quality(),
                    Some(value) => parse_quality(value)?,
                };
                Ok(OptionValues::Compression { quality })
            }
            OptionSchemaId::Watermark => {
                let text = raw
                    .non_blank(TEXT_KEY)
                    .unwrap_or(self.defaults.default_watermark_text.as_str())
                    .to_string();
                Ok(OptionValues::Watermark { text })
            }
            OptionSchemaId::Rotation => {
                let angle = match raw.non_blank(DEGREES_KEY) {
                    None => self.defaults.default_rotation,
                    Some(value) => parse_rotation(value)?,
                };
                Ok(OptionValues::Rotation { angle })
            }
            OptionSchemaId::Markup => {
                let markup = raw
                    .non_blank(MARKUP_KEY)
                    .ok_or(OptionError::MissingInput { key: MARKUP_KEY })?;
                Ok(OptionValues::Markup {
                    markup: markup.to_string(),
                })
            }
        }
    }
}

fn parse_quality(value: &str) -> Result<f32, OptionError> {
    if let Ok(level) = value.parse::<CompressionLevel>() {
        return Ok(level.quality());
    }
    let invalid = |reason: String| OptionError::InvalidValue {
        key: LEVEL_KEY,
        value: value.to_string(),
        reason,
    };
    let quality: f32 = value
        .parse()
        .map_err(|_| invalid("expected low, medium, high or a number".into()))?;
    if !(0.0..=1.0).contains(&quality) {
        return Err(invalid("quality must be between 0 and 1".into()));
    }
    Ok(quality)
}

fn parse_rotation(value: &str) -> Result<RotationAngle, OptionError> {
    let invalid = |reason: String| OptionError::InvalidValue {
        key: DEGREES_KEY,
        value: value.to_string(),
        reason,
    };
    let degrees: u16 = value
        .parse()
        .map_err(|_| invalid("expected a whole number of degrees".into()))?;
    RotationAngle::try_from(degrees).map_err(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn collector() -> OptionCollector {
        OptionCollector::default()
    }

    #[test]
    fn test_page_range_examples() {
        let values = collector()
            .collect(OptionSchemaId::PageRange, &RawOptions::new().with(RANGE_KEY, "1, 3-4"))
            .unwrap();
        assert_eq!(values.page_selection().unwrap().resolve(5), vec![0, 2, 3]);

        let values = collector()
            .collect(OptionSchemaId::PageRange, &RawOptions::new())
            .unwrap();
        assert_eq!(values.page_selection(), Some(&PageSelection::All));
    }

    #[test]
    fn test_compression_presets_and_numbers() {
        let quality = |level: &str| {
            collector()
                .collect(OptionSchemaId::Compression, &RawOptions::new().with(LEVEL_KEY, level))
                .map(|v| v.compression_quality().unwrap())
        };
        assert_eq!(quality("low"), Ok(0.8));
        assert_eq!(quality("Medium"), Ok(0.5));
        assert_eq!(quality("high"), Ok(0.2));
        assert_eq!(quality("0.35"), Ok(0.35));
        assert_eq!(quality(""), Ok(0.5));
        assert!(matches!(quality("1.5"), Err(OptionError::InvalidValue { .. })));
        assert!(matches!(quality("extreme"), Err(OptionError::InvalidValue { .. })));
    }

    #[test]
    fn test_blank_watermark_text_uses_default() {
        let values = collector()
            .collect(OptionSchemaId::Watermark, &RawOptions::new().with(TEXT_KEY, "   "))
            .unwrap();
        assert_eq!(values.watermark_text(), Some("CONFIDENTIAL"));

        let values = collector()
            .collect(OptionSchemaId::Watermark, &RawOptions::new().with(TEXT_KEY, "DRAFT"))
            .unwrap();
        assert_eq!(values.watermark_text(), Some("DRAFT"));
    }

    #[test]
    fn test_rotation_accepts_quarter_turns_only() {
        let rotation = |degrees: &str| {
            collector().collect(
                OptionSchemaId::Rotation,
                &RawOptions::new().with(DEGREES_KEY, degrees),
            )
        };
        assert_eq!(
            rotation("270").unwrap().rotation(),
            Some(RotationAngle::ThreeQuarters)
        );
        let err = rotation("45").unwrap_err();
        assert!(matches!(err, OptionError::InvalidValue { key: DEGREES_KEY, .. }));
        assert_eq!(err.kind(), ErrorKind::MissingInput);
        assert!(rotation("ninety").is_err());
        assert_eq!(
            rotation("").unwrap().rotation(),
            Some(RotationAngle::Quarter)
        );
    }

    #[test]
    fn test_blank_markup_is_missing_input() {
        let err = collector()
            .collect(OptionSchemaId::Markup, &RawOptions::new().with(MARKUP_KEY, " \n "))
            .unwrap_err();
        assert_eq!(err, OptionError::MissingInput { key: MARKUP_KEY });
        assert_eq!(err.kind(), ErrorKind::MissingInput);
    }

    #[test]
    fn test_defaults_collect_cleanly_except_markup() {
        let collector = collector();
        for id in [
            OptionSchemaId::PageRange,
            OptionSchemaId::Compression,
            OptionSchemaId::Watermark,
            OptionSchemaId::Rotation,
        ] {
            assert!(collector.collect(id, &collector.defaults_for(id)).is_ok());
        }
        let markup = OptionSchemaId::Markup;
        assert!(collector.collect(markup, &collector.defaults_for(markup)).is_err());
    }

    #[test]
    fn test_schema_serializes_for_forms() {
        let schema = collector().schema_for(OptionSchemaId::Rotation);
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["id"], "rotation");
        assert_eq!(json["fields"][0]["key"], "degrees");
        assert_eq!(json["fields"][0]["input"], "choice");
        assert_eq!(json["fields"][0]["default"], "90");
        assert_eq!(json["fields"][0]["choices"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_rotation_angle_serde() {
        assert_eq!(serde_json::to_string(&RotationAngle::Half).unwrap(), "180");
        assert!(serde_json::from_str::<RotationAngle>("45").is_err());
    }
}
