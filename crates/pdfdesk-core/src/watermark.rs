//! Text watermark overlay

use crate::error::PdfDeskError;
use crate::layout::encode_win_ansi;
use crate::page;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, ObjectId, StringFormat};
use serde::{Deserialize, Serialize};

const FONT_RESOURCE: &str = "FWm";
const STATE_RESOURCE: &str = "GSWm";

/// How the watermark text is drawn on each page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkStyle {
    pub font_size: f32,
    /// Fill and stroke opacity, 0.0 to 1.0.
    pub opacity: f32,
    /// RGB components, 0.0 to 1.0.
    pub color: [f32; 3],
    /// Counter-clockwise text angle.
    pub angle_degrees: f32,
    /// Horizontal offset from the left edge of the page.
    pub left_offset: f32,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            font_size: 50.0,
            opacity: 0.3,
            color: [0.95, 0.1, 0.1],
            angle_degrees: 45.0,
            left_offset: 50.0,
        }
    }
}

/// Stamp `text` across every page, starting at mid-height.
pub fn watermark(bytes: &[u8], text: &str, style: &WatermarkStyle) -> Result<Vec<u8>, PdfDeskError> {
    if text.trim().is_empty() {
        return Err(PdfDeskError::OperationError(
            "Watermark text is empty".into(),
        ));
    }

    let mut doc = page::load(bytes)?;
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let opacity = style.opacity.clamp(0.0, 1.0);
    let state_id = doc.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(opacity),
        "CA" => Object::Real(opacity),
    });

    let encoded = encode_win_ansi(text);
    let (sin, cos) = style.angle_degrees.to_radians().sin_cos();

    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in pages {
        let mut resources = page::effective_resources(&doc, page_id);
        page::add_resource(&doc, &mut resources, "Font", FONT_RESOURCE, Object::Reference(font_id));
        page::add_resource(
            &doc,
            &mut resources,
            "ExtGState",
            STATE_RESOURCE,
            Object::Reference(state_id),
        );
        page::set_page_entry(&mut doc, page_id, "Resources", Object::Dictionary(resources))?;

        let [x0, y0, _, y1] = page::media_box(&doc, page_id);
        let x = x0 + style.left_offset;
        let y = y0 + (y1 - y0) / 2.0;
        let [r, g, b] = style.color;

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("gs", vec![Object::Name(STATE_RESOURCE.as_bytes().to_vec())]),
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![
                        Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                        Object::Real(style.font_size),
                    ],
                ),
                Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
                Operation::new(
                    "Tm",
                    vec![
                        Object::Real(cos),
                        Object::Real(sin),
                        Object::Real(-sin),
                        Object::Real(cos),
                        Object::Real(x),
                        Object::Real(y),
                    ],
                ),
                Operation::new(
                    "Tj",
                    vec![Object::String(encoded.clone(), StringFormat::Literal)],
                ),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        };
        let content = content
            .encode()
            .map_err(|e| PdfDeskError::OperationError(format!("Content encoding failed: {}", e)))?;
        page::append_content(&mut doc, page_id, content)?;
    }

    page::save(&mut doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::test_support::create_test_pdf;
    use lopdf::Document;

    #[test]
    fn test_watermark_adds_overlay_to_every_page() {
        let pdf = create_test_pdf(2);
        let result = watermark(&pdf, "CONFIDENTIAL", &WatermarkStyle::default()).unwrap();

        let doc = Document::load_mem(&result).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
        for page_id in doc.get_pages().values() {
            let content = doc.get_page_content(*page_id).unwrap();
            let text = String::from_utf8_lossy(&content);
            assert!(text.contains("CONFIDENTIAL"));
            assert!(text.contains("/GSWm gs"));
        }
    }

    #[test]
    fn test_watermark_keeps_existing_fonts() {
        let pdf = create_test_pdf(1);
        let result = watermark(&pdf, "DRAFT", &WatermarkStyle::default()).unwrap();

        let doc = Document::load_mem(&result).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let resources = page::effective_resources(&doc, page_id);
        let fonts = page::resolve(&doc, resources.get(b"Font").unwrap())
            .as_dict()
            .unwrap();
        assert!(fonts.has(b"F1"));
        assert!(fonts.has(b"FWm"));
    }

    #[test]
    fn test_watermark_rejects_blank_text() {
        let pdf = create_test_pdf(1);
        assert!(watermark(&pdf, "  ", &WatermarkStyle::default()).is_err());
    }
}
