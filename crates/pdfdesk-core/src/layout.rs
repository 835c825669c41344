//! Plain text to PDF layout
//!
//! Lays paragraphs out as wrapped Helvetica lines on fixed-size pages. Used
//! by the DOCX and markup conversions, which reduce their input to text
//! paragraphs first.

use crate::error::PdfDeskError;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};

/// Page geometry and type size, in points.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub font_size: f32,
    /// Line height as a multiple of `font_size`.
    pub line_spacing: f32,
}

impl Default for PageLayout {
    /// US Letter, portrait, one-inch margins.
    fn default() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            margin: 72.0,
            font_size: 12.0,
            line_spacing: 1.2,
        }
    }
}

impl PageLayout {
    fn leading(&self) -> f32 {
        self.font_size * self.line_spacing
    }

    fn lines_per_page(&self) -> usize {
        let usable = self.height - 2.0 * self.margin;
        ((usable / self.leading()).floor() as usize).max(1)
    }

    fn text_width(&self) -> f32 {
        (self.width - 2.0 * self.margin).max(self.font_size)
    }
}

/// Render `paragraphs` into a PDF. Embedded `\n` forces a line break; an
/// empty line separates paragraphs. Always produces at least one page.
pub fn layout_text(paragraphs: &[String], layout: &PageLayout) -> Result<Vec<u8>, PdfDeskError> {
    let mut lines = Vec::new();
    for (i, paragraph) in paragraphs.iter().enumerate() {
        if i > 0 {
            lines.push(String::new());
        }
        for hard_line in paragraph.split('\n') {
            lines.extend(wrap_line(hard_line, layout));
        }
    }

    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let chunks: Vec<&[String]> = if lines.is_empty() {
        vec![lines.as_slice()]
    } else {
        lines.chunks(layout.lines_per_page()).collect()
    };

    let mut kids = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let content = page_content(chunk, layout)?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => Object::Reference(pages_id),
            "MediaBox" => vec![
                0.into(),
                0.into(),
                Object::Real(layout.width),
                Object::Real(layout.height),
            ],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
            "Contents" => Object::Reference(content_id),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    });
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.compress();

    crate::page::save(&mut doc)
}

fn page_content(lines: &[String], layout: &PageLayout) -> Result<Vec<u8>, PdfDeskError> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(b"F1".to_vec()), Object::Real(layout.font_size)],
        ),
        Operation::new("TL", vec![Object::Real(layout.leading())]),
        Operation::new(
            "Td",
            vec![
                Object::Real(layout.margin),
                Object::Real(layout.height - layout.margin - layout.font_size),
            ],
        ),
    ];
    for line in lines {
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(line), StringFormat::Literal)],
        ));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));

    Content { operations }
        .encode()
        .map_err(|e| PdfDeskError::OperationError(format!("Content encoding failed: {}", e)))
}

/// Approximate Helvetica advance width in em units.
fn glyph_width(c: char) -> f32 {
    match c {
        'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' => 0.278,
        ' ' | 'f' | 't' | 'I' | '/' | '(' | ')' | '[' | ']' => 0.278,
        'r' | '-' => 0.333,
        'm' | 'M' | 'W' => 0.833,
        'w' => 0.722,
        '0'..='9' => 0.556,
        'A'..='Z' => 0.667,
        _ => 0.556,
    }
}

fn measure(text: &str, font_size: f32) -> f32 {
    text.chars().map(glyph_width).sum::<f32>() * font_size
}

/// Greedy word wrap; words wider than a line are broken by character.
fn wrap_line(text: &str, layout: &PageLayout) -> Vec<String> {
    let max_width = layout.text_width();
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if measure(&candidate, layout.font_size) <= max_width {
            current = candidate;
            continue;
        }
        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        for c in word.chars() {
            current.push(c);
            if measure(&current, layout.font_size) > max_width && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::replace(&mut current, c.to_string()));
            }
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Encode text for a `WinAnsiEncoding` font; unmappable characters become `?`.
pub(crate) fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '\u{20AC}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wrap_keeps_short_line() {
        let lines = wrap_line("hello world", &PageLayout::default());
        assert_eq!(lines, vec!["hello world"]);
    }

    #[test]
    fn test_wrap_splits_long_paragraph() {
        let text = "lorem ipsum ".repeat(40);
        let layout = PageLayout::default();
        let lines = wrap_line(&text, &layout);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(measure(line, layout.font_size) <= layout.text_width());
        }
    }

    #[test]
    fn test_wrap_breaks_overlong_word() {
        let word = "x".repeat(300);
        let lines = wrap_line(&word, &PageLayout::default());
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_layout_paginates() {
        let paragraphs: Vec<String> = (0..120).map(|i| format!("Paragraph {}", i)).collect();
        let pdf = layout_text(&paragraphs, &PageLayout::default()).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn test_layout_empty_input_has_one_page() {
        let pdf = layout_text(&[], &PageLayout::default()).unwrap();
        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(encode_win_ansi("A\u{e9}\u{2019}\u{4e2d}"), vec![b'A', 0xE9, 0x92, b'?']);
    }
}
