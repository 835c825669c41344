//! Word (.docx) text reader
//!
//! Reads `word/document.xml` out of the package and reduces it to plain
//! paragraphs. Formatting, tables and images are not carried over.

use crate::error::PdfDeskError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

/// Paragraph texts of a .docx document, in document order.
///
/// `w:tab` becomes a space and `w:br` a line break inside the paragraph.
pub fn docx_paragraphs(bytes: &[u8]) -> Result<Vec<String>, PdfDeskError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| PdfDeskError::DecodeError(format!("Not a Word document: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|_| PdfDeskError::DecodeError(format!("Missing {}", DOCUMENT_PART)))?
        .read_to_string(&mut xml)
        .map_err(|e| PdfDeskError::DecodeError(format!("Failed to read {}: {}", DOCUMENT_PART, e)))?;

    parse_document_xml(&xml)
}

fn parse_document_xml(xml: &str) -> Result<Vec<String>, PdfDeskError> {
    let mut reader = Reader::from_str(xml);
    // Runs carry significant leading and trailing spaces.
    reader.trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"p" => current = Some(String::new()),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"p" => {
                    if let Some(paragraph) = current.take() {
                        paragraphs.push(paragraph);
                    }
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"p" => paragraphs.push(String::new()),
                b"tab" => push(&mut current, " "),
                b"br" | b"cr" => push(&mut current, "\n"),
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let text = e
                    .unescape()
                    .map_err(|e| PdfDeskError::DecodeError(format!("Bad text run: {}", e)))?;
                push(&mut current, &text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(PdfDeskError::DecodeError(format!(
                    "Malformed {} at {}: {}",
                    DOCUMENT_PART,
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

fn push(current: &mut Option<String>, text: &str) {
    current.get_or_insert_with(String::new).push_str(text);
}
