//! Text extraction

use crate::error::PdfDeskError;
use crate::page;
use tracing::warn;

/// Extract the text of every page, pages separated by a blank line.
///
/// Pages whose content cannot be decoded are skipped with a warning rather
/// than failing the whole document.
pub fn extract_text(bytes: &[u8]) -> Result<String, PdfDeskError> {
    let doc = page::load(bytes)?;
    let mut pages = Vec::new();
    for &number in doc.get_pages().keys() {
        match doc.extract_text(&[number]) {
            Ok(text) => pages.push(text.trim_end().to_string()),
            Err(e) => warn!(page = number, error = %e, "Skipping page without extractable text"),
        }
    }
    Ok(pages.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::test_support::create_test_pdf;

    #[test]
    fn test_extract_text_joins_pages() {
        let text = extract_text(&create_test_pdf(2)).unwrap();
        assert!(text.contains("Page 1"));
        assert!(text.contains("Page 2"));
        assert!(text.find("Page 1") < text.find("Page 2"));
    }

    #[test]
    fn test_extract_text_rejects_garbage() {
        assert!(extract_text(b"nope").unwrap_err().is_unreadable_input());
    }
}
