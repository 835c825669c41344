//! Page rotation

use crate::error::PdfDeskError;
use crate::page;
use lopdf::{Object, ObjectId};
use tracing::debug;

/// Set every page's clockwise rotation to `degrees`, replacing whatever
/// rotation the page had. `degrees` must be a multiple of 90.
pub fn rotate_pages(bytes: &[u8], degrees: i64) -> Result<Vec<u8>, PdfDeskError> {
    if degrees % 90 != 0 {
        return Err(PdfDeskError::OperationError(format!(
            "Rotation must be a multiple of 90 degrees, got {}",
            degrees
        )));
    }

    let rotation = degrees.rem_euclid(360);
    let mut doc = page::load(bytes)?;
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    for page_id in pages {
        let previous = page::inherited(&doc, page_id, b"Rotate")
            .and_then(|obj| page::number(page::resolve(&doc, &obj)));
        if let Some(previous) = previous {
            debug!(?page_id, previous, rotation, "Replacing page rotation");
        }
        page::set_page_entry(&mut doc, page_id, "Rotate", Object::Integer(rotation))?;
    }

    page::save(&mut doc)
}
