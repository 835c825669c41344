//! PDF Split algorithm
//!
//! Extracts a page selection into a new document.

use crate::error::PdfDeskError;
use crate::page;
use crate::ranges::PageSelection;
use lopdf::ObjectId;
use tracing::debug;

/// Extract the pages named by `selection` into a new PDF.
///
/// Pages appear in selection order. The page tree is rebuilt flat under the
/// original root, with inherited attributes pinned onto each kept page, and
/// objects only reachable from dropped pages are pruned.
pub fn extract_pages(bytes: &[u8], selection: &PageSelection) -> Result<Vec<u8>, PdfDeskError> {
    let mut doc = page::load(bytes)?;
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

    let indices = selection.resolve(pages.len());
    if indices.is_empty() {
        return Err(PdfDeskError::InvalidSelection(format!(
            "No pages selected (document has {} pages)",
            pages.len()
        )));
    }
    debug!(selected = indices.len(), total = pages.len(), "Extracting pages");

    let kept: Vec<ObjectId> = indices.iter().map(|&i| pages[i]).collect();
    for &page_id in &kept {
        page::pin_inherited(&mut doc, page_id)?;
    }

    let root = page::page_tree_root(&doc)?;
    page::write_page_tree(&mut doc, root, &kept)?;

    doc.prune_objects();
    doc.compress();

    page::save(&mut doc)
}
