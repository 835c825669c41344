//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document.

use crate::error::PdfDeskError;
use crate::page;
use lopdf::{Document, Object, ObjectId};
use tracing::debug;

/// Merge multiple PDFs into one, keeping document order and page order.
///
/// The algorithm:
/// 1. If empty, return error
/// 2. If single document, return it as-is
/// 3. Use the first document as the destination
/// 4. For each further source document:
///    a. Pin inherited page attributes so pages survive re-parenting
///    b. Import all objects with IDs shifted past the destination's max ID
///    c. Append the shifted page IDs to the destination page list
/// 5. Rebuild a flat page tree, drop orphaned objects and compress
pub fn merge_documents(documents: &[&[u8]]) -> Result<Vec<u8>, PdfDeskError> {
    let (first, rest) = documents
        .split_first()
        .ok_or_else(|| PdfDeskError::OperationError("No documents to merge".into()))?;

    if rest.is_empty() {
        return Ok(first.to_vec());
    }

    let mut dest = load_numbered(first, 0)?;
    let root = page::page_tree_root(&dest)?;
    let mut kids: Vec<ObjectId> = dest.get_pages().into_values().collect();
    for &page_id in &kids {
        page::pin_inherited(&mut dest, page_id)?;
    }

    for (i, bytes) in rest.iter().enumerate() {
        let mut source = load_numbered(bytes, i + 1)?;
        let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
        for &page_id in &source_pages {
            page::pin_inherited(&mut source, page_id)?;
        }

        let offset = dest.max_id;
        let source_max = source.max_id;
        debug!(
            document = i + 1,
            pages = source_pages.len(),
            offset,
            "Importing document"
        );

        for (id, object) in std::mem::take(&mut source.objects) {
            dest.objects
                .insert((id.0 + offset, id.1), remap_object_refs(object, offset));
        }
        kids.extend(source_pages.into_iter().map(|(id, gen)| (id + offset, gen)));
        dest.max_id = dest.max_id.max(source_max + offset);
    }

    page::write_page_tree(&mut dest, root, &kids)?;
    dest.prune_objects();
    dest.compress();

    page::save(&mut dest)
}

fn load_numbered(bytes: &[u8], index: usize) -> Result<Document, PdfDeskError> {
    page::load(bytes).map_err(|e| match e {
        PdfDeskError::ParseError(detail) => {
            PdfDeskError::ParseError(format!("Failed to load document {}: {}", index, detail))
        }
        other => other,
    })
}

/// Recursively shift object references by `offset`.
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference((id, gen)) => Object::Reference((id + offset, gen)),
        Object::Array(items) => Object::Array(
            items
                .into_iter()
                .map(|item| remap_object_refs(item, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                let taken = std::mem::replace(value, Object::Null);
                *value = remap_object_refs(taken, offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                let taken = std::mem::replace(value, Object::Null);
                *value = remap_object_refs(taken, offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}
