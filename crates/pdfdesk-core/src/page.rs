//! Page-tree helpers shared by the page-level transforms.

use crate::error::PdfDeskError;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic `Parent` chains in damaged files.
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when a page carries no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

pub(crate) fn load(bytes: &[u8]) -> Result<Document, PdfDeskError> {
    let doc = Document::load_mem(bytes).map_err(|e| PdfDeskError::ParseError(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(PdfDeskError::ParseError("Document is encrypted".into()));
    }
    Ok(doc)
}

pub(crate) fn save(doc: &mut Document) -> Result<Vec<u8>, PdfDeskError> {
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfDeskError::OperationError(format!("Save failed: {}", e)))?;
    Ok(buffer)
}

/// Follow a reference one level, falling back to the object itself.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Look up `key` on the page or the nearest ancestor that defines it.
pub(crate) fn inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = Some(page_id);
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_object(current?).and_then(Object::as_dict).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Effective MediaBox as `[x0, y0, x1, y1]`.
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let Some(obj) = inherited(doc, page_id, b"MediaBox") else {
        return DEFAULT_MEDIA_BOX;
    };
    let Ok(items) = resolve(doc, &obj).as_array() else {
        return DEFAULT_MEDIA_BOX;
    };
    let values: Vec<f32> = items
        .iter()
        .filter_map(|item| number(resolve(doc, item)))
        .collect();
    match values.as_slice() {
        [x0, y0, x1, y1] => [*x0, *y0, *x1, *y1],
        _ => DEFAULT_MEDIA_BOX,
    }
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, PdfDeskError> {
    doc.get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PdfDeskError::OperationError(format!("Invalid page object: {}", e)))
}

/// Copy inherited attributes onto the page so it survives re-parenting.
pub(crate) fn pin_inherited(doc: &mut Document, page_id: ObjectId) -> Result<(), PdfDeskError> {
    let mut pinned = Vec::new();
    for key in INHERITABLE {
        if let Some(value) = inherited(doc, page_id, key) {
            pinned.push((key, value));
        }
    }
    let page = page_dict_mut(doc, page_id)?;
    for (key, value) in pinned {
        if !page.has(key) {
            page.set(key.to_vec(), value);
        }
    }
    Ok(())
}

pub(crate) fn set_page_entry(
    doc: &mut Document,
    page_id: ObjectId,
    key: &str,
    value: Object,
) -> Result<(), PdfDeskError> {
    page_dict_mut(doc, page_id)?.set(key, value);
    Ok(())
}

/// Object id of the root `Pages` node.
pub(crate) fn page_tree_root(doc: &Document) -> Result<ObjectId, PdfDeskError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| PdfDeskError::OperationError("No Root in trailer".into()))?;
    doc.get_object(catalog_id)
        .and_then(Object::as_dict)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| PdfDeskError::OperationError("Catalog has no Pages reference".into()))
}

/// Replace the root page list with a flat `Kids` array.
pub(crate) fn write_page_tree(
    doc: &mut Document,
    root: ObjectId,
    kids: &[ObjectId],
) -> Result<(), PdfDeskError> {
    for &kid in kids {
        set_page_entry(doc, kid, "Parent", Object::Reference(root))?;
    }
    let pages = doc
        .get_object_mut(root)
        .and_then(Object::as_dict_mut)
        .map_err(|_| PdfDeskError::OperationError("Invalid pages dictionary".into()))?;
    pages.set(
        "Kids",
        Object::Array(kids.iter().map(|&id| Object::Reference(id)).collect()),
    );
    pages.set("Count", Object::Integer(kids.len() as i64));
    Ok(())
}

/// Owned copy of the page's effective resource dictionary.
pub(crate) fn effective_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    inherited(doc, page_id, b"Resources")
        .and_then(|obj| resolve(doc, &obj).as_dict().ok().cloned())
        .unwrap_or_default()
}

/// Insert `name` into a resource category (`Font`, `XObject`, ...), inlining
/// the category dictionary if it was indirect.
pub(crate) fn add_resource(
    doc: &Document,
    resources: &mut Dictionary,
    category: &str,
    name: &str,
    value: Object,
) {
    let mut entries = resources
        .get(category.as_bytes())
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok().cloned())
        .unwrap_or_default();
    entries.set(name, value);
    resources.set(category, Object::Dictionary(entries));
}

/// Wrap the existing page content in `q`/`Q` and append `content` after it.
///
/// `content` runs with the graphics state the page started with.
pub(crate) fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: Vec<u8>,
) -> Result<(), PdfDeskError> {
    let existing = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .ok()
        .and_then(|page| page.get(b"Contents").ok().cloned());
    let existing_parts = match existing {
        Some(Object::Array(items)) => items,
        Some(Object::Reference(id)) => match doc.get_object(id) {
            Ok(Object::Array(items)) => items.clone(),
            _ => vec![Object::Reference(id)],
        },
        Some(other) => vec![other],
        None => Vec::new(),
    };

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let mut closing = b"Q\n".to_vec();
    closing.extend(content);
    let close_id = doc.add_object(Stream::new(Dictionary::new(), closing));

    let mut parts = Vec::with_capacity(existing_parts.len() + 2);
    parts.push(Object::Reference(open_id));
    parts.extend(existing_parts);
    parts.push(Object::Reference(close_id));
    set_page_entry(doc, page_id, "Contents", Object::Array(parts))
}

#[cfg(test)]
pub(crate) mod test_support {
    use lopdf::{content::Content, content::Operation, Dictionary, Document, Object, Stream};

    /// Build a valid PDF with `num_pages` Letter pages, each showing its number.
    pub fn create_test_pdf(num_pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));
        let resources = Dictionary::from_iter(vec![(
            "Font",
            Object::Dictionary(Dictionary::from_iter(vec![(
                "F1",
                Object::Reference(font_id),
            )])),
        )]);

        let mut page_ids = Vec::new();
        for i in 0..num_pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new(
                        "Tf",
                        vec![Object::Name(b"F1".to_vec()), Object::Integer(12)],
                    ),
                    Operation::new("Td", vec![Object::Integer(100), Object::Integer(700)]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(
                            format!("Page {}", i + 1).into_bytes(),
                            lopdf::StringFormat::Literal,
                        )],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));

            let page = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(612),
                        Object::Integer(792),
                    ]),
                ),
                ("Contents", Object::Reference(content_id)),
            ]);
            page_ids.push(doc.add_object(page));
        }

        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(num_pages as i64)),
            (
                "Kids",
                Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
            ),
            ("Resources", Object::Dictionary(resources)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]);
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    /// Text drawn on each page, in page order.
    pub fn page_labels(bytes: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(bytes).unwrap();
        doc.get_pages()
            .keys()
            .map(|&n| doc.extract_text(&[n]).unwrap().trim().to_string())
            .collect()
    }
}
