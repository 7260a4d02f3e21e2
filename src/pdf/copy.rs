//! Page copying using lopdf
//!
//! Builds the destination document: every source page, in reading order,
//! hung off a fresh catalog and a flat page tree.

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::{Error, Result};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `/Parent` chains in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// Copy all pages of `source` into a new document
///
/// Page N of the source is page N of the result. The source `AcroForm` is
/// carried over to the new catalog and the `Info` dictionary to the trailer;
/// anything only reachable from the old catalog is dropped.
///
/// # Example
///
/// ```no_run
/// use lopdf::Document;
/// use pdf_form_fill::pdf::copy_pages;
///
/// let source = Document::load("sheet.pdf").expect("Failed to load");
/// let destination = copy_pages(source).expect("Failed to copy");
/// assert!(!destination.get_pages().is_empty());
/// ```
pub fn copy_pages(mut source: Document) -> Result<Document> {
    // get_pages walks the page tree in order, keyed by 1-based page number
    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
    if page_ids.is_empty() {
        return Err(Error::General("Source document has no pages".to_string()));
    }

    // Pages lose their old ancestors below, so pull inherited attributes down first
    for &page_id in &page_ids {
        flatten_inherited_attributes(&mut source, page_id)?;
    }

    let acro_form = source
        .catalog()
        .ok()
        .and_then(|catalog| catalog.get(b"AcroForm").ok())
        .cloned();
    let info = source.trailer.get(b"Info").ok().cloned();

    let mut destination = Document::with_version(source.version.clone());
    destination.objects = source.objects;
    destination.max_id = source.max_id;

    // New catalog and pages get IDs above every copied object
    let pages_id = destination.new_object_id();

    let kids: Vec<Object> = page_ids
        .iter()
        .map(|&id| Object::Reference(id))
        .collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));

    let catalog_id = destination.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    if let Some(acro_form) = acro_form {
        catalog.set("AcroForm", acro_form);
    }

    destination.objects.insert(catalog_id, Object::Dictionary(catalog));
    destination.objects.insert(pages_id, Object::Dictionary(pages_object));

    destination.trailer.set("Root", Object::Reference(catalog_id));
    if let Some(info) = info {
        destination.trailer.set("Info", info);
    }

    for &page_id in &page_ids {
        destination
            .get_dictionary_mut(page_id)?
            .set("Parent", Object::Reference(pages_id));
    }

    let pruned = destination.prune_objects();
    debug!(pages = page_ids.len(), pruned = pruned.len(), "copied page tree");

    Ok(destination)
}

/// Copy attributes the page inherits from an ancestor onto the page itself
fn flatten_inherited_attributes(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited = Vec::new();
    {
        let page = doc.get_dictionary(page_id)?;
        for key in INHERITABLE_KEYS {
            if page.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(doc, page, key) {
                inherited.push((key, value));
            }
        }
    }

    if inherited.is_empty() {
        return Ok(());
    }

    let page = doc.get_dictionary_mut(page_id)?;
    for (key, value) in inherited {
        page.set(key, value);
    }

    Ok(())
}

/// Find `key` on the nearest ancestor of `page` that defines it
fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        let parent_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two pages under an intermediate Pages node that carries the MediaBox
    fn nested_tree_document() -> (Document, Vec<ObjectId>) {
        let mut doc = Document::with_version("1.5");
        let root_pages_id = doc.new_object_id();
        let inner_pages_id = doc.new_object_id();

        let mut page_ids = Vec::new();
        for _ in 0..2 {
            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(inner_pages_id));
            page_ids.push(doc.add_object(page));
        }

        let mut inner = Dictionary::new();
        inner.set("Type", Object::Name(b"Pages".to_vec()));
        inner.set("Parent", Object::Reference(root_pages_id));
        inner.set(
            "Kids",
            Object::Array(page_ids.iter().map(|&id| Object::Reference(id)).collect()),
        );
        inner.set("Count", Object::Integer(2));
        inner.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(300),
                Object::Integer(400),
            ]),
        );
        doc.objects.insert(inner_pages_id, Object::Dictionary(inner));

        let mut root = Dictionary::new();
        root.set("Type", Object::Name(b"Pages".to_vec()));
        root.set("Kids", Object::Array(vec![Object::Reference(inner_pages_id)]));
        root.set("Count", Object::Integer(2));
        root.set("Rotate", Object::Integer(90));
        doc.objects.insert(root_pages_id, Object::Dictionary(root));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(root_pages_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        (doc, page_ids)
    }

    #[test]
    fn test_copy_preserves_page_order() {
        let (source, page_ids) = nested_tree_document();
        let destination = copy_pages(source).unwrap();

        let copied: Vec<ObjectId> = destination.get_pages().into_values().collect();
        assert_eq!(copied, page_ids);
    }

    #[test]
    fn test_copy_flattens_inherited_attributes() {
        let (source, page_ids) = nested_tree_document();
        let destination = copy_pages(source).unwrap();

        for page_id in page_ids {
            let page = destination.get_dictionary(page_id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            assert_eq!(media_box.len(), 4);
            assert_eq!(page.get(b"Rotate").unwrap().as_i64().unwrap(), 90);
        }
    }

    #[test]
    fn test_copy_drops_old_page_tree() {
        let (source, page_ids) = nested_tree_document();
        let destination = copy_pages(source).unwrap();

        // two pages, the new Pages node and the new catalog
        assert_eq!(destination.objects.len(), page_ids.len() + 2);
    }

    #[test]
    fn test_copy_rejects_empty_document() {
        let mut doc = Document::with_version("1.5");
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(vec![]));
        pages.set("Count", Object::Integer(0));
        let pages_id = doc.add_object(pages);
        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        assert!(copy_pages(doc).is_err());
    }
}
