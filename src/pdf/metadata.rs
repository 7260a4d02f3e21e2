//! PDF inspection: page count, document info and form fields

use std::path::Path;
use lopdf::{decode_text_string, Dictionary, Document, Object};
use crate::error::{Error, Result};
use super::fields::{read_page_form_fields, FormField};

/// Count pages by reading the Count field from the root Pages dictionary
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog = doc.catalog()?;

    let pages_id = catalog
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|_| Error::General("No Pages reference in catalog".to_string()))?;

    let count = doc
        .get_dictionary(pages_id)?
        .get(b"Count")
        .and_then(Object::as_i64)
        .map_err(|_| Error::General("No integer Count in Pages".to_string()))?;

    Ok(count.max(0) as usize)
}

/// PDF metadata
#[derive(Debug, Clone)]
pub struct PdfMetadata {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
    /// Form fields found on each page, indexed by page
    pub fields_per_page: Vec<Vec<FormField>>,
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    let doc = load_existing(path)?;

    let page_count = count_pages_from_catalog(&doc)?;
    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    let (title, author) = match info_dictionary(&doc) {
        Some(info) => (info_string(info, b"Title"), info_string(info, b"Author")),
        None => (None, None),
    };

    let fields_per_page = doc
        .get_pages()
        .into_values()
        .map(|page_id| read_page_form_fields(&doc, page_id))
        .collect::<Result<Vec<_>>>()?;

    Ok(PdfMetadata {
        page_count,
        title,
        author,
        fields_per_page,
    })
}

/// Count the number of pages in a PDF file
///
/// This is a quick operation that reads the Count field from the Pages dictionary.
pub fn count_pages(path: &Path) -> Result<usize> {
    let doc = load_existing(path)?;
    let page_count = count_pages_from_catalog(&doc)?;

    if page_count == 0 {
        return Err(Error::EmptyPdf(path.to_path_buf()));
    }

    Ok(page_count)
}

fn load_existing(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    Ok(Document::load(path)?)
}

/// The trailer's Info dictionary, stored inline or by reference
fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn info_string(info: &Dictionary, key: &[u8]) -> Option<String> {
    info.get(key)
        .ok()
        .and_then(|value| decode_text_string(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_pages_nonexistent_file() {
        let result = count_pages(Path::new("nonexistent.pdf"));
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_extract_metadata_nonexistent_file() {
        let result = extract_metadata(Path::new("nonexistent.pdf"));
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_info_dictionary_inline_or_referenced() {
        let mut info = Dictionary::new();
        info.set("Title", Object::string_literal("Investigator Sheet"));
        info.set("Author", Object::string_literal(b"Caf\xe9".to_vec()));

        let mut inline = Document::with_version("1.5");
        inline.trailer.set("Info", Object::Dictionary(info.clone()));

        let mut referenced = Document::with_version("1.5");
        let info_id = referenced.add_object(info);
        referenced.trailer.set("Info", Object::Reference(info_id));

        for doc in [&inline, &referenced] {
            let info = info_dictionary(doc).expect("Info dictionary");
            assert_eq!(info_string(info, b"Title").as_deref(), Some("Investigator Sheet"));
            assert_eq!(info_string(info, b"Author").as_deref(), Some("Caf\u{e9}"));
            assert_eq!(info_string(info, b"Subject"), None);
        }
    }

    #[test]
    fn test_missing_info_dictionary() {
        let doc = Document::with_version("1.5");
        assert!(info_dictionary(&doc).is_none());
    }

    // Integration tests with generated PDFs are in tests/ directory
}
