//! Rewrite a PDF: copy every page and fill the first page's form fields
//!
//! [`rewrite_pdf`] is the typed core. [`process_options`] wraps it as the one
//! place where every failure collapses into an [`Outcome`], and [`process`]
//! reports that outcome the way command-line callers expect.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

use lopdf::Document;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::options::RewriteOptions;
use crate::pdf::{copy_pages, update_page_form_field_values};

/// Summary of a completed rewrite
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteReport {
    /// Pages written to the output (always equal to the input's page count)
    pub page_count: usize,
    /// Field names that were found on the first page and set
    pub updated: Vec<String>,
    /// Field names that matched nothing on the first page
    pub unmatched: Vec<String>,
}

/// Result of one processing run
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Succeeded(RewriteReport),
    Failed(String),
}

/// Copy the input PDF to the output path, applying field values to page one
///
/// The output file is only opened once the new document has been built, so
/// a bad input never creates or truncates it.
///
/// # Example
///
/// ```no_run
/// use pdf_form_fill::options::RewriteOptions;
/// use pdf_form_fill::rewrite::rewrite_pdf;
///
/// let options = RewriteOptions::from_json(
///     r#"{"input_path": "sheet.pdf", "output_path": "filled.pdf", "metadata": {"Name": "Alice"}}"#,
/// ).expect("Invalid options");
///
/// let report = rewrite_pdf(&options).expect("Failed to rewrite");
/// println!("{} pages, updated {:?}", report.page_count, report.updated);
/// ```
pub fn rewrite_pdf(options: &RewriteOptions) -> Result<RewriteReport> {
    let input_path = &options.input_path;
    if !input_path.exists() {
        return Err(Error::FileNotFound(input_path.clone()));
    }

    let source = {
        let file = File::open(input_path)?;
        Document::load_from(BufReader::new(file))?
    };

    let source_pages = source.get_pages().len();
    if source_pages == 0 {
        return Err(Error::EmptyPdf(input_path.clone()));
    }
    debug!(path = %input_path.display(), pages = source_pages, "loaded source");

    let mut destination = copy_pages(source)?;

    let first_page = destination
        .get_pages()
        .into_values()
        .next()
        .ok_or_else(|| Error::EmptyPdf(input_path.clone()))?;
    let update = update_page_form_field_values(&mut destination, first_page, &options.metadata)?;

    let page_count = destination.get_pages().len();
    destination.compress();

    {
        let file = File::create(&options.output_path)?;
        let mut writer = BufWriter::new(file);
        destination.save_to(&mut writer)?;
        writer.flush()?;
    }

    info!(
        output = %options.output_path.display(),
        pages = page_count,
        updated = update.updated.len(),
        unmatched = update.unmatched.len(),
        "wrote PDF"
    );

    Ok(RewriteReport {
        page_count,
        updated: update.updated,
        unmatched: update.unmatched,
    })
}

/// Parse the options blob and run the rewrite, collapsing any failure
pub fn process_options(options_json: &str) -> Outcome {
    match RewriteOptions::from_json(options_json).and_then(|options| rewrite_pdf(&options)) {
        Ok(report) => Outcome::Succeeded(report),
        Err(e) => Outcome::Failed(e.to_string()),
    }
}

/// Run one rewrite from a JSON options string
///
/// Returns `true` on success. On failure prints
/// `Error processing PDF: <reason>` to stdout and returns `false`.
pub fn process(options_json: &str) -> bool {
    match process_options(options_json) {
        Outcome::Succeeded(_) => true,
        Outcome::Failed(reason) => {
            println!("Error processing PDF: {}", reason);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_json_fails() {
        let outcome = process_options("{not json");
        match outcome {
            Outcome::Failed(reason) => assert!(reason.starts_with("Invalid options")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_output_path_fails() {
        let outcome = process_options(r#"{"input_path": "a.pdf", "metadata": {}}"#);
        match outcome {
            Outcome::Failed(reason) => assert!(reason.contains("output_path"), "{reason}"),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_input_file_fails() {
        let outcome = process_options(
            r#"{"input_path": "nonexistent.pdf", "output_path": "never.pdf", "metadata": {}}"#,
        );
        assert_eq!(
            outcome,
            Outcome::Failed("File not found: nonexistent.pdf".to_string())
        );
        assert!(!std::path::Path::new("never.pdf").exists());
    }

    #[test]
    fn test_process_returns_false_on_failure() {
        assert!(!process("[]"));
    }
}
