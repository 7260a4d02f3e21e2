//! PDF Form Fill Library
//!
//! Copies a PDF page-for-page into a new document and fills the form fields
//! on its first page, driven by a JSON options blob:
//!
//! ```json
//! { "input_path": "sheet.pdf", "output_path": "filled.pdf", "metadata": { "Name": "Alice" } }
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pdf_form_fill::process;
//!
//! let ok = process(r#"{"input_path": "sheet.pdf", "output_path": "filled.pdf", "metadata": {"Name": "Alice"}}"#);
//! assert!(ok);
//! ```

pub mod error;
pub mod options;
pub mod pdf;
pub mod rewrite;

// Re-export commonly used items
pub use error::{Error, Result};
pub use options::{FieldValue, FieldValues, RewriteOptions};
pub use rewrite::{process, process_options, rewrite_pdf, Outcome, RewriteReport};
