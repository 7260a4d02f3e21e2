//! Options blob that drives a single rewrite run

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::Result;

/// Form-field name to value mapping, applied to the first page
pub type FieldValues = BTreeMap<String, FieldValue>;

/// Options for rewriting a PDF
///
/// Every key is required. The blob looks like:
///
/// ```json
/// { "input_path": "sheet.pdf", "output_path": "filled.pdf", "metadata": { "Name": "Alice" } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct RewriteOptions {
    /// Existing PDF to read pages from
    pub input_path: PathBuf,
    /// PDF to create or overwrite
    pub output_path: PathBuf,
    /// Field values keyed by form-field name
    pub metadata: FieldValues,
}

impl RewriteOptions {
    /// Parse the JSON options blob into typed options
    ///
    /// # Example
    ///
    /// ```
    /// use pdf_form_fill::options::RewriteOptions;
    ///
    /// let options = RewriteOptions::from_json(
    ///     r#"{"input_path": "a.pdf", "output_path": "b.pdf", "metadata": {"Age": 34}}"#,
    /// ).unwrap();
    /// assert_eq!(options.metadata["Age"].to_string(), "34");
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A single scalar form-field value
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(text) => f.write_str(text),
            FieldValue::Number(number) => write!(f, "{}", number),
            FieldValue::Flag(flag) => write!(f, "{}", flag),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}
