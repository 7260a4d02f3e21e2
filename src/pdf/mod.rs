//! PDF manipulation module

pub mod copy;
pub mod fields;
pub mod metadata;

// Re-export commonly used items
pub use copy::copy_pages;
pub use fields::{read_page_form_fields, update_page_form_field_values, FieldUpdate, FormField};
pub use metadata::{count_pages, extract_metadata, PdfMetadata};
