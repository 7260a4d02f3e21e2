//! Form-field values on a single page
//!
//! Fields are matched by their partial name (`/T`) on the widget annotation,
//! falling back to the widget's parent field. Names that match nothing on the
//! page are reported back rather than treated as failures.

use std::collections::BTreeSet;

use lopdf::{decode_text_string, text_string, Dictionary, Document, Object, ObjectId};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::options::{FieldValue, FieldValues};

/// Guard against cyclic `/Parent` chains in damaged files
const MAX_FIELD_DEPTH: usize = 32;

/// A form field as read back from a page
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    /// Fully-qualified field name (partial names joined with '.')
    pub name: String,
    /// Current value, if any
    pub value: Option<String>,
    /// Field type name such as "Tx" or "Btn"
    pub field_type: Option<String>,
}

/// Which requested field names were applied to the page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdate {
    pub updated: Vec<String>,
    pub unmatched: Vec<String>,
}

/// What we need to know about a widget annotation before editing it
struct Widget {
    name: Option<String>,
    parent: Option<(ObjectId, Option<String>)>,
    is_button: bool,
    /// Appearance state names under `/AP /N`, when the widget has any
    states: Option<Vec<Vec<u8>>>,
}

/// Apply field values to the widgets on one page
///
/// Text fields get `/V` set to the value as a text string. Buttons
/// (`/FT /Btn`) get `/V` and `/AS` set to the value as a name. The document's
/// `AcroForm` is flagged with `/NeedAppearances` so viewers redraw the fields.
pub fn update_page_form_field_values(
    doc: &mut Document,
    page_id: ObjectId,
    values: &FieldValues,
) -> Result<FieldUpdate> {
    let annotation_ids = match promote_inline_annotations(doc, page_id)? {
        Some(ids) => ids,
        None => {
            warn!(?page_id, "no fields to update on this page");
            return Ok(FieldUpdate {
                updated: Vec::new(),
                unmatched: values.keys().cloned().collect(),
            });
        }
    };

    ensure_need_appearances(doc, &annotation_ids)?;

    let mut matched = BTreeSet::new();
    for annotation_id in annotation_ids {
        let widget = match read_widget(doc, annotation_id)? {
            Some(widget) => widget,
            None => continue,
        };

        for (name, value) in values {
            if widget.name.as_deref() == Some(name.as_str()) {
                apply_value(doc, annotation_id, annotation_id, &widget, value)?;
                matched.insert(name.clone());
            } else if let Some((parent_id, Some(parent_name))) = &widget.parent {
                if parent_name == name {
                    apply_value(doc, *parent_id, annotation_id, &widget, value)?;
                    matched.insert(name.clone());
                }
            }
        }
    }

    let (updated, unmatched): (Vec<String>, Vec<String>) =
        values.keys().cloned().partition(|name| matched.contains(name));

    for name in &unmatched {
        warn!(field = %name, "form field not found on page");
    }
    debug!(updated = updated.len(), unmatched = unmatched.len(), "applied field values");

    Ok(FieldUpdate { updated, unmatched })
}

/// Read every form field widget on a page
pub fn read_page_form_fields(doc: &Document, page_id: ObjectId) -> Result<Vec<FormField>> {
    let mut fields = Vec::new();

    for annotation in page_annotations(doc, page_id)? {
        if !is_field_widget(annotation) {
            continue;
        }

        let name = qualified_name(doc, annotation);
        if name.is_empty() {
            continue;
        }

        let value = inherited_attribute(doc, annotation, b"V").and_then(object_text);
        let field_type = inherited_attribute(doc, annotation, b"FT")
            .and_then(|ft| ft.as_name().ok())
            .map(|ft| String::from_utf8_lossy(ft).into_owned());

        fields.push(FormField { name, value, field_type });
    }

    Ok(fields)
}

/// Collect the page's annotation IDs, turning inline dictionaries into objects
///
/// Returns `None` when the page has no `/Annots` at all.
fn promote_inline_annotations(doc: &mut Document, page_id: ObjectId) -> Result<Option<Vec<ObjectId>>> {
    let annots = match doc.get_dictionary(page_id)?.get(b"Annots") {
        Ok(annots) => annots.clone(),
        Err(_) => return Ok(None),
    };

    let (array_id, mut entries) = match annots {
        Object::Reference(id) => (Some(id), doc.get_object(id)?.as_array()?.clone()),
        Object::Array(entries) => (None, entries),
        _ => return Err(Error::General("Page /Annots is not an array".to_string())),
    };

    let mut promoted = false;
    let mut ids = Vec::with_capacity(entries.len());
    for entry in entries.iter_mut() {
        match entry {
            Object::Reference(id) => ids.push(*id),
            Object::Dictionary(dict) => {
                let id = doc.add_object(dict.clone());
                *entry = Object::Reference(id);
                ids.push(id);
                promoted = true;
            }
            _ => {}
        }
    }

    if promoted {
        match array_id {
            Some(id) => *doc.get_object_mut(id)? = Object::Array(entries),
            None => doc
                .get_dictionary_mut(page_id)?
                .set("Annots", Object::Array(entries)),
        }
    }

    Ok(Some(ids))
}

/// Inspect an annotation; `None` if it is not a form field widget
fn read_widget(doc: &Document, annotation_id: ObjectId) -> Result<Option<Widget>> {
    let annotation = match doc.get_object(annotation_id)? {
        Object::Dictionary(dict) if is_field_widget(dict) => dict,
        _ => return Ok(None),
    };

    let name = annotation.get(b"T").ok().and_then(object_text);

    let parent = match annotation.get(b"Parent").and_then(Object::as_reference) {
        Ok(parent_id) => {
            let parent_name = doc
                .get_dictionary(parent_id)
                .ok()
                .and_then(|parent| parent.get(b"T").ok())
                .and_then(object_text);
            Some((parent_id, parent_name))
        }
        Err(_) => None,
    };

    let is_button = inherited_attribute(doc, annotation, b"FT")
        .and_then(|ft| ft.as_name().ok())
        .map_or(false, |ft| ft == b"Btn");

    let states = annotation
        .get(b"AP")
        .and_then(|ap| resolve(doc, ap).as_dict())
        .and_then(|ap| ap.get(b"N"))
        .and_then(|normal| resolve(doc, normal).as_dict())
        .ok()
        .map(|normal| normal.iter().map(|(state, _)| state.clone()).collect());

    Ok(Some(Widget { name, parent, is_button, states }))
}

/// Write `value` into the field dictionary `field_id`
///
/// `widget_id` is the annotation that matched; for buttons its appearance
/// state is switched as well.
fn apply_value(
    doc: &mut Document,
    field_id: ObjectId,
    widget_id: ObjectId,
    widget: &Widget,
    value: &FieldValue,
) -> Result<()> {
    let text = value.to_string();

    if !widget.is_button {
        doc.get_dictionary_mut(field_id)?
            .set("V", text_string(&text));
        return Ok(());
    }

    let state = text.strip_prefix('/').unwrap_or(&text).as_bytes().to_vec();
    let appearance = match &widget.states {
        Some(states) if !states.contains(&state) => b"Off".to_vec(),
        _ => state.clone(),
    };

    doc.get_dictionary_mut(field_id)?
        .set("V", Object::Name(state));
    doc.get_dictionary_mut(widget_id)?
        .set("AS", Object::Name(appearance));

    Ok(())
}

/// Flag the AcroForm so viewers regenerate appearance streams
///
/// Documents without an AcroForm get one listing the fields on this page.
fn ensure_need_appearances(doc: &mut Document, annotation_ids: &[ObjectId]) -> Result<()> {
    let acro_form = doc.catalog()?.get(b"AcroForm").ok().cloned();

    match acro_form {
        Some(Object::Reference(id)) => {
            doc.get_dictionary_mut(id)?
                .set("NeedAppearances", Object::Boolean(true));
        }
        Some(Object::Dictionary(mut dict)) => {
            dict.set("NeedAppearances", Object::Boolean(true));
            doc.catalog_mut()?.set("AcroForm", Object::Dictionary(dict));
        }
        _ => {
            let mut fields = Vec::new();
            for &annotation_id in annotation_ids {
                if let Some(field_id) = top_level_field(doc, annotation_id) {
                    if !fields.contains(&field_id) {
                        fields.push(field_id);
                    }
                }
            }

            let mut dict = Dictionary::new();
            dict.set(
                "Fields",
                Object::Array(fields.into_iter().map(Object::Reference).collect()),
            );
            dict.set("NeedAppearances", Object::Boolean(true));
            let acro_form_id = doc.add_object(dict);
            doc.catalog_mut()?
                .set("AcroForm", Object::Reference(acro_form_id));
        }
    }

    Ok(())
}

/// Root of the field hierarchy a widget belongs to, if it is a field at all
fn top_level_field(doc: &Document, annotation_id: ObjectId) -> Option<ObjectId> {
    let mut id = annotation_id;
    let mut dict = doc.get_dictionary(id).ok()?;
    if !is_field_widget(dict) {
        return None;
    }

    for _ in 0..MAX_FIELD_DEPTH {
        match dict.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent_id) => {
                id = parent_id;
                dict = doc.get_dictionary(parent_id).ok()?;
            }
            Err(_) => return Some(id),
        }
    }
    None
}

/// Widget annotations that take part in a field hierarchy
///
/// Popups and markup annotations also carry `/Parent` and `/T`, so anything
/// with a non-Widget subtype is excluded.
fn is_field_widget(annotation: &Dictionary) -> bool {
    let widget = annotation
        .get(b"Subtype")
        .and_then(Object::as_name)
        .map_or(true, |subtype| subtype == b"Widget");
    widget && (annotation.has(b"T") || annotation.has(b"Parent"))
}

/// Annotation dictionaries of a page, whether stored inline or by reference
fn page_annotations(doc: &Document, page_id: ObjectId) -> Result<Vec<&Dictionary>> {
    let page = doc.get_dictionary(page_id)?;
    let annots = match page.get(b"Annots") {
        Ok(annots) => resolve(doc, annots),
        Err(_) => return Ok(Vec::new()),
    };

    Ok(annots
        .as_array()?
        .iter()
        .filter_map(|entry| match entry {
            Object::Reference(id) => doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        })
        .collect())
}

/// Value of `key` on the field or its nearest ancestor that has it
fn inherited_attribute<'a>(doc: &'a Document, field: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut node = field;
    for _ in 0..MAX_FIELD_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(resolve(doc, value));
        }
        let parent_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Partial names from the root field down to this one, joined with '.'
fn qualified_name(doc: &Document, field: &Dictionary) -> String {
    let mut parts = Vec::new();
    let mut node = field;
    for _ in 0..MAX_FIELD_DEPTH {
        if let Some(part) = node.get(b"T").ok().and_then(object_text) {
            parts.push(part);
        }
        match node
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
        {
            Ok(parent) => node = parent,
            Err(_) => break,
        }
    }
    parts.reverse();
    parts.join(".")
}

/// Follow a single indirect reference
fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

/// Text of a string or name object
fn object_text(object: &Object) -> Option<String> {
    match object {
        Object::String(..) => decode_text_string(object).ok(),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}
