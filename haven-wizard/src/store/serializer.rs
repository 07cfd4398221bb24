//! Deterministic rendering of a resolved configuration into the persisted text format.

use super::document::ConfigDocument;
use super::normalize::{normalize_boolean, normalize_number, normalize_text};
use super::schema::{
    is_managed, FieldDef, Section, SectionCondition, ValueKind, EXTRA_SECTION_HEADER, SECTIONS,
};

/// Render `values` through the fixed section template.
///
/// Managed keys missing from `values` fall back to their schema default. Keys in `existing` that
/// the schema does not know about are appended verbatim under an extra section, in document order.
pub fn serialize(values: &ConfigDocument, existing: &ConfigDocument) -> String {
    let mut out = String::new();

    for section in SECTIONS {
        if !section_enabled(section, values) {
            continue;
        }
        for line in section.header {
            out.push_str(line);
            out.push('\n');
        }
        for field in section.fields {
            out.push_str(&render_field(field, values.get(field.key)));
            out.push('\n');
        }
        out.push('\n');
    }

    let extras: Vec<_> = existing.entries().filter(|e| !is_managed(&e.key)).collect();
    if !extras.is_empty() {
        out.push_str(EXTRA_SECTION_HEADER);
        out.push('\n');
        for entry in extras {
            out.push_str(&format!("{}={}\n", entry.key, normalize_text(&entry.raw)));
        }
        out.push('\n');
    }

    // Single trailing newline.
    while out.ends_with("\n\n") {
        out.pop();
    }
    out
}

/// Re-render a parsed document on its own (its values and its unknown keys).
pub fn render_document(doc: &ConfigDocument) -> String {
    serialize(doc, doc)
}

fn section_enabled(section: &Section, values: &ConfigDocument) -> bool {
    match section.condition {
        SectionCondition::Always => true,
        SectionCondition::KeyEquals { key, value } => {
            let default = super::schema::field(key).map(|f| f.default).unwrap_or("");
            values.get(key).unwrap_or(default).trim() == value
        }
    }
}

fn render_field(field: &FieldDef, value: Option<&str>) -> String {
    match field.kind {
        ValueKind::Boolean => format!(
            "{}={}",
            field.key,
            normalize_boolean(value, field.default_bool())
        ),
        ValueKind::Integer => format!(
            "{}={}",
            field.key,
            normalize_number(value, field.default_number())
        ),
        ValueKind::String | ValueKind::Host => format!(
            "{}=\"{}\"",
            field.key,
            normalize_text(value.unwrap_or(field.default))
        ),
    }
}
