//! Validating values against an object schema.
//!
//! [`validate`] produces the nested [`SchemaErrors`] structure that
//! [`Diagnostics::from_schema_errors`] turns into user-facing diagnostics;
//! [`diagnose`] does both and adds deprecation warnings.
//!
//! # Example
//!
//! ```
//! use tfplugin_schema::field::{Field, ObjectSchema};
//! use tfplugin_schema::validation::{diagnose, validate};
//! use tfplugin_schema::value::Value;
//! use serde_json::json;
//!
//! let schema = ObjectSchema::new()
//!     .with_field("name", Field::string().required())
//!     .with_field("count", Field::int().optional());
//!
//! let input = Value::from(json!({"name": "test", "count": 42}));
//! assert!(validate(&schema, &input).is_empty());
//!
//! let input = Value::from(json!({"name": "test", "count": "not a number"}));
//! let diagnostics = diagnose(&schema, &input);
//! assert_eq!(diagnostics.len(), 1);
//! assert_eq!(diagnostics.as_slice()[0].summary, "Not a valid integer.");
//! assert_eq!(diagnostics.as_slice()[0].path_string(), "count");
//! ```

use crate::diagnostics::{
    AttributePathStep, Diagnostic, Diagnostics, ElementErrors, ElementKey, FieldErrors,
    SchemaErrors, Severity,
};
use crate::field::{Field, FieldKind, ObjectSchema};
use crate::value::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Message for a required field that is missing or null.
pub const MISSING_REQUIRED: &str = "Missing data for required field.";

/// Message for a member the schema does not declare.
pub const UNKNOWN_FIELD: &str = "Unknown field.";

/// Validate `value` against `schema`.
///
/// Unknown values are accepted anywhere. An empty result means the value is
/// valid.
pub fn validate(schema: &ObjectSchema, value: &Value) -> SchemaErrors {
    let errors = match value {
        Value::Map(entries) => validate_object(schema, entries),
        Value::Null => validate_object(schema, &BTreeMap::new()),
        Value::Unknown => SchemaErrors::new(),
        other => {
            let mut errors = SchemaErrors::new();
            errors.insert(
                "_schema".to_string(),
                FieldErrors::message(format!("Invalid input type: {}.", other.kind_name())),
            );
            errors
        },
    };
    debug!(fields_with_errors = errors.len(), "validated value");
    errors
}

/// Validate, returning `Ok` if valid or the errors otherwise.
pub fn validate_result(schema: &ObjectSchema, value: &Value) -> Result<(), SchemaErrors> {
    let errors = validate(schema, value);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Check if `value` is valid against `schema`.
pub fn is_valid(schema: &ObjectSchema, value: &Value) -> bool {
    validate(schema, value).is_empty()
}

/// Validate and translate the result into diagnostics.
///
/// Deprecated fields that are set produce a warning carrying the
/// deprecation notice.
pub fn diagnose(schema: &ObjectSchema, value: &Value) -> Diagnostics {
    let mut diagnostics = Diagnostics::from_schema_errors(&validate(schema, value), Severity::Error);
    let mut warnings = Vec::new();
    deprecation_warnings(schema, value, &[], &mut warnings);
    diagnostics.extend(warnings);
    diagnostics
}

fn validate_object(schema: &ObjectSchema, entries: &BTreeMap<String, Value>) -> SchemaErrors {
    let mut errors = SchemaErrors::new();

    for (name, field) in schema.fields() {
        let value = entries.get(name).filter(|v| !v.is_null());
        let field_errors = match (value, &field.removed) {
            (Some(_), Some(notice)) => Some(FieldErrors::message(notice.as_str())),
            (Some(value), None) => validate_field(field, value),
            (None, _) if field.resolved_requiredness().0 && !has_default_value(field) => {
                Some(FieldErrors::message(MISSING_REQUIRED))
            },
            (None, _) => None,
        };
        if let Some(field_errors) = field_errors {
            errors.insert(name.to_string(), field_errors);
        }
    }

    for name in entries.keys() {
        if schema.field(name).is_none() {
            errors.insert(name.clone(), FieldErrors::message(UNKNOWN_FIELD));
        }
    }

    errors
}

fn validate_field(field: &Field, value: &Value) -> Option<FieldErrors> {
    if value.is_unknown() || value.is_null() {
        return None;
    }

    match &field.kind {
        FieldKind::List(inner) | FieldKind::Set(inner) => {
            let Value::List(items) = value else {
                return Some(FieldErrors::message("Not a valid list."));
            };
            if let Some(message) = length_error(field, items.len()) {
                return Some(FieldErrors::message(message));
            }
            let elements: BTreeMap<ElementKey, ElementErrors> = items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| {
                    let errors = validate_field(inner, item)?;
                    Some((ElementKey::from(index), element(errors)))
                })
                .collect();
            (!elements.is_empty()).then_some(FieldErrors::Elements(elements))
        },
        FieldKind::Map(inner) => {
            let Value::Map(entries) = value else {
                return Some(FieldErrors::message("Not a valid mapping type."));
            };
            if let Some(message) = length_error(field, entries.len()) {
                return Some(FieldErrors::message(message));
            }
            let elements: BTreeMap<ElementKey, ElementErrors> = entries
                .iter()
                .filter_map(|(key, item)| {
                    validate_field(inner, item).map(|errors| {
                        let errors = match errors {
                            FieldErrors::Messages(value) => ElementErrors::Entry {
                                key: Vec::new(),
                                value,
                            },
                            other => element(other),
                        };
                        (ElementKey::from(key.as_str()), errors)
                    })
                })
                .collect();
            (!elements.is_empty()).then_some(FieldErrors::Elements(elements))
        },
        FieldKind::Object(schema) => {
            let Value::Map(entries) = value else {
                return Some(FieldErrors::message("Invalid input type."));
            };
            let nested = validate_object(schema, entries);
            (!nested.is_empty()).then_some(FieldErrors::Nested(nested))
        },
        primitive => {
            let valid = matches!(
                (primitive, value),
                (FieldKind::Bool, Value::Bool(_))
                    | (FieldKind::Int, Value::Int(_))
                    | (FieldKind::Float, Value::Int(_) | Value::Float(_))
                    | (FieldKind::String, Value::String(_))
            );
            (!valid).then(|| FieldErrors::message(type_message(primitive)))
        },
    }
}

fn has_default_value(field: &Field) -> bool {
    field
        .default
        .as_ref()
        .and_then(|default| default.evaluate().ok())
        .map(|value| !value.is_null())
        .unwrap_or(false)
}

fn element(errors: FieldErrors) -> ElementErrors {
    match errors {
        FieldErrors::Messages(messages) => ElementErrors::Messages(messages),
        FieldErrors::Nested(nested) => ElementErrors::Nested(nested),
        FieldErrors::Elements(elements) => ElementErrors::Elements(elements),
    }
}

fn type_message(kind: &FieldKind) -> &'static str {
    match kind {
        FieldKind::Bool => "Not a valid boolean.",
        FieldKind::Int => "Not a valid integer.",
        FieldKind::Float => "Not a valid number.",
        _ => "Not a valid string.",
    }
}

fn length_error(field: &Field, len: usize) -> Option<String> {
    let len = u32::try_from(len).unwrap_or(u32::MAX);
    if len < field.min_items {
        Some(format!("Shorter than minimum length {}.", field.min_items))
    } else if field.max_items > 0 && len > field.max_items {
        Some(format!("Longer than maximum length {}.", field.max_items))
    } else {
        None
    }
}

fn deprecation_warnings(
    schema: &ObjectSchema,
    value: &Value,
    steps: &[AttributePathStep],
    out: &mut Vec<Diagnostic>,
) {
    let Value::Map(entries) = value else {
        return;
    };
    for (name, field) in schema.fields() {
        let Some(member) = entries.get(name).filter(|v| !v.is_null()) else {
            continue;
        };
        let mut path = steps.to_vec();
        path.push(AttributePathStep::attribute(name));

        if let Some(notice) = &field.deprecated {
            out.push(Diagnostic::warning(notice.as_str()).with_path(path.clone()));
        }
        if let Some(nested) = field.as_object() {
            deprecation_warnings(nested, member, &path, out);
        }
    }
}
