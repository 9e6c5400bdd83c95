//! User-facing diagnostics and their translation from validation errors.
//!
//! A [`Diagnostics`] collection is always kept sorted by severity, then
//! summary, then the stringified attribute path, then detail, so the output is
//! the same whatever order errors were found in.
//!
//! ```
//! use std::collections::BTreeMap;
//! use tfplugin_schema::diagnostics::{Diagnostics, FieldErrors, Severity};
//!
//! let mut errors = BTreeMap::new();
//! errors.insert("b".to_string(), FieldErrors::message("Not a valid string."));
//! errors.insert("a".to_string(), FieldErrors::message("Not a valid string."));
//!
//! let diagnostics = Diagnostics::from_schema_errors(&errors, Severity::Error);
//! let paths: Vec<String> = diagnostics.iter().map(|d| d.path_string()).collect();
//! assert_eq!(paths, vec!["a", "b"]);
//! ```

use crate::proto;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Diagnostic severity. Errors sort before warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// The operation failed.
    Error,
    /// The operation succeeded but something deserves attention.
    Warning,
}

impl Severity {
    /// Protocol enum value.
    pub fn to_proto(self) -> proto::diagnostic::Severity {
        match self {
            Severity::Error => proto::diagnostic::Severity::Error,
            Severity::Warning => proto::diagnostic::Severity::Warning,
        }
    }
}

/// Key of a collection element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementKey {
    /// A list or set position.
    Int(i64),
    /// A map key.
    String(String),
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKey::Int(i) => write!(f, "{}", i),
            ElementKey::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ElementKey {
    fn from(i: i64) -> Self {
        ElementKey::Int(i)
    }
}

impl From<usize> for ElementKey {
    fn from(i: usize) -> Self {
        ElementKey::Int(i64::try_from(i).unwrap_or(i64::MAX))
    }
}

impl From<&str> for ElementKey {
    fn from(s: &str) -> Self {
        ElementKey::String(s.to_string())
    }
}

impl From<String> for ElementKey {
    fn from(s: String) -> Self {
        ElementKey::String(s)
    }
}

/// One step of an attribute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributePathStep {
    /// Descend into a named attribute.
    Attribute(String),
    /// Descend into a collection element.
    Element(ElementKey),
}

impl AttributePathStep {
    /// Shorthand for [`AttributePathStep::Attribute`].
    pub fn attribute(name: impl Into<String>) -> Self {
        AttributePathStep::Attribute(name.into())
    }

    /// Shorthand for [`AttributePathStep::Element`].
    pub fn element(key: impl Into<ElementKey>) -> Self {
        AttributePathStep::Element(key.into())
    }

    /// Protocol message.
    pub fn to_proto(&self) -> proto::attribute_path::Step {
        use proto::attribute_path::step::Selector;

        let selector = match self {
            AttributePathStep::Attribute(name) => Selector::AttributeName(name.clone()),
            AttributePathStep::Element(ElementKey::String(key)) => {
                Selector::ElementKeyString(key.clone())
            },
            AttributePathStep::Element(ElementKey::Int(index)) => Selector::ElementKeyInt(*index),
        };
        proto::attribute_path::Step {
            selector: Some(selector),
        }
    }
}

impl fmt::Display for AttributePathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributePathStep::Attribute(name) => f.write_str(name),
            AttributePathStep::Element(key) => write!(f, "{}", key),
        }
    }
}

/// A severity-tagged message, optionally attached to an attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity.
    pub severity: Severity,
    /// Short summary.
    pub summary: String,
    /// Longer explanation.
    pub detail: Option<String>,
    /// Path to the attribute concerned; empty for the whole object.
    pub path: Vec<AttributePathStep>,
}

impl Diagnostic {
    /// A diagnostic with no detail and no path.
    pub fn new(severity: Severity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: None,
            path: Vec::new(),
        }
    }

    /// An error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self::new(Severity::Error, summary)
    }

    /// A warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self::new(Severity::Warning, summary)
    }

    /// Set the detail.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the attribute path.
    pub fn with_path(mut self, path: Vec<AttributePathStep>) -> Self {
        self.path = path;
        self
    }

    /// The path as dot-joined step strings.
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Protocol message.
    pub fn to_proto(&self) -> proto::Diagnostic {
        let attribute = if self.path.is_empty() {
            None
        } else {
            Some(proto::AttributePath {
                steps: self.path.iter().map(AttributePathStep::to_proto).collect(),
            })
        };
        proto::Diagnostic {
            severity: self.severity.to_proto() as i32,
            summary: self.summary.clone(),
            detail: self.detail.clone().unwrap_or_default(),
            attribute,
        }
    }

    fn canonical_cmp(&self, other: &Self) -> Ordering {
        let steps = |d: &Diagnostic| d.path.iter().map(ToString::to_string).collect::<Vec<_>>();
        self.severity
            .cmp(&other.severity)
            .then_with(|| self.summary.cmp(&other.summary))
            .then_with(|| steps(self).cmp(&steps(other)))
            .then_with(|| self.detail.cmp(&other.detail))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", label, self.summary)?;
        if !self.path.is_empty() {
            write!(f, " (at {})", self.path_string())?;
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {}", detail)?;
        }
        Ok(())
    }
}

/// Validation errors keyed by field name.
pub type SchemaErrors = BTreeMap<String, FieldErrors>;

/// Errors reported for one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrors {
    /// Messages about the field itself.
    Messages(Vec<String>),
    /// Errors inside a nested object.
    Nested(SchemaErrors),
    /// Errors of individual collection elements.
    Elements(BTreeMap<ElementKey, ElementErrors>),
}

impl FieldErrors {
    /// A single message.
    pub fn message(message: impl Into<String>) -> Self {
        FieldErrors::Messages(vec![message.into()])
    }
}

/// Errors reported for one collection element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementErrors {
    /// Messages about the element value.
    Messages(Vec<String>),
    /// Errors inside an element that is a nested object.
    Nested(SchemaErrors),
    /// Errors of the elements of an element that is itself a collection.
    Elements(BTreeMap<ElementKey, ElementErrors>),
    /// Errors of a map entry, split into key and value messages.
    Entry {
        /// Messages about the key; reported with a `"Key: "` prefix.
        key: Vec<String>,
        /// Messages about the value.
        value: Vec<String>,
    },
}

/// A canonically ordered list of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
}

impl Diagnostics {
    /// An empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate nested validation errors, one diagnostic per message.
    pub fn from_schema_errors(errors: &SchemaErrors, severity: Severity) -> Self {
        let mut out = Vec::new();
        walk_schema_errors(errors, &[], severity, &mut out);
        Self::from(out)
    }

    /// Add one diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
        self.sort();
    }

    /// Whether there are no diagnostics.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Number of diagnostics.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Whether any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Iterate in canonical order.
    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.diagnostics.iter()
    }

    /// Borrow as a slice.
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Protocol messages in canonical order.
    pub fn to_proto(&self) -> Vec<proto::Diagnostic> {
        self.diagnostics.iter().map(Diagnostic::to_proto).collect()
    }

    fn sort(&mut self) {
        self.diagnostics.sort_by(Diagnostic::canonical_cmp);
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        let mut out = Self { diagnostics };
        out.sort();
        out
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        Self::from(iter.into_iter().collect::<Vec<_>>())
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.diagnostics.extend(iter);
        self.sort();
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.iter()
    }
}

fn walk_schema_errors(
    errors: &SchemaErrors,
    steps: &[AttributePathStep],
    severity: Severity,
    out: &mut Vec<Diagnostic>,
) {
    for (name, field_errors) in errors {
        let mut field_steps = steps.to_vec();
        field_steps.push(AttributePathStep::attribute(name.as_str()));

        match field_errors {
            FieldErrors::Messages(messages) => push_messages(messages, &field_steps, severity, out),
            FieldErrors::Nested(nested) => walk_schema_errors(nested, &field_steps, severity, out),
            FieldErrors::Elements(elements) => walk_elements(elements, &field_steps, severity, out),
        }
    }
}

fn walk_elements(
    elements: &BTreeMap<ElementKey, ElementErrors>,
    steps: &[AttributePathStep],
    severity: Severity,
    out: &mut Vec<Diagnostic>,
) {
    for (key, element_errors) in elements {
        let mut element_steps = steps.to_vec();
        element_steps.push(AttributePathStep::Element(key.clone()));

        match element_errors {
            ElementErrors::Messages(messages) => {
                push_messages(messages, &element_steps, severity, out)
            },
            ElementErrors::Nested(nested) => {
                walk_schema_errors(nested, &element_steps, severity, out)
            },
            ElementErrors::Elements(inner) => walk_elements(inner, &element_steps, severity, out),
            ElementErrors::Entry { key, value } => {
                let key_messages: Vec<String> =
                    key.iter().map(|m| format!("Key: {}", m)).collect();
                push_messages(&key_messages, &element_steps, severity, out);
                push_messages(value, &element_steps, severity, out);
            },
        }
    }
}

fn push_messages(
    messages: &[String],
    steps: &[AttributePathStep],
    severity: Severity,
    out: &mut Vec<Diagnostic>,
) {
    out.extend(
        messages
            .iter()
            .map(|message| Diagnostic::new(severity, message.as_str()).with_path(steps.to_vec())),
    );
}
