//! Pending-change records keyed by flat key.

use crate::flatmap::FlatMap;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where an attribute change originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeDiffKind {
    /// Not recorded.
    #[default]
    Unknown,
    /// Driven by configuration.
    Input,
    /// Produced by the provider.
    Output,
}

/// The change to a single flat key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeDiff {
    /// Value before the change.
    #[serde(default)]
    pub old: Value,
    /// Value after the change.
    #[serde(default)]
    pub new: Value,
    /// The new value is only known after apply.
    #[serde(default)]
    pub new_computed: bool,
    /// The entry is deleted, not set.
    #[serde(default)]
    pub new_removed: bool,
    /// Provider-specific extra payload.
    #[serde(default)]
    pub new_extra: Value,
    /// Changing this key replaces the resource.
    #[serde(default)]
    pub requires_new: bool,
    /// Hide the values in output.
    #[serde(default)]
    pub sensitive: bool,
    /// Origin of the change.
    #[serde(default, rename = "type")]
    pub kind: AttributeDiffKind,
}

impl AttributeDiff {
    /// A change from `old` to `new`.
    pub fn new(old: impl Into<Value>, new: impl Into<Value>) -> Self {
        Self {
            old: old.into(),
            new: new.into(),
            ..Default::default()
        }
    }

    /// Mark the new value as computed.
    pub fn computed(mut self) -> Self {
        self.new_computed = true;
        self
    }

    /// Mark the entry as removed.
    pub fn removed(mut self) -> Self {
        self.new_removed = true;
        self
    }

    /// Mark the change as forcing replacement.
    pub fn requires_new(mut self) -> Self {
        self.requires_new = true;
        self
    }

    /// Mark the change as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Set the origin.
    pub fn with_kind(mut self, kind: AttributeDiffKind) -> Self {
        self.kind = kind;
        self
    }
}

/// All pending changes of one resource instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstanceDiff {
    /// Changes keyed by flat key.
    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeDiff>,
    /// The instance is destroyed.
    #[serde(default)]
    pub destroy: bool,
    /// A deposed instance is destroyed.
    #[serde(default)]
    pub destroy_deposed: bool,
    /// A tainted instance is destroyed.
    #[serde(default)]
    pub destroy_tainted: bool,
    /// Opaque metadata carried with the diff.
    #[serde(default)]
    pub meta: BTreeMap<String, Value>,
}

impl InstanceDiff {
    /// An empty diff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the change for `key`.
    pub fn with_attribute(mut self, key: impl Into<String>, diff: AttributeDiff) -> Self {
        self.attributes.insert(key.into(), diff);
        self
    }

    /// The change recorded for `key`.
    pub fn attribute(&self, key: &str) -> Option<&AttributeDiff> {
        self.attributes.get(key)
    }

    /// Whether nothing changes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
            && !self.destroy
            && !self.destroy_deposed
            && !self.destroy_tainted
    }

    /// Whether any change forces replacement.
    pub fn requires_new(&self) -> bool {
        self.attributes.values().any(|diff| diff.requires_new)
    }
}

/// The stored state of one resource instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstanceState {
    /// Resource identifier, unset until created.
    #[serde(default)]
    pub id: Option<String>,
    /// Attributes in flat form.
    #[serde(default)]
    pub attributes: FlatMap,
    /// The instance must be replaced.
    #[serde(default)]
    pub tainted: bool,
}

impl InstanceState {
    /// A state with the given id and no attributes.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Replace the attributes.
    pub fn with_attributes(mut self, attributes: FlatMap) -> Self {
        self.attributes = attributes;
        self
    }
}
