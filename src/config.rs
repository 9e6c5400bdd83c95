//! Raw resource configuration addressed by flat keys.

use crate::flatmap::{FlatKey, Segment};
use crate::value::Value;

/// A decoded configuration object that can be queried with flat keys.
///
/// Map keys in configuration may themselves contain dots. When a lookup
/// misses, progressively longer runs of the remaining segments are retried
/// as one literal key, so `"labels.app.kubernetes.io/name"` finds the
/// `"app.kubernetes.io/name"` entry of `labels`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceConfig {
    config: Value,
}

impl ResourceConfig {
    /// Wrap a decoded configuration value.
    pub fn new(config: Value) -> Self {
        Self { config }
    }

    /// The whole configuration.
    pub fn raw(&self) -> &Value {
        &self.config
    }

    /// Look up a flat key.
    ///
    /// `#` on a list yields its length, or [`Value::Unknown`] when any element
    /// is unknown. Out-of-range and non-numeric list indices miss.
    pub fn get(&self, key: &str) -> Option<Value> {
        let key = FlatKey::parse(key);
        let segments: Vec<&str> = key.segments().iter().map(String::as_str).collect();
        lookup(&self.config, &segments)
    }

    /// Whether the value at `key` contains anything unknown.
    pub fn is_computed(&self, key: &str) -> bool {
        self.get(key)
            .map(|value| value.contains_unknown())
            .unwrap_or(false)
    }
}

impl From<Value> for ResourceConfig {
    fn from(config: Value) -> Self {
        Self::new(config)
    }
}

fn lookup(current: &Value, segments: &[&str]) -> Option<Value> {
    let Some((segment, rest)) = segments.split_first() else {
        return Some(current.clone());
    };

    match current {
        Value::Map(entries) => {
            if let Some(found) = entries.get(*segment).and_then(|next| lookup(next, rest)) {
                return Some(found);
            }
            (2..=segments.len()).find_map(|end| {
                let literal = segments[..end].join(".");
                entries
                    .get(&literal)
                    .and_then(|next| lookup(next, &segments[end..]))
            })
        },
        Value::List(items) => match Segment::classify(segment) {
            Segment::ListCount if rest.is_empty() => {
                if items.iter().any(Value::is_unknown) {
                    Some(Value::Unknown)
                } else {
                    Some(Value::from(items.len()))
                }
            },
            Segment::Index(index) => items.get(index).and_then(|item| lookup(item, rest)),
            _ => None,
        },
        _ => None,
    }
}
