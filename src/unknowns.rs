//! Marking not-yet-known computed values while planning.

use crate::schema::{Block, NestingMode};
use crate::value::Value;
use std::collections::BTreeMap;

/// Replace absent computed values with [`Value::Unknown`].
///
/// With no prior value (`None` or null), computed attributes become unknown,
/// other attributes null and nested blocks unknown. If the block has no
/// computed attribute at all, `None` is returned so callers can tell
/// "nothing to propagate" apart from an unknown object.
///
/// With a prior object, a computed attribute that is missing or null becomes
/// unknown and everything else is kept. Missing nested blocks become unknown
/// wholesale; present ones are walked according to their nesting mode.
/// Members not declared by the block are dropped. A value whose shape does
/// not match the block is returned unchanged.
pub fn set_unknowns(value: Option<&Value>, block: &Block) -> Option<Value> {
    let entries = match value {
        None | Some(Value::Null) => return unknown_object(block),
        Some(Value::Map(entries)) => entries,
        Some(other) => return Some(other.clone()),
    };

    let mut result = BTreeMap::new();
    for (name, attribute) in &block.attributes {
        let current = entries.get(name).cloned().unwrap_or(Value::Null);
        let value = if attribute.flags.computed && current.is_null() {
            Value::Unknown
        } else {
            current
        };
        result.insert(name.clone(), value);
    }

    for (name, nested) in &block.block_types {
        let value = match entries.get(name) {
            None | Some(Value::Null) => Value::Unknown,
            Some(current) => set_nested(current, nested.nesting_mode, &nested.block),
        };
        result.insert(name.clone(), value);
    }

    Some(Value::Map(result))
}

fn unknown_object(block: &Block) -> Option<Value> {
    if !block.attributes.values().any(|attr| attr.flags.computed) {
        return None;
    }

    let mut result: BTreeMap<String, Value> = block
        .attributes
        .iter()
        .map(|(name, attr)| {
            let value = if attr.flags.computed {
                Value::Unknown
            } else {
                Value::Null
            };
            (name.clone(), value)
        })
        .collect();
    for name in block.block_types.keys() {
        result.insert(name.clone(), Value::Unknown);
    }
    Some(Value::Map(result))
}

fn set_nested(value: &Value, nesting_mode: NestingMode, block: &Block) -> Value {
    let element = |v: &Value| set_unknowns(Some(v), block).unwrap_or(Value::Null);
    match (nesting_mode, value) {
        (NestingMode::Single | NestingMode::Group, _) => element(value),
        (NestingMode::List | NestingMode::Set, Value::List(items)) => {
            Value::List(items.iter().map(element).collect())
        },
        (NestingMode::Map, Value::Map(entries)) => Value::Map(
            entries
                .iter()
                .map(|(key, v)| (key.clone(), element(v)))
                .collect(),
        ),
        _ => value.clone(),
    }
}
