//! Reconstructing nested values from flat and raw sources.
//!
//! Every reader answers [`FieldReader::get`] for a path of flat key segments
//! and reports not only the value but whether it exists at all and whether it
//! is still computed. A never-configured optional map reads as
//! `exists == false`; an explicitly emptied one reads as an existing empty map.
//!
//! ```
//! use tfplugin_schema::diff::{AttributeDiff, InstanceDiff};
//! use tfplugin_schema::field::{Field, ObjectSchema};
//! use tfplugin_schema::reader::{DiffFieldReader, FieldReader, MapFieldReader};
//! use tfplugin_schema::value::Value;
//!
//! let schema = ObjectSchema::new().with_field("list", Field::list(Field::string()));
//! let diff = InstanceDiff::new()
//!     .with_attribute("list.#", AttributeDiff::new(0, 2))
//!     .with_attribute("list.0", AttributeDiff::new(Value::Null, "foo"))
//!     .with_attribute("list.1", AttributeDiff::new(Value::Null, "bar"));
//!
//! let reader = DiffFieldReader::new(&schema, &diff, MapFieldReader::default());
//! let result = reader.get_key("list").unwrap();
//! assert!(result.exists);
//! assert_eq!(result.value, Value::from(vec!["foo", "bar"]));
//! ```

use crate::config::ResourceConfig;
use crate::diff::{AttributeDiff, InstanceDiff};
use crate::error::{Result, SchemaError};
use crate::field::{FieldKind, ObjectSchema, SchemaNode};
use crate::flatmap::{self, child_path, FlatKey, FlatMap, Segment, LIST_COUNT, MAP_COUNT};
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Outcome of reading one path.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldReadResult {
    /// The value read; null when nothing exists.
    pub value: Value,
    /// Whether anything was found at the path.
    pub exists: bool,
    /// Whether the value is only known after apply.
    pub computed: bool,
}

impl FieldReadResult {
    /// Nothing at the path.
    pub fn missing() -> Self {
        Self::default()
    }

    /// An existing, known value.
    pub fn found(value: Value) -> Self {
        Self {
            value,
            exists: true,
            computed: false,
        }
    }

    /// An existing value that is only known after apply.
    pub fn computed(value: Value) -> Self {
        Self {
            value,
            exists: true,
            computed: true,
        }
    }

    fn from_leaf(value: Value) -> Self {
        if value.is_unknown() {
            Self::computed(value)
        } else {
            Self::found(value)
        }
    }
}

/// Reads values by path.
pub trait FieldReader {
    /// Read the value at `path`.
    ///
    /// A path that does not resolve is not an error; it reads as missing.
    fn get(&self, path: &[String]) -> Result<FieldReadResult>;

    /// Read the value at a dotted flat key.
    fn get_key(&self, key: &str) -> Result<FieldReadResult> {
        self.get(FlatKey::parse(key).segments())
    }
}

impl<R: FieldReader + ?Sized> FieldReader for &R {
    fn get(&self, path: &[String]) -> Result<FieldReadResult> {
        (**self).get(path)
    }
}

impl<R: FieldReader + ?Sized> FieldReader for Box<R> {
    fn get(&self, path: &[String]) -> Result<FieldReadResult> {
        (**self).get(path)
    }
}

/// Reads directly from a nested value, without a schema.
///
/// Map keys and list indices are followed segment by segment; `#` on a list
/// and `%` on a map yield their length. When the walk misses, the dotted key
/// is tried as one top-level entry, so a flat map wrapped in a
/// [`Value::Map`] can be read too.
#[derive(Debug, Clone, Default)]
pub struct MapFieldReader {
    data: Value,
}

impl MapFieldReader {
    /// Read from `data`.
    pub fn new(data: impl Into<Value>) -> Self {
        Self { data: data.into() }
    }
}

impl FieldReader for MapFieldReader {
    fn get(&self, path: &[String]) -> Result<FieldReadResult> {
        let found = walk(&self.data, path).or_else(|| {
            if path.len() > 1 {
                self.data.get(&flatmap::join(path)).cloned()
            } else {
                None
            }
        });
        Ok(found.map(FieldReadResult::found).unwrap_or_default())
    }
}

fn walk(current: &Value, path: &[String]) -> Option<Value> {
    let Some((segment, rest)) = path.split_first() else {
        return Some(current.clone());
    };
    match (current, Segment::classify(segment)) {
        (Value::Map(entries), Segment::MapCount) if rest.is_empty() => entries
            .get(MAP_COUNT)
            .cloned()
            .or_else(|| Some(Value::from(entries.len()))),
        (Value::Map(entries), _) => walk(entries.get(segment.as_str())?, rest),
        (Value::List(items), Segment::ListCount) if rest.is_empty() => {
            Some(Value::from(items.len()))
        },
        (Value::List(items), Segment::Index(index)) => walk(items.get(index)?, rest),
        _ => None,
    }
}

/// Reads a flat map, such as a writer's output or stored state, guided by a
/// schema.
#[derive(Debug, Clone, Copy)]
pub struct FlatMapFieldReader<'a> {
    schema: &'a ObjectSchema,
    data: &'a FlatMap,
}

impl<'a> FlatMapFieldReader<'a> {
    /// Read `data` as described by `schema`.
    pub fn new(schema: &'a ObjectSchema, data: &'a FlatMap) -> Self {
        Self { schema, data }
    }

    fn read_set(&self, path: &[String], key: &str) -> Result<FieldReadResult> {
        let count_key = FlatKey::parse(key).list_count().to_string();
        let count = self.data.get(&count_key);
        if matches!(count, Some(Value::Unknown)) {
            return Ok(FieldReadResult::computed(Value::List(Vec::new())));
        }

        let prefix = format!("{}.", key);
        let mut tokens = flatmap::child_tokens(self.data, &prefix, |k, _| k == count_key);
        sort_set_tokens(&mut tokens);

        let mut items = Vec::with_capacity(tokens.len());
        for token in tokens {
            items.push(self.get(&child_path(path, token))?.value);
        }
        Ok(FieldReadResult {
            exists: count.is_some() || !items.is_empty(),
            value: Value::List(items),
            computed: false,
        })
    }

    fn read_map(&self, path: &[String], key: &str, primitive: bool) -> Result<FieldReadResult> {
        if let Some(value @ (Value::Null | Value::Unknown)) = self.data.get(key) {
            return Ok(FieldReadResult::from_leaf(value.clone()));
        }
        let count_key = FlatKey::parse(key).map_count().to_string();
        if let Some(Value::Unknown) = self.data.get(&count_key) {
            return Ok(FieldReadResult::computed(Value::Null));
        }

        let prefix = format!("{}.", key);
        let mut entries: BTreeMap<String, Value> = BTreeMap::new();
        let mut exists = self.data.contains_key(&count_key);
        for (raw_key, _) in self.data.range(prefix.clone()..) {
            let Some(rest) = raw_key.strip_prefix(&prefix) else {
                break;
            };
            if raw_key == &count_key {
                continue;
            }
            exists = true;
            let entry = if primitive {
                rest
            } else {
                flatmap::first_segment(rest)
            };
            if !entries.contains_key(entry) {
                let value = self.get(&child_path(path, entry))?.value;
                entries.insert(entry.to_string(), value);
            }
        }

        if !exists {
            return Ok(FieldReadResult::missing());
        }
        Ok(FieldReadResult::found(Value::Map(entries)))
    }
}

impl FieldReader for FlatMapFieldReader<'_> {
    fn get(&self, path: &[String]) -> Result<FieldReadResult> {
        let Some(node) = resolve(self.schema, path) else {
            return Ok(FieldReadResult::missing());
        };
        let key = flatmap::join(path);
        if is_count_path(path) {
            return Ok(self
                .data
                .get(&key)
                .cloned()
                .map(FieldReadResult::from_leaf)
                .unwrap_or_default());
        }

        match node {
            SchemaNode::Object(schema) => read_object(self, path, schema),
            SchemaNode::Field(field) => match &field.kind {
                FieldKind::List(_) => read_list(self, path),
                FieldKind::Set(_) => self.read_set(path, &key),
                FieldKind::Map(inner) => self.read_map(path, &key, inner.is_primitive()),
                _ => Ok(self
                    .data
                    .get(&key)
                    .cloned()
                    .map(FieldReadResult::from_leaf)
                    .unwrap_or_default()),
            },
        }
    }
}

/// Reads raw resource configuration, guided by a schema.
///
/// Unknown values in configuration surface as computed results.
#[derive(Debug, Clone, Copy)]
pub struct ConfigFieldReader<'a> {
    schema: &'a ObjectSchema,
    config: &'a ResourceConfig,
}

impl<'a> ConfigFieldReader<'a> {
    /// Read `config` as described by `schema`.
    pub fn new(schema: &'a ObjectSchema, config: &'a ResourceConfig) -> Self {
        Self { schema, config }
    }

    fn read_map(&self, path: &[String], key: &str) -> Result<FieldReadResult> {
        let entries = match self.config.get(key) {
            None | Some(Value::Null) => return Ok(FieldReadResult::missing()),
            Some(Value::Unknown) => return Ok(FieldReadResult::computed(Value::Null)),
            Some(Value::Map(entries)) => entries,
            Some(other) => {
                return Err(SchemaError::unexpected(
                    key,
                    format!("expected a map, got {}", other.kind_name()),
                ))
            },
        };

        if entries.values().any(Value::contains_unknown) {
            return Ok(FieldReadResult::computed(Value::Null));
        }

        let mut result = BTreeMap::new();
        for entry in entries.keys() {
            let value = self.get(&child_path(path, entry.as_str()))?.value;
            result.insert(entry.clone(), value);
        }
        Ok(FieldReadResult::found(Value::Map(result)))
    }
}

impl FieldReader for ConfigFieldReader<'_> {
    fn get(&self, path: &[String]) -> Result<FieldReadResult> {
        let Some(node) = resolve(self.schema, path) else {
            return Ok(FieldReadResult::missing());
        };
        let key = flatmap::join(path);
        if is_count_path(path) {
            return Ok(self
                .config
                .get(&key)
                .map(FieldReadResult::from_leaf)
                .unwrap_or_default());
        }

        match node {
            SchemaNode::Object(schema) => {
                if !path.is_empty() && matches!(self.config.get(&key), Some(Value::Unknown)) {
                    return Ok(FieldReadResult::computed(Value::Unknown));
                }
                read_object(self, path, schema)
            },
            SchemaNode::Field(field) => match &field.kind {
                FieldKind::List(_) | FieldKind::Set(_) => {
                    if let Some(Value::Unknown) = self.config.get(&key) {
                        return Ok(FieldReadResult::computed(Value::List(Vec::new())));
                    }
                    read_list(self, path)
                },
                FieldKind::Map(_) => self.read_map(path, &key),
                _ => Ok(self
                    .config
                    .get(&key)
                    .map(FieldReadResult::from_leaf)
                    .unwrap_or_default()),
            },
        }
    }
}

/// Overlays a pending [`InstanceDiff`] onto a source reader.
///
/// Primitives come from the diff alone. Sets discover their element tokens
/// from the diff keys and fall back to the source when the diff does not
/// mention them. Maps start from the source value and apply the diff
/// entries on top, with removed entries deleting keys.
#[derive(Debug, Clone)]
pub struct DiffFieldReader<'a, R> {
    schema: &'a ObjectSchema,
    diff: &'a InstanceDiff,
    source: R,
}

impl<'a, R: FieldReader> DiffFieldReader<'a, R> {
    /// Overlay `diff` onto `source`.
    pub fn new(schema: &'a ObjectSchema, diff: &'a InstanceDiff, source: R) -> Self {
        Self {
            schema,
            diff,
            source,
        }
    }

    /// The wrapped source reader.
    pub fn source(&self) -> &R {
        &self.source
    }

    fn read_primitive(&self, key: &str) -> FieldReadResult {
        match self.diff.attribute(key) {
            Some(attr) if !attr.new_removed => FieldReadResult {
                value: attr.new.clone(),
                exists: true,
                computed: attr.new_computed,
            },
            _ => FieldReadResult::missing(),
        }
    }

    fn read_set(&self, path: &[String], key: &str) -> Result<FieldReadResult> {
        let count_key = FlatKey::parse(key).list_count().to_string();
        let prefix = format!("{}.", key);
        let mut tokens =
            flatmap::child_tokens(&self.diff.attributes, &prefix, |k, attr: &AttributeDiff| {
                attr.new_removed || k == count_key
            });
        sort_set_tokens(&mut tokens);

        let mut items = Vec::with_capacity(tokens.len());
        for token in tokens {
            items.push(self.get(&child_path(path, token))?.value);
        }

        let count = self.diff.attribute(&count_key);
        let exists = !items.is_empty() || count.is_some();
        if !exists {
            let source = self.source.get(path)?;
            if source.exists {
                trace!(key = %key, "set untouched by diff, using source");
                return Ok(source);
            }
        }

        Ok(FieldReadResult {
            value: Value::List(items),
            exists,
            computed: count.map(|attr| attr.new_computed).unwrap_or(false),
        })
    }

    fn read_map(&self, path: &[String], key: &str, primitive: bool) -> Result<FieldReadResult> {
        let source = self.source.get(path)?;
        let mut exists = source.exists;
        let mut entries = match source.value {
            Value::Map(entries) if exists => entries,
            _ => BTreeMap::new(),
        };

        let prefix = format!("{}.", key);
        let count_prefix = format!("{}{}", prefix, MAP_COUNT);
        let mut removed = BTreeSet::new();
        let mut kept = BTreeSet::new();
        for (raw_key, attr) in self.diff.attributes.range(prefix.clone()..) {
            let Some(rest) = raw_key.strip_prefix(&prefix) else {
                break;
            };
            if raw_key.starts_with(&count_prefix) {
                continue;
            }
            exists = true;

            if primitive {
                if attr.new_removed {
                    entries.remove(rest);
                } else {
                    entries.insert(rest.to_string(), attr.new.clone());
                }
                continue;
            }

            let entry = flatmap::first_segment(rest);
            if attr.new_removed {
                removed.insert(entry.to_string());
            } else {
                kept.insert(entry.to_string());
            }
        }

        // An element goes away only when every one of its keys is removed.
        for entry in removed.difference(&kept) {
            entries.remove(entry);
        }
        for entry in kept {
            let value = self.get(&child_path(path, entry.as_str()))?.value;
            entries.insert(entry, value);
        }

        trace!(key = %key, entries = entries.len(), "overlaid map diff");
        Ok(FieldReadResult {
            value: Value::Map(entries),
            exists,
            computed: false,
        })
    }
}

impl<R: FieldReader> FieldReader for DiffFieldReader<'_, R> {
    fn get(&self, path: &[String]) -> Result<FieldReadResult> {
        let Some(node) = resolve(self.schema, path) else {
            return Ok(FieldReadResult::missing());
        };
        let key = flatmap::join(path);
        if is_count_path(path) {
            return Ok(self.read_primitive(&key));
        }

        match node {
            SchemaNode::Object(schema) => read_object(self, path, schema),
            SchemaNode::Field(field) => match &field.kind {
                FieldKind::List(_) => read_list(self, path),
                FieldKind::Set(_) => self.read_set(path, &key),
                FieldKind::Map(inner) => self.read_map(path, &key, inner.is_primitive()),
                _ => Ok(self.read_primitive(&key)),
            },
        }
    }
}

fn resolve<'s>(schema: &'s ObjectSchema, path: &[String]) -> Option<SchemaNode<'s>> {
    schema.get_by_path(path)?.last().copied()
}

fn is_count_path(path: &[String]) -> bool {
    path.last()
        .map(|segment| Segment::classify(segment).is_count())
        .unwrap_or(false)
}

fn read_list<R: FieldReader + ?Sized>(reader: &R, path: &[String]) -> Result<FieldReadResult> {
    let count_path = child_path(path, LIST_COUNT);
    let count = reader.get(&count_path)?;
    if count.computed || count.value.is_unknown() {
        return Ok(FieldReadResult {
            value: Value::List(Vec::new()),
            exists: count.exists,
            computed: true,
        });
    }

    let len = parse_count(&count_path, &count)?;
    if len == 0 {
        return Ok(FieldReadResult {
            value: Value::List(Vec::new()),
            exists: count.exists,
            computed: false,
        });
    }

    // A count past the last stored element is corrupt, not a list of nulls.
    let last = reader.get(&child_path(path, (len - 1).to_string()))?;
    if !last.exists {
        return Err(SchemaError::InvalidCount(flatmap::join(&count_path)));
    }

    let mut items = Vec::new();
    for index in 0..len - 1 {
        items.push(reader.get(&child_path(path, index.to_string()))?.value);
    }
    items.push(last.value);
    Ok(FieldReadResult::found(Value::List(items)))
}

fn read_object<R: FieldReader + ?Sized>(
    reader: &R,
    path: &[String],
    schema: &ObjectSchema,
) -> Result<FieldReadResult> {
    let mut members = BTreeMap::new();
    let mut exists = false;
    for (name, _) in schema.fields() {
        let result = reader.get(&child_path(path, name))?;
        exists |= result.exists;
        members.insert(name.to_string(), result.value);
    }
    Ok(FieldReadResult {
        value: Value::Map(members),
        exists,
        computed: false,
    })
}

fn parse_count(path: &[String], count: &FieldReadResult) -> Result<usize> {
    if !count.exists {
        return Ok(0);
    }
    let invalid = || SchemaError::InvalidCount(flatmap::join(path));
    match &count.value {
        Value::Null => Ok(0),
        Value::Int(n) => usize::try_from(*n).map_err(|_| invalid()),
        Value::String(s) => s.parse().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

// Numeric tokens in numeric order, then anything else lexically.
fn sort_set_tokens(tokens: &mut [String]) {
    tokens.sort_by(|a, b| match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
}
