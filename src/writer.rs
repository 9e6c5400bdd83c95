//! Encoding nested values into a flat map.

use crate::error::{Result, SchemaError};
use crate::field::{Field, FieldKind, ObjectSchema, SchemaNode};
use crate::flatmap::{self, FlatKey, FlatMap};
use crate::value::Value;
use tracing::{trace, warn};

/// Writes values into a flat map, guided by a schema.
///
/// Only whole lists, sets and maps can be written; writing a member inside
/// one is rejected. Rewriting a collection first clears every key it owned,
/// so a shorter second write leaves nothing behind.
#[derive(Debug)]
pub struct FieldWriter<'a> {
    schema: &'a ObjectSchema,
    data: FlatMap,
}

impl<'a> FieldWriter<'a> {
    /// A writer with an empty flat map.
    pub fn new(schema: &'a ObjectSchema) -> Self {
        Self::with_data(schema, FlatMap::new())
    }

    /// A writer continuing from an existing flat map.
    pub fn with_data(schema: &'a ObjectSchema, data: FlatMap) -> Self {
        Self { schema, data }
    }

    /// The flat map written so far.
    pub fn data(&self) -> &FlatMap {
        &self.data
    }

    /// Consume the writer, returning the flat map.
    pub fn into_data(self) -> FlatMap {
        self.data
    }

    /// Write `value` at `path`.
    ///
    /// The empty path writes the root object.
    pub fn write<S: AsRef<str>>(&mut self, path: &[S], value: &Value) -> Result<()> {
        let key = flatmap::join(path);
        let schema = self.schema;
        let nodes = schema
            .get_by_path(path)
            .ok_or_else(|| SchemaError::KeyNotFound(key.clone()))?;

        if nodes[..nodes.len() - 1]
            .iter()
            .any(SchemaNode::is_collection)
        {
            warn!(key = %key, "rejected write inside a collection");
            return Err(SchemaError::PartialWrite(key));
        }

        let Some(node) = nodes.last().copied() else {
            return Err(SchemaError::KeyNotFound(key));
        };
        trace!(key = %key, "writing field");
        self.set(FlatKey::from_segments(path.iter().map(|s| s.as_ref())), node, value)
    }

    fn set(&mut self, key: FlatKey, node: SchemaNode<'_>, value: &Value) -> Result<()> {
        match node {
            SchemaNode::Object(schema) => self.set_object(key, schema, value),
            SchemaNode::Field(field) => match &field.kind {
                FieldKind::List(inner) | FieldKind::Set(inner) => self.set_list(key, inner, value),
                FieldKind::Map(inner) => self.set_map(key, inner, value),
                _ => self.set_primitive(key, field, value),
            },
        }
    }

    fn set_primitive(&mut self, key: FlatKey, field: &Field, value: &Value) -> Result<()> {
        let matches = match (&field.kind, value) {
            (_, Value::Null | Value::Unknown) => true,
            (FieldKind::Bool, Value::Bool(_)) => true,
            (FieldKind::Int, Value::Int(_)) => true,
            (FieldKind::Float, Value::Float(_) | Value::Int(_)) => true,
            (FieldKind::String, Value::String(_)) => true,
            _ => false,
        };
        if !matches {
            return Err(SchemaError::TypeMismatch {
                path: key.to_string(),
                expected: field.kind.name(),
                actual: value.kind_name(),
            });
        }

        self.data.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn set_list(&mut self, key: FlatKey, inner: &Field, value: &Value) -> Result<()> {
        let name = key.to_string();
        flatmap::clear_subtree(&mut self.data, &name);

        let items = match value {
            Value::Null => {
                self.data.insert(key.list_count().to_string(), Value::Int(0));
                return Ok(());
            },
            Value::List(items) => items,
            other => {
                return Err(SchemaError::TypeMismatch {
                    path: name,
                    expected: "list",
                    actual: other.kind_name(),
                })
            },
        };

        for (index, item) in items.iter().enumerate() {
            self.set(key.child(index.to_string()), SchemaNode::of(inner), item)?;
        }
        self.data
            .insert(key.list_count().to_string(), Value::from(items.len()));
        Ok(())
    }

    fn set_map(&mut self, key: FlatKey, inner: &Field, value: &Value) -> Result<()> {
        let name = key.to_string();
        flatmap::clear_subtree(&mut self.data, &name);

        let entries = match value {
            Value::Null => {
                self.data.insert(name, Value::Null);
                return Ok(());
            },
            Value::Map(entries) => entries,
            other => {
                return Err(SchemaError::TypeMismatch {
                    path: name,
                    expected: "map",
                    actual: other.kind_name(),
                })
            },
        };

        for (entry_key, item) in entries {
            self.set(key.child(entry_key.as_str()), SchemaNode::of(inner), item)?;
        }
        self.data
            .insert(key.map_count().to_string(), Value::from(entries.len()));
        Ok(())
    }

    fn set_object(&mut self, key: FlatKey, schema: &ObjectSchema, value: &Value) -> Result<()> {
        let members = match value {
            Value::Null if !key.is_root() => {
                flatmap::clear_subtree(&mut self.data, &key.to_string());
                return Ok(());
            },
            Value::Map(members) => members,
            other => {
                return Err(SchemaError::TypeMismatch {
                    path: key.to_string(),
                    expected: "object",
                    actual: other.kind_name(),
                })
            },
        };

        for (name, member) in members {
            let field = schema
                .field(name)
                .ok_or_else(|| SchemaError::KeyNotFound(key.child(name.as_str()).to_string()))?;
            self.set(key.child(name.as_str()), SchemaNode::of(field), member)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::map;

    fn schema() -> ObjectSchema {
        let element = ObjectSchema::new()
            .with_field("index", Field::int())
            .with_field("value", Field::string());

        ObjectSchema::new()
            .with_field("bool", Field::bool())
            .with_field("int", Field::int())
            .with_field("float", Field::float())
            .with_field("string", Field::string())
            .with_field("list", Field::list(Field::string()))
            .with_field("list_int", Field::list(Field::int()))
            .with_field("list_map", Field::list(Field::map(Field::string())))
            .with_field("list_nested", Field::list(Field::object(element.clone())))
            .with_field("map", Field::map(Field::string()))
            .with_field("map_int", Field::map(Field::int()))
            .with_field("set", Field::set(Field::int()))
            .with_field("set_nested", Field::set(Field::object(element.clone())))
            .with_field("nested", Field::object(element))
    }

    fn write(path: &[&str], value: Value) -> Result<FlatMap> {
        let schema = schema();
        let mut writer = FieldWriter::new(&schema);
        writer.write(path, &value)?;
        Ok(writer.into_data())
    }

    fn flat(entries: &[(&str, Value)]) -> FlatMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_write_primitives() {
        assert_eq!(
            write(&["bool"], Value::Bool(false)).unwrap(),
            flat(&[("bool", Value::Bool(false))])
        );
        assert_eq!(
            write(&["int"], Value::Int(42)).unwrap(),
            flat(&[("int", Value::Int(42))])
        );
        assert_eq!(
            write(&["float"], Value::Float(3.1415)).unwrap(),
            flat(&[("float", Value::Float(3.1415))])
        );
        assert_eq!(
            write(&["float"], Value::Int(3)).unwrap(),
            flat(&[("float", Value::Int(3))])
        );
        assert_eq!(
            write(&["string"], Value::from("foo")).unwrap(),
            flat(&[("string", Value::from("foo"))])
        );
        assert_eq!(
            write(&["string"], Value::Null).unwrap(),
            flat(&[("string", Value::Null)])
        );
    }

    #[test]
    fn test_write_type_mismatch() {
        let err = write(&["int"], Value::from("42")).unwrap_err();
        assert_eq!(
            err,
            SchemaError::TypeMismatch {
                path: "int".to_string(),
                expected: "int",
                actual: "string",
            }
        );
        assert!(matches!(
            write(&["bool"], Value::Int(1)),
            Err(SchemaError::TypeMismatch { .. })
        ));
        assert!(matches!(
            write(&["list"], Value::from("x")),
            Err(SchemaError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_write_list() {
        assert_eq!(
            write(&["list"], Value::from(vec!["foo", "bar"])).unwrap(),
            flat(&[
                ("list.#", Value::Int(2)),
                ("list.0", Value::from("foo")),
                ("list.1", Value::from("bar")),
            ])
        );
        assert_eq!(
            write(&["list"], Value::List(vec![])).unwrap(),
            flat(&[("list.#", Value::Int(0))])
        );
        assert_eq!(
            write(&["list"], Value::Null).unwrap(),
            flat(&[("list.#", Value::Int(0))])
        );
    }

    #[test]
    fn test_write_list_of_maps() {
        let value = Value::List(vec![map([("foo", "bar")]), map([("bar", "baz")])]);
        assert_eq!(
            write(&["list_map"], value).unwrap(),
            flat(&[
                ("list_map.#", Value::Int(2)),
                ("list_map.0.%", Value::Int(1)),
                ("list_map.0.foo", Value::from("bar")),
                ("list_map.1.%", Value::Int(1)),
                ("list_map.1.bar", Value::from("baz")),
            ])
        );
    }

    #[test]
    fn test_write_list_of_objects() {
        let value = Value::List(vec![map([
            ("index", Value::Int(10)),
            ("value", Value::from("ten")),
        ])]);
        assert_eq!(
            write(&["list_nested"], value).unwrap(),
            flat(&[
                ("list_nested.#", Value::Int(1)),
                ("list_nested.0.index", Value::Int(10)),
                ("list_nested.0.value", Value::from("ten")),
            ])
        );
    }

    #[test]
    fn test_write_map() {
        assert_eq!(
            write(&["map"], map([("foo", "bar"), ("bar", "baz")])).unwrap(),
            flat(&[
                ("map.%", Value::Int(2)),
                ("map.foo", Value::from("bar")),
                ("map.bar", Value::from("baz")),
            ])
        );
        assert_eq!(
            write(&["map"], Value::Null).unwrap(),
            flat(&[("map", Value::Null)])
        );
        assert_eq!(
            write(&["map"], Value::empty_map()).unwrap(),
            flat(&[("map.%", Value::Int(0))])
        );
    }

    #[test]
    fn test_write_set() {
        assert_eq!(
            write(&["set"], Value::from(vec![1i64, 5])).unwrap(),
            flat(&[
                ("set.#", Value::Int(2)),
                ("set.0", Value::Int(1)),
                ("set.1", Value::Int(5)),
            ])
        );
    }

    #[test]
    fn test_write_full_object() {
        let value = map([
            ("string", Value::from("foo")),
            ("list", Value::from(vec!["a"])),
            ("nested", map([("index", Value::Int(1))])),
        ]);
        assert_eq!(
            write(&[], value).unwrap(),
            flat(&[
                ("list.#", Value::Int(1)),
                ("list.0", Value::from("a")),
                ("nested.index", Value::Int(1)),
                ("string", Value::from("foo")),
            ])
        );
    }

    #[test]
    fn test_write_object_member_path() {
        assert_eq!(
            write(&["nested", "value"], Value::from("x")).unwrap(),
            flat(&[("nested.value", Value::from("x"))])
        );
    }

    #[test]
    fn test_partial_writes_rejected() {
        for path in [
            &["list", "0"][..],
            &["map", "foo"][..],
            &["set", "5"][..],
            &["list_nested", "0", "value"][..],
        ] {
            assert!(
                matches!(
                    write(path, Value::from("x")),
                    Err(SchemaError::PartialWrite(_))
                ),
                "expected partial write error for {:?}",
                path
            );
        }
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert_eq!(
            write(&["noexist"], Value::from("x")),
            Err(SchemaError::KeyNotFound("noexist".to_string()))
        );
        assert_eq!(
            write(&[], map([("noexist", "x")])),
            Err(SchemaError::KeyNotFound("noexist".to_string()))
        );
    }

    #[test]
    fn test_rewrite_shorter_list_leaves_no_orphans() {
        let schema = schema();
        let mut writer = FieldWriter::new(&schema);

        let four = Value::List(
            (0..4)
                .map(|i| map([("index", Value::Int(i)), ("value", Value::from("v"))]))
                .collect(),
        );
        writer.write(&["list_nested"], &four).unwrap();
        let three = Value::List(
            (0..3)
                .map(|i| map([("index", Value::Int(i))]))
                .collect(),
        );
        writer.write(&["list_nested"], &three).unwrap();

        let data = writer.into_data();
        assert_eq!(data.get("list_nested.#"), Some(&Value::Int(3)));
        assert!(!data.keys().any(|k| k.starts_with("list_nested.3")));
        assert!(!data.keys().any(|k| k.ends_with(".value")));
    }

    #[test]
    fn test_rewrite_map_after_null() {
        let schema = schema();
        let mut writer = FieldWriter::new(&schema);
        writer.write(&["map"], &Value::Null).unwrap();
        writer.write(&["map"], &map([("a", "b")])).unwrap();

        assert_eq!(
            writer.into_data(),
            flat(&[("map.%", Value::Int(1)), ("map.a", Value::from("b"))])
        );
    }

    #[test]
    fn test_unknown_primitive_is_stored() {
        assert_eq!(
            write(&["string"], Value::Unknown).unwrap(),
            flat(&[("string", Value::Unknown)])
        );
    }
}
