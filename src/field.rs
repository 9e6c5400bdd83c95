//! Declarative schema trees.
//!
//! Schemas are built from [`Field`] values composed into an
//! [`ObjectSchema`]. The tree is immutable once built and is normally shared
//! behind an [`Arc`] by every reader, writer and lifecycle call for a
//! resource type.
//!
//! ```
//! use tfplugin_schema::field::{Field, ObjectSchema};
//!
//! let rule = ObjectSchema::new()
//!     .with_field("port", Field::int().required())
//!     .with_field("cidr_blocks", Field::list(Field::string()).optional());
//!
//! let schema = ObjectSchema::resource()
//!     .with_field("name", Field::string().required().force_new())
//!     .with_field("ingress", Field::set(Field::object(rule)).optional());
//!
//! let block = schema.to_block();
//! assert!(block.attributes.contains_key("id"));
//! assert!(block.block_types.contains_key("ingress"));
//! ```

use crate::flatmap::{Segment, LIST_COUNT, MAP_COUNT};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, NestingMode};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Name of the implicit resource identifier field.
pub const ID_FIELD: &str = "id";

/// A default computed when the schema is projected or defaults are applied.
pub type DefaultFn = Arc<dyn Fn() -> Result<Value, String> + Send + Sync>;

/// The default of a field.
#[derive(Clone)]
pub enum FieldDefault {
    /// A fixed value.
    Value(Value),
    /// A function evaluated on demand; it may fail.
    Func(DefaultFn),
}

impl FieldDefault {
    /// Produce the default value.
    pub fn evaluate(&self) -> Result<Value, String> {
        match self {
            Self::Value(v) => Ok(v.clone()),
            Self::Func(f) => f(),
        }
    }
}

impl fmt::Debug for FieldDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Func(_) => f.write_str("Func(..)"),
        }
    }
}

/// What a field holds.
#[derive(Debug, Clone)]
pub enum FieldKind {
    /// A boolean.
    Bool,
    /// A whole number.
    Int,
    /// A fractional number.
    Float,
    /// A string.
    String,
    /// An ordered list of one inner field.
    List(Box<Field>),
    /// An unordered set of one inner field.
    Set(Box<Field>),
    /// A string-keyed map of one inner field.
    Map(Box<Field>),
    /// A nested object.
    Object(Arc<ObjectSchema>),
}

impl FieldKind {
    /// Short name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }
}

/// One field of a schema together with its metadata.
#[derive(Debug, Clone)]
pub struct Field {
    /// What the field holds.
    pub kind: FieldKind,
    /// Must be set in configuration.
    pub required: bool,
    /// May be set in configuration.
    pub optional: bool,
    /// Filled in by the provider.
    pub computed: bool,
    /// Hidden from output.
    pub sensitive: bool,
    /// Changing the field replaces the resource.
    pub force_new: bool,
    /// Human-readable description.
    pub description: Option<String>,
    /// Minimum number of items for collections.
    pub min_items: u32,
    /// Maximum number of items for collections, zero for unlimited.
    pub max_items: u32,
    /// Default applied when the configuration leaves the field unset.
    pub default: Option<FieldDefault>,
    /// Deprecation notice.
    pub deprecated: Option<String>,
    /// Removal notice; the field is ignored.
    pub removed: Option<String>,
}

impl Field {
    /// Create a field of the given kind with no flags set.
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            force_new: false,
            description: None,
            min_items: 0,
            max_items: 0,
            default: None,
            deprecated: None,
            removed: None,
        }
    }

    /// A boolean field.
    pub fn bool() -> Self {
        Self::new(FieldKind::Bool)
    }

    /// An integer field.
    pub fn int() -> Self {
        Self::new(FieldKind::Int)
    }

    /// A float field.
    pub fn float() -> Self {
        Self::new(FieldKind::Float)
    }

    /// A string field.
    pub fn string() -> Self {
        Self::new(FieldKind::String)
    }

    /// A list of `inner`.
    pub fn list(inner: Field) -> Self {
        Self::new(FieldKind::List(Box::new(inner)))
    }

    /// A set of `inner`.
    pub fn set(inner: Field) -> Self {
        Self::new(FieldKind::Set(Box::new(inner)))
    }

    /// A map of `inner`.
    pub fn map(inner: Field) -> Self {
        Self::new(FieldKind::Map(Box::new(inner)))
    }

    /// A nested object.
    pub fn object(schema: ObjectSchema) -> Self {
        Self::new(FieldKind::Object(Arc::new(schema)))
    }

    /// A nested object shared with other fields.
    pub fn object_shared(schema: Arc<ObjectSchema>) -> Self {
        Self::new(FieldKind::Object(schema))
    }

    /// Mark as required. Clears `optional`.
    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    /// Mark as optional. Clears `required`.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self.required = false;
        self
    }

    /// Mark as computed.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Mark as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Mark as forcing replacement.
    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the minimum number of items.
    pub fn with_min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }

    /// Set the maximum number of items.
    pub fn with_max_items(mut self, max: u32) -> Self {
        self.max_items = max;
        self
    }

    /// Set a fixed default.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(FieldDefault::Value(value.into()));
        self
    }

    /// Set a computed default.
    pub fn with_default_fn<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Result<Value, String> + Send + Sync + 'static,
    {
        self.default = Some(FieldDefault::Func(Arc::new(f)));
        self
    }

    /// Mark as deprecated.
    pub fn deprecated(mut self, message: impl Into<String>) -> Self {
        self.deprecated = Some(message.into());
        self
    }

    /// Mark as removed.
    pub fn removed(mut self, message: impl Into<String>) -> Self {
        self.removed = Some(message.into());
        self
    }

    /// Whether the field is bool, int, float or string.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::Bool | FieldKind::Int | FieldKind::Float | FieldKind::String
        )
    }

    /// Whether the field is a list, set or map.
    pub fn is_collection(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::List(_) | FieldKind::Set(_) | FieldKind::Map(_)
        )
    }

    /// Computed and not settable by the user.
    pub fn is_computed_only(&self) -> bool {
        self.computed && !self.optional
    }

    /// The element field of a list, set or map.
    pub fn inner(&self) -> Option<&Field> {
        match &self.kind {
            FieldKind::List(inner) | FieldKind::Set(inner) | FieldKind::Map(inner) => {
                Some(inner.as_ref())
            },
            _ => None,
        }
    }

    /// The schema of a nested object field.
    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match &self.kind {
            FieldKind::Object(schema) => Some(schema.as_ref()),
            _ => None,
        }
    }

    /// Structural type of the field.
    pub fn terraform_type(&self) -> AttributeType {
        match &self.kind {
            FieldKind::Bool => AttributeType::Bool,
            FieldKind::Int | FieldKind::Float => AttributeType::Number,
            FieldKind::String => AttributeType::String,
            FieldKind::List(inner) => AttributeType::list(inner.terraform_type()),
            FieldKind::Set(inner) => AttributeType::set(inner.terraform_type()),
            FieldKind::Map(inner) => AttributeType::map(inner.terraform_type()),
            FieldKind::Object(schema) => schema.terraform_type(),
        }
    }

    /// Required/optional as reported to the orchestrator.
    ///
    /// A required field with a default function stays required only while
    /// the function succeeds with null; any other outcome means the provider
    /// can fill the value itself.
    pub fn resolved_requiredness(&self) -> (bool, bool) {
        match (&self.default, self.required) {
            (Some(FieldDefault::Func(f)), true) => match f() {
                Ok(Value::Null) => (true, self.optional),
                Ok(_) | Err(_) => (false, true),
            },
            _ => (self.required, self.optional),
        }
    }

    /// Project as a nested block, if the field is one.
    ///
    /// Only collections of nested objects that the user can set become
    /// blocks; everything else is an attribute.
    pub fn to_nested_block(&self) -> Option<NestedBlock> {
        let (nesting_mode, inner) = match &self.kind {
            FieldKind::List(inner) => (NestingMode::List, inner),
            FieldKind::Set(inner) => (NestingMode::Set, inner),
            FieldKind::Map(inner) => (NestingMode::Map, inner),
            _ => return None,
        };
        let schema = inner.as_object()?;
        if self.is_computed_only() {
            return None;
        }

        let mut min_items = self.min_items;
        let max_items = self.max_items;
        if self.required && min_items == 0 {
            min_items = 1;
        }
        if self.optional && min_items > 0 {
            min_items = 0;
        }

        Some(
            NestedBlock::new(nesting_mode, schema.to_block())
                .with_min_items(min_items)
                .with_max_items(max_items),
        )
    }

    /// Project as a leaf attribute.
    pub fn to_attribute(&self) -> Attribute {
        let (required, optional) = self.resolved_requiredness();
        let flags = AttributeFlags {
            required,
            optional,
            computed: self.computed,
            sensitive: self.sensitive,
        };
        let mut attr = Attribute::new(self.terraform_type(), flags);
        attr.description = self.description.clone();
        attr.deprecated = self.deprecated.is_some();
        attr
    }
}

/// A node visited while resolving a path.
#[derive(Debug, Clone, Copy)]
pub enum SchemaNode<'a> {
    /// A nested object, including the root.
    Object(&'a ObjectSchema),
    /// Any field that is not a nested object.
    Field(&'a Field),
}

impl<'a> SchemaNode<'a> {
    /// The node a field resolves to; object fields resolve to their schema.
    pub fn of(field: &'a Field) -> Self {
        match &field.kind {
            FieldKind::Object(schema) => SchemaNode::Object(schema.as_ref()),
            _ => SchemaNode::Field(field),
        }
    }

    /// The field, unless this is an object.
    pub fn as_field(&self) -> Option<&'a Field> {
        match self {
            SchemaNode::Field(field) => Some(field),
            SchemaNode::Object(_) => None,
        }
    }

    /// Whether this is a list, set or map field.
    pub fn is_collection(&self) -> bool {
        self.as_field().map(Field::is_collection).unwrap_or(false)
    }
}

/// A nested object schema: named fields plus a version.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: BTreeMap<String, Field>,
    version: u64,
    description: Option<String>,
}

impl ObjectSchema {
    /// An empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// A resource schema, which always carries an optional computed `id`.
    pub fn resource() -> Self {
        Self::new().with_field(ID_FIELD, Field::string().optional().computed())
    }

    /// Add or replace a field.
    pub fn with_field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Set the schema version.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = version;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// All fields, sorted by name.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Schema version.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// `["object", {...}]` type of the schema.
    pub fn terraform_type(&self) -> AttributeType {
        AttributeType::Object(
            self.fields
                .iter()
                .map(|(name, field)| (name.clone(), field.terraform_type()))
                .collect(),
        )
    }

    /// Project into a block of attributes and nested blocks.
    pub fn to_block(&self) -> Block {
        let mut block = Block::new();
        block.description = self.description.clone();
        for (name, field) in &self.fields {
            match field.to_nested_block() {
                Some(nested) => {
                    block.block_types.insert(name.clone(), nested);
                },
                None => {
                    block.attributes.insert(name.clone(), field.to_attribute());
                },
            }
        }
        block
    }

    /// Project into a versioned schema.
    pub fn to_schema(&self) -> crate::schema::Schema {
        crate::schema::Schema::new(self.version, self.to_block())
    }

    /// Resolve a flat path into the nodes visited, one per segment.
    ///
    /// The empty path resolves to the root object. Returns `None` when a
    /// segment names an undeclared field, indexes past a primitive, or is
    /// not a valid list index; `#` and `%` must be the last segment.
    pub fn get_by_path<S: AsRef<str>>(&self, path: &[S]) -> Option<Vec<SchemaNode<'_>>> {
        if path.is_empty() {
            return Some(vec![SchemaNode::Object(self)]);
        }

        let mut nodes = Vec::with_capacity(path.len());
        let mut current = SchemaNode::Object(self);
        let mut segments = path.iter().map(|s| s.as_ref()).peekable();

        while let Some(segment) = segments.next() {
            let is_last = segments.peek().is_none();
            current = match current {
                SchemaNode::Object(schema) => SchemaNode::of(schema.field(segment)?),
                SchemaNode::Field(field) => match &field.kind {
                    FieldKind::List(inner) => match Segment::classify(segment) {
                        Segment::ListCount if is_last => SchemaNode::of(inner),
                        Segment::Index(_) => SchemaNode::of(inner),
                        _ => return None,
                    },
                    FieldKind::Set(inner) => {
                        if segment == LIST_COUNT && !is_last {
                            return None;
                        }
                        SchemaNode::of(inner)
                    },
                    FieldKind::Map(inner) => {
                        if segment == MAP_COUNT && !is_last {
                            return None;
                        }
                        SchemaNode::of(inner)
                    },
                    _ => return None,
                },
            };
            nodes.push(current);
        }

        Some(nodes)
    }

    /// Fill unset members from field defaults.
    ///
    /// Members that are missing or null take their field's default; a
    /// default function that fails leaves the member null. Removed fields
    /// are forced to null. Nested objects are filled recursively.
    pub fn apply_defaults(&self, value: &Value) -> Value {
        let mut out = match value {
            Value::Map(entries) => entries.clone(),
            Value::Null => BTreeMap::new(),
            other => return other.clone(),
        };

        for (name, field) in &self.fields {
            if field.removed.is_some() {
                if out.contains_key(name) {
                    out.insert(name.clone(), Value::Null);
                }
                continue;
            }

            let current = out.get(name).cloned().unwrap_or(Value::Null);
            let filled = match (&current, &field.default) {
                (Value::Null, Some(default)) => default.evaluate().unwrap_or(Value::Null),
                _ => current,
            };
            let filled = match (field.as_object(), &filled) {
                (Some(schema), Value::Map(_)) => schema.apply_defaults(&filled),
                _ => filled,
            };

            if !filled.is_null() || out.contains_key(name) {
                out.insert(name.clone(), filled);
            }
        }

        Value::Map(out)
    }
}
