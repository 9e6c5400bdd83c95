//! Block projection of a schema, as exchanged with the orchestrator.
//!
//! An [`ObjectSchema`](crate::field::ObjectSchema) is projected into a
//! [`Block`]: leaf [`Attribute`]s carrying a structural [`AttributeType`],
//! plus [`NestedBlock`]s for collections of nested objects. Blocks are what
//! the plugin protocol's `GetSchema` returns and what unknown propagation
//! walks during planning.

use crate::proto;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// The structural type of an attribute value.
///
/// Serializes to the protocol's type descriptor: `"string"`,
/// `["list", T]`, `["object", {name: T}]` and so on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub enum AttributeType {
    /// A string value.
    String,
    /// A number, integral or fractional.
    Number,
    /// A boolean value.
    Bool,
    /// A list of values of a single type.
    List(Box<AttributeType>),
    /// A set of unique values of a single type.
    Set(Box<AttributeType>),
    /// A map from string keys to values of a single type.
    Map(Box<AttributeType>),
    /// An object with a fixed set of attributes.
    Object(BTreeMap<String, AttributeType>),
    /// Any value; the type is decided by configuration.
    Dynamic,
}

impl AttributeType {
    /// Create a list type.
    pub fn list(element_type: AttributeType) -> Self {
        Self::List(Box::new(element_type))
    }

    /// Create a set type.
    pub fn set(element_type: AttributeType) -> Self {
        Self::Set(Box::new(element_type))
    }

    /// Create a map type.
    pub fn map(element_type: AttributeType) -> Self {
        Self::Map(Box::new(element_type))
    }

    /// Create an object type.
    pub fn object<I, K>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeType)>,
        K: Into<String>,
    {
        Self::Object(
            attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        )
    }

    /// The descriptor as a JSON value.
    pub fn descriptor(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Self::String => Json::from("string"),
            Self::Number => Json::from("number"),
            Self::Bool => Json::from("bool"),
            Self::Dynamic => Json::from("dynamic"),
            Self::List(inner) => Json::Array(vec![Json::from("list"), inner.descriptor()]),
            Self::Set(inner) => Json::Array(vec![Json::from("set"), inner.descriptor()]),
            Self::Map(inner) => Json::Array(vec![Json::from("map"), inner.descriptor()]),
            Self::Object(attrs) => {
                let fields = attrs
                    .iter()
                    .map(|(name, ty)| (name.clone(), ty.descriptor()))
                    .collect();
                Json::Array(vec![Json::from("object"), Json::Object(fields)])
            },
        }
    }

    /// Compact descriptor text with sorted object keys.
    ///
    /// Collaborators compare these bytes directly, so the output must not
    /// depend on declaration order.
    pub fn encode(&self) -> Vec<u8> {
        self.descriptor().to_string().into_bytes()
    }

    /// Parse a descriptor back into a type.
    pub fn from_descriptor(descriptor: &serde_json::Value) -> Result<Self, String> {
        use serde_json::Value as Json;

        match descriptor {
            Json::String(s) => match s.as_str() {
                "string" => Ok(Self::String),
                "number" => Ok(Self::Number),
                "bool" => Ok(Self::Bool),
                "dynamic" => Ok(Self::Dynamic),
                other => Err(format!("unknown primitive type {:?}", other)),
            },
            Json::Array(parts) if parts.len() == 2 => {
                let tag = parts[0].as_str().unwrap_or_default();
                match tag {
                    "list" => Ok(Self::list(Self::from_descriptor(&parts[1])?)),
                    "set" => Ok(Self::set(Self::from_descriptor(&parts[1])?)),
                    "map" => Ok(Self::map(Self::from_descriptor(&parts[1])?)),
                    "object" => {
                        let attrs = parts[1]
                            .as_object()
                            .ok_or_else(|| "object type without attributes".to_string())?;
                        let mut out = BTreeMap::new();
                        for (name, ty) in attrs {
                            out.insert(name.clone(), Self::from_descriptor(ty)?);
                        }
                        Ok(Self::Object(out))
                    },
                    other => Err(format!("unknown collection type {:?}", other)),
                }
            },
            other => Err(format!("malformed type descriptor {}", other)),
        }
    }
}

impl From<AttributeType> for serde_json::Value {
    fn from(ty: AttributeType) -> Self {
        ty.descriptor()
    }
}

impl TryFrom<serde_json::Value> for AttributeType {
    type Error = String;

    fn try_from(descriptor: serde_json::Value) -> Result<Self, Self::Error> {
        Self::from_descriptor(&descriptor)
    }
}

/// Describes how an attribute can be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AttributeFlags {
    /// The attribute is required in configuration.
    pub required: bool,
    /// The attribute is optional in configuration.
    pub optional: bool,
    /// The attribute is computed by the provider.
    pub computed: bool,
    /// The attribute is sensitive and should be hidden in output.
    pub sensitive: bool,
}

impl AttributeFlags {
    /// Flags for a required attribute.
    pub fn required() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Flags for an optional attribute.
    pub fn optional() -> Self {
        Self {
            optional: true,
            ..Default::default()
        }
    }

    /// Flags for a computed, read-only attribute.
    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Default::default()
        }
    }

    /// Flags for an attribute the user may set and the provider may fill in.
    pub fn optional_computed() -> Self {
        Self {
            optional: true,
            computed: true,
            ..Default::default()
        }
    }

    /// Mark the attribute as sensitive.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// A leaf attribute of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// The type of the attribute.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// How the attribute can be used.
    #[serde(flatten)]
    pub flags: AttributeFlags,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the attribute is deprecated.
    #[serde(default)]
    pub deprecated: bool,
}

impl Attribute {
    /// Create an attribute with the given type and flags.
    pub fn new(attr_type: AttributeType, flags: AttributeFlags) -> Self {
        Self {
            attr_type,
            flags,
            description: None,
            deprecated: false,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Mark the attribute as deprecated.
    pub fn with_deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    /// Project into the protocol message.
    pub fn to_proto(&self, name: &str) -> proto::schema::Attribute {
        proto::schema::Attribute {
            name: name.to_string(),
            r#type: self.attr_type.encode(),
            description: self.description.clone().unwrap_or_default(),
            required: self.flags.required,
            optional: self.flags.optional,
            computed: self.flags.computed,
            sensitive: self.flags.sensitive,
            description_kind: proto::StringKind::Plain as i32,
            deprecated: self.deprecated,
        }
    }
}

/// How a nested block repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NestingMode {
    /// At most one block.
    #[default]
    Single,
    /// Exactly one block, which is never null.
    Group,
    /// Ordered blocks.
    List,
    /// Unordered, unique blocks.
    Set,
    /// Blocks keyed by label.
    Map,
}

impl NestingMode {
    /// The protocol enum value.
    pub fn to_proto(self) -> proto::schema::nested_block::NestingMode {
        use proto::schema::nested_block::NestingMode as Proto;

        match self {
            Self::Single => Proto::Single,
            Self::Group => Proto::Group,
            Self::List => Proto::List,
            Self::Set => Proto::Set,
            Self::Map => Proto::Map,
        }
    }
}

/// Attributes and nested blocks at one level of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Block {
    /// Leaf attributes by name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Attribute>,
    /// Nested blocks by type name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub block_types: HashMap<String, NestedBlock>,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Block {
    /// Create an empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Add a nested block.
    pub fn with_block(mut self, name: impl Into<String>, block: NestedBlock) -> Self {
        self.block_types.insert(name.into(), block);
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Project into the protocol message.
    ///
    /// Attributes and nested blocks are emitted sorted by name so the output
    /// is stable.
    pub fn to_proto(&self) -> proto::schema::Block {
        let mut attributes: Vec<_> = self
            .attributes
            .iter()
            .map(|(name, attr)| attr.to_proto(name))
            .collect();
        attributes.sort_by(|a, b| a.name.cmp(&b.name));

        let mut block_types: Vec<_> = self
            .block_types
            .iter()
            .map(|(name, nested)| nested.to_proto(name))
            .collect();
        block_types.sort_by(|a, b| a.type_name.cmp(&b.type_name));

        proto::schema::Block {
            version: 0,
            attributes,
            block_types,
            description: self.description.clone().unwrap_or_default(),
            description_kind: proto::StringKind::Plain as i32,
            deprecated: false,
        }
    }
}

/// A nested block with its nesting mode and item constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedBlock {
    /// The block definition.
    #[serde(flatten)]
    pub block: Block,
    /// How the block repeats.
    #[serde(default)]
    pub nesting_mode: NestingMode,
    /// Minimum number of blocks required.
    #[serde(default)]
    pub min_items: u32,
    /// Maximum number of blocks allowed (0 = unlimited).
    #[serde(default)]
    pub max_items: u32,
}

impl NestedBlock {
    /// Create a nested block with no item constraints.
    pub fn new(nesting_mode: NestingMode, block: Block) -> Self {
        Self {
            block,
            nesting_mode,
            min_items: 0,
            max_items: 0,
        }
    }

    /// Create a list of nested blocks.
    pub fn list(block: Block) -> Self {
        Self::new(NestingMode::List, block)
    }

    /// Create a set of nested blocks.
    pub fn set(block: Block) -> Self {
        Self::new(NestingMode::Set, block)
    }

    /// Create a map of nested blocks.
    pub fn map(block: Block) -> Self {
        Self::new(NestingMode::Map, block)
    }

    /// Create a single nested block.
    pub fn single(block: Block) -> Self {
        Self::new(NestingMode::Single, block)
    }

    /// Set the minimum number of blocks required.
    pub fn with_min_items(mut self, min: u32) -> Self {
        self.min_items = min;
        self
    }

    /// Set the maximum number of blocks allowed.
    pub fn with_max_items(mut self, max: u32) -> Self {
        self.max_items = max;
        self
    }

    /// Project into the protocol message.
    pub fn to_proto(&self, type_name: &str) -> proto::schema::NestedBlock {
        proto::schema::NestedBlock {
            type_name: type_name.to_string(),
            block: Some(self.block.to_proto()),
            nesting: self.nesting_mode.to_proto() as i32,
            min_items: i64::from(self.min_items),
            max_items: i64::from(self.max_items),
        }
    }
}

/// A versioned block, the unit of `GetSchema`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Schema {
    /// Version used for state upgrades.
    #[serde(default)]
    pub version: u64,
    /// Root block.
    #[serde(flatten)]
    pub block: Block,
}

impl Schema {
    /// Create a schema at the given version.
    pub fn new(version: u64, block: Block) -> Self {
        Self { version, block }
    }

    /// Project into the protocol message.
    pub fn to_proto(&self) -> proto::Schema {
        proto::Schema {
            version: i64::try_from(self.version).unwrap_or(i64::MAX),
            block: Some(self.block.to_proto()),
        }
    }
}
