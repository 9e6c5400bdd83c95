//! Plugin protocol messages used by the schema and diagnostics projections.
//!
//! These mirror the subset of `tfplugin5` that this crate produces. Field
//! tags match the upstream `.proto` file so the messages can be framed and
//! sent by any gRPC service loop.

use std::collections::HashMap;

/// A value encoded either as msgpack or JSON.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DynamicValue {
    /// msgpack encoding.
    #[prost(bytes = "vec", tag = "1")]
    pub msgpack: Vec<u8>,
    /// JSON encoding.
    #[prost(bytes = "vec", tag = "2")]
    pub json: Vec<u8>,
}

/// A user-facing diagnostic.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Diagnostic {
    /// Severity.
    #[prost(enumeration = "diagnostic::Severity", tag = "1")]
    pub severity: i32,
    /// Short summary.
    #[prost(string, tag = "2")]
    pub summary: String,
    /// Longer explanation.
    #[prost(string, tag = "3")]
    pub detail: String,
    /// Attribute the diagnostic refers to.
    #[prost(message, optional, tag = "4")]
    pub attribute: Option<AttributePath>,
}

/// Nested types of [`Diagnostic`].
pub mod diagnostic {
    /// Diagnostic severity.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Severity {
        /// Unset.
        Invalid = 0,
        /// Error.
        Error = 1,
        /// Warning.
        Warning = 2,
    }
}

/// A path into a value.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AttributePath {
    /// Steps from the root.
    #[prost(message, repeated, tag = "1")]
    pub steps: Vec<attribute_path::Step>,
}

/// Nested types of [`AttributePath`].
pub mod attribute_path {
    /// One step of an attribute path.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Step {
        /// Which kind of step this is.
        #[prost(oneof = "step::Selector", tags = "1, 2, 3")]
        pub selector: Option<step::Selector>,
    }

    /// Nested types of [`Step`].
    pub mod step {
        /// The step selector.
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Selector {
            /// Select an attribute by name.
            #[prost(string, tag = "1")]
            AttributeName(String),
            /// Select a map or set element by string key.
            #[prost(string, tag = "2")]
            ElementKeyString(String),
            /// Select a list element by index.
            #[prost(int64, tag = "3")]
            ElementKeyInt(i64),
        }
    }
}

/// A versioned schema.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Schema {
    /// Schema version, used for state upgrades.
    #[prost(int64, tag = "1")]
    pub version: i64,
    /// Root block.
    #[prost(message, optional, tag = "2")]
    pub block: Option<schema::Block>,
}

/// Nested types of [`Schema`].
pub mod schema {
    /// A block of attributes and nested blocks.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Block {
        /// Block version.
        #[prost(int64, tag = "1")]
        pub version: i64,
        /// Attributes, sorted by name.
        #[prost(message, repeated, tag = "2")]
        pub attributes: Vec<Attribute>,
        /// Nested blocks, sorted by type name.
        #[prost(message, repeated, tag = "3")]
        pub block_types: Vec<NestedBlock>,
        /// Description.
        #[prost(string, tag = "4")]
        pub description: String,
        /// Description format.
        #[prost(enumeration = "super::StringKind", tag = "5")]
        pub description_kind: i32,
        /// Whether the block is deprecated.
        #[prost(bool, tag = "6")]
        pub deprecated: bool,
    }

    /// A leaf attribute.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Attribute {
        /// Attribute name.
        #[prost(string, tag = "1")]
        pub name: String,
        /// JSON-encoded type descriptor.
        #[prost(bytes = "vec", tag = "2")]
        pub r#type: Vec<u8>,
        /// Description.
        #[prost(string, tag = "3")]
        pub description: String,
        /// Must be set in configuration.
        #[prost(bool, tag = "4")]
        pub required: bool,
        /// May be set in configuration.
        #[prost(bool, tag = "5")]
        pub optional: bool,
        /// Set by the provider.
        #[prost(bool, tag = "6")]
        pub computed: bool,
        /// Hidden from output.
        #[prost(bool, tag = "7")]
        pub sensitive: bool,
        /// Description format.
        #[prost(enumeration = "super::StringKind", tag = "8")]
        pub description_kind: i32,
        /// Whether the attribute is deprecated.
        #[prost(bool, tag = "9")]
        pub deprecated: bool,
    }

    /// A named nested block.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct NestedBlock {
        /// Block type name.
        #[prost(string, tag = "1")]
        pub type_name: String,
        /// Nested block definition.
        #[prost(message, optional, tag = "2")]
        pub block: Option<Block>,
        /// Nesting mode.
        #[prost(enumeration = "nested_block::NestingMode", tag = "3")]
        pub nesting: i32,
        /// Minimum number of blocks.
        #[prost(int64, tag = "4")]
        pub min_items: i64,
        /// Maximum number of blocks, zero for unlimited.
        #[prost(int64, tag = "5")]
        pub max_items: i64,
    }

    /// Nested types of [`NestedBlock`].
    pub mod nested_block {
        /// How a nested block repeats.
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
        )]
        #[repr(i32)]
        pub enum NestingMode {
            /// Unset.
            Invalid = 0,
            /// At most one block.
            Single = 1,
            /// Ordered blocks.
            List = 2,
            /// Unordered unique blocks.
            Set = 3,
            /// Blocks keyed by label.
            Map = 4,
            /// Exactly one block, never null.
            Group = 5,
        }
    }
}

/// Format of description strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum StringKind {
    /// Plain text.
    Plain = 0,
    /// Markdown.
    Markdown = 1,
}

/// Response of `GetProviderSchema`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GetProviderSchemaResponse {
    /// Provider configuration schema.
    #[prost(message, optional, tag = "1")]
    pub provider: Option<Schema>,
    /// Resource schemas by type name.
    #[prost(map = "string, message", tag = "2")]
    pub resource_schemas: HashMap<String, Schema>,
    /// Data source schemas by type name.
    #[prost(map = "string, message", tag = "3")]
    pub data_source_schemas: HashMap<String, Schema>,
    /// Diagnostics raised while building the schema.
    #[prost(message, repeated, tag = "4")]
    pub diagnostics: Vec<Diagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_attribute_roundtrip_bytes() {
        let attr = schema::Attribute {
            name: "name".to_string(),
            r#type: b"\"string\"".to_vec(),
            required: true,
            ..Default::default()
        };

        let bytes = attr.encode_to_vec();
        let decoded = schema::Attribute::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, attr);
    }

    #[test]
    fn test_nesting_mode_values() {
        use schema::nested_block::NestingMode;

        assert_eq!(NestingMode::Invalid as i32, 0);
        assert_eq!(NestingMode::Group as i32, 5);
        assert_eq!(NestingMode::try_from(3).ok(), Some(NestingMode::Set));
    }

    #[test]
    fn test_step_oneof() {
        let path = AttributePath {
            steps: vec![
                attribute_path::Step {
                    selector: Some(attribute_path::step::Selector::AttributeName(
                        "tags".to_string(),
                    )),
                },
                attribute_path::Step {
                    selector: Some(attribute_path::step::Selector::ElementKeyInt(2)),
                },
            ],
        };

        let decoded = AttributePath::decode(path.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.steps.len(), 2);
        assert_eq!(decoded, path);
    }
}
