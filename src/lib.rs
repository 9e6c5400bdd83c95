//! Schema engine for infrastructure-as-code providers
//!
//! This crate implements the data layer of a provider speaking the
//! tfplugin protocol: typed schemas, the flatmap encoding of nested values,
//! layered readers over configuration, diffs and state, unknown-value
//! propagation during planning, and the translation of validation errors
//! into protocol diagnostics.
//!
//! # Overview
//!
//! - **Schema model** ([`field`]): fields and object schemas, projected into
//!   protocol blocks ([`schema`], [`proto`])
//! - **Flatmap** ([`flatmap`], [`writer`], [`reader`]): `a.0.b` style keys
//!   with `#` list counts and `%` map counts
//! - **Config, diff and state** ([`config`], [`diff`])
//! - **Planning** ([`unknowns`]): computed attributes become unknown
//! - **Validation and diagnostics** ([`validation`], [`diagnostics`])
//! - **Resources and providers** ([`resource`]): the lifecycle trait and a
//!   registry that exports schemas, validates, plans and applies
//! - **Logging** ([`logging`]) and **test helpers** ([`testing`])
//!
//! # Quick Start
//!
//! ```
//! use tfplugin_schema::field::{Field, ObjectSchema};
//! use tfplugin_schema::reader::{FieldReader, FlatMapFieldReader};
//! use tfplugin_schema::value::Value;
//! use tfplugin_schema::writer::FieldWriter;
//!
//! let schema = ObjectSchema::new().with_field("tags", Field::list(Field::string()));
//!
//! let mut writer = FieldWriter::new(&schema);
//! writer.write(&["tags"], &Value::from(vec!["a", "b"])).unwrap();
//! let data = writer.into_data();
//! assert_eq!(data.get("tags.#"), Some(&Value::Int(2)));
//! assert_eq!(data.get("tags.1"), Some(&Value::from("b")));
//!
//! let reader = FlatMapFieldReader::new(&schema, &data);
//! let result = reader.get_key("tags").unwrap();
//! assert_eq!(result.value, Value::from(vec!["a", "b"]));
//! ```
//!
//! # Writing a resource
//!
//! ```ignore
//! use tfplugin_schema::{async_trait, Field, ObjectSchema, Provider, ProviderError};
//! use tfplugin_schema::{Resource, ResourceData};
//!
//! struct Server {
//!     schema: ObjectSchema,
//! }
//!
//! #[async_trait]
//! impl Resource for Server {
//!     fn schema(&self) -> &ObjectSchema {
//!         &self.schema
//!     }
//!
//!     async fn create(&self, data: &mut ResourceData<'_>) -> Result<(), ProviderError> {
//!         data.set_id("srv-1");
//!         data.set("address", "10.0.0.1")?;
//!         Ok(())
//!     }
//!
//!     async fn read(&self, _data: &mut ResourceData<'_>) -> Result<(), ProviderError> {
//!         Ok(())
//!     }
//! }
//!
//! let schema = ObjectSchema::resource()
//!     .with_field("name", Field::string().required())
//!     .with_field("address", Field::string().computed());
//! let provider = Provider::new("example", ObjectSchema::new())
//!     .with_resource("example_server", Server { schema });
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod diagnostics;
pub mod diff;
pub mod error;
pub mod field;
pub mod flatmap;
pub mod logging;
pub mod proto;
pub mod reader;
pub mod resource;
pub mod schema;
pub mod testing;
pub mod unknowns;
pub mod validation;
pub mod value;
pub mod writer;

// Re-export main types at crate root
pub use config::ResourceConfig;
pub use diagnostics::{Diagnostic, Diagnostics, SchemaErrors, Severity};
pub use diff::{AttributeDiff, InstanceDiff, InstanceState};
pub use error::{ProviderError, SchemaError};
pub use field::{Field, FieldKind, ObjectSchema};
pub use flatmap::{FlatKey, FlatMap};
pub use logging::{init_logging, init_logging_with, try_init_logging_with, LogOptions};
pub use reader::{
    ConfigFieldReader, DiffFieldReader, FieldReadResult, FieldReader, FlatMapFieldReader,
    MapFieldReader,
};
pub use resource::{Provider, Resource, ResourceData};
pub use schema::{Attribute, AttributeFlags, AttributeType, Block, NestedBlock, NestingMode};
pub use unknowns::set_unknowns;
pub use validation::{diagnose, is_valid, validate, validate_result};
pub use value::Value;
pub use writer::FieldWriter;

// Re-export async_trait for convenience
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tonic;
pub use tracing;
