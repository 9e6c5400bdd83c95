//! Resource lifecycle and the provider registry.
//!
//! A [`Resource`] implements create/read/update/delete against a
//! [`ResourceData`] view, which layers values the resource wrote over the
//! pending diff, the configuration and the prior state. A [`Provider`]
//! collects resources and data sources under their type names and drives
//! schema export, validation, planning and apply.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::ResourceConfig;
use crate::diagnostics::Diagnostics;
use crate::diff::{InstanceDiff, InstanceState};
use crate::error::{ProviderError, Result};
use crate::field::{ObjectSchema, ID_FIELD};
use crate::flatmap::{FlatKey, FlatMap};
use crate::proto;
use crate::reader::{
    ConfigFieldReader, DiffFieldReader, FieldReadResult, FieldReader, FlatMapFieldReader,
};
use crate::unknowns::set_unknowns;
use crate::validation;
use crate::value::Value;
use crate::writer::FieldWriter;

/// The values a resource sees during one lifecycle call.
///
/// Reads resolve in order: values written with [`ResourceData::set`], the
/// diff applied over configuration, the configuration alone, then the prior
/// state.
#[derive(Debug)]
pub struct ResourceData<'a> {
    schema: &'a ObjectSchema,
    config: ResourceConfig,
    state: Option<InstanceState>,
    diff: Option<InstanceDiff>,
    written: FlatMap,
    id: Option<String>,
}

impl<'a> ResourceData<'a> {
    /// A view over `config` alone.
    pub fn new(schema: &'a ObjectSchema, config: impl Into<ResourceConfig>) -> Self {
        Self {
            schema,
            config: config.into(),
            state: None,
            diff: None,
            written: FlatMap::new(),
            id: None,
        }
    }

    /// A view over stored state with empty configuration.
    pub fn from_state(schema: &'a ObjectSchema, state: InstanceState) -> Self {
        Self::new(schema, Value::empty_map()).with_state(state)
    }

    /// Attach prior state; its id becomes the current id.
    pub fn with_state(mut self, state: InstanceState) -> Self {
        self.id = state.id.clone();
        self.state = Some(state);
        self
    }

    /// Attach a pending diff.
    pub fn with_diff(mut self, diff: InstanceDiff) -> Self {
        self.diff = Some(diff);
        self
    }

    /// The schema the data is read against.
    pub fn schema(&self) -> &ObjectSchema {
        self.schema
    }

    /// The raw configuration.
    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    /// The prior state, if any.
    pub fn state(&self) -> Option<&InstanceState> {
        self.state.as_ref()
    }

    /// Read `key`, reporting whether it exists and is computed.
    pub fn get_result(&self, key: &str) -> Result<FieldReadResult> {
        let path = FlatKey::parse(key).into_segments();

        let written = FlatMapFieldReader::new(self.schema, &self.written).get(&path)?;
        if written.exists {
            return Ok(written);
        }

        let config = ConfigFieldReader::new(self.schema, &self.config);
        if let Some(diff) = &self.diff {
            let planned = DiffFieldReader::new(self.schema, diff, &config).get(&path)?;
            if planned.exists {
                return Ok(planned);
            }
        }
        let configured = config.get(&path)?;
        if configured.exists {
            return Ok(configured);
        }

        match &self.state {
            Some(state) => FlatMapFieldReader::new(self.schema, &state.attributes).get(&path),
            None => Ok(FieldReadResult::missing()),
        }
    }

    /// Read the value at `key`; missing keys read as null.
    pub fn get(&self, key: &str) -> Result<Value> {
        Ok(self.get_result(key)?.value)
    }

    /// Whether `key` is only known after apply.
    pub fn is_computed(&self, key: &str) -> Result<bool> {
        Ok(self.get_result(key)?.computed)
    }

    /// Write `value` at `key`. Only whole lists, sets and maps can be set.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let path = FlatKey::parse(key).into_segments();
        let mut writer = FieldWriter::with_data(self.schema, std::mem::take(&mut self.written));
        let written = writer.write(&path, &value.into());
        self.written = writer.into_data();
        written
    }

    /// Set the resource id. An empty id marks the resource as gone.
    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.id = if id.is_empty() { None } else { Some(id) };
    }

    /// The resource id, once set.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Collapse every known value into a new state record.
    ///
    /// Computed values that are still unknown are left out.
    pub fn into_state(self) -> Result<InstanceState> {
        let mut writer = FieldWriter::new(self.schema);
        for (name, _) in self.schema.fields() {
            if name == ID_FIELD {
                continue;
            }
            let result = self.get_result(name)?;
            if !result.exists || result.computed || result.value.contains_unknown() {
                continue;
            }
            writer.write(&[name], &result.value)?;
        }
        if let (Some(id), Some(_)) = (&self.id, self.schema.field(ID_FIELD)) {
            writer.write(&[ID_FIELD], &Value::from(id.as_str()))?;
        }

        Ok(InstanceState {
            id: self.id,
            attributes: writer.into_data(),
            tainted: self.state.map(|state| state.tainted).unwrap_or(false),
        })
    }
}

/// A managed resource type or data source.
///
/// Data sources only need [`Resource::read`].
#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// The schema of the resource.
    fn schema(&self) -> &ObjectSchema;

    /// Create the resource and set its id.
    async fn create(&self, data: &mut ResourceData<'_>) -> Result<(), ProviderError> {
        let _ = data;
        Err(ProviderError::Sdk("create is not supported".to_string()))
    }

    /// Refresh `data` from the real resource. Clearing the id marks it gone.
    async fn read(&self, data: &mut ResourceData<'_>) -> Result<(), ProviderError>;

    /// Apply the pending diff in place.
    async fn update(&self, data: &mut ResourceData<'_>) -> Result<(), ProviderError> {
        let _ = data;
        Err(ProviderError::Sdk("update is not supported".to_string()))
    }

    /// Destroy the resource.
    async fn delete(&self, data: &mut ResourceData<'_>) -> Result<(), ProviderError> {
        let _ = data;
        Ok(())
    }

    /// Whether the resource still exists.
    async fn exists(&self, data: &ResourceData<'_>) -> Result<bool, ProviderError> {
        Ok(data.id().is_some())
    }
}

/// A provider: its own configuration schema plus named resources and data
/// sources.
#[derive(Clone)]
pub struct Provider {
    name: String,
    schema: ObjectSchema,
    resources: BTreeMap<String, Arc<dyn Resource>>,
    data_sources: BTreeMap<String, Arc<dyn Resource>>,
    config: Option<Value>,
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("resources", &self.resources.keys().collect::<Vec<_>>())
            .field("data_sources", &self.data_sources.keys().collect::<Vec<_>>())
            .field("configured", &self.config.is_some())
            .finish()
    }
}

impl Provider {
    /// A provider with the given configuration schema.
    pub fn new(name: impl Into<String>, schema: ObjectSchema) -> Self {
        Self {
            name: name.into(),
            schema,
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
            config: None,
        }
    }

    /// Register a resource type.
    pub fn with_resource(mut self, name: impl Into<String>, resource: impl Resource) -> Self {
        self.add_resource(name, resource);
        self
    }

    /// Register a data source.
    pub fn with_data_source(mut self, name: impl Into<String>, data_source: impl Resource) -> Self {
        self.add_data_source(name, data_source);
        self
    }

    /// Register a resource type, replacing any with the same name.
    pub fn add_resource(&mut self, name: impl Into<String>, resource: impl Resource) {
        self.resources.insert(name.into(), Arc::new(resource));
    }

    /// Register a data source, replacing any with the same name.
    pub fn add_data_source(&mut self, name: impl Into<String>, data_source: impl Resource) {
        self.data_sources.insert(name.into(), Arc::new(data_source));
    }

    /// The provider name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The provider configuration schema.
    pub fn schema(&self) -> &ObjectSchema {
        &self.schema
    }

    /// Registered resource type names, sorted.
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.resources.keys().map(String::as_str)
    }

    /// Registered data source names, sorted.
    pub fn data_source_types(&self) -> impl Iterator<Item = &str> {
        self.data_sources.keys().map(String::as_str)
    }

    /// The configuration accepted by the last successful [`Provider::configure`].
    pub fn configuration(&self) -> Option<&Value> {
        self.config.as_ref()
    }

    /// The accepted configuration, or [`ProviderError::Configuration`] when
    /// [`Provider::configure`] has not succeeded yet.
    pub fn require_configuration(&self) -> Result<&Value, ProviderError> {
        self.config.as_ref().ok_or_else(|| {
            ProviderError::Configuration(format!("provider {} is not configured", self.name))
        })
    }

    /// Look up a resource type.
    pub fn resource(&self, type_name: &str) -> Result<&Arc<dyn Resource>, ProviderError> {
        self.resources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    /// Look up a data source.
    pub fn data_source(&self, type_name: &str) -> Result<&Arc<dyn Resource>, ProviderError> {
        self.data_sources
            .get(type_name)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    /// Export every schema in protocol form.
    pub fn get_schema(&self) -> proto::GetProviderSchemaResponse {
        let project = |items: &BTreeMap<String, Arc<dyn Resource>>| -> HashMap<_, _> {
            items
                .iter()
                .map(|(name, item)| (name.clone(), item.schema().to_schema().to_proto()))
                .collect()
        };

        proto::GetProviderSchemaResponse {
            provider: Some(self.schema.to_schema().to_proto()),
            resource_schemas: project(&self.resources),
            data_source_schemas: project(&self.data_sources),
            diagnostics: Vec::new(),
        }
    }

    /// Validate provider configuration and keep it, defaults applied, when
    /// it carries no errors.
    pub fn configure(&mut self, config: &Value) -> Diagnostics {
        let diagnostics = validation::diagnose(&self.schema, config);
        if diagnostics.has_errors() {
            debug!(
                provider = %self.name,
                errors = diagnostics.len(),
                "provider configuration rejected"
            );
            return diagnostics;
        }

        self.config = Some(self.schema.apply_defaults(config));
        info!(provider = %self.name, "provider configured");
        diagnostics
    }

    /// Validate the configuration of a resource.
    pub fn validate_resource_config(
        &self,
        type_name: &str,
        config: &Value,
    ) -> Result<Diagnostics, ProviderError> {
        let resource = self.resource(type_name)?;
        Ok(validation::diagnose(resource.schema(), config))
    }

    /// Validate the configuration of a data source.
    pub fn validate_data_source_config(
        &self,
        type_name: &str,
        config: &Value,
    ) -> Result<Diagnostics, ProviderError> {
        let data_source = self.data_source(type_name)?;
        Ok(validation::diagnose(data_source.schema(), config))
    }

    /// Plan creation: fill defaults, then mark computed values unknown.
    pub fn plan_create(&self, type_name: &str, config: &Value) -> Result<Value, ProviderError> {
        let schema = self.resource(type_name)?.schema();
        let filled = schema.apply_defaults(config);
        let planned = set_unknowns(Some(&filled), &schema.to_block()).unwrap_or(Value::Null);
        debug!(resource = %type_name, "planned create");
        Ok(planned)
    }

    /// Run a resource's create and return the resulting state.
    pub async fn apply_create(
        &self,
        type_name: &str,
        config: &Value,
    ) -> Result<InstanceState, ProviderError> {
        let resource = self.resource(type_name)?;
        let schema = resource.schema();
        reject_errors(validation::diagnose(schema, config))?;

        let mut data = ResourceData::new(schema, schema.apply_defaults(config));
        resource.create(&mut data).await?;
        if data.id().is_none() {
            return Err(ProviderError::Sdk(format!(
                "{} create finished without setting an id",
                type_name
            )));
        }

        let state = data.into_state()?;
        info!(resource = %type_name, id = ?state.id, "created resource");
        Ok(state)
    }

    /// Run a resource's update against its prior state and diff.
    pub async fn apply_update(
        &self,
        type_name: &str,
        config: &Value,
        state: InstanceState,
        diff: InstanceDiff,
    ) -> Result<InstanceState, ProviderError> {
        let resource = self.resource(type_name)?;
        let schema = resource.schema();
        reject_errors(validation::diagnose(schema, config))?;

        let mut data = ResourceData::new(schema, schema.apply_defaults(config))
            .with_state(state)
            .with_diff(diff);
        resource.update(&mut data).await?;

        let state = data.into_state()?;
        info!(resource = %type_name, id = ?state.id, "updated resource");
        Ok(state)
    }

    /// Refresh stored state. `None` means the resource no longer exists.
    pub async fn read_resource(
        &self,
        type_name: &str,
        state: InstanceState,
    ) -> Result<Option<InstanceState>, ProviderError> {
        let resource = self.resource(type_name)?;
        let mut data = ResourceData::from_state(resource.schema(), state);
        if !resource.exists(&data).await? {
            debug!(resource = %type_name, "resource no longer exists");
            return Ok(None);
        }

        resource.read(&mut data).await?;
        if data.id().is_none() {
            debug!(resource = %type_name, "resource removed during read");
            return Ok(None);
        }
        Ok(Some(data.into_state()?))
    }

    /// Destroy a resource.
    pub async fn delete_resource(
        &self,
        type_name: &str,
        state: InstanceState,
    ) -> Result<(), ProviderError> {
        let resource = self.resource(type_name)?;
        let mut data = ResourceData::from_state(resource.schema(), state);
        resource.delete(&mut data).await?;
        info!(resource = %type_name, id = ?data.id(), "deleted resource");
        Ok(())
    }

    /// Read a data source for the given configuration.
    pub async fn read_data_source(
        &self,
        type_name: &str,
        config: &Value,
    ) -> Result<InstanceState, ProviderError> {
        let data_source = self.data_source(type_name)?;
        let schema = data_source.schema();
        reject_errors(validation::diagnose(schema, config))?;

        let mut data = ResourceData::new(schema, schema.apply_defaults(config));
        data_source.read(&mut data).await?;
        Ok(data.into_state()?)
    }
}

fn reject_errors(diagnostics: Diagnostics) -> Result<(), ProviderError> {
    if !diagnostics.has_errors() {
        return Ok(());
    }
    let message = diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    Err(ProviderError::Validation(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::AttributeDiff;
    use crate::field::Field;
    use crate::value::map;

    struct Server;

    fn server_schema() -> &'static ObjectSchema {
        static SCHEMA: std::sync::OnceLock<ObjectSchema> = std::sync::OnceLock::new();
        SCHEMA.get_or_init(|| {
            ObjectSchema::resource()
                .with_field("name", Field::string().required())
                .with_field("size", Field::int().optional().with_default(1))
                .with_field("tags", Field::map(Field::string()).optional())
                .with_field("ports", Field::list(Field::int()).optional())
                .with_field("address", Field::string().computed())
        })
    }

    #[async_trait]
    impl Resource for Server {
        fn schema(&self) -> &ObjectSchema {
            server_schema()
        }

        async fn create(&self, data: &mut ResourceData<'_>) -> Result<(), ProviderError> {
            let name = data.get("name")?;
            data.set_id(format!("srv-{}", name.as_str().unwrap_or_default()));
            data.set("address", "10.0.0.1")?;
            Ok(())
        }

        async fn read(&self, data: &mut ResourceData<'_>) -> Result<(), ProviderError> {
            if data.get("name")? == Value::from("gone") {
                data.set_id("");
            }
            Ok(())
        }

        async fn update(&self, data: &mut ResourceData<'_>) -> Result<(), ProviderError> {
            let size = data.get("size")?;
            data.set("size", size)?;
            Ok(())
        }
    }

    struct Lookup;

    #[async_trait]
    impl Resource for Lookup {
        fn schema(&self) -> &ObjectSchema {
            static SCHEMA: std::sync::OnceLock<ObjectSchema> = std::sync::OnceLock::new();
            SCHEMA.get_or_init(|| {
                ObjectSchema::resource()
                    .with_field("query", Field::string().required())
                    .with_field("result", Field::string().computed())
            })
        }

        async fn read(&self, data: &mut ResourceData<'_>) -> Result<(), ProviderError> {
            let query = data.get("query")?;
            data.set_id("lookup");
            data.set(
                "result",
                format!("answer to {}", query.as_str().unwrap_or_default()),
            )?;
            Ok(())
        }
    }

    fn provider() -> Provider {
        let schema = ObjectSchema::new()
            .with_field("region", Field::string().required())
            .with_field("retries", Field::int().optional().with_default(3));
        Provider::new("example", schema)
            .with_resource("example_server", Server)
            .with_data_source("example_lookup", Lookup)
    }

    fn stored_state() -> InstanceState {
        let mut writer = FieldWriter::new(server_schema());
        writer
            .write(&["name"], &Value::from("web"))
            .unwrap();
        writer.write(&["size"], &Value::Int(2)).unwrap();
        writer
            .write(&["tags"], &map([("env", "prod")]))
            .unwrap();
        InstanceState::new("srv-web").with_attributes(writer.into_data())
    }

    #[test]
    fn test_get_reads_config() {
        let config = map([
            ("name", Value::from("web")),
            ("ports", Value::from(vec![80, 443])),
        ]);
        let data = ResourceData::new(server_schema(), config);

        assert_eq!(data.get("name").unwrap(), Value::from("web"));
        assert_eq!(data.get("ports").unwrap(), Value::from(vec![80, 443]));
        assert_eq!(data.get("ports.1").unwrap(), Value::Int(443));
        assert_eq!(data.get("address").unwrap(), Value::Null);
        assert!(!data.get_result("address").unwrap().exists);
    }

    #[test]
    fn test_get_precedence() {
        let config = map([("name", "from-config")]);
        let mut data = ResourceData::new(server_schema(), config).with_state(stored_state());

        assert_eq!(data.get("name").unwrap(), Value::from("from-config"));
        assert_eq!(data.get("size").unwrap(), Value::Int(2));
        assert_eq!(data.get("tags").unwrap(), map([("env", "prod")]));

        data.set("name", "written").unwrap();
        assert_eq!(data.get("name").unwrap(), Value::from("written"));
    }

    #[test]
    fn test_get_diff_over_config() {
        let config = map([("name", "old")]);
        let diff = InstanceDiff::new()
            .with_attribute("name", AttributeDiff::new("old", "new"))
            .with_attribute("address", AttributeDiff::new(Value::Null, Value::Null).computed());
        let data = ResourceData::new(server_schema(), config).with_diff(diff);

        assert_eq!(data.get("name").unwrap(), Value::from("new"));
        assert!(data.is_computed("address").unwrap());
    }

    #[test]
    fn test_unknown_config_is_computed() {
        let config = map([("name", Value::Unknown)]);
        let data = ResourceData::new(server_schema(), config);

        let result = data.get_result("name").unwrap();
        assert!(result.exists);
        assert!(result.computed);
    }

    #[test]
    fn test_set_rejects_partial_write() {
        let mut data = ResourceData::new(server_schema(), Value::empty_map());

        assert!(data.set("ports.0", 80).is_err());
        assert!(data.set("missing", "x").is_err());
        data.set("ports", vec![8080]).unwrap();
        assert_eq!(data.get("ports").unwrap(), Value::from(vec![8080]));
    }

    #[test]
    fn test_set_id() {
        let mut data = ResourceData::new(server_schema(), Value::empty_map());
        assert_eq!(data.id(), None);

        data.set_id("abc");
        assert_eq!(data.id(), Some("abc"));

        data.set_id("");
        assert_eq!(data.id(), None);

        let data = ResourceData::from_state(server_schema(), stored_state());
        assert_eq!(data.id(), Some("srv-web"));
    }

    #[test]
    fn test_into_state() {
        let config = map([
            ("name", Value::from("web")),
            ("tags", map([("env", "dev"), ("team", "core")])),
        ]);
        let mut data = ResourceData::new(server_schema(), config);
        data.set_id("srv-1");
        data.set("address", "10.0.0.2").unwrap();

        let state = data.into_state().unwrap();
        assert_eq!(state.id.as_deref(), Some("srv-1"));
        assert_eq!(state.attributes.get("id"), Some(&Value::from("srv-1")));
        assert_eq!(state.attributes.get("name"), Some(&Value::from("web")));
        assert_eq!(state.attributes.get("address"), Some(&Value::from("10.0.0.2")));
        assert_eq!(state.attributes.get("tags.%"), Some(&Value::Int(2)));
        assert_eq!(state.attributes.get("tags.team"), Some(&Value::from("core")));
        assert!(!state.attributes.contains_key("size"));
    }

    #[test]
    fn test_into_state_skips_unknown() {
        let config = map([("name", Value::from("web")), ("ports", Value::Unknown)]);
        let data = ResourceData::new(server_schema(), config);

        let state = data.into_state().unwrap();
        assert_eq!(state.id, None);
        assert!(!state.attributes.contains_key("ports.#"));
        assert_eq!(state.attributes.get("name"), Some(&Value::from("web")));
    }

    #[test]
    fn test_get_schema() {
        let response = provider().get_schema();

        let provider_block = response.provider.unwrap().block.unwrap();
        assert_eq!(provider_block.attributes.len(), 2);
        assert!(response.resource_schemas.contains_key("example_server"));
        assert!(response.data_source_schemas.contains_key("example_lookup"));
        assert!(response.diagnostics.is_empty());

        let server = response.resource_schemas["example_server"]
            .block
            .as_ref()
            .unwrap();
        let address = server
            .attributes
            .iter()
            .find(|attr| attr.name == "address")
            .unwrap();
        assert!(address.computed);
        assert!(!address.optional);
    }

    #[test]
    fn test_registry_lookup() {
        let provider = provider();

        assert_eq!(provider.name(), "example");
        assert_eq!(provider.resource_types().collect::<Vec<_>>(), ["example_server"]);
        assert_eq!(provider.data_source_types().collect::<Vec<_>>(), ["example_lookup"]);
        assert!(matches!(
            provider.resource("example_lookup"),
            Err(ProviderError::UnknownResource(name)) if name == "example_lookup"
        ));
    }

    #[test]
    fn test_validate_resource_config() {
        let provider = provider();

        let diagnostics = provider
            .validate_resource_config("example_server", &map([("size", "big")]))
            .unwrap();
        assert!(diagnostics.has_errors());
        let paths: Vec<String> = diagnostics.iter().map(|d| d.path_string()).collect();
        assert!(paths.contains(&"name".to_string()));
        assert!(paths.contains(&"size".to_string()));

        let diagnostics = provider
            .validate_resource_config("example_server", &map([("name", "web")]))
            .unwrap();
        assert!(diagnostics.is_empty());

        assert!(provider
            .validate_resource_config("example_missing", &Value::empty_map())
            .is_err());
    }

    #[test]
    fn test_validate_data_source_config() {
        let provider = provider();

        let diagnostics = provider
            .validate_data_source_config("example_lookup", &Value::empty_map())
            .unwrap();
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_configure() {
        let mut provider = provider();

        let diagnostics = provider.configure(&Value::empty_map());
        assert!(diagnostics.has_errors());
        assert!(provider.configuration().is_none());

        let diagnostics = provider.configure(&map([("region", "eu-west-1")]));
        assert!(!diagnostics.has_errors());
        assert_eq!(
            provider.configuration(),
            Some(&map([
                ("region", Value::from("eu-west-1")),
                ("retries", Value::Int(3)),
            ]))
        );
    }

    #[test]
    fn test_require_configuration() {
        let mut provider = provider();

        let err = provider.require_configuration().unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert_eq!(err.message(), "provider example is not configured");
        let status: tonic::Status = err.into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        provider.configure(&map([("region", "eu-west-1")]));
        let config = provider.require_configuration().unwrap();
        assert_eq!(config.get("region"), Some(&Value::from("eu-west-1")));
    }

    #[test]
    fn test_plan_create() {
        let planned = provider()
            .plan_create("example_server", &map([("name", "web")]))
            .unwrap();

        assert_eq!(planned.get("name"), Some(&Value::from("web")));
        assert_eq!(planned.get("size"), Some(&Value::Int(1)));
        assert_eq!(planned.get("id"), Some(&Value::Unknown));
        assert_eq!(planned.get("address"), Some(&Value::Unknown));
        assert_eq!(planned.get("tags"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_apply_create() {
        let state = provider()
            .apply_create("example_server", &map([("name", "web")]))
            .await
            .unwrap();

        assert_eq!(state.id.as_deref(), Some("srv-web"));
        assert_eq!(state.attributes.get("address"), Some(&Value::from("10.0.0.1")));
        assert_eq!(state.attributes.get("size"), Some(&Value::Int(1)));
    }

    #[tokio::test]
    async fn test_apply_create_rejects_invalid_config() {
        let err = provider()
            .apply_create("example_server", &Value::empty_map())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Validation(ref msg) if msg.contains("name")));
    }

    #[tokio::test]
    async fn test_apply_create_unknown_type() {
        let err = provider()
            .apply_create("example_missing", &Value::empty_map())
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn test_apply_update() {
        let diff = InstanceDiff::new().with_attribute("size", AttributeDiff::new(2, 4));
        let state = provider()
            .apply_update(
                "example_server",
                &map([("name", Value::from("web")), ("size", Value::Int(4))]),
                stored_state(),
                diff,
            )
            .await
            .unwrap();

        assert_eq!(state.id.as_deref(), Some("srv-web"));
        assert_eq!(state.attributes.get("size"), Some(&Value::Int(4)));
        assert_eq!(state.attributes.get("tags.env"), Some(&Value::from("prod")));
    }

    #[tokio::test]
    async fn test_read_resource() {
        let provider = provider();

        let refreshed = provider
            .read_resource("example_server", stored_state())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refreshed.attributes.get("name"), Some(&Value::from("web")));

        let mut writer = FieldWriter::new(server_schema());
        writer.write(&["name"], &Value::from("gone")).unwrap();
        let gone = InstanceState::new("srv-gone").with_attributes(writer.into_data());
        assert!(provider
            .read_resource("example_server", gone)
            .await
            .unwrap()
            .is_none());

        let no_id = InstanceState::default();
        assert!(provider
            .read_resource("example_server", no_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_read_data_source() {
        let state = provider()
            .read_data_source("example_lookup", &map([("query", "life")]))
            .await
            .unwrap();

        assert_eq!(state.id.as_deref(), Some("lookup"));
        assert_eq!(
            state.attributes.get("result"),
            Some(&Value::from("answer to life"))
        );
    }

    #[test]
    fn test_default_lifecycle_methods() {
        let provider = provider();
        tokio_test::block_on(provider.delete_resource("example_server", stored_state())).unwrap();

        let lookup = provider.data_source("example_lookup").unwrap();
        let mut data = ResourceData::new(lookup.schema(), map([("query", "x")]));
        let err = tokio_test::block_on(lookup.create(&mut data)).unwrap_err();
        assert!(matches!(err, ProviderError::Sdk(_)));
        let err = tokio_test::block_on(lookup.update(&mut data)).unwrap_err();
        assert!(matches!(err, ProviderError::Sdk(_)));
    }
}
