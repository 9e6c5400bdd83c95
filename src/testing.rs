//! Testing utilities for provider implementations.
//!
//! [`ResourceTester`] drives a [`Provider`] through validation, planning and
//! the resource lifecycle without any transport in between. The assertion
//! helpers work on [`Diagnostics`] and [`InstanceState`].
//!
//! # Example
//!
//! ```ignore
//! use tfplugin_schema::testing::{assert_error_at, assert_state_attribute, ResourceTester};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_server() {
//!     let mut tester = ResourceTester::new(my_provider());
//!     tester.configure(json!({"region": "eu-west-1"})).unwrap();
//!
//!     let diagnostics = tester.diagnose("example_server", json!({})).unwrap();
//!     assert_error_at(&diagnostics, "name");
//!
//!     let state = tester
//!         .lifecycle_create("example_server", json!({"name": "web"}))
//!         .await
//!         .unwrap();
//!     assert_state_attribute(&state, "name", "web");
//! }
//! ```

use crate::diagnostics::{Diagnostic, Diagnostics, Severity};
use crate::diff::{InstanceDiff, InstanceState};
use crate::error::ProviderError;
use crate::proto;
use crate::resource::Provider;
use crate::value::Value;

/// A test harness around a [`Provider`].
#[derive(Debug)]
pub struct ResourceTester {
    provider: Provider,
}

impl ResourceTester {
    /// Create a new tester for the given provider.
    pub fn new(provider: Provider) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    /// Get a mutable reference to the underlying provider.
    pub fn provider_mut(&mut self) -> &mut Provider {
        &mut self.provider
    }

    /// The exported protocol schema.
    pub fn schema(&self) -> proto::GetProviderSchemaResponse {
        self.provider.get_schema()
    }

    /// Registered resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.resource_types().map(str::to_string).collect()
    }

    /// Registered data source names.
    pub fn data_source_types(&self) -> Vec<String> {
        self.provider.data_source_types().map(str::to_string).collect()
    }

    /// Configure the provider; error diagnostics fail the call.
    pub fn configure(&mut self, config: impl Into<Value>) -> Result<(), TestError> {
        check_diagnostics(self.provider.configure(&config.into()))
    }

    /// All diagnostics, warnings included, for a resource configuration.
    pub fn diagnose(
        &self,
        resource_type: &str,
        config: impl Into<Value>,
    ) -> Result<Diagnostics, ProviderError> {
        self.provider
            .validate_resource_config(resource_type, &config.into())
    }

    /// Validate a resource configuration; error diagnostics fail the call.
    pub fn validate_resource_config(
        &self,
        resource_type: &str,
        config: impl Into<Value>,
    ) -> Result<(), TestError> {
        check_diagnostics(self.diagnose(resource_type, config)?)
    }

    /// Validate a data source configuration; error diagnostics fail the call.
    pub fn validate_data_source_config(
        &self,
        data_source_type: &str,
        config: impl Into<Value>,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_data_source_config(data_source_type, &config.into())?;
        check_diagnostics(diagnostics)
    }

    /// Plan creation of a resource.
    pub fn plan_create(
        &self,
        resource_type: &str,
        config: impl Into<Value>,
    ) -> Result<Value, ProviderError> {
        self.provider.plan_create(resource_type, &config.into())
    }

    /// Create a resource.
    pub async fn create(
        &self,
        resource_type: &str,
        config: impl Into<Value>,
    ) -> Result<InstanceState, ProviderError> {
        self.provider
            .apply_create(resource_type, &config.into())
            .await
    }

    /// Refresh a resource; `None` when it is gone.
    pub async fn read(
        &self,
        resource_type: &str,
        state: InstanceState,
    ) -> Result<Option<InstanceState>, ProviderError> {
        self.provider.read_resource(resource_type, state).await
    }

    /// Update a resource.
    pub async fn update(
        &self,
        resource_type: &str,
        config: impl Into<Value>,
        state: InstanceState,
        diff: InstanceDiff,
    ) -> Result<InstanceState, ProviderError> {
        self.provider
            .apply_update(resource_type, &config.into(), state, diff)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        state: InstanceState,
    ) -> Result<(), ProviderError> {
        self.provider.delete_resource(resource_type, state).await
    }

    /// Read a data source.
    pub async fn read_data_source(
        &self,
        data_source_type: &str,
        config: impl Into<Value>,
    ) -> Result<InstanceState, ProviderError> {
        self.provider
            .read_data_source(data_source_type, &config.into())
            .await
    }

    /// Run validate, plan, create and read in order.
    ///
    /// Returns the state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: impl Into<Value>,
    ) -> Result<InstanceState, TestError> {
        let config = config.into();
        self.validate_resource_config(resource_type, config.clone())?;
        self.plan_create(resource_type, config.clone())?;

        let created = self.create(resource_type, config).await?;
        self.read(resource_type, created)
            .await?
            .ok_or_else(|| {
                TestError::Provider(ProviderError::NotFound(format!(
                    "{} vanished right after create",
                    resource_type
                )))
            })
    }

    /// Run [`ResourceTester::lifecycle_create`], then delete.
    ///
    /// Returns the state that was deleted.
    pub async fn lifecycle_create_delete(
        &self,
        resource_type: &str,
        config: impl Into<Value>,
    ) -> Result<InstanceState, TestError> {
        let state = self.lifecycle_create(resource_type, config).await?;
        self.delete(resource_type, state.clone()).await?;
        Ok(state)
    }
}

/// Error type for test operations that may fail with diagnostics.
#[derive(Debug)]
pub enum TestError {
    /// The operation failed with diagnostics.
    Diagnostics(Diagnostics),
    /// The operation failed with a provider error.
    Provider(ProviderError),
}

impl std::fmt::Display for TestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestError::Diagnostics(diags) => {
                writeln!(f, "Operation failed with {} diagnostic(s):", diags.len())?;
                for diag in diags {
                    writeln!(f, "  {}", diag)?;
                }
                Ok(())
            },
            TestError::Provider(e) => write!(f, "Provider error: {}", e),
        }
    }
}

impl std::error::Error for TestError {}

impl From<ProviderError> for TestError {
    fn from(e: ProviderError) -> Self {
        TestError::Provider(e)
    }
}

fn check_diagnostics(diagnostics: Diagnostics) -> Result<(), TestError> {
    if diagnostics.has_errors() {
        Err(TestError::Diagnostics(diagnostics))
    } else {
        Ok(())
    }
}

fn errors(diagnostics: &Diagnostics) -> impl Iterator<Item = &Diagnostic> {
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
}

fn describe(diagnostics: &Diagnostics) -> Vec<String> {
    errors(diagnostics).map(ToString::to_string).collect()
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &Diagnostics) {
    let errors = describe(diagnostics);
    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &Diagnostics) {
    assert!(
        diagnostics.has_errors(),
        "Expected at least one error, but got none"
    );
}

/// Assert that an error is attached to the dot-joined attribute `path`.
///
/// # Panics
///
/// Panics if no error diagnostic has that path.
pub fn assert_error_at(diagnostics: &Diagnostics, path: &str) {
    let found = errors(diagnostics).any(|d| d.path_string() == path);
    assert!(
        found,
        "Expected an error at '{}', but no matching error found. Errors: {:?}",
        path,
        describe(diagnostics)
    );
}

/// Assert that an error summary or detail contains `substring`.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &Diagnostics, substring: &str) {
    let found = errors(diagnostics).any(|d| {
        d.summary.contains(substring)
            || d.detail.as_deref().is_some_and(|detail| detail.contains(substring))
    });
    assert!(
        found,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        describe(diagnostics)
    );
}

/// Assert that a flat state attribute holds `expected`.
///
/// # Panics
///
/// Panics if the key is absent or holds another value.
pub fn assert_state_attribute(state: &InstanceState, key: &str, expected: impl Into<Value>) {
    let expected = expected.into();
    assert_eq!(
        state.attributes.get(key),
        Some(&expected),
        "Unexpected value for state attribute '{}'",
        key
    );
}
