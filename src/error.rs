//! Error types for the schema engine and provider lifecycle.

use thiserror::Error;

/// Result alias for engine operations.
pub type Result<T, E = SchemaError> = std::result::Result<T, E>;

/// Errors raised by the flatmap writer and readers.
///
/// A path that simply does not resolve while *reading* is not an error;
/// readers report it as a non-existent value instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The path does not name a field of the schema.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// A member inside a list, set or map was targeted directly.
    #[error("Can only set full list/set/map: {0}")]
    PartialWrite(String),

    /// A value does not match the declared field kind.
    #[error("Type mismatch at {path}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Flat key being written.
        path: String,
        /// Declared kind.
        expected: &'static str,
        /// Kind of the offending value.
        actual: &'static str,
    },

    /// A value has a shape the schema cannot contain.
    #[error("Unexpected value at {path}: {reason}")]
    UnexpectedValue {
        /// Flat key being read.
        path: String,
        /// What was wrong.
        reason: String,
    },

    /// A `#` or `%` entry did not hold a count.
    #[error("Invalid count at {0}")]
    InvalidCount(String),
}

impl SchemaError {
    /// Build an [`SchemaError::UnexpectedValue`].
    pub fn unexpected(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnexpectedValue {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by resource lifecycle calls and the provider registry.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote object behind a resource is gone.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Configuration failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The lifecycle contract was broken, e.g. create without an id.
    #[error("SDK error: {0}")]
    Sdk(String),

    /// The provider itself is misconfigured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No resource or data source is registered under the name.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// The schema engine rejected a read or write.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

impl ProviderError {
    /// The message without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Sdk(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg) => msg.clone(),
            Self::Schema(err) => err.to_string(),
        }
    }
}

impl From<SchemaError> for tonic::Status {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::KeyNotFound(_)
            | SchemaError::PartialWrite(_)
            | SchemaError::TypeMismatch { .. } => tonic::Status::invalid_argument(err.to_string()),
            SchemaError::UnexpectedValue { .. } | SchemaError::InvalidCount(_) => {
                tonic::Status::internal(err.to_string())
            },
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::Sdk(msg) => tonic::Status::internal(msg),
            ProviderError::Schema(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::KeyNotFound("tags.0".to_string());
        assert_eq!(format!("{}", err), "Key not found: tags.0");

        let err = SchemaError::PartialWrite("tags.0".to_string());
        assert_eq!(format!("{}", err), "Can only set full list/set/map: tags.0");

        let err = SchemaError::TypeMismatch {
            path: "count".to_string(),
            expected: "int",
            actual: "string",
        };
        assert_eq!(
            format!("{}", err),
            "Type mismatch at count: expected int, got string"
        );

        let err = SchemaError::unexpected("labels", "not a map");
        assert_eq!(format!("{}", err), "Unexpected value at labels: not a map");
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::NotFound("resource-123".to_string());
        assert_eq!(format!("{}", err), "Resource not found: resource-123");

        let err = ProviderError::UnknownResource("custom_resource".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: custom_resource");

        let err: ProviderError = SchemaError::InvalidCount("tags.#".to_string()).into();
        assert_eq!(format!("{}", err), "Schema error: Invalid count at tags.#");
    }

    #[test]
    fn test_error_to_status() {
        let cases = [
            (ProviderError::NotFound("srv-1".into()), tonic::Code::NotFound),
            (ProviderError::UnknownResource("x_y".into()), tonic::Code::NotFound),
            (ProviderError::Validation("name".into()), tonic::Code::InvalidArgument),
            (ProviderError::Configuration("region".into()), tonic::Code::FailedPrecondition),
            (ProviderError::Sdk("no id".into()), tonic::Code::Internal),
        ];
        for (err, code) in cases {
            let status: tonic::Status = err.into();
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn test_schema_error_to_status() {
        let status: tonic::Status = SchemaError::PartialWrite("a.0".to_string()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status: tonic::Status = SchemaError::InvalidCount("a.#".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Internal);

        let status: tonic::Status =
            ProviderError::Schema(SchemaError::KeyNotFound("x".to_string())).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::NotFound("resource-123".to_string());
        assert_eq!(err.message(), "resource-123");

        let err = ProviderError::Schema(SchemaError::KeyNotFound("x".to_string()));
        assert_eq!(err.message(), "Key not found: x");
    }
}
