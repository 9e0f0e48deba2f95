use miette::Diagnostic;
use thiserror::Error;

/// Errors returned by an object store
#[derive(Error, Debug, Diagnostic)]
pub enum ClientError {
    /// Object does not exist
    #[error("Resource not found: {resource_key}")]
    #[diagnostic(
        code(podbalancer::client::not_found),
        help("The object may have been deleted since it was listed")
    )]
    NotFound {
        #[allow(unused)]
        resource_key: String,
    },

    /// Optimistic concurrency failure on write
    #[error("Conflict updating {resource_key}: {message}")]
    #[diagnostic(
        code(podbalancer::client::conflict),
        help("The object was modified concurrently. Re-read it and retry with the latest resourceVersion")
    )]
    Conflict {
        #[allow(unused)]
        resource_key: String,
        #[allow(unused)]
        message: String,
    },

    /// Object already exists on create
    #[error("Resource already exists: {resource_key}")]
    #[diagnostic(
        code(podbalancer::client::already_exists),
        help("Update the existing object instead of creating it")
    )]
    AlreadyExists {
        #[allow(unused)]
        resource_key: String,
    },

    /// HTTP transport or unexpected status
    #[error("Transport error: {message}")]
    #[diagnostic(
        code(podbalancer::client::transport),
        help("Check that the API server URL is reachable and the token is valid")
    )]
    Transport {
        #[allow(unused)]
        message: String,
    },

    /// Object could not be (de)serialized
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(podbalancer::client::serialization),
        help("Ensure the stored object matches the expected resource schema")
    )]
    Serialization {
        #[allow(unused)]
        message: String,
        #[source]
        #[allow(unused)]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Object is missing required fields
    #[error("Invalid resource: {message}")]
    #[diagnostic(
        code(podbalancer::client::invalid_resource),
        help("Objects need metadata.name, and metadata.namespace for namespaced kinds")
    )]
    InvalidResource {
        #[allow(unused)]
        message: String,
    },

    /// Embedded storage error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Storage(#[from] podbalancer_storage::StorageError),
}

/// Result type for object store operations
pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    /// Create a NotFound error
    pub fn not_found(resource_key: impl Into<String>) -> Self {
        Self::NotFound {
            resource_key: resource_key.into(),
        }
    }

    /// Create a Conflict error
    pub fn conflict(resource_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            resource_key: resource_key.into(),
            message: message.into(),
        }
    }

    /// Create an AlreadyExists error
    pub fn already_exists(resource_key: impl Into<String>) -> Self {
        Self::AlreadyExists {
            resource_key: resource_key.into(),
        }
    }

    /// Create a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a Serialization error
    pub fn serialization(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Serialization {
            message: message.into(),
            source,
        }
    }

    /// Create an InvalidResource error
    pub fn invalid_resource(message: impl Into<String>) -> Self {
        Self::InvalidResource {
            message: message.into(),
        }
    }

    /// Whether this is an optimistic concurrency failure
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Whether the object did not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::serialization(format!("JSON error: {}", err), Some(Box::new(err)))
    }
}

impl From<podbalancer_core::ResourceError> for ClientError {
    fn from(err: podbalancer_core::ResourceError) -> Self {
        ClientError::invalid_resource(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_predicates() {
        assert!(ClientError::conflict("apps/v1/StatefulSet/ns1/db", "stale").is_conflict());
        assert!(!ClientError::conflict("k", "m").is_not_found());
        assert!(ClientError::not_found("v1/Pod/ns1/web-1").is_not_found());
        assert!(!ClientError::transport("boom").is_conflict());
    }
}
