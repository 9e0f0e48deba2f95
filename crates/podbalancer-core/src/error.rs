// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Core error type for podbalancer resource handling
#[derive(Error, Debug, Diagnostic)]
pub enum CoreError {
    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(
        code(podbalancer::serialization_error),
        help("Ensure the manifest is a valid multi-document YAML stream")
    )]
    SerializationError {
        #[allow(unused)]
        message: String,
        #[source]
        #[allow(unused)]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Create a SerializationError
    pub fn serialization_error(
        message: impl Into<String>,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SerializationError {
            message: message.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialization_error_message() {
        let err = CoreError::serialization_error("bad document", None);
        assert!(matches!(err, CoreError::SerializationError { .. }));
        assert_eq!(err.to_string(), "Serialization error: bad document");
    }
}
