//! Podbalancer Core - Resource types shared by the pod distribution rebalancer
//!
//! This crate provides:
//! - Kubernetes resource abstractions (including OpenShift DeploymentConfig)
//! - Error types with miette diagnostics
//! - Type-safe resource keys and identifiers
//! - Multi-document YAML loading

pub mod error;
pub mod resources;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, Result};
pub use resources::{DeploymentConfig, Resource, ResourceError};
pub use types::{collection_path, GroupVersionKind, ResourceKey};

// Re-export k8s-openapi types for convenience
pub use k8s_openapi;
pub use k8s_openapi::api::apps::v1::{ReplicaSet, StatefulSet};
pub use k8s_openapi::api::core::v1::{Node, Pod};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

/// Split a multi-document YAML stream into JSON values, skipping empty documents
pub fn from_yaml_documents(data: &str) -> Result<Vec<serde_json::Value>> {
    use serde::Deserialize;

    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(data) {
        let value = serde_json::Value::deserialize(document).map_err(|e| {
            CoreError::serialization_error(
                format!("Failed to deserialize from YAML: {}", e),
                Some(Box::new(e)),
            )
        })?;
        if !value.is_null() {
            documents.push(value);
        }
    }
    Ok(documents)
}
