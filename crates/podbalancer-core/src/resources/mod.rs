pub mod deployment_config;

pub use deployment_config::DeploymentConfig;

use crate::{GroupVersionKind, ResourceKey};
use k8s_openapi::api::apps::v1::{ReplicaSet, StatefulSet};
use k8s_openapi::api::core::v1::{Node, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

/// Trait for the Kubernetes resources podbalancer reads and writes
pub trait Resource: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// API version of this resource type
    const API_VERSION: &'static str;

    /// Kind of this resource type
    const KIND: &'static str;

    /// Get the metadata of this resource
    fn metadata(&self) -> &ObjectMeta;

    /// Get mutable metadata
    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    /// Get the GroupVersionKind of this resource type
    fn type_gvk() -> GroupVersionKind
    where
        Self: Sized,
    {
        GroupVersionKind::from_api_version_kind(Self::API_VERSION, Self::KIND)
    }

    /// Whether instances live inside a namespace
    fn is_namespaced() -> bool
    where
        Self: Sized,
    {
        true
    }

    /// Get the ResourceKey
    fn resource_key(&self) -> Result<ResourceKey, ResourceError>
    where
        Self: Sized,
    {
        let metadata = self.metadata();
        let name = metadata
            .name
            .as_ref()
            .ok_or_else(|| ResourceError::MissingField("metadata.name".to_string()))?;

        if !Self::is_namespaced() {
            return Ok(ResourceKey::cluster_scoped(Self::type_gvk(), name));
        }

        let namespace = metadata
            .namespace
            .as_ref()
            .ok_or_else(|| ResourceError::MissingField("metadata.namespace".to_string()))?;

        Ok(ResourceKey::new(Self::type_gvk(), namespace, name))
    }

    /// Get the annotation map, if any
    fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata().annotations.as_ref()
    }

    /// Replace the annotation map
    fn set_annotations(&mut self, annotations: BTreeMap<String, String>) {
        self.metadata_mut().annotations = Some(annotations);
    }
}

/// Resource-related errors
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Missing required field: {0}")]
    MissingField(String),
}

impl Resource for Pod {
    const API_VERSION: &'static str = "v1";
    const KIND: &'static str = "Pod";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl Resource for Node {
    const API_VERSION: &'static str = "v1";
    const KIND: &'static str = "Node";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }

    fn is_namespaced() -> bool {
        false
    }
}

impl Resource for ReplicaSet {
    const API_VERSION: &'static str = "apps/v1";
    const KIND: &'static str = "ReplicaSet";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl Resource for StatefulSet {
    const API_VERSION: &'static str = "apps/v1";
    const KIND: &'static str = "StatefulSet";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}

impl Resource for DeploymentConfig {
    const API_VERSION: &'static str = "apps.openshift.io/v1";
    const KIND: &'static str = "DeploymentConfig";

    fn metadata(&self) -> &ObjectMeta {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        &mut self.metadata
    }
}
