use serde::{Deserialize, Serialize};
use std::fmt;

/// GroupVersionKind uniquely identifies a Kubernetes resource type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupVersionKind {
    /// API group (e.g., "", "apps", "apps.openshift.io")
    pub group: String,
    /// API version (e.g., "v1")
    pub version: String,
    /// Resource kind (e.g., "Pod", "StatefulSet")
    pub kind: String,
}

impl GroupVersionKind {
    /// Create a new GVK
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Create a GVK from apiVersion and kind
    /// apiVersion format: "v1" or "group/version"
    pub fn from_api_version_kind(api_version: &str, kind: &str) -> Self {
        let (group, version) = match api_version.split_once('/') {
            Some((g, v)) => (g.to_string(), v.to_string()),
            None => (String::new(), api_version.to_string()),
        };

        Self {
            group,
            version,
            kind: kind.to_string(),
        }
    }

    /// Get the apiVersion string (group/version or just version)
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// Get the full API path segment
    pub fn api_path(&self) -> String {
        if self.group.is_empty() {
            format!("api/{}", self.version)
        } else {
            format!("apis/{}/{}", self.group, self.version)
        }
    }

    /// Get the resource name (lowercase, plural)
    pub fn resource_name(&self) -> String {
        let lower = self.kind.to_lowercase();
        if lower.ends_with('s') {
            format!("{}es", lower)
        } else if lower.ends_with('y') {
            format!("{}ies", &lower[..lower.len() - 1])
        } else {
            format!("{}s", lower)
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.api_version(), self.kind)
    }
}

/// ResourceKey uniquely identifies a specific resource instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    /// GroupVersionKind of the resource
    pub gvk: GroupVersionKind,
    /// Namespace (empty for cluster-scoped resources)
    pub namespace: String,
    /// Resource name
    pub name: String,
}

impl ResourceKey {
    /// Create a new ResourceKey
    pub fn new(gvk: GroupVersionKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            gvk,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Create a cluster-scoped ResourceKey
    pub fn cluster_scoped(gvk: GroupVersionKind, name: impl Into<String>) -> Self {
        Self {
            gvk,
            namespace: String::new(),
            name: name.into(),
        }
    }

    /// Check if this is a namespaced resource
    pub fn is_namespaced(&self) -> bool {
        !self.namespace.is_empty()
    }

    /// Get the storage key encoding: {api_version}/{kind}/{namespace}/{name}
    /// For cluster-scoped: {api_version}/{kind}/{name}
    pub fn storage_key(&self) -> String {
        let api_version = self.gvk.api_version();
        if self.is_namespaced() {
            format!("{}/{}/{}/{}", api_version, self.gvk.kind, self.namespace, self.name)
        } else {
            format!("{}/{}/{}", api_version, self.gvk.kind, self.name)
        }
    }

    /// Get the API path for this resource
    pub fn api_path(&self) -> String {
        format!("{}/{}", collection_path(&self.gvk, self.namespace()), self.name)
    }

    /// Namespace as an option, `None` for cluster-scoped keys
    pub fn namespace(&self) -> Option<&str> {
        if self.is_namespaced() {
            Some(&self.namespace)
        } else {
            None
        }
    }
}

/// Get the API path for a collection of resources, optionally namespaced
pub fn collection_path(gvk: &GroupVersionKind, namespace: Option<&str>) -> String {
    let base = gvk.api_path();
    let resource = gvk.resource_name();

    match namespace {
        Some(ns) => format!("/{}/namespaces/{}/{}", base, ns, resource),
        None => format!("/{}/{}", base, resource),
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_namespaced() {
            write!(f, "{}/{}/{}", self.gvk, self.namespace, self.name)
        } else {
            write!(f, "{}/{}", self.gvk, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gvk_from_api_version() {
        let gvk = GroupVersionKind::from_api_version_kind("v1", "Pod");
        assert_eq!(gvk.group, "");
        assert_eq!(gvk.version, "v1");
        assert_eq!(gvk.api_version(), "v1");

        let gvk = GroupVersionKind::from_api_version_kind("apps.openshift.io/v1", "DeploymentConfig");
        assert_eq!(gvk.group, "apps.openshift.io");
        assert_eq!(gvk.version, "v1");
        assert_eq!(gvk.api_version(), "apps.openshift.io/v1");
    }

    #[test]
    fn test_gvk_resource_name() {
        let cases = [
            ("v1", "Pod", "pods"),
            ("v1", "Node", "nodes"),
            ("apps/v1", "ReplicaSet", "replicasets"),
            ("apps/v1", "StatefulSet", "statefulsets"),
            ("apps.openshift.io/v1", "DeploymentConfig", "deploymentconfigs"),
        ];
        for (api_version, kind, expected) in cases {
            let gvk = GroupVersionKind::from_api_version_kind(api_version, kind);
            assert_eq!(gvk.resource_name(), expected);
        }
    }

    #[test]
    fn test_resource_key_storage_key() {
        let gvk = GroupVersionKind::from_api_version_kind("apps/v1", "StatefulSet");
        let key = ResourceKey::new(gvk, "ns1", "db");
        assert_eq!(key.storage_key(), "apps/v1/StatefulSet/ns1/db");

        let gvk = GroupVersionKind::from_api_version_kind("v1", "Node");
        let key = ResourceKey::cluster_scoped(gvk, "node-1");
        assert_eq!(key.storage_key(), "v1/Node/node-1");
    }

    #[test]
    fn test_resource_key_api_path() {
        let gvk = GroupVersionKind::from_api_version_kind("apps.openshift.io/v1", "DeploymentConfig");
        let key = ResourceKey::new(gvk, "ns1", "dc1");
        assert_eq!(
            key.api_path(),
            "/apis/apps.openshift.io/v1/namespaces/ns1/deploymentconfigs/dc1"
        );

        let gvk = GroupVersionKind::from_api_version_kind("v1", "Node");
        let key = ResourceKey::cluster_scoped(gvk.clone(), "node-1");
        assert_eq!(key.api_path(), "/api/v1/nodes/node-1");
        assert_eq!(collection_path(&gvk, None), "/api/v1/nodes");
    }
}
