use podbalancer_core::{GroupVersionKind, ResourceKey};

/// Key encoder for storage keys
pub struct KeyEncoder;

impl KeyEncoder {
    /// Encode a resource key: {api_version}/{kind}/{namespace}/{name}
    /// For cluster-scoped: {api_version}/{kind}/{name}
    pub fn encode_resource_key(key: &ResourceKey) -> String {
        key.storage_key()
    }

    /// Encode a prefix for scanning resources of a kind, optionally in one namespace
    pub fn encode_prefix(gvk: &GroupVersionKind, namespace: Option<&str>) -> String {
        match namespace {
            Some(ns) => format!("{}/{}/{}/", gvk.api_version(), gvk.kind, ns),
            None => format!("{}/{}/", gvk.api_version(), gvk.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_resource_key() {
        let gvk = GroupVersionKind::from_api_version_kind("apps/v1", "ReplicaSet");
        let key = ResourceKey::new(gvk, "ns1", "web");
        assert_eq!(KeyEncoder::encode_resource_key(&key), "apps/v1/ReplicaSet/ns1/web");

        let gvk = GroupVersionKind::from_api_version_kind("v1", "Node");
        let key = ResourceKey::cluster_scoped(gvk, "node-1");
        assert_eq!(KeyEncoder::encode_resource_key(&key), "v1/Node/node-1");
    }

    #[test]
    fn test_encode_prefix() {
        let pod = GroupVersionKind::from_api_version_kind("v1", "Pod");
        assert_eq!(KeyEncoder::encode_prefix(&pod, Some("ns1")), "v1/Pod/ns1/");

        let node = GroupVersionKind::from_api_version_kind("v1", "Node");
        assert_eq!(KeyEncoder::encode_prefix(&node, None), "v1/Node/");
    }
}
