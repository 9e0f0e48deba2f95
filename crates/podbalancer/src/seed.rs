use podbalancer_client::{ClientError, ObjectStore};
use podbalancer_core::{GroupVersionKind, ResourceKey};
use serde_json::Value;
use tracing::{debug, info};

fn str_at<'a>(document: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(document, |v, k| v.get(*k))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Key for a raw manifest, cluster-scoped when it has no namespace
fn manifest_key(document: &Value) -> miette::Result<ResourceKey> {
    let api_version = str_at(document, &["apiVersion"])
        .ok_or_else(|| miette::miette!("Manifest is missing apiVersion"))?;
    let kind = str_at(document, &["kind"])
        .ok_or_else(|| miette::miette!("Manifest is missing kind"))?;
    let name = str_at(document, &["metadata", "name"])
        .ok_or_else(|| miette::miette!("{} manifest is missing metadata.name", kind))?;

    let gvk = GroupVersionKind::from_api_version_kind(api_version, kind);
    Ok(match str_at(document, &["metadata", "namespace"]) {
        Some(namespace) => ResourceKey::new(gvk, namespace, name),
        None => ResourceKey::cluster_scoped(gvk, name),
    })
}

/// Write manifests into a store, replacing objects that already exist
pub async fn load_documents(store: &dyn ObjectStore, documents: Vec<Value>) -> miette::Result<usize> {
    let mut loaded = 0;
    for mut document in documents {
        let key = manifest_key(&document)?;

        // Stale versions from an exported snapshot would be rejected
        if let Some(metadata) = document.get_mut("metadata").and_then(Value::as_object_mut) {
            metadata.remove("resourceVersion");
        }

        match store.create(&key, document.clone()).await {
            Ok(_) => debug!("Created {}", key),
            Err(ClientError::AlreadyExists { .. }) => {
                store
                    .update(&key, document)
                    .await
                    .map_err(|e| miette::miette!("Failed to replace {}: {}", key, e))?;
                debug!("Replaced {}", key);
            }
            Err(e) => return Err(miette::miette!("Failed to load {}: {}", key, e)),
        }
        loaded += 1;
    }

    info!("Loaded {} objects", loaded);
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use podbalancer_client::StorageObjectStore;
    use podbalancer_storage::RedbBackend;
    use std::sync::Arc;
    use tempfile::tempdir;

    const SNAPSHOT: &str = r#"
apiVersion: v1
kind: Node
metadata:
  name: node-a
  labels:
    topology.kubernetes.io/zone: zone-a
---
apiVersion: apps/v1
kind: ReplicaSet
metadata:
  name: web
  namespace: ns1
  resourceVersion: "12345"
---
"#;

    #[tokio::test]
    async fn test_load_and_reload() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(RedbBackend::new(dir.path().join("snapshot.redb")).unwrap());
        let store = StorageObjectStore::new(backend);

        let documents = podbalancer_core::from_yaml_documents(SNAPSHOT).unwrap();
        assert_eq!(load_documents(&store, documents.clone()).await.unwrap(), 2);
        assert_eq!(load_documents(&store, documents).await.unwrap(), 2);

        let node = store
            .get(&ResourceKey::cluster_scoped(
                GroupVersionKind::from_api_version_kind("v1", "Node"),
                "node-a",
            ))
            .await
            .unwrap();
        assert_eq!(
            node["metadata"]["labels"]["topology.kubernetes.io/zone"],
            "zone-a"
        );
    }

    #[test]
    fn test_manifest_without_kind_is_rejected() {
        let document = serde_json::json!({ "apiVersion": "v1", "metadata": { "name": "x" } });
        assert!(manifest_key(&document).is_err());
    }
}
