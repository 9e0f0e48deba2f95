use crate::error::{ClientError, Result};
use crate::store::{ListParams, ObjectStore};
use podbalancer_core::{Resource, ResourceKey};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Typed access to an `ObjectStore`
#[derive(Clone)]
pub struct Client {
    store: Arc<dyn ObjectStore>,
}

impl Client {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// List objects of type `T`
    pub async fn list<T: Resource>(&self, params: &ListParams) -> Result<Vec<T>> {
        let gvk = T::type_gvk();
        debug!("Listing {} with {:?}", gvk, params);

        let items = self.store.list(&gvk, params).await?;
        items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(ClientError::from))
            .collect()
    }

    /// Get a namespaced object of type `T`
    pub async fn get<T: Resource>(&self, namespace: &str, name: &str) -> Result<T> {
        let key = ResourceKey::new(T::type_gvk(), namespace, name);
        let object = self.store.get(&key).await?;
        Ok(serde_json::from_value(object)?)
    }

    /// Create an object
    pub async fn create<T: Resource>(&self, resource: &T) -> Result<T> {
        let key = resource.resource_key()?;
        let created = self.store.create(&key, to_object(resource)?).await?;
        Ok(serde_json::from_value(created)?)
    }

    /// Replace an object; fails with a conflict if its resourceVersion is stale
    pub async fn update<T: Resource>(&self, resource: &T) -> Result<T> {
        let key = resource.resource_key()?;
        let updated = self.store.update(&key, to_object(resource)?).await?;
        Ok(serde_json::from_value(updated)?)
    }

    /// Delete an object
    pub async fn delete<T: Resource>(&self, resource: &T) -> Result<()> {
        let key = resource.resource_key()?;
        self.store.delete(&key).await
    }
}

/// Serialize a typed resource, making sure apiVersion and kind are present
fn to_object<T: Resource>(resource: &T) -> Result<Value> {
    let mut object = serde_json::to_value(resource)?;
    if let Some(map) = object.as_object_mut() {
        map.entry("apiVersion")
            .or_insert_with(|| Value::String(T::API_VERSION.to_string()));
        map.entry("kind")
            .or_insert_with(|| Value::String(T::KIND.to_string()));
    }
    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_store::StorageObjectStore;
    use podbalancer_core::{Node, Pod, ReplicaSet};
    use podbalancer_storage::RedbBackend;
    use tempfile::tempdir;

    fn test_client(dir: &tempfile::TempDir) -> Client {
        let backend = Arc::new(RedbBackend::new(dir.path().join("snapshot.redb")).unwrap());
        Client::new(Arc::new(StorageObjectStore::new(backend)))
    }

    fn pod(name: &str, namespace: &str) -> Pod {
        let mut pod = Pod::default();
        pod.metadata.name = Some(name.to_string());
        pod.metadata.namespace = Some(namespace.to_string());
        pod
    }

    #[tokio::test]
    async fn test_typed_round_trip() {
        let dir = tempdir().unwrap();
        let client = test_client(&dir);

        client.create(&pod("web-1", "ns1")).await.unwrap();
        client.create(&pod("web-2", "ns1")).await.unwrap();
        client.create(&pod("api-1", "ns2")).await.unwrap();

        let pods: Vec<Pod> = client.list(&ListParams::namespaced("ns1")).await.unwrap();
        let names: Vec<_> = pods
            .iter()
            .filter_map(|p| p.metadata.name.as_deref())
            .collect();
        assert_eq!(names, vec!["web-1", "web-2"]);

        let fetched: Pod = client.get("ns2", "api-1").await.unwrap();
        assert!(fetched.metadata.uid.is_some());
        assert!(fetched.metadata.resource_version.is_some());

        client.delete(&fetched).await.unwrap();
        let err = client.get::<Pod>("ns2", "api-1").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_detects_stale_resource_version() {
        let dir = tempdir().unwrap();
        let client = test_client(&dir);

        let mut rs = ReplicaSet::default();
        rs.metadata.name = Some("web".to_string());
        rs.metadata.namespace = Some("ns1".to_string());
        let created = client.create(&rs).await.unwrap();

        let mut first = created.clone();
        first
            .metadata
            .annotations
            .get_or_insert_with(Default::default)
            .insert("owner".to_string(), "first".to_string());
        client.update(&first).await.unwrap();

        // `created` still carries the original resourceVersion
        let err = client.update(&created).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_list_cluster_scoped() {
        let dir = tempdir().unwrap();
        let client = test_client(&dir);

        let mut node = Node::default();
        node.metadata.name = Some("node-a".to_string());
        client.create(&node).await.unwrap();

        let nodes: Vec<Node> = client.list(&ListParams::all()).await.unwrap();
        assert_eq!(nodes.len(), 1);
    }
}
