use crate::error::{ClientError, Result};
use crate::store::{ListParams, ObjectStore};
use async_trait::async_trait;
use podbalancer_core::{GroupVersionKind, ResourceKey};
use podbalancer_storage::{KVStore, KeyEncoder};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Object store backed by the embedded key-value store
///
/// Every successful write stamps a fresh `metadata.resourceVersion`. Updates
/// run inside a single write transaction so the version comparison and the
/// write cannot interleave with another writer.
pub struct StorageObjectStore {
    storage: Arc<dyn KVStore>,
}

impl StorageObjectStore {
    pub fn new(storage: Arc<dyn KVStore>) -> Self {
        Self { storage }
    }
}

fn metadata_mut<'a>(key: &ResourceKey, object: &'a mut Value) -> Result<&'a mut Map<String, Value>> {
    object
        .as_object_mut()
        .and_then(|o| {
            o.entry("metadata")
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
        })
        .ok_or_else(|| ClientError::invalid_resource(format!("{} has no metadata object", key)))
}

fn resource_version(object: &Value) -> Option<&str> {
    object
        .get("metadata")
        .and_then(|m| m.get("resourceVersion"))
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl ObjectStore for StorageObjectStore {
    async fn list(&self, gvk: &GroupVersionKind, params: &ListParams) -> Result<Vec<Value>> {
        let prefix = KeyEncoder::encode_prefix(gvk, params.namespace.as_deref());
        let results = self.storage.scan(prefix.as_bytes())?;

        let mut objects = Vec::with_capacity(results.len());
        for (_key, data) in results.iter() {
            let object: Value = serde_json::from_slice(data)?;
            let selected = params
                .label_selector
                .as_ref()
                .is_none_or(|selector| selector.matches_object(&object));
            if selected {
                objects.push(object);
            }
        }

        debug!("Listed {} objects with prefix {}", objects.len(), prefix);
        Ok(objects)
    }

    async fn get(&self, key: &ResourceKey) -> Result<Value> {
        let storage_key = KeyEncoder::encode_resource_key(key);
        let data = self
            .storage
            .get(storage_key.as_bytes())?
            .ok_or_else(|| ClientError::not_found(key.to_string()))?;

        Ok(serde_json::from_slice(&data)?)
    }

    async fn create(&self, key: &ResourceKey, mut object: Value) -> Result<Value> {
        let storage_key = KeyEncoder::encode_resource_key(key);

        let mut txn = self.storage.transaction()?;
        if txn.get(storage_key.as_bytes())?.is_some() {
            return Err(ClientError::already_exists(key.to_string()));
        }

        let metadata = metadata_mut(key, &mut object)?;
        metadata.insert("uid".to_string(), Value::String(Uuid::new_v4().to_string()));
        metadata.insert(
            "resourceVersion".to_string(),
            Value::String(Uuid::new_v4().to_string()),
        );

        txn.put(storage_key.as_bytes(), &serde_json::to_vec(&object)?)?;
        txn.commit()?;

        info!("Created resource: {}", key);
        Ok(object)
    }

    async fn update(&self, key: &ResourceKey, mut object: Value) -> Result<Value> {
        let storage_key = KeyEncoder::encode_resource_key(key);

        let mut txn = self.storage.transaction()?;
        let current = txn
            .get(storage_key.as_bytes())?
            .ok_or_else(|| ClientError::not_found(key.to_string()))?;
        let current: Value = serde_json::from_slice(&current)?;

        if let Some(ours) = resource_version(&object) {
            let theirs = resource_version(&current).unwrap_or_default();
            if ours != theirs {
                return Err(ClientError::conflict(
                    key.to_string(),
                    format!(
                        "the object has been modified (resourceVersion {} != {})",
                        ours, theirs
                    ),
                ));
            }
        }

        let new_version = Uuid::new_v4().to_string();
        metadata_mut(key, &mut object)?
            .insert("resourceVersion".to_string(), Value::String(new_version.clone()));

        txn.put(storage_key.as_bytes(), &serde_json::to_vec(&object)?)?;
        txn.commit()?;

        info!("Updated resource: {} with version {}", key, new_version);
        Ok(object)
    }

    async fn delete(&self, key: &ResourceKey) -> Result<()> {
        let storage_key = KeyEncoder::encode_resource_key(key);
        if !self.storage.delete(storage_key.as_bytes())? {
            return Err(ClientError::not_found(key.to_string()));
        }

        info!("Deleted resource: {}", key);
        Ok(())
    }
}
