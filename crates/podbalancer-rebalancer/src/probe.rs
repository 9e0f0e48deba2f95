use crate::error::{RebalanceError, Result};
use crate::topology::ZONE_LABEL;
use async_trait::async_trait;
use podbalancer_client::{Client, ListParams};
use podbalancer_core::Node;
use std::collections::BTreeSet;
use tracing::debug;

/// Answers whether the cluster spans more than one availability zone
#[async_trait]
pub trait TopologyProbe: Send + Sync {
    async fn is_multi_zone(&self) -> Result<bool>;
}

/// Probe that counts distinct zone labels across all nodes
pub struct NodeZoneProbe {
    client: Client,
}

impl NodeZoneProbe {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl TopologyProbe for NodeZoneProbe {
    async fn is_multi_zone(&self) -> Result<bool> {
        let nodes: Vec<Node> = self
            .client
            .list(&ListParams::all())
            .await
            .map_err(RebalanceError::topology)?;

        let zones: BTreeSet<&str> = nodes
            .iter()
            .filter_map(|n| n.metadata.labels.as_ref()?.get(ZONE_LABEL))
            .map(String::as_str)
            .filter(|z| !z.is_empty())
            .collect();

        debug!("Cluster has {} nodes across zones {:?}", nodes.len(), zones);
        Ok(zones.len() > 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use podbalancer_client::StorageObjectStore;
    use podbalancer_storage::RedbBackend;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn add_node(client: &Client, name: &str, zone: Option<&str>) {
        let mut node = Node::default();
        node.metadata.name = Some(name.to_string());
        node.metadata.labels =
            zone.map(|z| BTreeMap::from([(ZONE_LABEL.to_string(), z.to_string())]));
        client.create(&node).await.unwrap();
    }

    #[tokio::test]
    async fn test_multi_zone_detection() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(RedbBackend::new(dir.path().join("snapshot.redb")).unwrap());
        let client = Client::new(Arc::new(StorageObjectStore::new(backend)));
        let probe = NodeZoneProbe::new(client.clone());

        assert!(!probe.is_multi_zone().await.unwrap());

        add_node(&client, "node-a", Some("zone-a")).await;
        add_node(&client, "node-a2", Some("zone-a")).await;
        add_node(&client, "node-x", None).await;
        add_node(&client, "node-y", Some("")).await;
        assert!(!probe.is_multi_zone().await.unwrap());

        add_node(&client, "node-b", Some("zone-b")).await;
        assert!(probe.is_multi_zone().await.unwrap());
    }
}
