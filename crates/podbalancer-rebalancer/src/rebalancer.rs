use crate::error::{RebalanceError, Result};
use crate::grouper::WorkloadKey;
use crate::ledger::RebalanceLedger;
use crate::resolver::ObjectResolver;
use podbalancer_client::Client;
use podbalancer_core::Pod;
use std::time::Duration;
use tracing::{debug, error, info};

/// Configuration for corrective rebalancing
#[derive(Debug, Clone)]
pub struct RebalancerConfig {
    /// Pause between the pod deletion and the attempt counter write
    pub settle_interval: Duration,
    /// Upper bound on the attempt counter write once the pause is over
    pub settle_timeout: Duration,
    /// Attempts allowed per workload before it is left alone
    pub max_balance_attempts: u32,
    /// Re-read retries for StatefulSet counter writes that hit a conflict
    pub statefulset_conflict_retries: u32,
    /// Delay before each conflict retry
    pub conflict_backoff: Duration,
    /// Detect and report without deleting pods or writing annotations
    pub dry_run: bool,
}

impl Default for RebalancerConfig {
    fn default() -> Self {
        Self {
            settle_interval: Duration::from_secs(5),
            settle_timeout: Duration::from_secs(5),
            max_balance_attempts: crate::ledger::MAX_BALANCE_ATTEMPTS,
            statefulset_conflict_retries: 5,
            conflict_backoff: Duration::from_millis(10),
            dry_run: false,
        }
    }
}

/// Deletes one pod of an imbalanced workload and records the attempt
pub struct Rebalancer {
    client: Client,
    resolver: ObjectResolver,
    ledger: RebalanceLedger,
    config: RebalancerConfig,
}

impl Rebalancer {
    pub fn new(client: Client, config: RebalancerConfig) -> Self {
        let resolver = ObjectResolver::new(client.clone()).with_conflict_retries(
            config.statefulset_conflict_retries,
            config.conflict_backoff,
        );
        Self {
            client,
            resolver,
            ledger: RebalanceLedger::new(config.max_balance_attempts),
            config,
        }
    }

    pub fn resolver(&self) -> &ObjectResolver {
        &self.resolver
    }

    pub fn ledger(&self) -> &RebalanceLedger {
        &self.ledger
    }

    pub fn config(&self) -> &RebalancerConfig {
        &self.config
    }

    /// Delete the first member pod, then bump the workload's attempt counter
    ///
    /// The deletion is best effort. The counter write happens after the
    /// settle interval and must finish within the settle timeout.
    pub async fn rebalance(&self, key: &WorkloadKey, pods: &[String]) -> Result<()> {
        info!("Rebalancing {} ({} pods in one zone)", key, pods.len());

        if let Some(victim) = pods.first() {
            info!("Deleting pod {}/{} of {}", key.namespace, victim, key);
            self.delete_pod(&key.namespace, victim).await;
        }

        tokio::time::sleep(self.config.settle_interval).await;

        info!("Updating {} annotation on {}", crate::ledger::POD_REBALANCE_ATTEMPTS, key);
        let record = self.resolver.update_annotations(key, |annotations| {
            self.ledger
                .increment(annotations)
                .map_err(|e| RebalanceError::annotation_parse(key, e))
        });

        let updated = tokio::time::timeout(self.config.settle_timeout, record)
            .await
            .map_err(|_| RebalanceError::settle_timeout(key, self.config.settle_timeout))??;

        info!(
            "Recorded rebalance attempt {} on {}",
            updated
                .annotations()
                .and_then(|a| a.get(crate::ledger::POD_REBALANCE_ATTEMPTS))
                .map(String::as_str)
                .unwrap_or("?"),
            key
        );
        Ok(())
    }

    /// Re-read and delete a pod, logging rather than returning failures
    async fn delete_pod(&self, namespace: &str, name: &str) {
        let pod: Pod = match self.client.get(namespace, name).await {
            Ok(pod) => pod,
            Err(e) => {
                error!("Failed to get pod {}/{} for deletion: {}", namespace, name, e);
                return;
            }
        };

        match self.client.delete(&pod).await {
            Ok(()) => info!("Deleted pod {}/{} to trigger rescheduling", namespace, name),
            Err(e) => error!("Failed to delete pod {}/{}: {}", namespace, name, e),
        }
        debug!("Pod deletion for {}/{} finished", namespace, name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::POD_REBALANCE_ATTEMPTS;
    use podbalancer_client::StorageObjectStore;
    use podbalancer_core::{ObjectMeta, ReplicaSet};
    use podbalancer_storage::RedbBackend;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn test_client(dir: &tempfile::TempDir) -> Client {
        let backend = Arc::new(RedbBackend::new(dir.path().join("snapshot.redb")).unwrap());
        Client::new(Arc::new(StorageObjectStore::new(backend)))
    }

    fn meta(name: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("ns1".to_string()),
            ..Default::default()
        }
    }

    fn immediate() -> RebalancerConfig {
        RebalancerConfig {
            settle_interval: Duration::ZERO,
            ..Default::default()
        }
    }

    async fn seed(client: &Client, pods: &[&str]) {
        client
            .create(&ReplicaSet {
                metadata: meta("web"),
                ..Default::default()
            })
            .await
            .unwrap();
        for name in pods {
            client
                .create(&Pod {
                    metadata: meta(name),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
    }

    fn pod_names() -> Vec<String> {
        vec!["web-1".to_string(), "web-2".to_string()]
    }

    #[tokio::test]
    async fn test_rebalance_deletes_first_pod_and_counts() {
        let dir = tempdir().unwrap();
        let client = test_client(&dir);
        seed(&client, &["web-1", "web-2"]).await;

        let rebalancer = Rebalancer::new(client.clone(), immediate());
        let key = WorkloadKey::new("ReplicaSet", "ns1", "web");
        rebalancer.rebalance(&key, &pod_names()).await.unwrap();

        assert!(client.get::<Pod>("ns1", "web-1").await.unwrap_err().is_not_found());
        assert!(client.get::<Pod>("ns1", "web-2").await.is_ok());

        let rs: ReplicaSet = client.get("ns1", "web").await.unwrap();
        assert_eq!(rs.metadata.annotations.unwrap()[POD_REBALANCE_ATTEMPTS], "1");
    }

    #[tokio::test]
    async fn test_missing_pod_does_not_block_counter() {
        let dir = tempdir().unwrap();
        let client = test_client(&dir);
        seed(&client, &[]).await;

        let rebalancer = Rebalancer::new(client.clone(), immediate());
        let key = WorkloadKey::new("ReplicaSet", "ns1", "web");
        rebalancer.rebalance(&key, &pod_names()).await.unwrap();

        let rs: ReplicaSet = client.get("ns1", "web").await.unwrap();
        assert_eq!(rs.metadata.annotations.unwrap()[POD_REBALANCE_ATTEMPTS], "1");
    }

    #[tokio::test]
    async fn test_non_numeric_counter_fails_after_delete() {
        let dir = tempdir().unwrap();
        let client = test_client(&dir);
        let mut rs = ReplicaSet {
            metadata: meta("web"),
            ..Default::default()
        };
        rs.metadata.annotations = Some(BTreeMap::from([(
            POD_REBALANCE_ATTEMPTS.to_string(),
            "many".to_string(),
        )]));
        client.create(&rs).await.unwrap();

        let rebalancer = Rebalancer::new(client.clone(), immediate());
        let key = WorkloadKey::new("ReplicaSet", "ns1", "web");
        let err = rebalancer.rebalance(&key, &pod_names()).await.unwrap_err();
        assert!(matches!(err, RebalanceError::AnnotationParse { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_settle_window_waits_before_counting() {
        let dir = tempdir().unwrap();
        let client = test_client(&dir);
        seed(&client, &["web-1", "web-2"]).await;

        let rebalancer = Rebalancer::new(client.clone(), RebalancerConfig::default());
        let key = WorkloadKey::new("ReplicaSet", "ns1", "web");

        let started = tokio::time::Instant::now();
        rebalancer.rebalance(&key, &pod_names()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(5));
    }
}
