use crate::detector::{find_imbalanced, is_imbalanced};
use crate::error::{AggregateError, RebalanceError, Result};
use crate::grouper::{group_pods, WorkloadGroup, WorkloadKey};
use crate::ledger::RebalanceLedger;
use crate::namespaces::{target_namespaces, InstallType};
use crate::probe::TopologyProbe;
use crate::rebalancer::{Rebalancer, RebalancerConfig};
use crate::topology::index_node_zones;
use chrono::{DateTime, Utc};
use podbalancer_client::{Client, ListParams};
use podbalancer_core::{Node, Pod};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Read-only view of one workload group
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupReport {
    pub workload: WorkloadKey,
    pub zones: Vec<String>,
    pub pods: Vec<String>,
    pub imbalanced: bool,
    /// Recorded attempts, only looked up for imbalanced groups
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Read-only view of one namespace
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceReport {
    pub namespace: String,
    pub groups: Vec<GroupReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of [`Orchestrator::inspect`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectReport {
    pub generated_at: DateTime<Utc>,
    pub multi_zone: bool,
    pub namespaces: Vec<NamespaceReport>,
}

/// Runs one pod distribution pass over the target namespaces
pub struct Orchestrator {
    client: Client,
    probe: Arc<dyn TopologyProbe>,
    rebalancer: Rebalancer,
}

impl Orchestrator {
    pub fn new(client: Client, probe: Arc<dyn TopologyProbe>, config: RebalancerConfig) -> Self {
        Self {
            rebalancer: Rebalancer::new(client.clone(), config),
            client,
            probe,
        }
    }

    /// Detect and correct single-zone workloads in every target namespace
    ///
    /// Only a failed multi-zone check ends the pass early. Every other failure
    /// is collected and the pass moves on to the next workload or namespace.
    pub async fn reconcile_pod_distribution(
        &self,
        namespace_prefix: &str,
        install_type: InstallType,
    ) -> AggregateError {
        let mut errors = AggregateError::new();

        match self.probe.is_multi_zone().await {
            Ok(true) => {}
            Ok(false) => {
                debug!("Cluster is not multi-zone, skipping pod distribution");
                return errors;
            }
            Err(e) => {
                errors.push(e);
                return errors;
            }
        }

        for namespace in target_namespaces(namespace_prefix, install_type) {
            self.reconcile_namespace(&namespace, &mut errors).await;
        }

        if errors.is_empty() {
            info!("Pod distribution pass completed");
        } else {
            warn!("Pod distribution pass completed with {} error(s)", errors.len());
        }
        errors
    }

    async fn reconcile_namespace(&self, namespace: &str, errors: &mut AggregateError) {
        info!("Reconciling pod distribution in namespace {}", namespace);
        let groups = match self.workload_groups(namespace).await {
            Ok(groups) => groups,
            Err(e) => {
                warn!("Skipping namespace {}: {}", namespace, e);
                errors.push(e);
                return;
            }
        };

        for (key, pods) in find_imbalanced(&groups) {
            if let Err(e) = self.reconcile_workload(&key, &pods).await {
                warn!("Failed to rebalance {}: {}", key, e);
                errors.push(e);
            }
        }
    }

    async fn reconcile_workload(&self, key: &str, pods: &[String]) -> Result<()> {
        let key: WorkloadKey = key.parse()?;
        let object = self.rebalancer.resolver().fetch(&key).await?;

        let eligible = self
            .rebalancer
            .ledger()
            .check_eligible(object.annotations())
            .map_err(|e| RebalanceError::annotation_parse(&key, e))?;
        if !eligible {
            warn!(
                "Reached max balance attempts ({}) for {}",
                self.rebalancer.ledger().max_attempts(),
                key
            );
            return Ok(());
        }

        if self.rebalancer.config().dry_run {
            info!("Dry run: would delete pod {:?} of {}", pods.first(), key);
            return Ok(());
        }

        self.rebalancer.rebalance(&key, pods).await
    }

    /// Group the running pods of a namespace using a fresh node snapshot
    pub async fn workload_groups(
        &self,
        namespace: &str,
    ) -> Result<BTreeMap<WorkloadKey, WorkloadGroup>> {
        let nodes: Vec<Node> = self
            .client
            .list(&ListParams::all())
            .await
            .map_err(|e| RebalanceError::listing(namespace, "nodes", e))?;
        let pods: Vec<Pod> = self
            .client
            .list(&ListParams::namespaced(namespace))
            .await
            .map_err(|e| RebalanceError::listing(namespace, "pods", e))?;

        let node_zones = index_node_zones(&nodes);
        debug!(
            "Namespace {}: {} pods across {} nodes, zone map {:?}",
            namespace,
            pods.len(),
            nodes.len(),
            node_zones
        );
        Ok(group_pods(namespace, &pods, &node_zones))
    }

    /// Describe every workload group without changing anything
    pub async fn inspect(
        &self,
        namespace_prefix: &str,
        install_type: InstallType,
    ) -> Result<InspectReport> {
        let multi_zone = self.probe.is_multi_zone().await?;

        let mut namespaces = Vec::new();
        for namespace in target_namespaces(namespace_prefix, install_type) {
            let report = match self.workload_groups(&namespace).await {
                Ok(groups) => {
                    let mut reports = Vec::with_capacity(groups.len());
                    for group in groups.into_values() {
                        reports.push(self.inspect_group(group).await);
                    }
                    NamespaceReport {
                        namespace,
                        groups: reports,
                        error: None,
                    }
                }
                Err(e) => NamespaceReport {
                    namespace,
                    groups: Vec::new(),
                    error: Some(e.to_string()),
                },
            };
            namespaces.push(report);
        }

        Ok(InspectReport {
            generated_at: Utc::now(),
            multi_zone,
            namespaces,
        })
    }

    async fn inspect_group(&self, group: WorkloadGroup) -> GroupReport {
        let imbalanced = is_imbalanced(&group);
        let mut report = GroupReport {
            workload: group.key.clone(),
            zones: group.zones.into_iter().collect(),
            pods: group.pods,
            imbalanced,
            attempts: None,
            eligible: None,
            error: None,
        };
        if !imbalanced {
            return report;
        }

        let ledger = self.rebalancer.ledger();
        let status = match self.rebalancer.resolver().fetch(&group.key).await {
            Ok(object) => RebalanceLedger::attempts(object.annotations())
                .and_then(|attempts| Ok((attempts, ledger.check_eligible(object.annotations())?)))
                .map_err(|e| RebalanceError::annotation_parse(&group.key, e)),
            Err(e) => Err(e),
        };

        match status {
            Ok((attempts, eligible)) => {
                report.attempts = Some(attempts.unwrap_or(0));
                report.eligible = Some(eligible);
            }
            Err(e) => report.error = Some(e.to_string()),
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use podbalancer_client::StorageObjectStore;
    use podbalancer_storage::RedbBackend;
    use tempfile::tempdir;

    struct FailingProbe;

    #[async_trait]
    impl TopologyProbe for FailingProbe {
        async fn is_multi_zone(&self) -> Result<bool> {
            Err(RebalanceError::topology(
                podbalancer_client::ClientError::transport("connection refused"),
            ))
        }
    }

    fn test_client(dir: &tempfile::TempDir) -> Client {
        let backend = Arc::new(RedbBackend::new(dir.path().join("snapshot.redb")).unwrap());
        Client::new(Arc::new(StorageObjectStore::new(backend)))
    }

    #[tokio::test]
    async fn test_probe_failure_aborts_pass() {
        let dir = tempdir().unwrap();
        let orchestrator = Orchestrator::new(
            test_client(&dir),
            Arc::new(FailingProbe),
            RebalancerConfig::default(),
        );

        let errors = orchestrator
            .reconcile_pod_distribution("test-", InstallType::ManagedApi)
            .await;
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors.errors()[0], RebalanceError::Topology { .. }));

        assert!(orchestrator
            .inspect("test-", InstallType::Managed)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_inspect_empty_cluster() {
        let dir = tempdir().unwrap();
        let client = test_client(&dir);
        let orchestrator = Orchestrator::new(
            client.clone(),
            Arc::new(crate::probe::NodeZoneProbe::new(client)),
            RebalancerConfig::default(),
        );

        let report = orchestrator
            .inspect("test-", InstallType::ManagedApi)
            .await
            .unwrap();
        assert!(!report.multi_zone);
        assert_eq!(report.namespaces.len(), 4);
        assert!(report.namespaces.iter().all(|ns| ns.groups.is_empty()));
    }
}
