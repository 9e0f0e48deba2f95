use crate::error::Result;
use crate::namespaces::InstallType;
use crate::orchestrator::Orchestrator;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Configuration for the periodic pod distribution controller
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Interval between reconcile passes
    pub interval: Duration,
    /// Prefix shared by the product namespaces
    pub namespace_prefix: String,
    pub install_type: InstallType,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            namespace_prefix: "redhat-rhoam-".to_string(),
            install_type: InstallType::default(),
        }
    }
}

/// Runs a reconcile pass every interval until cancelled
pub struct PodDistributionController {
    orchestrator: Arc<Orchestrator>,
    config: ControllerConfig,
}

impl PodDistributionController {
    pub fn new(orchestrator: Arc<Orchestrator>, config: ControllerConfig) -> Self {
        Self {
            orchestrator,
            config,
        }
    }

    /// Run the controller loop
    ///
    /// The first pass starts immediately. A failed pass is logged and the
    /// next one is still scheduled.
    pub async fn run(&self, token: CancellationToken) -> Result<()> {
        info!(
            "Starting pod distribution controller (interval: {:?}, prefix: {}, install type: {})",
            self.config.interval, self.config.namespace_prefix, self.config.install_type
        );

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Pod distribution controller shutting down");
                    return Ok(());
                }
                _ = interval.tick() => {
                    self.reconcile_once().await;
                }
            }
        }
    }

    async fn reconcile_once(&self) {
        let errors = self
            .orchestrator
            .reconcile_pod_distribution(&self.config.namespace_prefix, self.config.install_type)
            .await;

        for e in errors {
            error!("Pod distribution error: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RebalanceError;
    use crate::probe::TopologyProbe;
    use crate::rebalancer::RebalancerConfig;
    use async_trait::async_trait;
    use podbalancer_client::{Client, ClientError, StorageObjectStore};
    use podbalancer_storage::RedbBackend;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    /// Fails every time and counts how often it was asked
    struct CountingProbe {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TopologyProbe for CountingProbe {
        async fn is_multi_zone(&self) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(RebalanceError::topology(ClientError::transport("unreachable")))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_passes_do_not_stop_the_loop() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(RedbBackend::new(dir.path().join("snapshot.redb")).unwrap());
        let client = Client::new(Arc::new(StorageObjectStore::new(backend)));

        let calls = Arc::new(AtomicUsize::new(0));
        let orchestrator = Arc::new(Orchestrator::new(
            client,
            Arc::new(CountingProbe {
                calls: calls.clone(),
            }),
            RebalancerConfig::default(),
        ));
        let controller = PodDistributionController::new(
            orchestrator,
            ControllerConfig {
                interval: Duration::from_secs(60),
                ..Default::default()
            },
        );

        let token = CancellationToken::new();
        let handle = {
            let token = token.clone();
            tokio::spawn(async move { controller.run(token).await })
        };

        tokio::time::sleep(Duration::from_secs(150)).await;
        token.cancel();
        handle.await.unwrap().unwrap();

        // Passes at t=0, 60s and 120s
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
