use crate::error::{RebalanceError, Result};
use crate::grouper::WorkloadKey;
use podbalancer_client::{Client, ClientError};
use podbalancer_core::{DeploymentConfig, ObjectMeta, ReplicaSet, Resource, StatefulSet};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Controller kinds that can be rebalanced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    DeploymentConfig,
    ReplicaSet,
    StatefulSet,
}

impl ControllerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DeploymentConfig => DeploymentConfig::KIND,
            Self::ReplicaSet => ReplicaSet::KIND,
            Self::StatefulSet => StatefulSet::KIND,
        }
    }

    /// Whether annotation writes re-read and retry after a version conflict
    ///
    /// StatefulSets are modified continuously by their own controller, so a
    /// conflict right after a pod deletion is expected there.
    pub fn retries_on_conflict(&self) -> bool {
        matches!(self, Self::StatefulSet)
    }
}

impl FromStr for ControllerKind {
    type Err = RebalanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "DeploymentConfig" => Ok(Self::DeploymentConfig),
            "ReplicaSet" => Ok(Self::ReplicaSet),
            "StatefulSet" => Ok(Self::StatefulSet),
            other => Err(RebalanceError::unsupported_kind(other)),
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fetched controller object
#[derive(Debug, Clone)]
pub enum ControllerObject {
    DeploymentConfig(DeploymentConfig),
    ReplicaSet(ReplicaSet),
    StatefulSet(StatefulSet),
}

impl ControllerObject {
    pub fn kind(&self) -> ControllerKind {
        match self {
            Self::DeploymentConfig(_) => ControllerKind::DeploymentConfig,
            Self::ReplicaSet(_) => ControllerKind::ReplicaSet,
            Self::StatefulSet(_) => ControllerKind::StatefulSet,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::DeploymentConfig(o) => o.metadata(),
            Self::ReplicaSet(o) => o.metadata(),
            Self::StatefulSet(o) => o.metadata(),
        }
    }

    fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Self::DeploymentConfig(o) => o.metadata_mut(),
            Self::ReplicaSet(o) => o.metadata_mut(),
            Self::StatefulSet(o) => o.metadata_mut(),
        }
    }

    pub fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata().annotations.as_ref()
    }

    pub fn set_annotations(&mut self, annotations: BTreeMap<String, String>) {
        self.metadata_mut().annotations = Some(annotations);
    }
}

/// Per-kind fetch and annotation update of controller objects
#[derive(Clone)]
pub struct ObjectResolver {
    client: Client,
    conflict_retries: u32,
    conflict_backoff: Duration,
}

impl ObjectResolver {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            conflict_retries: 5,
            conflict_backoff: Duration::from_millis(10),
        }
    }

    /// Configure the re-read retries used for kinds that retry on conflict
    pub fn with_conflict_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.conflict_retries = retries;
        self.conflict_backoff = backoff;
        self
    }

    /// Fetch the controller object a workload key names
    pub async fn fetch(&self, key: &WorkloadKey) -> Result<ControllerObject> {
        let kind: ControllerKind = key.kind.parse()?;
        if key.namespace.is_empty() || key.name.is_empty() {
            return Err(RebalanceError::fetch(
                key,
                ClientError::invalid_resource(format!("{} has an empty namespace or name", key)),
            ));
        }
        debug!("Fetching {} {}/{}", kind, key.namespace, key.name);

        let (namespace, name) = (key.namespace.as_str(), key.name.as_str());
        let object = match kind {
            ControllerKind::DeploymentConfig => self
                .client
                .get::<DeploymentConfig>(namespace, name)
                .await
                .map(ControllerObject::DeploymentConfig),
            ControllerKind::ReplicaSet => self
                .client
                .get::<ReplicaSet>(namespace, name)
                .await
                .map(ControllerObject::ReplicaSet),
            ControllerKind::StatefulSet => self
                .client
                .get::<StatefulSet>(namespace, name)
                .await
                .map(ControllerObject::StatefulSet),
        };

        object.map_err(|e| RebalanceError::fetch(key, e))
    }

    /// Persist a controller object as-is
    pub async fn update(
        &self,
        object: &ControllerObject,
    ) -> std::result::Result<ControllerObject, ClientError> {
        match object {
            ControllerObject::DeploymentConfig(o) => self
                .client
                .update(o)
                .await
                .map(ControllerObject::DeploymentConfig),
            ControllerObject::ReplicaSet(o) => {
                self.client.update(o).await.map(ControllerObject::ReplicaSet)
            }
            ControllerObject::StatefulSet(o) => {
                self.client.update(o).await.map(ControllerObject::StatefulSet)
            }
        }
    }

    /// Read the object, rewrite its annotations with `mutate` and write it back
    ///
    /// Kinds that retry on conflict re-read and reapply `mutate` up to the
    /// configured number of times; other kinds surface the first conflict.
    pub async fn update_annotations<F>(&self, key: &WorkloadKey, mutate: F) -> Result<ControllerObject>
    where
        F: Fn(Option<&BTreeMap<String, String>>) -> Result<BTreeMap<String, String>> + Send + Sync,
    {
        let kind: ControllerKind = key.kind.parse()?;
        let max_attempts = if kind.retries_on_conflict() {
            self.conflict_retries.saturating_add(1)
        } else {
            1
        };

        let mut attempt = 1;
        loop {
            let mut object = self.fetch(key).await?;
            let annotations = mutate(object.annotations())?;
            object.set_annotations(annotations);

            match self.update(&object).await {
                Ok(updated) => return Ok(updated),
                Err(e) if e.is_conflict() && attempt < max_attempts => {
                    warn!(
                        "Conflict updating {} (attempt {}/{}), re-reading: {}",
                        key, attempt, max_attempts, e
                    );
                    attempt += 1;
                    tokio::time::sleep(self.conflict_backoff).await;
                }
                Err(e) => return Err(RebalanceError::update(key, e)),
            }
        }
    }
}
