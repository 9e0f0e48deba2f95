use crate::error::{RebalanceError, Result};
use crate::topology::NodeZones;
use podbalancer_core::{OwnerReference, Pod};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::trace;

/// Pod annotation naming the DeploymentConfig behind a ReplicationController
pub const DEPLOYMENT_CONFIG_NAME_ANNOTATION: &str = "openshift.io/deployment-config.name";

const RUNNING: &str = "Running";
const REPLICATION_CONTROLLER: &str = "ReplicationController";
const DEPLOYMENT_CONFIG: &str = "DeploymentConfig";

/// Identity of the controller object a group of pods belongs to
///
/// Serialized as `Kind/Namespace/Name`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkloadKey {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl WorkloadKey {
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

impl FromStr for WorkloadKey {
    type Err = RebalanceError;

    fn from_str(s: &str) -> Result<Self> {
        let segments: Vec<&str> = s.split('/').collect();
        match segments.as_slice() {
            [kind, namespace, name] => Ok(Self::new(*kind, *namespace, *name)),
            _ => Err(RebalanceError::key_parse(s)),
        }
    }
}

impl Serialize for WorkloadKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Running pods of one controller and the zones they occupy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadGroup {
    pub key: WorkloadKey,
    /// Distinct zones hosting members; the empty string stands for unknown
    pub zones: BTreeSet<String>,
    /// Member pod names in scan order
    pub pods: Vec<String>,
}

impl WorkloadGroup {
    fn new(key: WorkloadKey) -> Self {
        Self {
            key,
            zones: BTreeSet::new(),
            pods: Vec::new(),
        }
    }
}

/// First owner reference flagged as the controller
fn controller_ref(pod: &Pod) -> Option<&OwnerReference> {
    pod.metadata
        .owner_references
        .as_ref()?
        .iter()
        .find(|r| r.controller == Some(true))
}

/// Group identity for a pod's controller
///
/// ReplicationControllers are attributed to the DeploymentConfig named in the
/// pod's own annotation rather than by fetching the ReplicationController.
fn workload_key(namespace: &str, pod: &Pod, owner: &OwnerReference) -> WorkloadKey {
    if owner.kind == REPLICATION_CONTROLLER {
        let name = pod
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(DEPLOYMENT_CONFIG_NAME_ANNOTATION))
            .cloned()
            .unwrap_or_default();
        return WorkloadKey::new(DEPLOYMENT_CONFIG, namespace, name);
    }

    WorkloadKey::new(owner.kind.clone(), namespace, owner.name.clone())
}

/// Group running, controller-owned pods by their owning workload
pub fn group_pods(
    namespace: &str,
    pods: &[Pod],
    node_zones: &NodeZones,
) -> BTreeMap<WorkloadKey, WorkloadGroup> {
    let mut groups: BTreeMap<WorkloadKey, WorkloadGroup> = BTreeMap::new();

    for pod in pods {
        let status = pod.status.as_ref();
        if status.and_then(|s| s.phase.as_deref()) != Some(RUNNING) {
            continue;
        }

        let (Some(name), Some(owner)) = (pod.metadata.name.as_ref(), controller_ref(pod)) else {
            continue;
        };

        let key = workload_key(namespace, pod, owner);
        let zone = node_zones.zone_for(status.and_then(|s| s.host_ip.as_deref()));
        trace!("Pod {} of {} runs in zone '{}'", name, key, zone);

        let group = groups
            .entry(key.clone())
            .or_insert_with(|| WorkloadGroup::new(key));
        group.zones.insert(zone.to_string());
        group.pods.push(name.clone());
    }

    groups
}
