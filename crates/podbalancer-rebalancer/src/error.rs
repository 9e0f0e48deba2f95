// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use crate::ledger::AttemptCountError;
use miette::Diagnostic;
use podbalancer_client::ClientError;
use std::time::Duration;
use thiserror::Error;

/// Rebalancer error type
#[derive(Error, Debug, Diagnostic)]
pub enum RebalanceError {
    /// The multi-zone check could not be answered
    #[error("Failed to determine whether the cluster spans multiple zones: {source}")]
    #[diagnostic(
        code(rebalancer::topology),
        help("Check that nodes can be listed and carry the topology.kubernetes.io/zone label")
    )]
    Topology {
        #[source]
        source: ClientError,
    },

    /// Nodes or pods could not be listed for a namespace
    #[error("Failed to list {resource} for namespace {namespace}: {source}")]
    #[diagnostic(
        code(rebalancer::listing),
        help("The namespace is skipped for this pass; other namespaces are still processed")
    )]
    Listing {
        namespace: String,
        resource: String,
        #[source]
        source: ClientError,
    },

    /// A workload key did not have exactly three segments
    #[error("Error parsing workload key '{key}': expected Kind/namespace/name")]
    #[diagnostic(
        code(rebalancer::key_parse),
        help("The deployment-config annotation on the pod may contain a '/'")
    )]
    KeyParse { key: String },

    /// The owning controller object could not be fetched
    #[error("Error getting owner object {workload}: {source}")]
    #[diagnostic(
        code(rebalancer::fetch),
        help("The controller may have been deleted since its pods were listed")
    )]
    Fetch {
        workload: String,
        #[source]
        source: ClientError,
    },

    /// The attempt annotation does not hold an integer
    #[error("Error converting annotation value '{value}' on {workload} to an attempt count")]
    #[diagnostic(
        code(rebalancer::annotation_parse),
        help("Fix or remove the pod-rebalance-attempts annotation on the object")
    )]
    AnnotationParse {
        workload: String,
        value: String,
        #[source]
        source: AttemptCountError,
    },

    /// The owner kind has no rebalancing support
    #[error("Unsupported owner kind {kind}")]
    #[diagnostic(
        code(rebalancer::unsupported_kind),
        help("Only DeploymentConfig, ReplicaSet and StatefulSet owners are rebalanced")
    )]
    UnsupportedKind { kind: String },

    /// The attempt counter write lost an optimistic concurrency race
    #[error("Conflict recording rebalance attempt on {workload}: {source}")]
    #[diagnostic(
        code(rebalancer::update_conflict),
        help("The object was modified concurrently; the next pass will retry")
    )]
    UpdateConflict {
        workload: String,
        #[source]
        source: ClientError,
    },

    /// The attempt counter write failed
    #[error("Error updating {workload}: {source}")]
    #[diagnostic(
        code(rebalancer::update),
        help("Check connectivity to the cluster and write permissions on the object")
    )]
    Update {
        workload: String,
        #[source]
        source: ClientError,
    },

    /// The settle window expired before the attempt counter was written
    #[error("Timed out after {timeout:?} recording rebalance attempt on {workload}")]
    #[diagnostic(
        code(rebalancer::settle_timeout),
        help("Increase the settle timeout if the API server is slow to respond")
    )]
    SettleTimeout { workload: String, timeout: Duration },
}

/// Result type for rebalancer operations
pub type Result<T> = std::result::Result<T, RebalanceError>;

impl RebalanceError {
    /// Create a Topology error
    pub fn topology(source: ClientError) -> Self {
        Self::Topology { source }
    }

    /// Create a Listing error
    pub fn listing(
        namespace: impl Into<String>,
        resource: impl Into<String>,
        source: ClientError,
    ) -> Self {
        Self::Listing {
            namespace: namespace.into(),
            resource: resource.into(),
            source,
        }
    }

    /// Create a KeyParse error
    pub fn key_parse(key: impl Into<String>) -> Self {
        Self::KeyParse { key: key.into() }
    }

    /// Create a Fetch error
    pub fn fetch(workload: impl ToString, source: ClientError) -> Self {
        Self::Fetch {
            workload: workload.to_string(),
            source,
        }
    }

    /// Create an AnnotationParse error
    pub fn annotation_parse(workload: impl ToString, source: AttemptCountError) -> Self {
        Self::AnnotationParse {
            workload: workload.to_string(),
            value: source.value.clone(),
            source,
        }
    }

    /// Create an UnsupportedKind error
    pub fn unsupported_kind(kind: impl Into<String>) -> Self {
        Self::UnsupportedKind { kind: kind.into() }
    }

    /// Classify a failed write as a conflict or a plain update error
    pub fn update(workload: impl ToString, source: ClientError) -> Self {
        if source.is_conflict() {
            Self::UpdateConflict {
                workload: workload.to_string(),
                source,
            }
        } else {
            Self::Update {
                workload: workload.to_string(),
                source,
            }
        }
    }

    /// Create a SettleTimeout error
    pub fn settle_timeout(workload: impl ToString, timeout: Duration) -> Self {
        Self::SettleTimeout {
            workload: workload.to_string(),
            timeout,
        }
    }
}

/// Every error collected during one reconcile pass
///
/// A pass keeps going after per-namespace and per-workload failures, so the
/// caller receives all of them at once. An empty aggregate means success.
#[derive(Error, Debug, Diagnostic, Default)]
#[error("{} error(s) during pod distribution reconcile: {}", .errors.len(), join(.errors))]
#[diagnostic(code(rebalancer::aggregate))]
pub struct AggregateError {
    #[related]
    errors: Vec<RebalanceError>,
}

fn join(errors: &[RebalanceError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: RebalanceError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[RebalanceError] {
        &self.errors
    }

    /// `Ok(())` when nothing was collected
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<RebalanceError> for AggregateError {
    fn from(error: RebalanceError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl IntoIterator for AggregateError {
    type Item = RebalanceError;
    type IntoIter = std::vec::IntoIter<RebalanceError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}
