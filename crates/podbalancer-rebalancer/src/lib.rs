//! Podbalancer Rebalancer - Zone-balance detection and correction
//!
//! This crate provides:
//! - Node address to zone indexing
//! - Grouping of running pods by their owning controller
//! - Detection of multi-replica workloads confined to a single zone
//! - A capped rebalance-attempt ledger persisted as an annotation
//! - Per-kind resolution of DeploymentConfigs, ReplicaSets and StatefulSets
//! - The pass orchestrator and a periodic controller loop

pub mod controller;
pub mod detector;
pub mod error;
pub mod grouper;
pub mod ledger;
pub mod namespaces;
pub mod orchestrator;
pub mod probe;
pub mod rebalancer;
pub mod resolver;
pub mod topology;

// Re-export primary types
pub use controller::{ControllerConfig, PodDistributionController};
pub use detector::{find_imbalanced, is_imbalanced};
pub use error::{AggregateError, RebalanceError, Result};
pub use grouper::{group_pods, WorkloadGroup, WorkloadKey, DEPLOYMENT_CONFIG_NAME_ANNOTATION};
pub use ledger::{AttemptCountError, RebalanceLedger, MAX_BALANCE_ATTEMPTS, POD_REBALANCE_ATTEMPTS};
pub use namespaces::{target_namespaces, InstallType};
pub use orchestrator::{GroupReport, InspectReport, NamespaceReport, Orchestrator};
pub use probe::{NodeZoneProbe, TopologyProbe};
pub use rebalancer::{Rebalancer, RebalancerConfig};
pub use resolver::{ControllerKind, ControllerObject, ObjectResolver};
pub use topology::{index_node_zones, NodeZones, ZONE_LABEL};
