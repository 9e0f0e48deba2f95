use crate::grouper::{WorkloadGroup, WorkloadKey};
use std::collections::BTreeMap;
use tracing::warn;

/// A workload is imbalanced when several replicas share a single zone
pub fn is_imbalanced(group: &WorkloadGroup) -> bool {
    group.zones.len() == 1 && group.pods.len() > 1
}

/// Serialized keys and member pods of every imbalanced group
pub fn find_imbalanced(
    groups: &BTreeMap<WorkloadKey, WorkloadGroup>,
) -> BTreeMap<String, Vec<String>> {
    groups
        .values()
        .filter(|group| is_imbalanced(group))
        .map(|group| {
            warn!(
                "Requires pod rebalance: {} has {} pods in zone '{}'",
                group.key,
                group.pods.len(),
                group.zones.iter().next().map(String::as_str).unwrap_or("")
            );
            (group.key.to_string(), group.pods.clone())
        })
        .collect()
}
