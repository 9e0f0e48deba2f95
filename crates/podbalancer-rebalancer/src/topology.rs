use podbalancer_core::Node;
use std::collections::HashMap;

/// Node label carrying the availability zone
pub const ZONE_LABEL: &str = "topology.kubernetes.io/zone";

/// Node address type used to match pods to nodes
const INTERNAL_IP: &str = "InternalIP";

/// Map from a node's internal IP address to its zone label
///
/// Nodes without an InternalIP are left out. Nodes without a zone label map
/// to the empty zone.
#[derive(Debug, Clone, Default)]
pub struct NodeZones {
    zones: HashMap<String, String>,
}

impl NodeZones {
    /// Zone for a pod's host address, empty when unknown
    pub fn zone_for(&self, host_ip: Option<&str>) -> &str {
        host_ip
            .and_then(|ip| self.zones.get(ip))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Build the address to zone index from a node listing
pub fn index_node_zones(nodes: &[Node]) -> NodeZones {
    let mut zones = HashMap::with_capacity(nodes.len());

    for node in nodes {
        let address = node
            .status
            .as_ref()
            .and_then(|s| s.addresses.as_ref())
            .and_then(|addrs| addrs.iter().find(|a| a.type_ == INTERNAL_IP));

        let Some(address) = address else {
            continue;
        };

        let zone = node
            .metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(ZONE_LABEL))
            .cloned()
            .unwrap_or_default();

        zones.insert(address.address.clone(), zone);
    }

    NodeZones { zones }
}
