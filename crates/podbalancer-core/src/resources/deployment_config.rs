use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

fn default_api_version() -> String {
    "apps.openshift.io/v1".to_string()
}

fn default_kind() -> String {
    "DeploymentConfig".to_string()
}

/// OpenShift `apps.openshift.io/v1` DeploymentConfig
///
/// k8s-openapi does not ship OpenShift types. Only the metadata is
/// interpreted here; `spec` and `status` are carried through untouched so an
/// update never drops fields owned by the DeploymentConfig controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentConfig {
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<serde_json::Value>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta::default(),
            spec: None,
            status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_opaque_spec_survives_round_trip() {
        let value = json!({
            "apiVersion": "apps.openshift.io/v1",
            "kind": "DeploymentConfig",
            "metadata": { "name": "dc1", "namespace": "ns1" },
            "spec": { "replicas": 3, "triggers": [{ "type": "ConfigChange" }] }
        });

        let dc: DeploymentConfig = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(dc.metadata.name.as_deref(), Some("dc1"));
        assert_eq!(serde_json::to_value(&dc).unwrap(), value);
    }

    #[test]
    fn test_missing_type_meta_is_defaulted() {
        let dc: DeploymentConfig =
            serde_json::from_value(json!({ "metadata": { "name": "dc1" } })).unwrap();
        assert_eq!(dc.api_version, "apps.openshift.io/v1");
        assert_eq!(dc.kind, "DeploymentConfig");
    }
}
