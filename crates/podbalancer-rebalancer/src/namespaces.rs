use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Product installation flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallType {
    #[default]
    Managed,
    ManagedApi,
    SelfManaged,
    Workshop,
}

impl InstallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Managed => "managed",
            Self::ManagedApi => "managed-api",
            Self::SelfManaged => "self-managed",
            Self::Workshop => "workshop",
        }
    }
}

impl FromStr for InstallType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "managed" => Ok(Self::Managed),
            "managed-api" => Ok(Self::ManagedApi),
            "self-managed" => Ok(Self::SelfManaged),
            "workshop" => Ok(Self::Workshop),
            other => Err(format!(
                "unknown install type '{}' (expected managed, managed-api, self-managed or workshop)",
                other
            )),
        }
    }
}

impl fmt::Display for InstallType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespaces whose workloads are kept zone-balanced
pub fn target_namespaces(prefix: &str, install_type: InstallType) -> Vec<String> {
    let mut namespaces = vec![
        format!("{}3scale", prefix),
        format!("{}rhsso", prefix),
        format!("{}user-sso", prefix),
    ];
    if install_type == InstallType::ManagedApi {
        namespaces.push(format!("{}marin3r", prefix));
    }
    namespaces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_namespaces() {
        assert_eq!(
            target_namespaces("redhat-rhoam-", InstallType::Managed),
            vec!["redhat-rhoam-3scale", "redhat-rhoam-rhsso", "redhat-rhoam-user-sso"]
        );

        let managed_api = target_namespaces("redhat-rhoam-", InstallType::ManagedApi);
        assert_eq!(managed_api.len(), 4);
        assert_eq!(managed_api[3], "redhat-rhoam-marin3r");
    }

    #[test]
    fn test_install_type_parsing() {
        for install_type in [
            InstallType::Managed,
            InstallType::ManagedApi,
            InstallType::SelfManaged,
            InstallType::Workshop,
        ] {
            assert_eq!(install_type.as_str().parse::<InstallType>().unwrap(), install_type);
        }
        assert!("rhmi".parse::<InstallType>().is_err());
    }

    #[test]
    fn test_install_type_yaml() {
        let parsed: InstallType = serde_yaml::from_str("managed-api").unwrap();
        assert_eq!(parsed, InstallType::ManagedApi);
    }
}
