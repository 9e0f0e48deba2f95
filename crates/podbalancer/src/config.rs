use podbalancer_rebalancer::{ControllerConfig, InstallType, RebalancerConfig};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Optional YAML configuration file; CLI flags take precedence
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub namespace_prefix: Option<String>,
    pub install_type: Option<InstallType>,
    pub interval_secs: Option<u64>,
    pub settle_interval_secs: Option<u64>,
    pub settle_timeout_secs: Option<u64>,
    pub max_balance_attempts: Option<u32>,
    pub statefulset_conflict_retries: Option<u32>,
    pub conflict_backoff_ms: Option<u64>,
    pub dry_run: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> miette::Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| miette::miette!("Failed to read config {}: {}", path.display(), e))?;
        Self::parse(&data)
            .map_err(|e| miette::miette!("Invalid config {}: {}", path.display(), e))
    }

    pub fn parse(data: &str) -> Result<Self, serde_yaml::Error> {
        // An empty file deserializes to null
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(data)
    }

    pub fn rebalancer_config(&self, dry_run: bool) -> RebalancerConfig {
        let defaults = RebalancerConfig::default();
        RebalancerConfig {
            settle_interval: self
                .settle_interval_secs
                .map_or(defaults.settle_interval, Duration::from_secs),
            settle_timeout: self
                .settle_timeout_secs
                .map_or(defaults.settle_timeout, Duration::from_secs),
            max_balance_attempts: self
                .max_balance_attempts
                .unwrap_or(defaults.max_balance_attempts),
            statefulset_conflict_retries: self
                .statefulset_conflict_retries
                .unwrap_or(defaults.statefulset_conflict_retries),
            conflict_backoff: self
                .conflict_backoff_ms
                .map_or(defaults.conflict_backoff, Duration::from_millis),
            dry_run: dry_run || self.dry_run.unwrap_or(defaults.dry_run),
        }
    }

    pub fn controller_config(
        &self,
        namespace_prefix: Option<String>,
        install_type: Option<InstallType>,
        interval_secs: Option<u64>,
    ) -> ControllerConfig {
        let defaults = ControllerConfig::default();
        ControllerConfig {
            interval: interval_secs
                .or(self.interval_secs)
                .map_or(defaults.interval, Duration::from_secs),
            namespace_prefix: namespace_prefix
                .or_else(|| self.namespace_prefix.clone())
                .unwrap_or(defaults.namespace_prefix),
            install_type: install_type
                .or(self.install_type)
                .unwrap_or(defaults.install_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = FileConfig::parse("").unwrap();
        let rebalancer = config.rebalancer_config(false);
        assert_eq!(rebalancer.settle_interval, Duration::from_secs(5));
        assert_eq!(rebalancer.max_balance_attempts, 3);
        assert!(!rebalancer.dry_run);

        let controller = config.controller_config(None, None, None);
        assert_eq!(controller.interval, Duration::from_secs(300));
        assert_eq!(controller.install_type, InstallType::Managed);
    }

    #[test]
    fn test_flags_override_file() {
        let config = FileConfig::parse(
            "namespace_prefix: sandbox-\ninstall_type: managed-api\ninterval_secs: 60\nconflict_backoff_ms: 50\n",
        )
        .unwrap();

        let controller = config.controller_config(None, None, None);
        assert_eq!(controller.namespace_prefix, "sandbox-");
        assert_eq!(controller.install_type, InstallType::ManagedApi);
        assert_eq!(controller.interval, Duration::from_secs(60));

        let controller =
            config.controller_config(Some("prod-".to_string()), Some(InstallType::Workshop), Some(10));
        assert_eq!(controller.namespace_prefix, "prod-");
        assert_eq!(controller.install_type, InstallType::Workshop);
        assert_eq!(controller.interval, Duration::from_secs(10));

        assert_eq!(
            config.rebalancer_config(true).conflict_backoff,
            Duration::from_millis(50)
        );
        assert!(config.rebalancer_config(true).dry_run);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(FileConfig::parse("max_atempts: 4\n").is_err());
    }
}
