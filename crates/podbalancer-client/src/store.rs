use crate::error::{ClientError, Result};
use async_trait::async_trait;
use podbalancer_core::{GroupVersionKind, ResourceKey};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Options for listing objects of one kind
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    /// Restrict to one namespace; `None` lists across namespaces or cluster-scoped kinds
    pub namespace: Option<String>,
    /// Equality-based label selector
    pub label_selector: Option<LabelSelector>,
}

impl ListParams {
    /// List within a namespace
    pub fn namespaced(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            label_selector: None,
        }
    }

    /// List cluster-wide
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter by label selector
    pub fn with_selector(mut self, selector: LabelSelector) -> Self {
        self.label_selector = Some(selector);
        self
    }
}

/// One `key=value` or `key!=value` term of a label selector
#[derive(Debug, Clone, PartialEq, Eq)]
enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
}

/// Equality-based label selector, e.g. `app=web,tier!=cache`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    /// Whether the given labels satisfy every requirement
    pub fn matches(&self, labels: Option<&BTreeMap<String, String>>) -> bool {
        self.requirements.iter().all(|req| match req {
            Requirement::Equals(k, v) => labels.and_then(|l| l.get(k)) == Some(v),
            Requirement::NotEquals(k, v) => labels.and_then(|l| l.get(k)) != Some(v),
        })
    }

    /// Match against the `metadata.labels` of a raw object
    pub fn matches_object(&self, object: &Value) -> bool {
        let labels: Option<BTreeMap<String, String>> = object
            .get("metadata")
            .and_then(|m| m.get("labels"))
            .and_then(|l| serde_json::from_value(l.clone()).ok());
        self.matches(labels.as_ref())
    }
}

impl FromStr for LabelSelector {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let mut requirements = Vec::new();
        for term in s.split(',').map(str::trim).filter(|t| !t.is_empty()) {
            let requirement = if let Some((k, v)) = term.split_once("!=") {
                Requirement::NotEquals(k.trim().to_string(), v.trim().to_string())
            } else if let Some((k, v)) = term.split_once("==").or_else(|| term.split_once('=')) {
                Requirement::Equals(k.trim().to_string(), v.trim().to_string())
            } else {
                return Err(ClientError::invalid_resource(format!(
                    "Unsupported label selector term '{}'",
                    term
                )));
            };
            requirements.push(requirement);
        }
        Ok(Self { requirements })
    }
}

impl std::fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let terms: Vec<String> = self
            .requirements
            .iter()
            .map(|req| match req {
                Requirement::Equals(k, v) => format!("{}={}", k, v),
                Requirement::NotEquals(k, v) => format!("{}!={}", k, v),
            })
            .collect();
        write!(f, "{}", terms.join(","))
    }
}

/// Generic object store over raw JSON objects
///
/// Implementations enforce optimistic concurrency on `update`: an object
/// carrying a `metadata.resourceVersion` that no longer matches the stored
/// one is rejected with `ClientError::Conflict`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List objects of a kind
    async fn list(&self, gvk: &GroupVersionKind, params: &ListParams) -> Result<Vec<Value>>;

    /// Get one object
    async fn get(&self, key: &ResourceKey) -> Result<Value>;

    /// Create an object, failing if it already exists
    async fn create(&self, key: &ResourceKey, object: Value) -> Result<Value>;

    /// Replace an object, returning the stored result with its new resourceVersion
    async fn update(&self, key: &ResourceKey, object: Value) -> Result<Value>;

    /// Delete an object
    async fn delete(&self, key: &ResourceKey) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_label_selector_parse_and_match() {
        let selector: LabelSelector = "app=web, tier!=cache".parse().unwrap();

        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), "web".to_string());
        assert!(selector.matches(Some(&labels)));

        labels.insert("tier".to_string(), "cache".to_string());
        assert!(!selector.matches(Some(&labels)));

        assert!(!selector.matches(None));
        assert_eq!(selector.to_string(), "app=web,tier!=cache");
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let selector: LabelSelector = "".parse().unwrap();
        assert!(selector.matches(None));
        assert!(selector.matches_object(&json!({ "metadata": {} })));
    }

    #[test]
    fn test_label_selector_rejects_set_syntax() {
        assert!("app in (web)".parse::<LabelSelector>().is_err());
    }

    #[test]
    fn test_matches_object() {
        let selector: LabelSelector = "app==web".parse().unwrap();
        let object = json!({ "metadata": { "labels": { "app": "web" } } });
        assert!(selector.matches_object(&object));
    }
}
