//! Rebalance attempt ledger
//!
//! The number of corrective deletions made for a workload is stored on the
//! owning controller object itself, under [`POD_REBALANCE_ATTEMPTS`]. The
//! counter only ever grows; once it reaches the limit the workload is left
//! alone.

use std::collections::BTreeMap;
use std::num::ParseIntError;
use thiserror::Error;

/// Annotation key holding the attempt count
pub const POD_REBALANCE_ATTEMPTS: &str = "pod-rebalance-attempts";

/// Default attempt limit per workload
pub const MAX_BALANCE_ATTEMPTS: u32 = 3;

/// The annotation holds something other than a non-negative integer
#[derive(Debug, Error)]
#[error("'{value}' is not a valid attempt count")]
pub struct AttemptCountError {
    pub value: String,
    #[source]
    source: ParseIntError,
}

/// Reads and advances the attempt counter
#[derive(Debug, Clone, Copy)]
pub struct RebalanceLedger {
    max_attempts: u32,
}

impl Default for RebalanceLedger {
    fn default() -> Self {
        Self::new(MAX_BALANCE_ATTEMPTS)
    }
}

impl RebalanceLedger {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Current attempt count; `None` when never attempted
    pub fn attempts(
        annotations: Option<&BTreeMap<String, String>>,
    ) -> Result<Option<u32>, AttemptCountError> {
        let value = match annotations.and_then(|a| a.get(POD_REBALANCE_ATTEMPTS)) {
            Some(value) => value,
            None => return Ok(None),
        };

        value
            .parse::<u32>()
            .map(Some)
            .map_err(|source| AttemptCountError {
                value: value.clone(),
                source,
            })
    }

    /// Whether another attempt is allowed
    pub fn check_eligible(
        &self,
        annotations: Option<&BTreeMap<String, String>>,
    ) -> Result<bool, AttemptCountError> {
        Ok(Self::attempts(annotations)?.is_none_or(|count| count < self.max_attempts))
    }

    /// Annotations with the attempt counter advanced by one
    ///
    /// All other entries are preserved. A missing map or key starts at 1.
    pub fn increment(
        &self,
        annotations: Option<&BTreeMap<String, String>>,
    ) -> Result<BTreeMap<String, String>, AttemptCountError> {
        let next = Self::attempts(annotations)?.map_or(1, |count| count.saturating_add(1));

        let mut updated = annotations.cloned().unwrap_or_default();
        updated.insert(POD_REBALANCE_ATTEMPTS.to_string(), next.to_string());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_missing_annotations_are_eligible() {
        let ledger = RebalanceLedger::default();
        assert!(ledger.check_eligible(None).unwrap());
        assert!(ledger
            .check_eligible(Some(&annotations(&[("other", "x")])))
            .unwrap());
    }

    #[test]
    fn test_eligibility_limit() {
        let ledger = RebalanceLedger::default();
        for value in ["0", "1", "2"] {
            assert!(
                ledger
                    .check_eligible(Some(&annotations(&[(POD_REBALANCE_ATTEMPTS, value)])))
                    .unwrap(),
                "{}",
                value
            );
        }
        assert!(!ledger
            .check_eligible(Some(&annotations(&[(POD_REBALANCE_ATTEMPTS, "3")])))
            .unwrap());
        assert!(!ledger
            .check_eligible(Some(&annotations(&[(POD_REBALANCE_ATTEMPTS, "7")])))
            .unwrap());
    }

    #[test]
    fn test_custom_limit() {
        let ledger = RebalanceLedger::new(1);
        assert!(ledger.check_eligible(None).unwrap());
        assert!(!ledger
            .check_eligible(Some(&annotations(&[(POD_REBALANCE_ATTEMPTS, "1")])))
            .unwrap());
    }

    #[test]
    fn test_non_numeric_value_is_an_error() {
        let ledger = RebalanceLedger::default();
        let err = ledger
            .check_eligible(Some(&annotations(&[(POD_REBALANCE_ATTEMPTS, "abc")])))
            .unwrap_err();
        assert_eq!(err.value, "abc");

        assert!(ledger
            .increment(Some(&annotations(&[(POD_REBALANCE_ATTEMPTS, "-1")])))
            .is_err());
    }

    #[test]
    fn test_increment() {
        let ledger = RebalanceLedger::default();

        let first = ledger.increment(None).unwrap();
        assert_eq!(first.get(POD_REBALANCE_ATTEMPTS).unwrap(), "1");

        let second = ledger.increment(Some(&first)).unwrap();
        assert_eq!(second.get(POD_REBALANCE_ATTEMPTS).unwrap(), "2");

        let existing = annotations(&[("keep", "me"), (POD_REBALANCE_ATTEMPTS, "2")]);
        let next = ledger.increment(Some(&existing)).unwrap();
        assert_eq!(next.get(POD_REBALANCE_ATTEMPTS).unwrap(), "3");
        assert_eq!(next.get("keep").unwrap(), "me");
    }
}
