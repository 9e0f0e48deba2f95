//! Podbalancer Client - Object store access for cluster resources
//!
//! This crate provides:
//! - `ObjectStore`, the list/get/update/delete capability the rebalancer consumes
//! - A typed `Client` over any `ObjectStore`
//! - `StorageObjectStore`, backed by the embedded redb snapshot store
//! - `ApiClient`, speaking the Kubernetes REST conventions over HTTP

// Allow unused assignments for diagnostic fields - they're used by the thiserror/miette macros
#![allow(unused_assignments)]

pub mod api_client;
pub mod client;
pub mod error;
pub mod storage_store;
pub mod store;

// Re-export primary types
pub use api_client::ApiClient;
pub use client::Client;
pub use error::{ClientError, Result};
pub use storage_store::StorageObjectStore;
pub use store::{LabelSelector, ListParams, ObjectStore};
