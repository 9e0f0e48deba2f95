//! Podbalancer Storage - Embedded key-value storage for cluster snapshots
//!
//! This crate provides:
//! - KVStore trait for storage abstraction
//! - redb-based implementation
//! - Key encoding for resource keys
//! - Transaction support

pub mod encoding;
pub mod error;
pub mod kv;
pub mod redb_backend;

// Re-export commonly used types
pub use encoding::KeyEncoder;
pub use error::{Result, StorageError};
pub use kv::{KVStore, Transaction};
pub use redb_backend::RedbBackend;
