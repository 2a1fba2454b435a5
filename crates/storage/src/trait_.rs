//! Storage trait abstraction.

use async_trait::async_trait;
use ebs_core::{CoreError, Store};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot parsed but breaks a model invariant
    #[error("Corrupt snapshot: {0}")]
    Corrupt(#[from] CoreError),
}

/// Durable home of the task store snapshot.
///
/// This trait allows different storage backends to be plugged in. A backend
/// stores exactly one snapshot and always replaces it whole.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Read the snapshot, or an empty store when none has been written yet.
    async fn load_store(&self) -> Result<Store>;

    /// Replace the snapshot. Readers never observe a partial write.
    async fn save_store(&mut self, store: &Store) -> Result<()>;
}
