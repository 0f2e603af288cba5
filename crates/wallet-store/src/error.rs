//! Error types for the wallet registry.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors returned by registry operations.
///
/// Backend failures are not represented here: they come back from the
/// wallet returned by [`crate::WalletStore::get`] as `WalletError`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No configuration has the given id.
    #[error("Wallet not found: {0}")]
    NotFound(String),

    /// Configurations exist but none of them is active.
    #[error("No active wallet config")]
    NoActiveConfig,

    /// A configuration with this id is already registered.
    #[error("Wallet already exists: {0}")]
    DuplicateId(String),

    /// Writing the configuration list failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Serializing the configuration list failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
