//! Configuration for opening a registry on disk.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use crate::connectors::Connectors;
use crate::storage::{FileStorage, DEFAULT_CONFIG_KEY};
use crate::store::WalletStore;

/// Where the registry keeps its configuration list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding the storage files.
    pub storage_dir: PathBuf,
    /// Storage key for the configuration list.
    pub storage_key: String,
}

impl StoreConfig {
    /// Use `storage_dir` with the default key.
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
            storage_key: DEFAULT_CONFIG_KEY.to_string(),
        }
    }

    /// Override the storage key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `WALLET_STORE_DIR` (default: ./data/wallets)
    /// - `WALLET_STORE_KEY` (default: wallet-config)
    pub fn from_env() -> Self {
        let storage_dir = env::var("WALLET_STORE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/wallets"));
        let storage_key =
            env::var("WALLET_STORE_KEY").unwrap_or_else(|_| DEFAULT_CONFIG_KEY.to_string());

        Self {
            storage_dir,
            storage_key,
        }
    }

    /// Open a file-backed registry with the given connectors.
    pub fn open(&self, connectors: Connectors) -> WalletStore {
        let storage = Arc::new(FileStorage::new(&self.storage_dir));
        WalletStore::with_key(storage, connectors, self.storage_key.clone())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("./data/wallets")
    }
}
