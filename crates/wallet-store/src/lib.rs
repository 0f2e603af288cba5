//! Registry of Lightning wallet configurations.
//!
//! This crate manages several mutually incompatible wallet backends behind
//! the single `LnWallet` interface from `wallet-core`:
//!
//! - [`WalletStore`] - Persisted configurations, lazy activation, one active wallet
//! - [`Connectors`] - Which connector builds each [`WalletKind`]
//! - [`WalletStoreSnapshot`] - Immutable views pushed to observers on every change
//! - [`use_wallet`] / [`WalletBinding`] - Subscribe-and-read access for UI code
//! - [`KeyValueStorage`] - Host persistence ([`MemoryStorage`], [`FileStorage`])
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use mock_wallet::MockConnector;
//! use wallet_store::{Connectors, MemoryStorage, WalletConfig, WalletKind, WalletStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connectors = Connectors::new().with(WalletKind::LndHub, Arc::new(MockConnector::new()));
//!     let store = WalletStore::new(Arc::new(MemoryStorage::new()), connectors);
//!
//!     let handle = store.hook(|snapshot| {
//!         println!("{} wallet(s), active: {:?}", snapshot.configs.len(), snapshot.active_id());
//!     });
//!
//!     store.add(
//!         WalletConfig::new("hub", WalletKind::LndHub)
//!             .with_data(r#"{"balance": 1000}"#)
//!             .activated(),
//!     )?;
//!
//!     if let Some(wallet) = store.get()? {
//!         println!("Balance: {} sats", wallet.get_balance().await?);
//!     }
//!
//!     handle.unsubscribe();
//!     store.free().await;
//!     Ok(())
//! }
//! ```

mod binding;
mod config;
mod connectors;
mod error;
mod snapshot;
mod storage;
mod store;

pub use binding::{use_wallet, WalletBinding, WalletWatch};
pub use config::StoreConfig;
pub use connectors::Connectors;
pub use error::StoreError;
pub use snapshot::{HookFn, WalletStoreSnapshot};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError, DEFAULT_CONFIG_KEY};
pub use store::{HookHandle, WalletStore, INJECTED_PROVIDER_ID};

// Re-export wallet-core types for convenience
pub use wallet_core::{
    LnWallet, WalletConfig, WalletConnector, WalletError, WalletErrorCode, WalletInfo, WalletKind,
};
