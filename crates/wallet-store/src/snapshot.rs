//! Immutable registry snapshots and the observer list.

use std::fmt;
use std::sync::Arc;

use wallet_core::{LnWallet, WalletConfig};

/// A point-in-time view of the registry.
///
/// A new snapshot is built on every observable change; existing snapshots
/// are never modified.
#[derive(Clone)]
pub struct WalletStoreSnapshot {
    /// Increases by one with every snapshot a registry produces.
    pub version: u64,
    /// All configurations, in registry order.
    pub configs: Vec<WalletConfig>,
    /// The active configuration, if any.
    pub config: Option<WalletConfig>,
    /// The active wallet, once it has been activated.
    pub wallet: Option<Arc<dyn LnWallet>>,
}

impl WalletStoreSnapshot {
    pub(crate) fn empty() -> Self {
        Self {
            version: 0,
            configs: Vec::new(),
            config: None,
            wallet: None,
        }
    }

    /// Id of the active configuration.
    pub fn active_id(&self) -> Option<&str> {
        self.config.as_ref().map(|c| c.id.as_str())
    }

    /// Whether a live wallet is available.
    pub fn has_wallet(&self) -> bool {
        self.wallet.is_some()
    }
}

impl fmt::Debug for WalletStoreSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletStoreSnapshot")
            .field("version", &self.version)
            .field("configs", &self.configs)
            .field("config", &self.active_id())
            .field("wallet", &self.wallet.as_ref().map(|w| w.name()))
            .finish()
    }
}

/// Observer callback.
pub type HookFn = Arc<dyn Fn(&Arc<WalletStoreSnapshot>) + Send + Sync>;

#[derive(Clone)]
pub(crate) struct Hook {
    pub(crate) id: u64,
    pub(crate) callback: HookFn,
}

/// Copy-on-write list of observers.
///
/// Adding or removing an observer builds a new list, so a delivery that
/// is already iterating keeps the list it started with.
#[derive(Clone, Default)]
pub(crate) struct HookList {
    hooks: Arc<Vec<Hook>>,
}

impl HookList {
    pub(crate) fn with(&self, hook: Hook) -> Self {
        let mut hooks = Vec::with_capacity(self.hooks.len() + 1);
        hooks.extend(self.hooks.iter().cloned());
        hooks.push(hook);
        Self {
            hooks: Arc::new(hooks),
        }
    }

    pub(crate) fn without(&self, id: u64) -> Self {
        let hooks = self.hooks.iter().filter(|h| h.id != id).cloned().collect();
        Self {
            hooks: Arc::new(hooks),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Call every observer in registration order.
    pub(crate) fn notify(&self, snapshot: &Arc<WalletStoreSnapshot>) {
        for hook in self.hooks.iter() {
            (hook.callback)(snapshot);
        }
    }
}
