//! Reactive read access for UI-layer consumers.

use std::sync::Arc;

use tokio::sync::watch;

use crate::snapshot::WalletStoreSnapshot;
use crate::store::{HookHandle, WalletStore};

/// Subscribe-and-read view of a [`WalletStore`].
///
/// Holds no state of its own; every call goes straight to the registry.
#[derive(Clone)]
pub struct WalletBinding {
    store: WalletStore,
}

/// Bind a consumer to `store`.
pub fn use_wallet(store: &WalletStore) -> WalletBinding {
    WalletBinding {
        store: store.clone(),
    }
}

impl WalletBinding {
    /// Be called with every new snapshot.
    pub fn subscribe<F>(&self, on_change: F) -> HookHandle
    where
        F: Fn(&Arc<WalletStoreSnapshot>) + Send + Sync + 'static,
    {
        self.store.hook(on_change)
    }

    /// The latest snapshot; stable until the next change.
    pub fn get_snapshot(&self) -> Arc<WalletStoreSnapshot> {
        self.store.get_snapshot()
    }

    /// Follow snapshots through a `tokio::sync::watch` channel.
    pub fn watch(&self) -> WalletWatch {
        let (tx, rx) = watch::channel(self.store.get_snapshot());
        let tx = Arc::new(tx);

        let hook_tx = tx.clone();
        let handle = self.store.hook(move |snapshot| {
            advance(&hook_tx, snapshot.clone());
        });
        // Catch a change that landed between seeding and hooking.
        advance(&tx, self.store.get_snapshot());

        WalletWatch {
            rx,
            handle: Some(handle),
        }
    }
}

/// Replace the watched value only with a newer snapshot.
fn advance(tx: &watch::Sender<Arc<WalletStoreSnapshot>>, snapshot: Arc<WalletStoreSnapshot>) {
    tx.send_if_modified(|current| {
        if snapshot.version > current.version {
            *current = snapshot;
            true
        } else {
            false
        }
    });
}

/// Async view of the snapshot stream. Unsubscribes when dropped.
pub struct WalletWatch {
    rx: watch::Receiver<Arc<WalletStoreSnapshot>>,
    handle: Option<HookHandle>,
}

impl WalletWatch {
    /// The most recent snapshot seen.
    pub fn current(&self) -> Arc<WalletStoreSnapshot> {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot.
    ///
    /// Returns `None` if the registry has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<WalletStoreSnapshot>> {
        self.rx.changed().await.ok()?;
        let snapshot = self.rx.borrow_and_update().clone();
        Some(snapshot)
    }

    /// Wait until a snapshot satisfies `predicate`, checking the current one first.
    pub async fn wait_for<P>(&mut self, mut predicate: P) -> Option<Arc<WalletStoreSnapshot>>
    where
        P: FnMut(&WalletStoreSnapshot) -> bool,
    {
        let snapshot = self.rx.wait_for(|s| predicate(s)).await.ok()?.clone();
        Some(snapshot)
    }
}

impl Drop for WalletWatch {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.unsubscribe();
        }
    }
}
