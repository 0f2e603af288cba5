//! Integration tests for the wallet registry.
//!
//! All backends are in-memory mocks, so these run without a Lightning node:
//!   cargo test -p wallet-store --test registry_tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mock_wallet::{DeferredConnector, FailingConnector, Gate, MockConnector};
use tokio::sync::mpsc;
use tokio::time::timeout;
use wallet_store::{
    Connectors, FileStorage, HookHandle, KeyValueStorage, MemoryStorage, StorageError, StoreError,
    WalletConfig, WalletError, WalletKind, WalletStore, WalletStoreSnapshot, DEFAULT_CONFIG_KEY,
    INJECTED_PROVIDER_ID,
};

/// Helper: registry over fresh memory storage where every kind builds mock wallets.
fn mock_store() -> (WalletStore, Arc<MemoryStorage>, Arc<MockConnector>) {
    let storage = Arc::new(MemoryStorage::new());
    let mock = Arc::new(MockConnector::new());
    let store = WalletStore::new(storage.clone(), Connectors::uniform(mock.clone()));
    (store, storage, mock)
}

/// Helper: ids of the active configurations.
fn active_ids(store: &WalletStore) -> Vec<String> {
    store
        .list()
        .into_iter()
        .filter(|c| c.active)
        .map(|c| c.id)
        .collect()
}

/// Helper: forward every snapshot into a channel.
fn channel_hook(
    store: &WalletStore,
) -> (HookHandle, mpsc::UnboundedReceiver<Arc<WalletStoreSnapshot>>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = store.hook(move |snapshot| {
        let _ = tx.send(snapshot.clone());
    });
    (handle, rx)
}

/// Helper: wait for a snapshot matching `predicate`.
async fn next_matching<P>(
    rx: &mut mpsc::UnboundedReceiver<Arc<WalletStoreSnapshot>>,
    predicate: P,
) -> Arc<WalletStoreSnapshot>
where
    P: Fn(&WalletStoreSnapshot) -> bool,
{
    timeout(Duration::from_secs(5), async {
        loop {
            let snapshot = rx.recv().await.expect("hook channel closed");
            if predicate(&snapshot) {
                return snapshot;
            }
        }
    })
    .await
    .expect("timed out waiting for snapshot")
}

/// Helper: poll `condition` until it holds or five seconds pass.
async fn eventually<F: Fn() -> bool>(condition: F) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never became true");
}

/// Storage whose writes can be switched off.
#[derive(Default)]
struct FlakyStorage {
    inner: MemoryStorage,
    broken: AtomicBool,
}

impl KeyValueStorage for FlakyStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("quota exceeded".to_string()));
        }
        self.inner.set_item(key, value)
    }
}

// ============================================================================
// Configuration list
// ============================================================================

mod config_tests {
    use super::*;

    #[tokio::test]
    async fn test_add_persists_and_lists() {
        let (store, storage, _) = mock_store();

        store
            .add(WalletConfig::new("a", WalletKind::LndHub).with_alias("Hub"))
            .unwrap();
        store.add(WalletConfig::new("b", WalletKind::Nwc)).unwrap();

        let ids: Vec<String> = store.list().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a", "b"]);

        let raw = storage.get_item(DEFAULT_CONFIG_KEY).unwrap().unwrap();
        let persisted: Vec<WalletConfig> = serde_json::from_str(&raw).unwrap();
        assert_eq!(persisted, store.list());
        assert_eq!(persisted[0].info.alias, "Hub");
    }

    #[tokio::test]
    async fn test_add_inactive_does_not_activate() {
        let (store, _, mock) = mock_store();

        store.add(WalletConfig::new("a", WalletKind::LndHub)).unwrap();

        assert!(active_ids(&store).is_empty());
        assert!(matches!(store.get(), Err(StoreError::NoActiveConfig)));
        assert_eq!(mock.build_count(), 0);
    }

    #[tokio::test]
    async fn test_add_duplicate_id_rejected() {
        let (store, storage, _) = mock_store();
        store.add(WalletConfig::new("a", WalletKind::LndHub)).unwrap();
        let writes = storage.write_count();

        let err = store
            .add(WalletConfig::new("a", WalletKind::Cashu))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(id) if id == "a"));
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.list()[0].kind, WalletKind::LndHub);
        assert_eq!(storage.write_count(), writes);
    }

    #[tokio::test]
    async fn test_add_active_deactivates_others() {
        let (store, _, _) = mock_store();
        store
            .add(WalletConfig::new("a", WalletKind::LndHub).activated())
            .unwrap();
        store
            .add(WalletConfig::new("b", WalletKind::Cashu).activated())
            .unwrap();

        assert_eq!(active_ids(&store), vec!["b"]);
    }

    #[tokio::test]
    async fn test_at_most_one_active_across_operations() {
        let (store, _, _) = mock_store();

        store
            .add(WalletConfig::new("a", WalletKind::LndHub).activated())
            .unwrap();
        assert!(active_ids(&store).len() <= 1);
        store.add(WalletConfig::new("b", WalletKind::Lnc)).unwrap();
        assert!(active_ids(&store).len() <= 1);
        store
            .add(WalletConfig::new("c", WalletKind::Nwc).activated())
            .unwrap();
        assert!(active_ids(&store).len() <= 1);
        store.switch("b").unwrap();
        assert!(active_ids(&store).len() <= 1);
        store.remove("b").unwrap();
        assert!(active_ids(&store).len() <= 1);
        store.sync_injected_provider(true).unwrap();
        assert!(active_ids(&store).len() <= 1);
        store.switch(INJECTED_PROVIDER_ID).unwrap();
        assert!(active_ids(&store).len() <= 1);
        store.sync_injected_provider(false).unwrap();
        assert!(active_ids(&store).len() <= 1);
        store.load(true);
        assert!(active_ids(&store).len() <= 1);
    }

    #[tokio::test]
    async fn test_remove_active_promotes_first() {
        let (store, _, _) = mock_store();
        store.add(WalletConfig::new("a", WalletKind::LndHub)).unwrap();
        store
            .add(WalletConfig::new("b", WalletKind::Cashu).activated())
            .unwrap();
        store.add(WalletConfig::new("c", WalletKind::Nwc)).unwrap();

        store.remove("b").unwrap();

        assert_eq!(active_ids(&store), vec!["a"]);
        assert_eq!(store.list().len(), 2);
    }

    #[tokio::test]
    async fn test_remove_inactive_keeps_active() {
        let (store, _, _) = mock_store();
        store
            .add(WalletConfig::new("a", WalletKind::LndHub).activated())
            .unwrap();
        store.add(WalletConfig::new("b", WalletKind::Cashu)).unwrap();

        store.remove("b").unwrap();
        assert_eq!(active_ids(&store), vec!["a"]);
    }

    #[tokio::test]
    async fn test_remove_missing_is_noop() {
        let (store, storage, _) = mock_store();
        store
            .add(WalletConfig::new("a", WalletKind::LndHub).activated())
            .unwrap();
        let before = store.get_snapshot();
        let writes = storage.write_count();

        let err = store.remove("nope").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(id) if id == "nope"));
        assert_eq!(storage.write_count(), writes);
        assert!(Arc::ptr_eq(&before, &store.get_snapshot()));
    }

    #[tokio::test]
    async fn test_switch_unknown_id_is_noop() {
        let (store, storage, _) = mock_store();
        store
            .add(WalletConfig::new("a", WalletKind::LndHub).activated())
            .unwrap();
        let writes = storage.write_count();

        let err = store.switch("missing").unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(active_ids(&store), vec!["a"]);
        assert_eq!(storage.write_count(), writes);
    }

    #[tokio::test]
    async fn test_storage_failure_leaves_state_unchanged() {
        let storage = Arc::new(FlakyStorage::default());
        let store = WalletStore::new(
            storage.clone(),
            Connectors::uniform(Arc::new(MockConnector::new())),
        );
        store
            .add(WalletConfig::new("a", WalletKind::LndHub).activated())
            .unwrap();
        let before = store.get_snapshot();

        storage.broken.store(true, Ordering::SeqCst);
        let err = store.add(WalletConfig::new("b", WalletKind::Cashu)).unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
        assert!(store.switch("a").is_err());
        assert!(store.save().is_err());

        assert_eq!(store.list().len(), 1);
        assert!(Arc::ptr_eq(&before, &store.get_snapshot()));
    }
}

// ============================================================================
// Activation
// ============================================================================

mod activation_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_empty_registry() {
        let (store, _, mock) = mock_store();
        assert!(store.get().unwrap().is_none());
        assert!(!store.is_loading());
        assert_eq!(mock.build_count(), 0);
    }

    #[tokio::test]
    async fn test_get_caches_ready_wallet() {
        let (store, _, mock) = mock_store();
        store
            .add(
                WalletConfig::new("a", WalletKind::Cashu)
                    .with_data(r#"{"balance": 21}"#)
                    .activated(),
            )
            .unwrap();

        let first = store.get().unwrap().unwrap();
        let second = store.get().unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(mock.build_count(), 1);
        assert_eq!(first.get_balance().await.unwrap(), 21);
    }

    #[tokio::test]
    async fn test_deferred_activation_single_flight() {
        let mock = Arc::new(MockConnector::new());
        let gate = Gate::new();
        let deferred = Arc::new(DeferredConnector::gated(mock.clone(), gate.clone()));
        let connectors = Connectors::new().with(WalletKind::Lnc, deferred.clone());
        let store = WalletStore::new(Arc::new(MemoryStorage::new()), connectors);
        let (_handle, mut rx) = channel_hook(&store);

        store
            .add(WalletConfig::new("lnc", WalletKind::Lnc).activated())
            .unwrap();

        assert!(store.get().unwrap().is_none());
        assert!(store.get().unwrap().is_none());
        assert!(store.is_loading());
        assert_eq!(deferred.connect_count(), 1);
        assert!(!store.get_snapshot().has_wallet());

        gate.open();
        let snapshot = next_matching(&mut rx, |s| s.has_wallet()).await;
        assert_eq!(snapshot.active_id(), Some("lnc"));

        let wallet = store.get().unwrap().unwrap();
        assert!(Arc::ptr_eq(&wallet, snapshot.wallet.as_ref().unwrap()));
        assert!(!store.is_loading());
        assert_eq!(deferred.connect_count(), 1);
        assert_eq!(mock.build_count(), 1);
    }

    #[tokio::test]
    async fn test_delayed_activation_publishes_snapshot() {
        let mock = Arc::new(MockConnector::new());
        let deferred = Arc::new(DeferredConnector::delayed(
            mock.clone(),
            Duration::from_millis(20),
        ));
        let store = WalletStore::new(
            Arc::new(MemoryStorage::new()),
            Connectors::new().with(WalletKind::WebLn, deferred),
        );
        let mut watch = wallet_store::use_wallet(&store).watch();

        store
            .add(WalletConfig::new("w", WalletKind::WebLn).activated())
            .unwrap();

        let snapshot = timeout(Duration::from_secs(5), watch.wait_for(|s| s.has_wallet()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.active_id(), Some("w"));
        assert_eq!(mock.build_count(), 1);
    }

    #[tokio::test]
    async fn test_immediate_failure_leaves_wallet_absent() {
        let store = WalletStore::new(
            Arc::new(MemoryStorage::new()),
            Connectors::new().with(
                WalletKind::LndHub,
                Arc::new(FailingConnector::immediate(WalletError::bad_auth("bad secret"))),
            ),
        );
        store
            .add(WalletConfig::new("a", WalletKind::LndHub).activated())
            .unwrap();

        assert!(store.get().unwrap().is_none());
        assert!(!store.is_loading());
        assert!(!store.get_snapshot().has_wallet());
        assert_eq!(store.list().len(), 1);
    }

    #[tokio::test]
    async fn test_deferred_failure_allows_retry() {
        let store = WalletStore::new(
            Arc::new(MemoryStorage::new()),
            Connectors::new().with(
                WalletKind::Nwc,
                Arc::new(FailingConnector::deferred(WalletError::node_failure(
                    "relay unreachable",
                ))),
            ),
        );
        store
            .add(WalletConfig::new("n", WalletKind::Nwc).activated())
            .unwrap();
        assert!(store.is_loading());

        eventually(|| !store.is_loading()).await;
        assert!(store.get().unwrap().is_none());
        // The failed activation is retried on the next read.
        assert!(store.is_loading());
    }

    #[tokio::test]
    async fn test_unregistered_kind_does_not_break_registry() {
        let store = WalletStore::new(Arc::new(MemoryStorage::new()), Connectors::new());
        store
            .add(WalletConfig::new("a", WalletKind::Cashu).activated())
            .unwrap();

        assert!(store.get().unwrap().is_none());
        assert_eq!(store.get_snapshot().active_id(), Some("a"));
    }

    #[tokio::test]
    async fn test_switch_activates_target() {
        let (store, _, mock) = mock_store();
        store
            .add(WalletConfig::new("a", WalletKind::LndHub).activated())
            .unwrap();
        store.add(WalletConfig::new("b", WalletKind::Cashu)).unwrap();

        store.switch("b").unwrap();
        let snapshot = store.get_snapshot();
        assert_eq!(snapshot.active_id(), Some("b"));
        assert!(snapshot.has_wallet());
        assert_eq!(mock.build_count(), 2);
    }

    #[tokio::test]
    async fn test_remove_closes_cached_wallet() {
        let (store, _, mock) = mock_store();
        store
            .add(WalletConfig::new("a", WalletKind::LndHub).activated())
            .unwrap();
        store.add(WalletConfig::new("b", WalletKind::Cashu)).unwrap();
        assert!(store.get().unwrap().is_some());

        let wallet = mock.wallets()[0].clone();
        store.remove("a").unwrap();

        eventually(|| wallet.is_closed()).await;
        assert_eq!(wallet.close_calls(), 1);
        assert_eq!(store.get_snapshot().active_id(), Some("b"));
    }

    #[tokio::test]
    async fn test_free_closes_wallets() {
        let (store, _, mock) = mock_store();
        store
            .add(WalletConfig::new("a", WalletKind::LndHub).activated())
            .unwrap();
        assert!(store.get().unwrap().is_some());

        store.free().await;

        let wallets = mock.wallets();
        assert_eq!(wallets.len(), 1);
        assert!(wallets[0].is_closed());
        assert!(store.get().unwrap().is_none());
        assert_eq!(mock.build_count(), 1);
    }

    #[tokio::test]
    async fn test_free_publishes_snapshot_without_wallet() {
        let (store, _, _) = mock_store();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let _handle = store.hook(move |s| log.lock().unwrap().push((s.version, s.has_wallet())));

        store
            .add(WalletConfig::new("a", WalletKind::LndHub).activated())
            .unwrap();
        assert!(store.get_snapshot().has_wallet());

        store.free().await;

        let snapshot = store.get_snapshot();
        assert!(!snapshot.has_wallet());
        assert_eq!(snapshot.active_id(), Some("a"));
        assert_eq!(
            seen.lock().unwrap().last().copied(),
            Some((snapshot.version, false))
        );
    }

    #[tokio::test]
    async fn test_readded_config_does_not_reuse_stale_activation() {
        let mock = Arc::new(MockConnector::new());
        let gate = Gate::new();
        let deferred = Arc::new(DeferredConnector::gated(mock.clone(), gate.clone()));
        let store = WalletStore::new(
            Arc::new(MemoryStorage::new()),
            Connectors::new().with(WalletKind::Lnc, deferred.clone()),
        );

        store
            .add(
                WalletConfig::new("a", WalletKind::Lnc)
                    .with_data(r#"{"balance": 1}"#)
                    .activated(),
            )
            .unwrap();
        store.remove("a").unwrap();
        assert!(!store.is_loading());

        store
            .add(
                WalletConfig::new("a", WalletKind::Lnc)
                    .with_data(r#"{"balance": 999}"#)
                    .activated(),
            )
            .unwrap();
        assert!(store.is_loading());
        assert_eq!(deferred.connect_count(), 2);

        gate.open();
        eventually(|| matches!(store.get(), Ok(Some(_)))).await;

        let wallet = store.get().unwrap().unwrap();
        assert_eq!(wallet.get_balance().await.unwrap(), 999);
        eventually(|| mock.wallets().iter().filter(|w| w.is_closed()).count() == 1).await;
        assert_eq!(deferred.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_activation_after_free_is_closed() {
        let mock = Arc::new(MockConnector::new());
        let gate = Gate::new();
        let store = WalletStore::new(
            Arc::new(MemoryStorage::new()),
            Connectors::new().with(
                WalletKind::Lnc,
                Arc::new(DeferredConnector::gated(mock.clone(), gate.clone())),
            ),
        );
        store
            .add(WalletConfig::new("a", WalletKind::Lnc).activated())
            .unwrap();
        assert!(store.is_loading());

        store.free().await;
        gate.open();

        eventually(|| mock.wallets().first().is_some_and(|w| w.is_closed())).await;
        assert!(store.get().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_activation_for_removed_config_is_closed() {
        let mock = Arc::new(MockConnector::new());
        let gate = Gate::new();
        let store = WalletStore::new(
            Arc::new(MemoryStorage::new()),
            Connectors::new().with(
                WalletKind::Lnc,
                Arc::new(DeferredConnector::gated(mock.clone(), gate.clone())),
            ),
        );
        store
            .add(WalletConfig::new("a", WalletKind::Lnc).activated())
            .unwrap();
        store.remove("a").unwrap();
        gate.open();

        eventually(|| mock.wallets().first().is_some_and(|w| w.is_closed())).await;
        assert!(store.list().is_empty());
        assert!(store.get().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ab_scenario() {
        let mock = Arc::new(MockConnector::new());
        let gate = Gate::new();
        let connectors = Connectors::new()
            .with(WalletKind::LndHub, mock.clone())
            .with(
                WalletKind::WebLn,
                Arc::new(DeferredConnector::gated(mock.clone(), gate.clone())),
            );
        let store = WalletStore::new(Arc::new(MemoryStorage::new()), connectors);

        store
            .add(WalletConfig::new("A", WalletKind::LndHub).activated())
            .unwrap();
        store.add(WalletConfig::new("B", WalletKind::WebLn)).unwrap();

        let a = store.get().unwrap().unwrap();
        assert_eq!(store.get_snapshot().active_id(), Some("A"));

        store.switch("B").unwrap();
        assert!(store.get().unwrap().is_none());
        assert_eq!(store.get_snapshot().active_id(), Some("B"));

        store.switch("A").unwrap();
        let again = store.get().unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &again));

        gate.open();
        eventually(|| mock.build_count() == 2).await;
        // B finished in the background and is cached for the next switch.
        store.switch("B").unwrap();
        assert!(store.get().unwrap().is_some());
        assert_eq!(mock.build_count(), 2);

        store.remove("B").unwrap();
        assert_eq!(active_ids(&store), vec!["A"]);
        assert_eq!(store.list().len(), 1);
        assert!(Arc::ptr_eq(&a, &store.get().unwrap().unwrap()));
    }
}

// ============================================================================
// Persistence
// ============================================================================

mod persistence_tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_round_trip() {
        let storage = Arc::new(MemoryStorage::new());
        let store = WalletStore::new(storage.clone(), Connectors::new());
        store
            .add(WalletConfig::new("a", WalletKind::LndHub).with_data("lndhub://u:p@host"))
            .unwrap();
        store
            .add(WalletConfig::new("b", WalletKind::Nwc).activated())
            .unwrap();
        store.save().unwrap();

        let reopened = WalletStore::new(storage, Connectors::new());
        assert_eq!(reopened.list(), store.list());
        assert_eq!(reopened.get_snapshot().active_id(), Some("b"));
    }

    #[tokio::test]
    async fn test_corrupt_storage_loads_empty() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(DEFAULT_CONFIG_KEY, "{not json").unwrap();

        let store = WalletStore::new(storage, Connectors::new());
        assert!(store.list().is_empty());
        assert!(store.get().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_publish_flag() {
        let (store, storage, _) = mock_store();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let _handle = store.hook(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        storage
            .set_item(
                DEFAULT_CONFIG_KEY,
                r#"[{"id":"x","kind":5,"active":true}]"#,
            )
            .unwrap();

        store.load(false);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert_eq!(store.list()[0].id, "x");

        store.load(true);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_snapshot().active_id(), Some("x"));
    }

    #[tokio::test]
    async fn test_load_closes_wallets_without_config() {
        let (store, storage, mock) = mock_store();
        store
            .add(WalletConfig::new("a", WalletKind::LndHub).activated())
            .unwrap();
        assert!(store.get().unwrap().is_some());

        storage.set_item(DEFAULT_CONFIG_KEY, "[]").unwrap();
        store.load(true);

        let wallet = mock.wallets()[0].clone();
        eventually(|| wallet.is_closed()).await;
        assert!(store.list().is_empty());
    }

    #[tokio::test]
    async fn test_load_replaces_wallet_with_changed_data() {
        let (first, storage, mock) = mock_store();
        first
            .add(
                WalletConfig::new("a", WalletKind::LndHub)
                    .with_data(r#"{"balance": 1}"#)
                    .activated(),
            )
            .unwrap();
        let stale = first.get().unwrap().unwrap();

        // A second registry on the same storage replaces "a" with new credentials.
        let second = WalletStore::new(storage.clone(), Connectors::uniform(mock.clone()));
        second.remove("a").unwrap();
        second
            .add(
                WalletConfig::new("a", WalletKind::LndHub)
                    .with_data(r#"{"balance": 500}"#)
                    .activated(),
            )
            .unwrap();

        first.load(true);
        let fresh = first.get().unwrap().unwrap();
        assert!(!Arc::ptr_eq(&stale, &fresh));
        assert_eq!(fresh.get_balance().await.unwrap(), 500);

        let replaced = mock.wallets()[0].clone();
        eventually(|| replaced.is_closed()).await;

        // Reloading unchanged data keeps the live wallet.
        first.load(true);
        assert!(Arc::ptr_eq(&fresh, &first.get().unwrap().unwrap()));
    }

    #[tokio::test]
    async fn test_load_skips_unreadable_records() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set_item(
                DEFAULT_CONFIG_KEY,
                r#"[
                    {"id":"a","kind":1,"active":true},
                    {"id":"b","kind":42},
                    {"id":"c","kind":5,"info":{"fee":null}},
                    {"kind":4},
                    {"id":"d","kind":4}
                ]"#,
            )
            .unwrap();

        let store = WalletStore::new(storage, Connectors::new());
        let ids: Vec<String> = store.list().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a", "d"]);
        assert_eq!(active_ids(&store), vec!["a"]);
    }

    #[tokio::test]
    async fn test_file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().join("wallets")));

        let store = WalletStore::new(storage.clone(), Connectors::new());
        store
            .add(WalletConfig::new("a", WalletKind::Cashu).activated())
            .unwrap();
        store.add(WalletConfig::new("b", WalletKind::Lnc)).unwrap();
        drop(store);

        let reopened = WalletStore::new(
            Arc::new(FileStorage::new(dir.path().join("wallets"))),
            Connectors::new(),
        );
        let ids: Vec<String> = reopened.list().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(active_ids(&reopened), vec!["a"]);
    }
}

// ============================================================================
// Observers
// ============================================================================

mod observer_tests {
    use super::*;

    #[tokio::test]
    async fn test_every_mutation_publishes_once() {
        let (store, _, _) = mock_store();
        let versions = Arc::new(Mutex::new(Vec::new()));
        let log = versions.clone();
        let _handle = store.hook(move |s| log.lock().unwrap().push(s.version));

        store.add(WalletConfig::new("a", WalletKind::LndHub)).unwrap();
        store.add(WalletConfig::new("b", WalletKind::Cashu)).unwrap();
        store.switch("b").unwrap();
        store.remove("a").unwrap();
        store.save().unwrap();

        let versions = versions.lock().unwrap().clone();
        assert_eq!(versions.len(), 5);
        assert!(versions.windows(2).all(|w| w[1] == w[0] + 1));
        assert_eq!(*versions.last().unwrap(), store.get_snapshot().version);
    }

    #[tokio::test]
    async fn test_unsubscribe_during_delivery_skips_nobody() {
        let (store, _, _) = mock_store();
        let slot: Arc<Mutex<Option<HookHandle>>> = Arc::new(Mutex::new(None));
        let first_calls = Arc::new(AtomicUsize::new(0));
        let later = Arc::new(Mutex::new(Vec::new()));

        let own = slot.clone();
        let calls = first_calls.clone();
        let handle = store.hook(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            if let Some(handle) = own.lock().unwrap().take() {
                handle.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(handle);

        for name in ["second", "third"] {
            let log = later.clone();
            let _ = store.hook(move |_| log.lock().unwrap().push(name));
        }

        store.add(WalletConfig::new("a", WalletKind::LndHub)).unwrap();
        assert_eq!(*later.lock().unwrap(), vec!["second", "third"]);

        store.add(WalletConfig::new("b", WalletKind::LndHub)).unwrap();
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(later.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_reentrant_mutation_delivers_in_order() {
        let (store, _, _) = mock_store();

        let inner = store.clone();
        let reacting = store.hook(move |s| {
            if s.configs.len() == 1 {
                inner
                    .add(WalletConfig::new("follow-up", WalletKind::Cashu))
                    .unwrap();
            }
        });

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        let recorder = store.hook(move |s| log.lock().unwrap().push((s.version, s.configs.len())));

        store.add(WalletConfig::new("a", WalletKind::LndHub)).unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].1, 1);
        assert_eq!(seen[1].1, 2);
        assert!(seen[0].0 < seen[1].0);

        reacting.unsubscribe();
        recorder.unsubscribe();
    }

    #[tokio::test]
    async fn test_snapshot_identity_stable() {
        let (store, _, _) = mock_store();
        let before = store.get_snapshot();
        assert!(Arc::ptr_eq(&before, &store.get_snapshot()));

        store.add(WalletConfig::new("a", WalletKind::LndHub)).unwrap();
        let after = store.get_snapshot();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(before.configs.is_empty());
        assert_eq!(after.configs.len(), 1);
    }
}

// ============================================================================
// Injected provider
// ============================================================================

mod injected_provider_tests {
    use super::*;

    #[tokio::test]
    async fn test_provider_added_active_when_first() {
        let (store, _, _) = mock_store();
        store.sync_injected_provider(true).unwrap();

        let configs = store.list();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].id, INJECTED_PROVIDER_ID);
        assert_eq!(configs[0].kind, WalletKind::WebLn);
        assert_eq!(configs[0].info.alias, "WebLN");
        assert!(configs[0].active);
    }

    #[tokio::test]
    async fn test_provider_added_inactive_behind_others() {
        let (store, _, _) = mock_store();
        store
            .add(WalletConfig::new("a", WalletKind::LndHub).activated())
            .unwrap();

        store.sync_injected_provider(true).unwrap();
        store.sync_injected_provider(true).unwrap();

        assert_eq!(store.list().len(), 2);
        assert_eq!(active_ids(&store), vec!["a"]);
    }

    #[tokio::test]
    async fn test_provider_removed_when_unavailable() {
        let (store, _, _) = mock_store();
        store.sync_injected_provider(true).unwrap();
        store.add(WalletConfig::new("a", WalletKind::LndHub)).unwrap();

        store.sync_injected_provider(false).unwrap();

        let ids: Vec<String> = store.list().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["a"]);
        assert_eq!(active_ids(&store), vec!["a"]);

        // Nothing to remove the second time.
        store.sync_injected_provider(false).unwrap();
        assert_eq!(store.list().len(), 1);
    }
}
