//! The wallet registry.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::runtime::Handle;
use tracing::{debug, info, warn};
use wallet_core::{
    Activation, LnWallet, PendingWallet, WalletConfig, WalletError, WalletInfo, WalletKind,
};

use crate::connectors::Connectors;
use crate::error::StoreError;
use crate::snapshot::{Hook, HookList, WalletStoreSnapshot};
use crate::storage::{KeyValueStorage, DEFAULT_CONFIG_KEY};

/// Id given to the automatically managed injected-provider configuration.
pub const INJECTED_PROVIDER_ID: &str = "webln";

/// Registry of wallet configurations and their live backends.
///
/// The registry owns the configuration list and a cache of activated
/// wallets (at most one per configuration). Every change is written to
/// storage and then published to observers as a new
/// [`WalletStoreSnapshot`].
///
/// `WalletStore` is a cheap handle; clones share the same registry.
///
/// # Example
///
/// ```ignore
/// let store = WalletStore::new(Arc::new(MemoryStorage::new()), connectors);
/// let _handle = store.hook(|snapshot| println!("version {}", snapshot.version));
///
/// store.add(WalletConfig::new("alby", WalletKind::Nwc).with_data(uri).activated())?;
/// if let Some(wallet) = store.get()? {
///     println!("balance: {}", wallet.get_balance().await?);
/// }
/// ```
#[derive(Clone)]
pub struct WalletStore {
    shared: Arc<Shared>,
}

struct Shared {
    storage: Arc<dyn KeyValueStorage>,
    connectors: Connectors,
    key: String,
    state: Mutex<State>,
}

struct State {
    configs: Vec<WalletConfig>,
    instances: HashMap<String, Arc<dyn LnWallet>>,
    /// Configurations whose activation is in flight, with the token of that activation.
    activating: HashMap<String, u64>,
    next_activation: u64,
    hooks: HookList,
    next_hook_id: u64,
    snapshot: Arc<WalletStoreSnapshot>,
    /// Snapshots waiting to be delivered, oldest first.
    outbox: VecDeque<(Arc<WalletStoreSnapshot>, HookList)>,
    delivering: bool,
    freed: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            configs: Vec::new(),
            instances: HashMap::new(),
            activating: HashMap::new(),
            next_activation: 0,
            hooks: HookList::default(),
            next_hook_id: 0,
            snapshot: Arc::new(WalletStoreSnapshot::empty()),
            outbox: VecDeque::new(),
            delivering: false,
            freed: false,
        }
    }
}

/// Registration of an observer; see [`WalletStore::hook`].
#[derive(Debug)]
pub struct HookHandle {
    shared: Weak<Shared>,
    id: u64,
}

impl HookHandle {
    /// Stop receiving snapshots.
    pub fn unsubscribe(self) {
        if let Some(shared) = self.shared.upgrade() {
            WalletStore { shared }.unhook(self.id);
        }
    }
}

impl WalletStore {
    /// Create a registry over `storage` using the default key.
    ///
    /// Persisted configurations are loaded immediately; if one is active
    /// its activation starts right away.
    pub fn new(storage: Arc<dyn KeyValueStorage>, connectors: Connectors) -> Self {
        Self::with_key(storage, connectors, DEFAULT_CONFIG_KEY)
    }

    /// Create a registry that persists under a custom storage key.
    pub fn with_key(
        storage: Arc<dyn KeyValueStorage>,
        connectors: Connectors,
        key: impl Into<String>,
    ) -> Self {
        let store = Self {
            shared: Arc::new(Shared {
                storage,
                connectors,
                key: key.into(),
                state: Mutex::new(State::default()),
            }),
        };
        store.load(false);

        let mut state = store.state();
        store.enqueue_snapshot(&mut state);
        drop(state);
        store
    }

    /// All configurations, in order.
    pub fn list(&self) -> Vec<WalletConfig> {
        self.state().configs.clone()
    }

    /// The active wallet.
    ///
    /// Returns `Ok(None)` when there are no configurations, or when the
    /// active wallet is still activating (or failed to activate). An
    /// asynchronous activation publishes a new snapshot once it completes,
    /// after which this returns the wallet.
    ///
    /// # Errors
    ///
    /// [`StoreError::NoActiveConfig`] if configurations exist but none of
    /// them is active.
    pub fn get(&self) -> Result<Option<Arc<dyn LnWallet>>, StoreError> {
        let mut state = self.state();
        self.current_wallet(&mut state)
    }

    /// Whether the active wallet's activation is still in flight.
    pub fn is_loading(&self) -> bool {
        let state = self.state();
        state
            .configs
            .iter()
            .find(|c| c.active)
            .is_some_and(|c| state.activating.contains_key(&c.id))
    }

    /// Append a configuration and persist.
    ///
    /// The configuration is not activated. If it is already marked active,
    /// every other configuration is deactivated.
    pub fn add(&self, config: WalletConfig) -> Result<(), StoreError> {
        let state = self.state();
        if state.configs.iter().any(|c| c.id == config.id) {
            return Err(StoreError::DuplicateId(config.id));
        }

        let mut configs = state.configs.clone();
        if config.active {
            for existing in configs.iter_mut() {
                existing.active = false;
            }
        }
        info!("Adding {} wallet {}", config.kind, config.id);
        configs.push(config);
        self.commit(state, configs, None)
    }

    /// Remove a configuration, closing its live wallet if one exists.
    ///
    /// If the removed configuration was active, the first remaining one
    /// becomes active.
    pub fn remove(&self, id: &str) -> Result<(), StoreError> {
        let state = self.state();
        let index = state
            .configs
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let mut configs = state.configs.clone();
        let removed = configs.remove(index);
        info!("Removing {} wallet {}", removed.kind, removed.id);
        if removed.active {
            if let Some(first) = configs.first_mut() {
                info!("Promoting wallet {} to active", first.id);
                first.active = true;
            }
        }
        self.commit(state, configs, Some(id))
    }

    /// Make `id` the only active configuration.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if no configuration has that id; nothing
    /// changes in that case.
    pub fn switch(&self, id: &str) -> Result<(), StoreError> {
        let state = self.state();
        if !state.configs.iter().any(|c| c.id == id) {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let configs = state
            .configs
            .iter()
            .cloned()
            .map(|mut c| {
                c.active = c.id == id;
                c
            })
            .collect();
        info!("Switching active wallet to {}", id);
        self.commit(state, configs, None)
    }

    /// Write the configuration list to storage and publish a snapshot.
    pub fn save(&self) -> Result<(), StoreError> {
        let mut state = self.state();
        self.persist(&state.configs)?;
        self.enqueue_snapshot(&mut state);
        drop(state);
        self.flush();
        Ok(())
    }

    /// Replace the configuration list with what storage holds.
    ///
    /// Missing or malformed data loads as an empty list, and individual
    /// records that fail to parse are skipped. Live wallets whose
    /// configuration is gone, or whose kind or data changed, are closed.
    /// Observers are notified only when `publish` is true.
    pub fn load(&self, publish: bool) {
        let configs = self.read_configs();
        let mut state = self.state();

        // A backend is stale once its id is gone or its connection details changed.
        let is_stale = |old: &[WalletConfig], id: &str| match configs.iter().find(|c| c.id == id) {
            None => true,
            Some(new) => old
                .iter()
                .find(|c| c.id == id)
                .is_some_and(|prev| !same_backend(prev, new)),
        };
        let stale: Vec<String> = state
            .instances
            .keys()
            .filter(|id| is_stale(state.configs.as_slice(), id.as_str()))
            .cloned()
            .collect();
        let abandoned: Vec<String> = state
            .activating
            .keys()
            .filter(|id| is_stale(state.configs.as_slice(), id.as_str()))
            .cloned()
            .collect();
        for id in abandoned {
            debug!("Abandoning activation of stale wallet {}", id);
            state.activating.remove(&id);
        }
        let evicted: Vec<(String, Arc<dyn LnWallet>)> = stale
            .into_iter()
            .filter_map(|id| state.instances.remove(&id).map(|w| (id, w)))
            .collect();

        debug!("Loaded {} wallet config(s)", configs.len());
        state.configs = configs;
        if publish {
            self.enqueue_snapshot(&mut state);
        }
        drop(state);

        self.close_in_background(evicted);
        if publish {
            self.flush();
        }
    }

    /// Close every live wallet.
    ///
    /// Meant to be called once by the host at shutdown. Activations that
    /// complete afterwards are closed instead of cached, and `get` no longer
    /// starts new activations. Observers receive a snapshot without a wallet.
    pub async fn free(&self) {
        let wallets: Vec<(String, Arc<dyn LnWallet>)> = {
            let mut state = self.state();
            state.freed = true;
            state.activating.clear();
            let wallets = state.instances.drain().collect();
            self.enqueue_snapshot(&mut state);
            wallets
        };
        self.flush();

        info!("Closing {} wallet instance(s)", wallets.len());
        for (id, wallet) in wallets {
            close_wallet(&id, wallet).await;
        }
    }

    /// Register an observer for every subsequent snapshot.
    ///
    /// Observers run synchronously, in registration order, before the
    /// mutating call returns. They must not block.
    pub fn hook<F>(&self, callback: F) -> HookHandle
    where
        F: Fn(&Arc<WalletStoreSnapshot>) + Send + Sync + 'static,
    {
        let mut state = self.state();
        state.next_hook_id += 1;
        let id = state.next_hook_id;
        state.hooks = state.hooks.with(Hook {
            id,
            callback: Arc::new(callback),
        });
        debug!("Registered wallet hook {} ({} total)", id, state.hooks.len());

        HookHandle {
            shared: Arc::downgrade(&self.shared),
            id,
        }
    }

    /// The latest snapshot. The same `Arc` is returned until the next change.
    pub fn get_snapshot(&self) -> Arc<WalletStoreSnapshot> {
        self.state().snapshot.clone()
    }

    /// Keep an injected-provider configuration in step with its availability.
    ///
    /// Adds a WebLN configuration when the provider is present and none
    /// exists (active only if it is the first configuration); removes it when
    /// the provider has gone away.
    pub fn sync_injected_provider(&self, available: bool) -> Result<(), StoreError> {
        let configs = self.list();
        let existing = configs.iter().find(|c| c.kind == WalletKind::WebLn);

        match (available, existing) {
            (true, None) => {
                let config = WalletConfig {
                    id: INJECTED_PROVIDER_ID.to_string(),
                    kind: WalletKind::WebLn,
                    active: configs.is_empty(),
                    info: WalletInfo::with_alias("WebLN"),
                    data: None,
                };
                self.add(config)
            }
            (false, Some(config)) => self.remove(&config.id),
            _ => Ok(()),
        }
    }

    fn unhook(&self, id: u64) {
        let mut state = self.state();
        state.hooks = state.hooks.without(id);
        debug!("Removed wallet hook {} ({} left)", id, state.hooks.len());
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist `configs`, then make them current and publish.
    ///
    /// Nothing changes if the write fails.
    fn commit(
        &self,
        mut state: MutexGuard<'_, State>,
        configs: Vec<WalletConfig>,
        evict: Option<&str>,
    ) -> Result<(), StoreError> {
        self.persist(&configs)?;
        state.configs = configs;

        if let Some(id) = evict {
            state.activating.remove(id);
        }
        let evicted: Vec<(String, Arc<dyn LnWallet>)> = evict
            .and_then(|id| state.instances.remove(id).map(|w| (id.to_string(), w)))
            .into_iter()
            .collect();

        self.enqueue_snapshot(&mut state);
        drop(state);

        self.close_in_background(evicted);
        self.flush();
        Ok(())
    }

    fn persist(&self, configs: &[WalletConfig]) -> Result<(), StoreError> {
        let json = serde_json::to_string(configs)?;
        self.shared.storage.set_item(&self.shared.key, &json)?;
        Ok(())
    }

    fn read_configs(&self) -> Vec<WalletConfig> {
        let raw = match self.shared.storage.get_item(&self.shared.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!("Failed to read wallet configs: {}", e);
                return Vec::new();
            }
        };

        let records = match serde_json::from_str::<Vec<serde_json::Value>>(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!("Ignoring malformed wallet configs: {}", e);
                return Vec::new();
            }
        };

        let configs = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| {
                serde_json::from_value::<WalletConfig>(record)
                    .map_err(|e| warn!("Skipping wallet config #{}: {}", index, e))
                    .ok()
            })
            .collect();
        normalize(configs)
    }

    fn current_wallet(
        &self,
        state: &mut State,
    ) -> Result<Option<Arc<dyn LnWallet>>, StoreError> {
        let active = match state.configs.iter().find(|c| c.active) {
            Some(config) => config.clone(),
            None if state.configs.is_empty() => return Ok(None),
            None => return Err(StoreError::NoActiveConfig),
        };

        if let Some(wallet) = state.instances.get(&active.id) {
            return Ok(Some(wallet.clone()));
        }
        if state.freed || state.activating.contains_key(&active.id) {
            return Ok(None);
        }

        match self.shared.connectors.connect(&active) {
            Ok(Activation::Ready(wallet)) => {
                info!(
                    "Activated {} wallet {} ({})",
                    active.kind,
                    active.id,
                    wallet.name()
                );
                state.instances.insert(active.id, wallet.clone());
                Ok(Some(wallet))
            }
            Ok(Activation::Pending(pending)) => {
                self.spawn_activation(state, active, pending);
                Ok(None)
            }
            Err(e) => {
                warn!("Failed to activate {} wallet {}: {}", active.kind, active.id, e);
                Ok(None)
            }
        }
    }

    fn spawn_activation(&self, state: &mut State, config: WalletConfig, pending: PendingWallet) {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(
                    "No async runtime; cannot activate {} wallet {}",
                    config.kind, config.id
                );
                return;
            }
        };

        state.next_activation += 1;
        let token = state.next_activation;
        debug!(
            "Activating {} wallet {} in the background (#{})",
            config.kind, config.id, token
        );
        state.activating.insert(config.id.clone(), token);

        let shared = Arc::downgrade(&self.shared);
        handle.spawn(async move {
            let result = pending.await;
            match shared.upgrade() {
                Some(shared) => {
                    let store = WalletStore { shared };
                    store.finish_activation(config, token, result).await;
                }
                None => {
                    if let Ok(wallet) = result {
                        close_wallet(&config.id, wallet).await;
                    }
                }
            }
        });
    }

    async fn finish_activation(
        &self,
        config: WalletConfig,
        token: u64,
        result: Result<Arc<dyn LnWallet>, WalletError>,
    ) {
        let orphan = {
            let mut state = self.state();
            let current = state.activating.get(&config.id) == Some(&token);
            if current {
                state.activating.remove(&config.id);
            }

            match result {
                Err(e) => {
                    warn!("Failed to activate {} wallet {}: {}", config.kind, config.id, e);
                    None
                }
                Ok(wallet) => {
                    let registered = state
                        .configs
                        .iter()
                        .any(|c| c.id == config.id && same_backend(c, &config));
                    if state.freed || !current || !registered {
                        Some(wallet)
                    } else {
                        info!(
                            "Activated {} wallet {} ({})",
                            config.kind,
                            config.id,
                            wallet.name()
                        );
                        state.instances.insert(config.id.clone(), wallet);
                        self.enqueue_snapshot(&mut state);
                        None
                    }
                }
            }
        };

        match orphan {
            Some(wallet) => {
                debug!("Wallet {} is no longer registered; closing it", config.id);
                close_wallet(&config.id, wallet).await;
            }
            None => self.flush(),
        }
    }

    /// Build a new snapshot and queue it for every current observer.
    fn enqueue_snapshot(&self, state: &mut State) {
        let wallet = match self.current_wallet(state) {
            Ok(wallet) => wallet,
            Err(e) => {
                debug!("Snapshot has no wallet: {}", e);
                None
            }
        };

        let snapshot = Arc::new(WalletStoreSnapshot {
            version: state.snapshot.version + 1,
            configs: state.configs.clone(),
            config: state.configs.iter().find(|c| c.active).cloned(),
            wallet,
        });
        debug!(
            version = snapshot.version,
            configs = snapshot.configs.len(),
            active = snapshot.active_id().unwrap_or("-"),
            "Publishing wallet snapshot"
        );

        state.snapshot = snapshot.clone();
        if !state.hooks.is_empty() {
            let hooks = state.hooks.clone();
            state.outbox.push_back((snapshot, hooks));
        }
    }

    /// Deliver queued snapshots.
    ///
    /// Only one caller delivers at a time. A snapshot queued by an observer
    /// (or another thread) during delivery is picked up by the loop that is
    /// already running, so observers see snapshots in version order.
    fn flush(&self) {
        {
            let mut state = self.state();
            if state.delivering {
                return;
            }
            state.delivering = true;
        }

        let _reset = DeliveryReset(self);
        loop {
            let (snapshot, hooks) = {
                let mut state = self.state();
                match state.outbox.pop_front() {
                    Some(next) => next,
                    None => {
                        state.delivering = false;
                        return;
                    }
                }
            };
            hooks.notify(&snapshot);
        }
    }

    fn close_in_background(&self, wallets: Vec<(String, Arc<dyn LnWallet>)>) {
        if wallets.is_empty() {
            return;
        }
        match Handle::try_current() {
            Ok(handle) => {
                for (id, wallet) in wallets {
                    handle.spawn(async move { close_wallet(&id, wallet).await });
                }
            }
            Err(_) => {
                warn!(
                    "No async runtime; dropping {} wallet(s) without closing",
                    wallets.len()
                );
            }
        }
    }
}

/// Clears the delivery flag if an observer panics mid-delivery.
struct DeliveryReset<'a>(&'a WalletStore);

impl Drop for DeliveryReset<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.0.state().delivering = false;
        }
    }
}

async fn close_wallet(id: &str, wallet: Arc<dyn LnWallet>) {
    match wallet.close().await {
        Ok(_) => debug!("Closed wallet {} ({})", id, wallet.name()),
        Err(e) => warn!("Error closing wallet {}: {}", id, e),
    }
}

/// Whether two configurations describe the same backend connection.
fn same_backend(a: &WalletConfig, b: &WalletConfig) -> bool {
    a.kind == b.kind && a.data == b.data
}

/// Repair stored lists that break registry invariants.
///
/// Keeps the first of any duplicated ids and the first active entry.
fn normalize(configs: Vec<WalletConfig>) -> Vec<WalletConfig> {
    let mut seen = HashSet::new();
    let mut has_active = false;
    let mut out = Vec::with_capacity(configs.len());

    for mut config in configs {
        if !seen.insert(config.id.clone()) {
            warn!("Dropping duplicate wallet config {}", config.id);
            continue;
        }
        if config.active {
            if has_active {
                warn!("Deactivating extra active wallet config {}", config.id);
                config.active = false;
            } else {
                has_active = true;
            }
        }
        out.push(config);
    }
    out
}
