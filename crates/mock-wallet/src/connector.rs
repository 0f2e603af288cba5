//! Connectors that build [`MockWallet`]s with different activation costs.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::sleep;
use tracing::debug;
use wallet_core::{Activation, LnWallet, WalletConfig, WalletConnector, WalletError};

use crate::wallet::MockWallet;

/// Builds mock wallets synchronously and remembers every wallet it built.
#[derive(Debug, Default)]
pub struct MockConnector {
    built: Mutex<Vec<Arc<MockWallet>>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a wallet for `config` and record it.
    pub fn build(&self, config: &WalletConfig) -> Result<Arc<MockWallet>, WalletError> {
        let wallet = Arc::new(MockWallet::from_config(config)?);
        debug!("Built mock wallet for config {}", config.id);
        self.built
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(wallet.clone());
        Ok(wallet)
    }

    /// Every wallet built so far, oldest first.
    pub fn wallets(&self) -> Vec<Arc<MockWallet>> {
        self.built
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of wallets built so far.
    pub fn build_count(&self) -> usize {
        self.built.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl WalletConnector for MockConnector {
    fn connect(&self, config: &WalletConfig) -> Result<Activation, WalletError> {
        let wallet: Arc<dyn LnWallet> = self.build(config)?;
        Ok(Activation::Ready(wallet))
    }
}

/// A latch that holds deferred activations until it is opened.
#[derive(Debug, Clone)]
pub struct Gate {
    tx: Arc<watch::Sender<bool>>,
}

impl Gate {
    /// Create a closed gate.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Release every activation waiting on this gate, now and later.
    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    async fn wait(&self) -> Result<(), WalletError> {
        let mut rx = self.tx.subscribe();
        rx.wait_for(|open| *open)
            .await
            .map(|_| ())
            .map_err(|_| WalletError::node_failure("activation gate dropped"))
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
enum Hold {
    Delay(Duration),
    Gate(Gate),
}

/// Activates asynchronously, like a backend that must load a module first.
///
/// The wallet is only built once the hold (a delay or a [`Gate`]) has passed.
#[derive(Debug)]
pub struct DeferredConnector {
    inner: Arc<MockConnector>,
    hold: Hold,
    connects: AtomicUsize,
}

impl DeferredConnector {
    /// Defer activation by a fixed delay.
    pub fn delayed(inner: Arc<MockConnector>, delay: Duration) -> Self {
        Self {
            inner,
            hold: Hold::Delay(delay),
            connects: AtomicUsize::new(0),
        }
    }

    /// Defer activation until `gate` is opened.
    pub fn gated(inner: Arc<MockConnector>, gate: Gate) -> Self {
        Self {
            inner,
            hold: Hold::Gate(gate),
            connects: AtomicUsize::new(0),
        }
    }

    /// How many activations have been started.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl WalletConnector for DeferredConnector {
    fn connect(&self, config: &WalletConfig) -> Result<Activation, WalletError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.clone();
        let hold = self.hold.clone();
        let config = config.clone();

        Ok(Activation::pending(async move {
            match hold {
                Hold::Delay(delay) => sleep(delay).await,
                Hold::Gate(gate) => gate.wait().await?,
            }
            let wallet: Arc<dyn LnWallet> = inner.build(&config)?;
            Ok(wallet)
        }))
    }
}

/// Always fails to activate, either immediately or after an await.
#[derive(Debug, Clone)]
pub struct FailingConnector {
    error: WalletError,
    deferred: bool,
}

impl FailingConnector {
    /// Fail synchronously from `connect`.
    pub fn immediate(error: WalletError) -> Self {
        Self {
            error,
            deferred: false,
        }
    }

    /// Return a pending activation that resolves to an error.
    pub fn deferred(error: WalletError) -> Self {
        Self {
            error,
            deferred: true,
        }
    }
}

impl WalletConnector for FailingConnector {
    fn connect(&self, _config: &WalletConfig) -> Result<Activation, WalletError> {
        if !self.deferred {
            return Err(self.error.clone());
        }
        let error = self.error.clone();
        Ok(Activation::pending(async move {
            tokio::task::yield_now().await;
            Err(error)
        }))
    }
}
