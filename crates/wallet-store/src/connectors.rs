//! Kind-to-backend dispatch.

use std::sync::Arc;

use tracing::info;
use wallet_core::{Activation, WalletConfig, WalletConnector, WalletError, WalletKind};

/// One connector per [`WalletKind`].
///
/// Every kind always has a connector: kinds nobody registered a backend for
/// resolve to one that refuses to activate.
#[derive(Clone)]
pub struct Connectors {
    lndhub: Arc<dyn WalletConnector>,
    lnc: Arc<dyn WalletConnector>,
    webln: Arc<dyn WalletConnector>,
    nwc: Arc<dyn WalletConnector>,
    cashu: Arc<dyn WalletConnector>,
}

impl Connectors {
    /// Create a table with no backends registered.
    pub fn new() -> Self {
        Self::uniform(Arc::new(Unavailable))
    }

    /// Use the same connector for every kind.
    pub fn uniform(connector: Arc<dyn WalletConnector>) -> Self {
        Self {
            lndhub: connector.clone(),
            lnc: connector.clone(),
            webln: connector.clone(),
            nwc: connector.clone(),
            cashu: connector,
        }
    }

    /// Register the connector for `kind`, replacing any previous one.
    pub fn with(mut self, kind: WalletKind, connector: Arc<dyn WalletConnector>) -> Self {
        info!("Registering {} connector", kind);
        *self.slot_mut(kind) = connector;
        self
    }

    /// The connector responsible for `kind`.
    pub fn get(&self, kind: WalletKind) -> &Arc<dyn WalletConnector> {
        match kind {
            WalletKind::LndHub => &self.lndhub,
            WalletKind::Lnc => &self.lnc,
            WalletKind::WebLn => &self.webln,
            WalletKind::Nwc => &self.nwc,
            WalletKind::Cashu => &self.cashu,
        }
    }

    /// Start the backend for `config` using the connector for its kind.
    pub fn connect(&self, config: &WalletConfig) -> Result<Activation, WalletError> {
        self.get(config.kind).connect(config)
    }

    fn slot_mut(&mut self, kind: WalletKind) -> &mut Arc<dyn WalletConnector> {
        match kind {
            WalletKind::LndHub => &mut self.lndhub,
            WalletKind::Lnc => &mut self.lnc,
            WalletKind::WebLn => &mut self.webln,
            WalletKind::Nwc => &mut self.nwc,
            WalletKind::Cashu => &mut self.cashu,
        }
    }
}

impl Default for Connectors {
    fn default() -> Self {
        Self::new()
    }
}

/// Placeholder for kinds without a registered backend.
struct Unavailable;

impl WalletConnector for Unavailable {
    fn connect(&self, config: &WalletConfig) -> Result<Activation, WalletError> {
        Err(WalletError::general(format!(
            "no backend available for {} wallets",
            config.kind
        )))
    }
}
