//! Backend construction contract.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::trait_def::LnWallet;

/// A backend whose construction is still in flight.
pub type PendingWallet = BoxFuture<'static, Result<Arc<dyn LnWallet>, WalletError>>;

/// Outcome of starting a backend from its configuration.
///
/// Construction cost is part of the contract: in-process backends are
/// `Ready` immediately, backends that must load a module or open a remote
/// session hand back a future the registry drives in the background.
pub enum Activation {
    /// The wallet is usable now.
    Ready(Arc<dyn LnWallet>),
    /// The wallet will be usable once the future resolves.
    Pending(PendingWallet),
}

impl Activation {
    /// Wrap a future as a pending activation.
    pub fn pending<F>(future: F) -> Self
    where
        F: std::future::Future<Output = Result<Arc<dyn LnWallet>, WalletError>> + Send + 'static,
    {
        Activation::Pending(Box::pin(future))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Activation::Ready(_))
    }
}

impl fmt::Debug for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Activation::Ready(wallet) => f.debug_tuple("Ready").field(&wallet.name()).finish(),
            Activation::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Constructs a live backend from a persisted configuration.
///
/// One connector exists per [`crate::WalletKind`]. Connectors are called
/// synchronously and must not block; slow work belongs in
/// [`Activation::Pending`].
pub trait WalletConnector: Send + Sync {
    /// Start the backend described by `config`.
    fn connect(&self, config: &WalletConfig) -> Result<Activation, WalletError>;
}
