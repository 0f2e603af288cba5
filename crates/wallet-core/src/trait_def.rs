//! The LnWallet trait definition.

use async_trait::async_trait;

use crate::config::{Sats, WalletInfo};
use crate::error::WalletError;
use crate::invoice::{InvoiceRequest, WalletInvoice};

/// The uniform capability interface every wallet backend implements.
///
/// Implementations range from in-process providers to remote signers and
/// ecash mints. This trait is object-safe and is used as `Arc<dyn LnWallet>`.
#[async_trait]
pub trait LnWallet: Send + Sync {
    /// Get a human-readable name for this backend.
    fn name(&self) -> &str;

    /// Whether the wallet can serve requests right now.
    fn is_ready(&self) -> bool;

    /// Whether `login` can succeed without a password.
    fn can_auto_login(&self) -> bool;

    /// Fetch node metadata from the backend.
    async fn get_info(&self) -> Result<WalletInfo, WalletError>;

    /// Unlock the wallet, optionally with a password.
    ///
    /// Returns `Ok(true)` once the wallet is ready for use.
    async fn login(&self, password: Option<&str>) -> Result<bool, WalletError>;

    /// Release backend resources.
    async fn close(&self) -> Result<bool, WalletError>;

    /// Spendable balance in sats.
    async fn get_balance(&self) -> Result<Sats, WalletError>;

    /// Create an invoice to receive a payment.
    async fn create_invoice(&self, req: InvoiceRequest) -> Result<WalletInvoice, WalletError>;

    /// Pay a wire-encoded payment request.
    async fn pay_invoice(&self, pr: &str) -> Result<WalletInvoice, WalletError>;

    /// List invoices known to the backend, newest last.
    async fn get_invoices(&self) -> Result<Vec<WalletInvoice>, WalletError>;
}
