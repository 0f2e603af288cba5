//! Core trait and types for Lightning wallet backends.
//!
//! This crate provides the shared interface for every wallet backend the
//! registry can drive. It defines:
//!
//! - [`LnWallet`] - The capability trait all backends implement
//! - [`WalletConnector`] / [`Activation`] - How a backend is constructed from its config
//! - [`WalletConfig`] / [`WalletKind`] / [`WalletInfo`] - The persisted configuration model
//! - [`WalletInvoice`] / [`InvoiceRequest`] - Invoice types for input/output
//! - [`WalletError`] - The backend error taxonomy
//! - [`InvoiceDecoder`] - Collaborator for turning payment requests into invoice views
//!
//! # Example
//!
//! ```rust
//! use wallet_core::{
//!     async_trait, InvoiceRequest, LnWallet, Sats, WalletError, WalletInfo, WalletInvoice,
//! };
//!
//! struct EmptyWallet;
//!
//! #[async_trait]
//! impl LnWallet for EmptyWallet {
//!     fn name(&self) -> &str {
//!         "EmptyWallet"
//!     }
//!
//!     fn is_ready(&self) -> bool {
//!         true
//!     }
//!
//!     fn can_auto_login(&self) -> bool {
//!         true
//!     }
//!
//!     async fn get_info(&self) -> Result<WalletInfo, WalletError> {
//!         Ok(WalletInfo::default())
//!     }
//!
//!     async fn login(&self, _password: Option<&str>) -> Result<bool, WalletError> {
//!         Ok(true)
//!     }
//!
//!     async fn close(&self) -> Result<bool, WalletError> {
//!         Ok(true)
//!     }
//!
//!     async fn get_balance(&self) -> Result<Sats, WalletError> {
//!         Ok(0)
//!     }
//!
//!     async fn create_invoice(&self, _req: InvoiceRequest) -> Result<WalletInvoice, WalletError> {
//!         Err(WalletError::unknown())
//!     }
//!
//!     async fn pay_invoice(&self, _pr: &str) -> Result<WalletInvoice, WalletError> {
//!         Err(WalletError::unknown())
//!     }
//!
//!     async fn get_invoices(&self) -> Result<Vec<WalletInvoice>, WalletError> {
//!         Ok(Vec::new())
//!     }
//! }
//! ```

mod config;
mod connector;
mod error;
mod invoice;
mod trait_def;

pub use config::{MilliSats, Sats, WalletConfig, WalletInfo, WalletKind};
pub use connector::{Activation, PendingWallet, WalletConnector};
pub use error::{WalletError, WalletErrorCode};
pub use invoice::{
    pr_to_wallet_invoice, DecodedInvoice, InvoiceDecoder, InvoiceRequest, WalletInvoice,
    WalletInvoiceState,
};
pub use trait_def::LnWallet;

// Re-export async_trait for convenience
pub use async_trait::async_trait;
