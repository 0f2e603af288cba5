//! Mock wallet backend for exercising the wallet registry.
//!
//! This crate provides a reference implementation of the `LnWallet` trait
//! and connectors with different activation costs:
//! - `MockWallet` - In-memory ledger wallet that honours the error taxonomy
//! - `MockConnector` - Activates synchronously
//! - `DeferredConnector` - Activates asynchronously after a delay or a `Gate`
//! - `FailingConnector` - Never activates
//! - `MockDecoder` - Decodes the payment requests `MockWallet` issues
//!
//! # Example
//!
//! ```rust
//! use mock_wallet::{InvoiceRequest, LnWallet, MockWallet};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), mock_wallet::WalletError> {
//!     let payer = MockWallet::with_balance(1_000);
//!     let payee = MockWallet::with_balance(0);
//!
//!     let invoice = payee.create_invoice(InvoiceRequest::new(100)).await?;
//!     payer.pay_invoice(&invoice.pr).await?;
//!
//!     println!("Balance: {}", payer.get_balance().await?);
//!     Ok(())
//! }
//! ```

mod connector;
mod decoder;
mod wallet;

// Re-export wallet-core types for convenience
pub use wallet_core::{
    async_trait, Activation, InvoiceRequest, LnWallet, WalletConfig, WalletConnector, WalletError,
    WalletInvoice, WalletKind,
};

pub use connector::{DeferredConnector, FailingConnector, Gate, MockConnector};
pub use decoder::{encode_request, payment_hash, MockDecoder};
pub use wallet::{MockSettings, MockWallet};
