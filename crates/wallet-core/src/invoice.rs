//! Invoice types and the payment-request view helper.

use serde::{Deserialize, Serialize};

use crate::config::{MilliSats, Sats};

/// Parameters for creating an invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRequest {
    /// Amount to receive, in sats.
    pub amount: Sats,
    /// Optional description shown to the payer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// Optional expiry in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<u64>,
}

impl InvoiceRequest {
    pub fn new(amount: Sats) -> Self {
        Self {
            amount,
            memo: None,
            expiry: None,
        }
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    pub fn with_expiry(mut self, expiry_secs: u64) -> Self {
        self.expiry = Some(expiry_secs);
        self
    }
}

/// Lifecycle state of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WalletInvoiceState {
    Pending = 0,
    Paid = 1,
    Expired = 2,
    Failed = 3,
}

impl From<WalletInvoiceState> for u8 {
    fn from(state: WalletInvoiceState) -> Self {
        state as u8
    }
}

impl TryFrom<u8> for WalletInvoiceState {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(WalletInvoiceState::Pending),
            1 => Ok(WalletInvoiceState::Paid),
            2 => Ok(WalletInvoiceState::Expired),
            3 => Ok(WalletInvoiceState::Failed),
            other => Err(format!("unknown invoice state: {}", other)),
        }
    }
}

/// An invoice as reported by a backend or derived from a payment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInvoice {
    /// Wire-encoded payment request.
    pub pr: String,
    pub payment_hash: String,
    pub memo: String,
    pub amount: MilliSats,
    pub fees: MilliSats,
    /// Creation time, unix seconds.
    pub timestamp: u64,
    /// Proof of payment, present once settled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preimage: Option<String>,
    pub state: WalletInvoiceState,
}

/// Fields extracted from a payment request by an [`InvoiceDecoder`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedInvoice {
    pub amount: Option<MilliSats>,
    pub description: Option<String>,
    pub payment_hash: Option<String>,
    pub timestamp: Option<u64>,
    pub expired: bool,
}

/// Decodes wire-encoded payment requests.
///
/// Decoding is owned by an external collaborator; the wallet layer only
/// needs the handful of fields in [`DecodedInvoice`].
pub trait InvoiceDecoder: Send + Sync {
    /// Decode `pr`, or return `None` if it cannot be parsed.
    fn decode(&self, pr: &str) -> Option<DecodedInvoice>;
}

/// Build a display view of a payment request.
///
/// Returns `None` when the decoder cannot parse `pr`.
pub fn pr_to_wallet_invoice(pr: &str, decoder: &dyn InvoiceDecoder) -> Option<WalletInvoice> {
    let parsed = decoder.decode(pr)?;
    Some(WalletInvoice {
        pr: pr.to_string(),
        payment_hash: parsed.payment_hash.unwrap_or_default(),
        memo: parsed.description.unwrap_or_default(),
        amount: parsed.amount.unwrap_or(0),
        fees: 0,
        timestamp: parsed.timestamp.unwrap_or(0),
        preimage: None,
        state: if parsed.expired {
            WalletInvoiceState::Expired
        } else {
            WalletInvoiceState::Pending
        },
    })
}
