//! Payment-request format used by [`crate::MockWallet`].
//!
//! Requests look like `lnmock<msat>n<nonce>`. They carry just enough to be
//! paid by another mock wallet; there is no signature or expiry.

use sha2::{Digest, Sha256};
use wallet_core::{DecodedInvoice, InvoiceDecoder, MilliSats};

const PREFIX: &str = "lnmock";

/// Encode a mock payment request.
pub fn encode_request(amount_msats: MilliSats, nonce: u64) -> String {
    format!("{}{}n{}", PREFIX, amount_msats, nonce)
}

/// Hex SHA-256 of the request, used as its payment hash.
pub fn payment_hash(pr: &str) -> String {
    hex::encode(Sha256::digest(pr.as_bytes()))
}

/// Parse the amount out of a mock payment request.
pub fn parse_amount(pr: &str) -> Option<MilliSats> {
    let rest = pr.strip_prefix(PREFIX)?;
    let (amount, nonce) = rest.split_once('n')?;
    nonce.parse::<u64>().ok()?;
    amount.parse().ok()
}

/// [`InvoiceDecoder`] for mock payment requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockDecoder;

impl InvoiceDecoder for MockDecoder {
    fn decode(&self, pr: &str) -> Option<DecodedInvoice> {
        let amount = parse_amount(pr)?;
        Some(DecodedInvoice {
            amount: Some(amount),
            description: None,
            payment_hash: Some(payment_hash(pr)),
            timestamp: None,
            expired: false,
        })
    }
}
