//! Error types for wallet backend operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a backend failure.
///
/// Every backend maps its own failures onto this closed set so callers can
/// react to the kind of problem (for example, telling "insufficient balance"
/// apart from "no route found") without knowing which backend produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WalletErrorCode {
    /// Credentials were rejected or a login is required.
    BadAuth = 1,
    /// The wallet cannot cover the requested amount.
    NotEnoughBalance = 2,
    /// The counterparty is incompatible with this backend.
    BadPartner = 3,
    /// The payment request could not be understood.
    InvalidInvoice = 4,
    /// No payment route could be found.
    RouteNotFound = 5,
    /// Anything that does not fit another code.
    GeneralError = 6,
    /// The node or backend service itself failed.
    NodeFailure = 7,
}

impl WalletErrorCode {
    /// Short machine-friendly name.
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletErrorCode::BadAuth => "bad_auth",
            WalletErrorCode::NotEnoughBalance => "not_enough_balance",
            WalletErrorCode::BadPartner => "bad_partner",
            WalletErrorCode::InvalidInvoice => "invalid_invoice",
            WalletErrorCode::RouteNotFound => "route_not_found",
            WalletErrorCode::GeneralError => "general_error",
            WalletErrorCode::NodeFailure => "node_failure",
        }
    }
}

impl fmt::Display for WalletErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<WalletErrorCode> for u8 {
    fn from(code: WalletErrorCode) -> Self {
        code as u8
    }
}

impl TryFrom<u8> for WalletErrorCode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(WalletErrorCode::BadAuth),
            2 => Ok(WalletErrorCode::NotEnoughBalance),
            3 => Ok(WalletErrorCode::BadPartner),
            4 => Ok(WalletErrorCode::InvalidInvoice),
            5 => Ok(WalletErrorCode::RouteNotFound),
            6 => Ok(WalletErrorCode::GeneralError),
            7 => Ok(WalletErrorCode::NodeFailure),
            other => Err(format!("unknown wallet error code: {}", other)),
        }
    }
}

/// Error returned by any network-facing wallet operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct WalletError {
    /// What kind of failure this is.
    pub code: WalletErrorCode,
    /// Backend-provided detail.
    pub message: String,
}

impl WalletError {
    /// Create an error with the given code and message.
    pub fn new(code: WalletErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The catch-all error used when a backend gives no usable detail.
    pub fn unknown() -> Self {
        Self::new(WalletErrorCode::GeneralError, "Unknown error")
    }

    pub fn bad_auth(message: impl Into<String>) -> Self {
        Self::new(WalletErrorCode::BadAuth, message)
    }

    pub fn not_enough_balance(message: impl Into<String>) -> Self {
        Self::new(WalletErrorCode::NotEnoughBalance, message)
    }

    pub fn bad_partner(message: impl Into<String>) -> Self {
        Self::new(WalletErrorCode::BadPartner, message)
    }

    pub fn invalid_invoice(message: impl Into<String>) -> Self {
        Self::new(WalletErrorCode::InvalidInvoice, message)
    }

    pub fn route_not_found(message: impl Into<String>) -> Self {
        Self::new(WalletErrorCode::RouteNotFound, message)
    }

    pub fn node_failure(message: impl Into<String>) -> Self {
        Self::new(WalletErrorCode::NodeFailure, message)
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self::new(WalletErrorCode::GeneralError, message)
    }
}
