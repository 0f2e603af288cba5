//! Persisted wallet configuration types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Amount in satoshis.
pub type Sats = u64;

/// Amount in millisatoshis (1 sat = 1000 msats).
pub type MilliSats = u64;

/// The kind of backend a configuration connects to.
///
/// Persisted as its integer tag, so the discriminants must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WalletKind {
    /// Hosted-node account API (LNDHub).
    LndHub = 1,
    /// Remote node connection (Lightning Node Connect).
    Lnc = 2,
    /// Provider injected by the host environment (WebLN).
    WebLn = 3,
    /// Remote signer over Nostr Wallet Connect.
    Nwc = 4,
    /// Ecash mint (Cashu).
    Cashu = 5,
}

impl WalletKind {
    /// All kinds, in tag order.
    pub const ALL: [WalletKind; 5] = [
        WalletKind::LndHub,
        WalletKind::Lnc,
        WalletKind::WebLn,
        WalletKind::Nwc,
        WalletKind::Cashu,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WalletKind::LndHub => "lndhub",
            WalletKind::Lnc => "lnc",
            WalletKind::WebLn => "webln",
            WalletKind::Nwc => "nwc",
            WalletKind::Cashu => "cashu",
        }
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        WalletKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| format!("unknown wallet kind: {}", s))
    }
}

impl From<WalletKind> for u8 {
    fn from(kind: WalletKind) -> Self {
        kind as u8
    }
}

impl TryFrom<u8> for WalletKind {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        WalletKind::ALL
            .into_iter()
            .find(|kind| *kind as u8 == value)
            .ok_or_else(|| format!("unknown wallet kind tag: {}", value))
    }
}

/// Last-known metadata reported by a backend.
///
/// Advisory only: it may be stale or partially filled, so every field
/// falls back to its default when missing from stored JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WalletInfo {
    pub fee: f64,
    pub node_pub_key: String,
    pub alias: String,
    pub pending_channels: u32,
    pub active_channels: u32,
    pub peers: u32,
    pub block_height: u64,
    pub block_hash: String,
    pub synced: bool,
    pub chains: Vec<String>,
    pub version: String,
}

impl WalletInfo {
    /// Info carrying only a display alias.
    pub fn with_alias(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            ..Default::default()
        }
    }
}

/// A persisted wallet configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletConfig {
    /// Unique identifier within the registry.
    pub id: String,
    /// Which backend this configuration activates.
    pub kind: WalletKind,
    /// Whether this is the selected wallet.
    #[serde(default)]
    pub active: bool,
    /// Last-known backend metadata.
    #[serde(default)]
    pub info: WalletInfo,
    /// Backend-specific credentials or connection parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl WalletConfig {
    /// Create an inactive configuration with no backend data.
    pub fn new(id: impl Into<String>, kind: WalletKind) -> Self {
        Self {
            id: id.into(),
            kind,
            active: false,
            info: WalletInfo::default(),
            data: None,
        }
    }

    /// Set the opaque backend data.
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the display alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.info.alias = alias.into();
        self
    }

    /// Mark this configuration active.
    pub fn activated(mut self) -> Self {
        self.active = true;
        self
    }
}
