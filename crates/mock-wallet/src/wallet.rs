//! In-memory ledger wallet.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;
use wallet_core::{
    InvoiceRequest, LnWallet, Sats, WalletConfig, WalletError, WalletInfo, WalletInvoice,
    WalletInvoiceState,
};

use crate::decoder::{encode_request, parse_amount, payment_hash};

/// Settings read from a configuration's opaque `data` field.
///
/// ```json
/// {"balance": 10000, "password": "hunter2", "alias": "test", "unroutable": false}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MockSettings {
    /// Starting balance in sats.
    pub balance: Sats,
    /// If set, `login` must be called with this password before use.
    pub password: Option<String>,
    /// Node alias reported by `get_info`.
    pub alias: Option<String>,
    /// Every payment fails with "no route".
    pub unroutable: bool,
}

impl MockSettings {
    /// Parse settings from a configuration's data. Missing data means defaults.
    pub fn from_data(data: Option<&str>) -> Result<Self, WalletError> {
        match data {
            None => Ok(Self::default()),
            Some(raw) if raw.trim().is_empty() => Ok(Self::default()),
            Some(raw) => serde_json::from_str(raw)
                .map_err(|e| WalletError::general(format!("invalid mock wallet data: {}", e))),
        }
    }
}

#[derive(Debug, Default)]
struct Ledger {
    balance_msats: u64,
    invoices: Vec<WalletInvoice>,
    logged_in: bool,
    closed: bool,
    close_calls: usize,
    nonce: u64,
}

/// A wallet that keeps its balance and invoices in memory.
///
/// It behaves like a real backend as far as the error taxonomy goes, which
/// makes it useful for exercising callers without a Lightning node.
#[derive(Debug)]
pub struct MockWallet {
    settings: MockSettings,
    ledger: Mutex<Ledger>,
}

impl MockWallet {
    /// Create a wallet from explicit settings.
    pub fn new(settings: MockSettings) -> Self {
        let ledger = Ledger {
            balance_msats: settings.balance.saturating_mul(1000),
            ..Default::default()
        };
        Self {
            settings,
            ledger: Mutex::new(ledger),
        }
    }

    /// Create a wallet with the given balance and no password.
    pub fn with_balance(balance: Sats) -> Self {
        Self::new(MockSettings {
            balance,
            ..Default::default()
        })
    }

    /// Create a wallet from a persisted configuration.
    ///
    /// The configured alias is used when the data does not name one.
    pub fn from_config(config: &WalletConfig) -> Result<Self, WalletError> {
        let mut settings = MockSettings::from_data(config.data.as_deref())?;
        if settings.alias.is_none() && !config.info.alias.is_empty() {
            settings.alias = Some(config.info.alias.clone());
        }
        Ok(Self::new(settings))
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.ledger().closed
    }

    /// How many times `close` has been called.
    pub fn close_calls(&self) -> usize {
        self.ledger().close_calls
    }

    /// Mark one of this wallet's own invoices as paid, crediting the balance.
    ///
    /// Returns `false` if the invoice is unknown or not pending.
    pub fn settle(&self, pr: &str) -> bool {
        let mut ledger = self.ledger();
        let Some(index) = ledger
            .invoices
            .iter()
            .position(|inv| inv.pr == pr && inv.state == WalletInvoiceState::Pending)
        else {
            return false;
        };
        let amount = ledger.invoices[index].amount;
        ledger.invoices[index].state = WalletInvoiceState::Paid;
        ledger.invoices[index].preimage = Some(preimage_for(pr));
        ledger.balance_msats += amount;
        true
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the ledger for an operation that needs an open, unlocked wallet.
    fn usable_ledger(&self) -> Result<MutexGuard<'_, Ledger>, WalletError> {
        let ledger = self.ledger();
        if ledger.closed {
            return Err(WalletError::node_failure("wallet is closed"));
        }
        if self.settings.password.is_some() && !ledger.logged_in {
            return Err(WalletError::bad_auth("login required"));
        }
        Ok(ledger)
    }
}

fn preimage_for(pr: &str) -> String {
    hex::encode(Sha256::digest(format!("preimage:{}", pr).as_bytes()))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[async_trait]
impl LnWallet for MockWallet {
    fn name(&self) -> &str {
        "MockWallet"
    }

    fn is_ready(&self) -> bool {
        let ledger = self.ledger();
        !ledger.closed && (self.settings.password.is_none() || ledger.logged_in)
    }

    fn can_auto_login(&self) -> bool {
        self.settings.password.is_none()
    }

    async fn get_info(&self) -> Result<WalletInfo, WalletError> {
        let _ledger = self.usable_ledger()?;
        let alias = self.settings.alias.clone().unwrap_or_else(|| "mock".to_string());
        Ok(WalletInfo {
            node_pub_key: hex::encode(Sha256::digest(alias.as_bytes())),
            alias,
            synced: true,
            chains: vec!["bitcoin".to_string()],
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Default::default()
        })
    }

    async fn login(&self, password: Option<&str>) -> Result<bool, WalletError> {
        let mut ledger = self.ledger();
        if ledger.closed {
            return Err(WalletError::node_failure("wallet is closed"));
        }
        match self.settings.password.as_deref() {
            Some(expected) if password != Some(expected) => {
                Err(WalletError::bad_auth("invalid password"))
            }
            _ => {
                ledger.logged_in = true;
                Ok(true)
            }
        }
    }

    async fn close(&self) -> Result<bool, WalletError> {
        let mut ledger = self.ledger();
        ledger.closed = true;
        ledger.close_calls += 1;
        debug!("Mock wallet closed ({} calls)", ledger.close_calls);
        Ok(true)
    }

    async fn get_balance(&self) -> Result<Sats, WalletError> {
        let ledger = self.usable_ledger()?;
        Ok(ledger.balance_msats / 1000)
    }

    async fn create_invoice(&self, req: InvoiceRequest) -> Result<WalletInvoice, WalletError> {
        let mut ledger = self.usable_ledger()?;
        if req.amount == 0 {
            return Err(WalletError::invalid_invoice("amount must be positive"));
        }
        ledger.nonce += 1;
        let amount = req.amount.saturating_mul(1000);
        let pr = encode_request(amount, ledger.nonce);
        let invoice = WalletInvoice {
            payment_hash: payment_hash(&pr),
            pr,
            memo: req.memo.unwrap_or_default(),
            amount,
            fees: 0,
            timestamp: unix_now(),
            preimage: None,
            state: WalletInvoiceState::Pending,
        };
        ledger.invoices.push(invoice.clone());
        Ok(invoice)
    }

    async fn pay_invoice(&self, pr: &str) -> Result<WalletInvoice, WalletError> {
        let mut ledger = self.usable_ledger()?;
        let amount = parse_amount(pr)
            .ok_or_else(|| WalletError::invalid_invoice(format!("cannot decode: {}", pr)))?;
        if amount == 0 {
            return Err(WalletError::invalid_invoice("amountless invoices are not supported"));
        }
        if ledger.invoices.iter().any(|inv| inv.pr == pr) {
            return Err(WalletError::bad_partner(
                "cannot pay an invoice issued by this wallet",
            ));
        }
        if self.settings.unroutable {
            return Err(WalletError::route_not_found("no route to destination"));
        }
        if amount > ledger.balance_msats {
            return Err(WalletError::not_enough_balance(format!(
                "balance {} msat, need {} msat",
                ledger.balance_msats, amount
            )));
        }

        ledger.balance_msats -= amount;
        let invoice = WalletInvoice {
            pr: pr.to_string(),
            payment_hash: payment_hash(pr),
            memo: String::new(),
            amount,
            fees: 0,
            timestamp: unix_now(),
            preimage: Some(preimage_for(pr)),
            state: WalletInvoiceState::Paid,
        };
        ledger.invoices.push(invoice.clone());
        Ok(invoice)
    }

    async fn get_invoices(&self) -> Result<Vec<WalletInvoice>, WalletError> {
        let ledger = self.usable_ledger()?;
        Ok(ledger.invoices.clone())
    }
}
