use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand};
use tracing::{info, warn};
use uuid::Uuid;

use mock_wallet::MockConnector;
use wallet_core::{LnWallet, WalletConfig, WalletKind};
use wallet_store::{use_wallet, Connectors, StoreConfig, StoreError, WalletStore};

/// How long `balance` waits for a wallet that activates in the background.
const ACTIVATION_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Parser)]
#[command(name = "wallet-cli")]
#[command(about = "Manage persisted Lightning wallet configurations")]
struct Args {
    /// Directory holding the wallet store. Falls back to WALLET_STORE_DIR env.
    #[arg(long)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List every configuration (the active one is marked with *)
    List,

    /// Print the active configuration as JSON
    Active,

    /// Add a configuration
    Add {
        /// Backend kind: lndhub, lnc, webln, nwc, cashu
        #[arg(long)]
        kind: WalletKind,

        /// Configuration id (defaults to a random UUID)
        #[arg(long)]
        id: Option<String>,

        /// Display name
        #[arg(long)]
        alias: Option<String>,

        /// Backend-specific connection data
        #[arg(long)]
        data: Option<String>,

        /// Make this the active configuration
        #[arg(long)]
        activate: bool,
    },

    /// Remove a configuration
    Remove {
        id: String,
    },

    /// Make a configuration the active one
    Switch {
        id: String,
    },

    /// Record whether an injected WebLN provider is present
    Webln {
        #[arg(long, action = ArgAction::Set)]
        available: bool,
    },

    /// Activate the active configuration and print its balance
    Balance,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wallet_store=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = StoreConfig::from_env();
    if let Some(dir) = args.store_dir {
        config.storage_dir = dir;
    }
    info!(
        dir = %config.storage_dir.display(),
        key = %config.storage_key,
        "Opening wallet store"
    );

    let store = config.open(Connectors::uniform(Arc::new(MockConnector::new())));
    let result = run(&store, args.command).await;

    store.free().await;
    result
}

async fn run(store: &WalletStore, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::List => {
            let configs = store.list();
            if configs.is_empty() {
                println!("No wallets configured");
            }
            for config in configs {
                let marker = if config.active { "*" } else { " " };
                println!(
                    "{} {:<36} {:<8} {}",
                    marker, config.id, config.kind, config.info.alias
                );
            }
        }
        Command::Active => match store.get_snapshot().config.as_ref() {
            Some(config) => println!("{}", serde_json::to_string_pretty(config)?),
            None => return Err(StoreError::NoActiveConfig.into()),
        },
        Command::Add {
            kind,
            id,
            alias,
            data,
            activate,
        } => {
            let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
            let mut config = WalletConfig::new(id.clone(), kind);
            if let Some(alias) = alias {
                config = config.with_alias(alias);
            }
            if let Some(data) = data {
                config = config.with_data(data);
            }
            if activate {
                config = config.activated();
            }
            store.add(config)?;
            println!("Added {} wallet {}", kind, id);
        }
        Command::Remove { id } => {
            store.remove(&id)?;
            println!("Removed wallet {}", id);
        }
        Command::Switch { id } => {
            store.switch(&id)?;
            println!("Active wallet is now {}", id);
        }
        Command::Webln { available } => {
            store.sync_injected_provider(available)?;
            let present = store.list().iter().any(|c| c.kind == WalletKind::WebLn);
            println!("WebLN wallet {}", if present { "present" } else { "absent" });
        }
        Command::Balance => {
            let wallet = active_wallet(store).await?;
            let balance = wallet.get_balance().await?;
            println!("{} sats ({})", balance, wallet.name());
        }
    }

    Ok(())
}

/// The active wallet, waiting for a background activation if one is running.
async fn active_wallet(store: &WalletStore) -> Result<Arc<dyn LnWallet>, Box<dyn std::error::Error>> {
    if let Some(wallet) = store.get()? {
        return Ok(wallet);
    }
    if !store.is_loading() {
        return Err("Active wallet could not be activated (see logs)".into());
    }

    let mut watch = use_wallet(store).watch();
    let snapshot = tokio::time::timeout(ACTIVATION_TIMEOUT, watch.wait_for(|s| s.has_wallet()))
        .await
        .map_err(|_| {
            warn!("Wallet activation timed out");
            "Timed out waiting for wallet activation"
        })?
        .ok_or("Wallet store closed")?;

    snapshot
        .wallet
        .clone()
        .ok_or_else(|| "Active wallet is unavailable".into())
}
