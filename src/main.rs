//! Proposer pool CLI.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────┐
//!   status        │                AccountManager                │
//!   create  ─────▶│  funder ── pool [A, B, C, ...] (append-only) │
//!   submit        │      │            │                          │
//!                 │      ▼            ▼                          │
//!                 │  mint account   select proposer ─▶ submit    │
//!                 └──────┬────────────────────────────┬──────────┘
//!                        │                            │
//!                        ▼                            ▼
//!                 ┌─────────────┐              ┌─────────────┐
//!                 │ FlowClient  │──── REST ───▶│ Access API  │
//!                 └─────────────┘              └─────────────┘
//!                        │
//!                        ▼
//!                 pool file (JSON), saved after each submission
//! ```

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

use flow_proposer_pool::account::{Account, KeyPair};
use flow_proposer_pool::config::{load_config, PoolConfig, FUNDER_KEY_ENV_VAR};
use flow_proposer_pool::flow::{Address, FlowClient, Transport};
use flow_proposer_pool::manager::{AccountManager, ManagerOptions};
use flow_proposer_pool::observability::{logging, metrics};
use flow_proposer_pool::store;

#[derive(Parser)]
#[command(name = "proposer-pool")]
#[command(about = "Submit Flow transactions through a pool of proposer accounts", long_about = None)]
struct Cli {
    /// Configuration file (TOML). Defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the funder, the pool and Access API health
    Status,
    /// Create one pool account
    Create,
    /// Submit a transaction with a pooled proposer
    Submit {
        /// Cadence transaction source file
        #[arg(short, long)]
        script: PathBuf,

        /// JSON-Cadence arguments as a JSON array
        #[arg(short, long)]
        args: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PoolConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("proposer-pool v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let client = Arc::new(FlowClient::new(config.access.clone())?);
    let transport: Arc<dyn Transport> = client.clone();

    let funder_address: Address = config.funder.address.parse()?;
    let funder_keys = KeyPair::from_env(FUNDER_KEY_ENV_VAR)?;
    let funder = Account::from_chain(
        funder_address,
        funder_keys,
        config.funder.key_id,
        transport.as_ref(),
    )
    .await?;

    let pool_file = PathBuf::from(&config.pool.pool_file);
    let accounts = store::load_pool(&pool_file, transport.as_ref()).await?;

    let mut manager = AccountManager::new(
        transport,
        funder,
        accounts,
        ManagerOptions::from(&config.pool),
    );
    manager.on_submitted(store::save_hook(pool_file.clone()));

    match cli.command {
        Commands::Status => {
            let report = json!({
                "funder": account_summary(manager.funder()),
                "accounts": manager.accounts().iter().map(account_summary).collect::<Vec<_>>(),
                "access_healthy": client.is_healthy().await,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Create => {
            let account = manager.mint_account().await?;
            store::save_pool(&pool_file, &manager.accounts())?;
            println!("{}", account.address());
        }
        Commands::Submit { script, args } => {
            let source = std::fs::read_to_string(&script)?;
            let arguments = parse_arguments(args.as_deref())?;
            let tx_id = manager.submit(&source, arguments).await?;
            println!("{}", tx_id);
        }
    }

    Ok(())
}

fn account_summary(account: &Arc<Account>) -> Value {
    json!({
        "address": account.address(),
        "key_id": account.key_id(),
        "sequence_number": account.sequence_number(),
        "pending_tx": account.pending_tx(),
    })
}

fn parse_arguments(raw: Option<&str>) -> Result<Vec<Value>, Box<dyn std::error::Error>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(values) => Ok(values),
        other => Err(format!("--args must be a JSON array, got {}", other).into()),
    }
}
