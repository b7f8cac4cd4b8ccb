//! Wallet ledger daemon binary

use anyhow::Context;
use wallet_ledger::{Config, Ledger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting NickBank wallet ledger");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Open ledger; transport adapters attach out of process
    let _ledger = Ledger::open(config).context("Failed to open ledger")?;
    tracing::info!("Ledger opened successfully");

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down wallet ledger");
    Ok(())
}
