//! Transfer engine server binary
//!
//! Boots the engine over in-memory stores and keeps the expiry sweeper
//! running. HTTP routing, JWT verification and schema validation belong
//! to the gateway in front of this process.

use points_ledger::{MemoryTransactionStore, MemoryUserStore, TransactionStore, UserStore};
use std::sync::Arc;
use transfer_engine::{
    seed, Config, ExpirySweeper, LedgerEngine, StaticAuthenticator, TransferService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting PointsPay transfer server");

    let config = Config::from_env()?;

    let users = Arc::new(MemoryUserStore::new());
    let transactions = Arc::new(MemoryTransactionStore::new());
    let engine = Arc::new(LedgerEngine::new(
        users.clone() as Arc<dyn UserStore>,
        transactions.clone() as Arc<dyn TransactionStore>,
        &config,
    )?);

    if config.seed_demo_data {
        let demo = seed::seed_demo_data(&engine, users.as_ref(), transactions.as_ref())?;
        tracing::info!(email = %demo.email, balance = %demo.balance, "Demo user available");
    }

    let authenticator = Arc::new(StaticAuthenticator::new());
    let _service = TransferService::new(
        engine.clone(),
        users.clone() as Arc<dyn UserStore>,
        authenticator,
        &config,
    );
    tracing::info!("Transfer service ready");

    let sweeper = if config.sweep.enabled {
        Some(ExpirySweeper::new(engine.clone(), config.sweep.interval_secs).spawn())
    } else {
        None
    };

    // TODO: attach the gRPC/HTTP gateway surface here
    tokio::signal::ctrl_c().await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    tracing::info!("Shutting down transfer server");
    Ok(())
}
