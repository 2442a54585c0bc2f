//! Ledger Engine
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────┐    ┌──────────────┐
//! │  Config  │───▶│ Storage  │───▶│  Engine  │───▶│   Gateway    │
//! │  (YAML)  │    │ (PG/Mem) │    │ (ledger) │    │ (axum, HTTP) │
//! └──────────┘    └──────────┘    └──────────┘    └──────────────┘
//! ```
//!
//! Usage: `ledger_engine [--env dev] [--port 3000]`

use std::sync::Arc;

use anyhow::Context;

use ledger_engine::config::{AppConfig, StorageKind};
use ledger_engine::db::Database;
use ledger_engine::gateway::{self, state::AppState, validation::RequestValidator};
use ledger_engine::ledger::{LedgerStore, MemoryLedgerStore, PgLedgerStore};
use ledger_engine::logging;

// ============================================================
// COMMAND LINE
// ============================================================

fn arg_value(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    args.iter()
        .position(|a| names.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1).cloned())
}

fn get_env() -> String {
    arg_value(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

/// Get port override from command line (--port argument)
fn get_port_override() -> anyhow::Result<Option<u16>> {
    arg_value(&["--port"])
        .map(|p| p.parse::<u16>().with_context(|| format!("Invalid --port: {}", p)))
        .transpose()
}

// ============================================================
// STORAGE
// ============================================================

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn LedgerStore>> {
    let store: Arc<dyn LedgerStore> = match config.storage {
        StorageKind::Postgres => {
            let url = config
                .postgres_url
                .as_deref()
                .context("storage is postgres but no postgres_url or DATABASE_URL is set")?;
            let db = Database::connect(url, &config.ledger)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.migrate().await.context("Failed to apply migrations")?;
            Arc::new(PgLedgerStore::new(
                db.pool().clone(),
                config.ledger.lock_timeout(),
            ))
        }
        StorageKind::Memory => {
            tracing::warn!("Using in-memory ledger store, state is lost on exit");
            Arc::new(MemoryLedgerStore::new(config.ledger.lock_timeout()))
        }
    };

    store
        .ensure_system_account()
        .await
        .context("Failed to seed system account")?;
    Ok(store)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// ============================================================
// MAIN
// ============================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override()? {
        app_config.gateway.port = port;
    }
    let _log_guard = logging::init_logging(&app_config);

    tracing::info!(
        env = %env,
        build = env!("BUILD_REV"),
        storage = ?app_config.storage,
        lock_timeout_ms = app_config.ledger.lock_timeout_ms,
        "Starting ledger engine"
    );

    let store = build_store(&app_config).await?;
    let state = Arc::new(AppState::new(store, RequestValidator::default()));

    gateway::run_server(&app_config.gateway, state, shutdown_signal())
        .await
        .context("Gateway server error")?;

    tracing::info!("Ledger engine stopped");
    Ok(())
}
