//! Ledger Engine - double-entry account transfers
//!
//! # Modules
//!
//! - [`ledger`] - Domain types, transfer engine, idempotency and stores
//! - [`gateway`] - axum HTTP API with OpenAPI docs
//! - [`db`] - PostgreSQL pool and migrations
//! - [`config`] - YAML configuration
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod db;
pub mod gateway;
pub mod ledger;
pub mod logging;

// Convenient re-exports at crate root
pub use ledger::{
    Account, AccountId, LedgerError, LedgerStore, MemoryLedgerStore, Outcome, PgLedgerStore,
    TransactionRecord, TransferEngine,
};
