use std::sync::Arc;

use super::validation::RequestValidator;
use crate::ledger::{LedgerStore, TransferEngine};

/// Gateway application state (shared across handlers)
#[derive(Clone)]
pub struct AppState {
    /// Ledger operations
    pub engine: TransferEngine,
    /// Business rules for request bodies
    pub validator: RequestValidator,
    /// Build revision reported by the health endpoint
    pub build: &'static str,
}

impl AppState {
    pub fn new(store: Arc<dyn LedgerStore>, validator: RequestValidator) -> Self {
        Self {
            engine: TransferEngine::new(store),
            validator,
            build: env!("BUILD_REV"),
        }
    }
}
