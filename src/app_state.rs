//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::chain::registry::ChainRegistry;
use crate::service::{BalanceSyncService, PoolService, ReconciliationService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Pool lifecycle service.
    pub pools: Arc<PoolService>,
    /// Transaction reconciliation service.
    pub reconciliation: Arc<ReconciliationService>,
    /// Cached balance refresh service.
    pub balance_sync: Arc<BalanceSyncService>,
    /// Configured chain endpoints.
    pub registry: Arc<ChainRegistry>,
}
