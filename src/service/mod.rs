//! Service layer: business logic orchestration.
//!
//! [`ReconciliationService`] turns confirmed on-chain transactions into
//! ledger writes, [`BalanceSyncService`] refreshes cached balances from
//! chain state, and [`PoolService`] handles the pool lifecycle. All
//! three sit behind the [`crate::persistence::LedgerStore`] and
//! [`crate::chain::ChainReader`] seams.

pub mod balance_sync;
pub mod pool;
pub mod reconciliation;

pub use balance_sync::BalanceSyncService;
pub use pool::PoolService;
pub use reconciliation::{ReconcileSummary, ReconciliationService};

#[cfg(test)]
pub(crate) mod testing;
