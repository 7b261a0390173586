//! # stakegate
//!
//! REST API gateway and on-chain reconciliation engine for creator
//! staking pools.
//!
//! The relational ledger here is a cache over chain truth: an
//! append-only stake event journal plus cached balances, kept
//! consistent by receipt-driven reconciliation (applied exactly once
//! per transaction) and batched balance refreshes that tolerate
//! partial chain failure.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── ReconciliationService (service/)
//!     ├── BalanceSyncService / PoolService (service/)
//!     │
//!     ├── ChainReader (chain/) ──► JSON-RPC nodes
//!     │
//!     └── LedgerStore (persistence/) ──► PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod chain;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
