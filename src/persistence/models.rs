//! Database models for wallets, pools, balances, and journal entries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{ChainAddress, ChainId, PoolId, StakeEventKind, TokenAmount, WalletId};

/// A wallet row from the `user_wallets` table.
///
/// Wallets are seeded by the account subsystem; the ledger only reads
/// them.
#[derive(Debug, Clone, Serialize)]
pub struct WalletRecord {
    /// Wallet row id.
    pub id: WalletId,
    /// Owning platform user.
    pub user_id: Uuid,
    /// Wallet address, lowercased.
    pub address: ChainAddress,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A pool row from the `pools` table.
#[derive(Debug, Clone, Serialize)]
pub struct PoolRecord {
    /// Pool row id.
    pub id: PoolId,
    /// Creator's wallet.
    pub wallet_id: WalletId,
    /// Network the pool lives on.
    pub chain_id: ChainId,
    /// Deployed contract address; `NULL` until deployment is confirmed.
    pub address: Option<ChainAddress>,
    /// Display name read from the contract; `NULL` until synced.
    pub name: Option<String>,
    /// Cached pool-wide total (creator + fans), refreshed from chain.
    pub total_staked: TokenAmount,
    /// Optional display image.
    pub image_url: Option<String>,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Arguments for creating a pool shell.
#[derive(Debug, Clone)]
pub struct NewPool {
    /// Creator's wallet.
    pub wallet_id: WalletId,
    /// Network the pool will be deployed on.
    pub chain_id: ChainId,
    /// Optional display name supplied at creation.
    pub name: Option<String>,
    /// Optional display image.
    pub image_url: Option<String>,
}

/// A cached balance row from the `staked_pools` table.
#[derive(Debug, Clone, Serialize)]
pub struct StakedBalanceRecord {
    /// Staking wallet.
    pub wallet_id: WalletId,
    /// Target pool.
    pub pool_id: PoolId,
    /// Cached staked amount.
    pub amount: TokenAmount,
    /// Cached pending reward, refreshed from chain.
    pub pending_reward: TokenAmount,
    /// Last refresh timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A journal row from the `stake_events` table.
#[derive(Debug, Clone, Serialize)]
pub struct StakeEventRecord {
    /// Auto-increment row id.
    pub id: i64,
    /// Wallet credited or debited.
    pub wallet_id: WalletId,
    /// Target pool.
    pub pool_id: PoolId,
    /// Journal entry type.
    pub event_type: StakeEventKind,
    /// Event amount in wei.
    pub amount: TokenAmount,
    /// Source transaction hash.
    pub tx_hash: String,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A pool joined with the caller's cached stake in it.
#[derive(Debug, Clone, Serialize)]
pub struct StakedPoolRecord {
    /// The pool row.
    pub pool: PoolRecord,
    /// Caller's cached staked amount.
    pub amount: TokenAmount,
    /// Caller's cached pending reward.
    pub pending_reward: TokenAmount,
}
