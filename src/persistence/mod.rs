//! Persistence layer: the ledger store.
//!
//! [`LedgerStore`] is the seam between the services and PostgreSQL.
//! The concrete implementation is [`postgres::PostgresLedgerStore`]
//! over `sqlx::PgPool`; service tests substitute an in-memory double.

pub mod models;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{ChainAddress, ChainId, PoolId, StakeApplication, TokenAmount, WalletId};
use crate::error::LedgerError;
use crate::persistence::models::{
    NewPool, PoolRecord, StakeEventRecord, StakedBalanceRecord, StakedPoolRecord, WalletRecord,
};

/// Durable ledger storage.
///
/// Every method maps infrastructure failures to
/// [`LedgerError::Persistence`]; domain-level conflicts surface as
/// their specific variants (`PoolExists`, `AlreadyProcessed`).
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Finds the wallet registered for a platform user.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    async fn find_wallet_by_user(&self, user_id: Uuid)
    -> Result<Option<WalletRecord>, LedgerError>;

    /// Finds a wallet by row id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    async fn find_wallet(&self, id: WalletId) -> Result<Option<WalletRecord>, LedgerError>;

    /// Finds the wallet registered at a chain address.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    async fn find_wallet_by_address(
        &self,
        address: &ChainAddress,
    ) -> Result<Option<WalletRecord>, LedgerError>;

    /// Creates a pool shell with no deployed address yet.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PoolExists`] when the wallet already has
    /// a pool on the chain, [`LedgerError::Persistence`] otherwise.
    async fn insert_pool(&self, new_pool: NewPool) -> Result<PoolRecord, LedgerError>;

    /// Finds a pool by row id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    async fn find_pool(&self, id: PoolId) -> Result<Option<PoolRecord>, LedgerError>;

    /// Finds a pool by its deployed contract address.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    async fn find_pool_by_address(
        &self,
        address: &ChainAddress,
    ) -> Result<Option<PoolRecord>, LedgerError>;

    /// Finds the wallet's pool on a chain, if any.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    async fn find_pool_by_wallet_chain(
        &self,
        wallet_id: WalletId,
        chain_id: &ChainId,
    ) -> Result<Option<PoolRecord>, LedgerError>;

    /// Attaches or clears a pool's deployed address.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PoolIdNotFound`] when the row does not
    /// exist, [`LedgerError::Persistence`] on database failure.
    async fn set_pool_address(
        &self,
        id: PoolId,
        address: Option<&ChainAddress>,
    ) -> Result<(), LedgerError>;

    /// Deletes a pool row. Returns `false` when no row matched.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    async fn delete_pool(&self, id: PoolId) -> Result<bool, LedgerError>;

    /// Lists pools, optionally filtered by chain, newest first.
    ///
    /// Returns the page of rows plus the unfiltered total for the same
    /// filter.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    async fn list_pools(
        &self,
        chain_id: Option<&ChainId>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PoolRecord>, i64), LedgerError>;

    /// Lists pools a wallet has a cached balance in, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    async fn list_staked_pools(
        &self,
        wallet_id: WalletId,
        chain_id: Option<&ChainId>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<StakedPoolRecord>, i64), LedgerError>;

    /// Reads the cached balance row for (wallet, pool), if any.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    async fn staked_balance(
        &self,
        wallet_id: WalletId,
        pool_id: PoolId,
    ) -> Result<Option<StakedBalanceRecord>, LedgerError>;

    /// Finds the journal entry for (transaction, wallet, pool), if any.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    async fn find_stake_event(
        &self,
        tx_hash: &str,
        wallet_id: WalletId,
        pool_id: PoolId,
    ) -> Result<Option<StakeEventRecord>, LedgerError>;

    /// Applies a batch of staged ledger writes atomically.
    ///
    /// Each application is one journal insert plus one balance upsert;
    /// the whole batch commits or rolls back together.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AlreadyProcessed`] when the journal's
    /// unique constraint rejects a duplicate (including concurrent
    /// duplicates), [`LedgerError::Persistence`] on other failures.
    async fn apply_stake_events(
        &self,
        applications: &[StakeApplication],
    ) -> Result<(), LedgerError>;

    /// Bulk-overwrites cached pool totals in one statement.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    async fn update_pool_totals(
        &self,
        updates: &[(PoolId, TokenAmount)],
    ) -> Result<(), LedgerError>;

    /// Bulk-sets pool display names in one statement.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    async fn update_pool_names(&self, updates: &[(PoolId, String)]) -> Result<(), LedgerError>;

    /// Bulk-overwrites a wallet's cached staked amounts in one
    /// statement.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    async fn update_staked_balances(
        &self,
        wallet_id: WalletId,
        updates: &[(PoolId, TokenAmount)],
    ) -> Result<(), LedgerError>;

    /// Bulk-overwrites a wallet's cached pending rewards in one
    /// statement.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    async fn update_pending_rewards(
        &self,
        wallet_id: WalletId,
        updates: &[(PoolId, TokenAmount)],
    ) -> Result<(), LedgerError>;
}
