//! Pool lifecycle: creation, deployment confirmation, deletion,
//! listings.
//!
//! A pool starts as a database shell with no contract address. Once
//! the creator's deployment transaction lands, the factory is asked
//! `poolFor(creator)` and the returned address is attached. The
//! factory, not the caller, is the authority on where (and whether) a
//! pool is deployed.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::chain::calls::{decode_address, pool_for};
use crate::chain::registry::ChainRegistry;
use crate::chain::{CallOutcome, ChainReader};
use crate::domain::{ChainId, PoolId};
use crate::error::LedgerError;
use crate::persistence::LedgerStore;
use crate::persistence::models::{NewPool, PoolRecord, StakedPoolRecord, WalletRecord};

/// Creates, confirms, deletes, and lists staking pools.
pub struct PoolService {
    store: Arc<dyn LedgerStore>,
    chain: Arc<dyn ChainReader>,
    registry: Arc<ChainRegistry>,
}

impl fmt::Debug for PoolService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolService").finish_non_exhaustive()
    }
}

impl PoolService {
    /// Builds the service over its store, chain reader, and registry.
    #[must_use]
    pub fn new(
        store: Arc<dyn LedgerStore>,
        chain: Arc<dyn ChainReader>,
        registry: Arc<ChainRegistry>,
    ) -> Self {
        Self {
            store,
            chain,
            registry,
        }
    }

    /// Resolves the caller's registered wallet.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingWallet`] when the user has no
    /// wallet on record, [`LedgerError::Persistence`] on database
    /// failure.
    pub async fn require_wallet(&self, user_id: Uuid) -> Result<WalletRecord, LedgerError> {
        self.store
            .find_wallet_by_user(user_id)
            .await?
            .ok_or(LedgerError::MissingWallet)
    }

    /// Creates a pool shell for the caller on the given chain.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnsupportedChain`] for an unconfigured
    /// chain, [`LedgerError::MissingWallet`] when the caller has no
    /// wallet, and [`LedgerError::PoolExists`] when the wallet already
    /// has a pool on that chain.
    pub async fn create(
        &self,
        user_id: Uuid,
        chain_id: ChainId,
        name: Option<String>,
        image_url: Option<String>,
    ) -> Result<PoolRecord, LedgerError> {
        self.registry.require(&chain_id)?;
        let wallet = self.require_wallet(user_id).await?;
        if self
            .store
            .find_pool_by_wallet_chain(wallet.id, &chain_id)
            .await?
            .is_some()
        {
            return Err(LedgerError::PoolExists(chain_id));
        }
        let pool = self
            .store
            .insert_pool(NewPool {
                wallet_id: wallet.id,
                chain_id: chain_id.clone(),
                name,
                image_url,
            })
            .await?;
        tracing::info!(pool_id = %pool.id, chain_id = %chain_id, "created pool shell");
        Ok(pool)
    }

    /// Asks the factory whether the pool's contract is deployed and
    /// records the answer.
    ///
    /// Returns the refreshed pool row and whether a deployment was
    /// found. When the factory reports the zero address, any stale
    /// stored address is cleared so the row reflects chain reality.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PoolIdNotFound`] when the pool row does
    /// not exist, [`LedgerError::UnsupportedChain`] when its chain has
    /// no endpoint, and [`LedgerError::ChainUnavailable`] when the
    /// factory lookup fails or returns malformed data.
    pub async fn confirm_deployment(
        &self,
        pool_id: PoolId,
    ) -> Result<(PoolRecord, bool), LedgerError> {
        let mut pool = self
            .store
            .find_pool(pool_id)
            .await?
            .ok_or(LedgerError::PoolIdNotFound(pool_id))?;
        let endpoint = self.registry.require(&pool.chain_id)?;
        let wallet = self
            .store
            .find_wallet(pool.wallet_id)
            .await?
            .ok_or_else(|| LedgerError::Internal("pool references missing wallet".to_string()))?;

        let call = pool_for(&endpoint.factory_address, &wallet.address);
        let outcomes = self.chain.call_batch(endpoint, &[call]).await?;
        let data = outcomes
            .first()
            .and_then(CallOutcome::returned)
            .ok_or_else(|| LedgerError::ChainUnavailable("factory lookup failed".to_string()))?;
        let deployed = decode_address(data).map_err(|e| {
            LedgerError::ChainUnavailable(format!("factory returned malformed address: {e}"))
        })?;

        if deployed.is_zero() {
            if pool.address.is_some() {
                tracing::warn!(pool_id = %pool.id, "factory no longer knows this pool, clearing stored address");
                self.store.set_pool_address(pool.id, None).await?;
                pool.address = None;
            }
            return Ok((pool, false));
        }

        self.store.set_pool_address(pool.id, Some(&deployed)).await?;
        tracing::info!(pool_id = %pool.id, address = %deployed, "confirmed pool deployment");
        pool.address = Some(deployed);
        Ok((pool, true))
    }

    /// Deletes the caller's pool.
    ///
    /// A pool belonging to someone else reports not-found rather than
    /// revealing that the row exists.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingWallet`] when the caller has no
    /// wallet, [`LedgerError::PoolIdNotFound`] when the pool does not
    /// exist or is not the caller's.
    pub async fn delete(&self, user_id: Uuid, pool_id: PoolId) -> Result<(), LedgerError> {
        let wallet = self.require_wallet(user_id).await?;
        let pool = self
            .store
            .find_pool(pool_id)
            .await?
            .ok_or(LedgerError::PoolIdNotFound(pool_id))?;
        if pool.wallet_id != wallet.id {
            return Err(LedgerError::PoolIdNotFound(pool_id));
        }
        if !self.store.delete_pool(pool_id).await? {
            return Err(LedgerError::PoolIdNotFound(pool_id));
        }
        tracing::info!(pool_id = %pool_id, "deleted pool");
        Ok(())
    }

    /// Lists pools, optionally filtered by chain, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] on database failure.
    pub async fn list(
        &self,
        chain_id: Option<&ChainId>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PoolRecord>, i64), LedgerError> {
        self.store.list_pools(chain_id, limit, offset).await
    }

    /// Lists the pools the caller has a cached stake in, newest first.
    ///
    /// Also returns the caller's wallet so follow-up refreshes do not
    /// resolve it twice.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingWallet`] when the caller has no
    /// wallet, [`LedgerError::Persistence`] on database failure.
    pub async fn list_staked(
        &self,
        user_id: Uuid,
        chain_id: Option<&ChainId>,
        limit: i64,
        offset: i64,
    ) -> Result<(WalletRecord, Vec<StakedPoolRecord>, i64), LedgerError> {
        let wallet = self.require_wallet(user_id).await?;
        let (rows, total) = self
            .store
            .list_staked_pools(wallet.id, chain_id, limit, offset)
            .await?;
        Ok((wallet, rows, total))
    }
}
