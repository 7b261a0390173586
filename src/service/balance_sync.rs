//! Cached balance refresh from chain state.
//!
//! The database rows are a cache of what the pool contracts report.
//! Before listings are served, this service re-reads the contract
//! getters in one batched RPC round trip per chain, overwrites the
//! cache, and returns the refreshed rows. Every chain failure degrades
//! to the cached values with a warning; a refresh never turns a listing
//! into an error.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::chain::calls::{
    creator_staked, decode_string, decode_uint256, pending_reward, pool_name, stake_of,
    total_fan_staked,
};
use crate::chain::registry::ChainRegistry;
use crate::chain::{CallOutcome, ChainReader, ContractCall};
use crate::domain::{ChainAddress, ChainId, PoolId, TokenAmount};
use crate::error::LedgerError;
use crate::persistence::LedgerStore;
use crate::persistence::models::{PoolRecord, StakedPoolRecord, WalletRecord};

/// Refreshes cached pool totals, per-wallet stakes, pending rewards,
/// and pool names from the contracts.
pub struct BalanceSyncService {
    store: Arc<dyn LedgerStore>,
    chain: Arc<dyn ChainReader>,
    registry: Arc<ChainRegistry>,
}

impl fmt::Debug for BalanceSyncService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BalanceSyncService").finish_non_exhaustive()
    }
}

impl BalanceSyncService {
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

    /// Refreshes `total_staked` on each deployed pool.
    ///
    /// The pool-wide total is `creatorStaked() + totalFanStaked()`,
    /// read in one batch per chain. Pools whose reads fail keep their
    /// cached total.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] when writing the refreshed
    /// totals back fails; chain failures degrade instead of erroring.
    pub async fn sync_pool_totals(
        &self,
        pools: Vec<PoolRecord>,
    ) -> Result<Vec<PoolRecord>, LedgerError> {
        let mut refreshed: HashMap<PoolId, TokenAmount> = HashMap::new();
        for (chain_id, members) in group_addressed(pools.iter()) {
            let Some(endpoint) = self.registry.get(&chain_id) else {
                tracing::warn!(chain_id = %chain_id, "no endpoint for chain, serving cached totals");
                continue;
            };
            let mut batch = Vec::with_capacity(members.len().saturating_mul(2));
            for (_, address) in &members {
                batch.push(creator_staked(address));
                batch.push(total_fan_staked(address));
            }
            let outcomes = match self.chain.call_batch(endpoint, &batch).await {
                Ok(outcomes) => outcomes,
                Err(err) => {
                    tracing::warn!(
                        chain_id = %chain_id,
                        error = %err,
                        "pool total refresh failed, serving cached values"
                    );
                    continue;
                }
            };
            for ((pool_id, _), pair) in members.iter().zip(outcomes.chunks(2)) {
                match pair_total(pair) {
                    Some(total) => {
                        refreshed.insert(*pool_id, total);
                    }
                    None => {
                        tracing::warn!(pool_id = %pool_id, "pool total read failed, keeping cached value");
                    }
                }
            }
        }
        if !refreshed.is_empty() {
            let updates: Vec<(PoolId, TokenAmount)> =
                refreshed.iter().map(|(id, total)| (*id, *total)).collect();
            self.store.update_pool_totals(&updates).await?;
        }
        Ok(pools
            .into_iter()
            .map(|mut pool| {
                if let Some(total) = refreshed.get(&pool.id) {
                    pool.total_staked = *total;
                }
                pool
            })
            .collect())
    }

    /// Fills in missing pool display names from the contracts' `name()`.
    ///
    /// Pools that already carry a name are left alone; the contract is
    /// the authority only for names the ledger has never seen.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] when writing the names back
    /// fails; chain failures degrade instead of erroring.
    pub async fn sync_pool_names(
        &self,
        pools: Vec<PoolRecord>,
    ) -> Result<Vec<PoolRecord>, LedgerError> {
        let mut refreshed: HashMap<PoolId, String> = HashMap::new();
        for (chain_id, members) in group_addressed(pools.iter().filter(|p| p.name.is_none())) {
            let Some(endpoint) = self.registry.get(&chain_id) else {
                tracing::warn!(chain_id = %chain_id, "no endpoint for chain, leaving names unset");
                continue;
            };
            let batch: Vec<ContractCall> =
                members.iter().map(|(_, address)| pool_name(address)).collect();
            let outcomes = match self.chain.call_batch(endpoint, &batch).await {
                Ok(outcomes) => outcomes,
                Err(err) => {
                    tracing::warn!(
                        chain_id = %chain_id,
                        error = %err,
                        "pool name refresh failed, leaving names unset"
                    );
                    continue;
                }
            };
            for ((pool_id, _), outcome) in members.iter().zip(&outcomes) {
                match outcome.returned().and_then(|data| decode_string(data).ok()) {
                    Some(name) => {
                        refreshed.insert(*pool_id, name);
                    }
                    None => {
                        tracing::warn!(pool_id = %pool_id, "pool name read failed, leaving name unset");
                    }
                }
            }
        }
        if !refreshed.is_empty() {
            let updates: Vec<(PoolId, String)> = refreshed
                .iter()
                .map(|(id, name)| (*id, name.clone()))
                .collect();
            self.store.update_pool_names(&updates).await?;
        }
        Ok(pools
            .into_iter()
            .map(|mut pool| {
                if let Some(name) = refreshed.get(&pool.id) {
                    pool.name = Some(name.clone());
                }
                pool
            })
            .collect())
    }

    /// Overwrites the wallet's cached staked amounts from `stakeOf`.
    ///
    /// The contract value is absolute, not a delta; whatever the chain
    /// reports replaces the cache.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] when writing the refreshed
    /// amounts back fails; chain failures degrade instead of erroring.
    pub async fn sync_user_stakes(
        &self,
        wallet: &WalletRecord,
        staked: Vec<StakedPoolRecord>,
    ) -> Result<Vec<StakedPoolRecord>, LedgerError> {
        let refreshed = self
            .read_wallet_values(&wallet.address, &staked, stake_of, "staked amount")
            .await;
        if !refreshed.is_empty() {
            let updates: Vec<(PoolId, TokenAmount)> =
                refreshed.iter().map(|(id, value)| (*id, *value)).collect();
            self.store.update_staked_balances(wallet.id, &updates).await?;
        }
        Ok(staked
            .into_iter()
            .map(|mut row| {
                if let Some(amount) = refreshed.get(&row.pool.id) {
                    row.amount = *amount;
                }
                row
            })
            .collect())
    }

    /// Overwrites the wallet's cached pending rewards from
    /// `pendingReward`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Persistence`] when writing the refreshed
    /// rewards back fails; chain failures degrade instead of erroring.
    pub async fn sync_pending_rewards(
        &self,
        wallet: &WalletRecord,
        staked: Vec<StakedPoolRecord>,
    ) -> Result<Vec<StakedPoolRecord>, LedgerError> {
        let refreshed = self
            .read_wallet_values(&wallet.address, &staked, pending_reward, "pending reward")
            .await;
        if !refreshed.is_empty() {
            let updates: Vec<(PoolId, TokenAmount)> =
                refreshed.iter().map(|(id, value)| (*id, *value)).collect();
            self.store.update_pending_rewards(wallet.id, &updates).await?;
        }
        Ok(staked
            .into_iter()
            .map(|mut row| {
                if let Some(reward) = refreshed.get(&row.pool.id) {
                    row.pending_reward = *reward;
                }
                row
            })
            .collect())
    }

    /// Reads one `uint256` per pool for a wallet, batched per chain.
    async fn read_wallet_values(
        &self,
        wallet_address: &ChainAddress,
        staked: &[StakedPoolRecord],
        build: fn(&ChainAddress, &ChainAddress) -> ContractCall,
        what: &'static str,
    ) -> HashMap<PoolId, TokenAmount> {
        let mut refreshed = HashMap::new();
        for (chain_id, members) in group_addressed(staked.iter().map(|row| &row.pool)) {
            let Some(endpoint) = self.registry.get(&chain_id) else {
                tracing::warn!(chain_id = %chain_id, what, "no endpoint for chain, serving cached values");
                continue;
            };
            let batch: Vec<ContractCall> = members
                .iter()
                .map(|(_, address)| build(address, wallet_address))
                .collect();
            let outcomes = match self.chain.call_batch(endpoint, &batch).await {
                Ok(outcomes) => outcomes,
                Err(err) => {
                    tracing::warn!(
                        chain_id = %chain_id,
                        what,
                        error = %err,
                        "refresh failed, serving cached values"
                    );
                    continue;
                }
            };
            for ((pool_id, _), outcome) in members.iter().zip(&outcomes) {
                match outcome.returned().and_then(|data| decode_uint256(data).ok()) {
                    Some(value) => {
                        refreshed.insert(*pool_id, TokenAmount::from_u256(value));
                    }
                    None => {
                        tracing::warn!(pool_id = %pool_id, what, "read failed, keeping cached value");
                    }
                }
            }
        }
        refreshed
    }
}

/// Groups deployed pools by chain, keeping row id and contract address.
fn group_addressed<'a, I>(pools: I) -> HashMap<ChainId, Vec<(PoolId, ChainAddress)>>
where
    I: IntoIterator<Item = &'a PoolRecord>,
{
    let mut groups: HashMap<ChainId, Vec<(PoolId, ChainAddress)>> = HashMap::new();
    for pool in pools {
        if let Some(address) = &pool.address {
            groups
                .entry(pool.chain_id.clone())
                .or_default()
                .push((pool.id, address.clone()));
        }
    }
    groups
}

/// Combines the `creatorStaked`/`totalFanStaked` pair into one total.
fn pair_total(pair: &[CallOutcome]) -> Option<TokenAmount> {
    let creator = pair.first()?.returned().and_then(|d| decode_uint256(d).ok())?;
    let fans = pair.get(1)?.returned().and_then(|d| decode_uint256(d).ok())?;
    creator.checked_add(fans).map(TokenAmount::from_u256)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::service::testing::{
        MemoryLedgerStore, MockChainReader, addr, registry_with, string_return, uint_word,
    };
    use uuid::Uuid;

    const CHAIN: u64 = 137;

    fn harness() -> (Arc<MemoryLedgerStore>, Arc<MockChainReader>, BalanceSyncService) {
        let store = Arc::new(MemoryLedgerStore::new());
        let chain = Arc::new(MockChainReader::new());
        let store_dyn: Arc<dyn LedgerStore> = Arc::clone(&store) as Arc<dyn LedgerStore>;
        let chain_dyn: Arc<dyn ChainReader> = Arc::clone(&chain) as Arc<dyn ChainReader>;
        let service =
            BalanceSyncService::new(store_dyn, chain_dyn, Arc::new(registry_with(CHAIN)));
        (store, chain, service)
    }

    fn staked_row(pool: PoolRecord, amount: u64) -> StakedPoolRecord {
        StakedPoolRecord {
            pool,
            amount: TokenAmount::from(amount),
            pending_reward: TokenAmount::ZERO,
        }
    }

    #[tokio::test]
    async fn pool_total_is_creator_plus_fans() {
        let (store, chain, service) = harness();
        let wallet = store.seed_wallet(Uuid::new_v4(), addr(0x01));
        let pool = store.seed_pool(wallet.id, ChainId::from(CHAIN), Some(addr(0x02)), None);

        chain.stage_batch(Ok(vec![
            CallOutcome::Returned(uint_word(600)),
            CallOutcome::Returned(uint_word(400)),
        ]));
        let Ok(refreshed) = service.sync_pool_totals(vec![pool.clone()]).await else {
            panic!("total refresh should succeed");
        };
        assert_eq!(
            refreshed.first().map(|p| p.total_staked),
            Some(TokenAmount::from(1000))
        );
        assert_eq!(store.total_of(pool.id), Some(TokenAmount::from(1000)));
    }

    #[tokio::test]
    async fn failed_pool_read_keeps_cached_total() {
        let (store, chain, service) = harness();
        let wallet = store.seed_wallet(Uuid::new_v4(), addr(0x01));
        let a = store.seed_pool(wallet.id, ChainId::from(CHAIN), Some(addr(0x02)), None);
        let other = store.seed_wallet(Uuid::new_v4(), addr(0x03));
        let b = store.seed_pool(other.id, ChainId::from(CHAIN), Some(addr(0x04)), None);

        chain.stage_batch(Ok(vec![
            CallOutcome::Returned(uint_word(600)),
            CallOutcome::Returned(uint_word(400)),
            CallOutcome::Failed("execution reverted".to_string()),
            CallOutcome::Returned(uint_word(100)),
        ]));
        let Ok(refreshed) = service
            .sync_pool_totals(vec![a.clone(), b.clone()])
            .await
        else {
            panic!("partial failure should still refresh the rest");
        };
        let updated: HashMap<PoolId, TokenAmount> = refreshed
            .iter()
            .map(|p| (p.id, p.total_staked))
            .collect();
        assert_eq!(updated.get(&a.id), Some(&TokenAmount::from(1000)));
        assert_eq!(updated.get(&b.id), Some(&TokenAmount::ZERO));
        assert_eq!(store.total_of(a.id), Some(TokenAmount::from(1000)));
        assert_eq!(store.total_of(b.id), Some(TokenAmount::ZERO));
    }

    #[tokio::test]
    async fn chain_outage_degrades_to_cached_values() {
        let (store, _chain, service) = harness();
        let wallet = store.seed_wallet(Uuid::new_v4(), addr(0x01));
        let pool = store.seed_pool(wallet.id, ChainId::from(CHAIN), Some(addr(0x02)), None);

        // Nothing staged: the batch call fails and the refresh degrades.
        let Ok(refreshed) = service.sync_pool_totals(vec![pool.clone()]).await else {
            panic!("outage must not fail the listing");
        };
        assert_eq!(
            refreshed.first().map(|p| p.total_staked),
            Some(TokenAmount::ZERO)
        );
        assert_eq!(store.total_of(pool.id), Some(TokenAmount::ZERO));
    }

    #[tokio::test]
    async fn undeployed_pools_are_never_queried() {
        let (store, chain, service) = harness();
        let wallet = store.seed_wallet(Uuid::new_v4(), addr(0x01));
        let pool = store.seed_pool(wallet.id, ChainId::from(CHAIN), None, None);

        let Ok(_) = service.sync_pool_totals(vec![pool]).await else {
            panic!("refresh should succeed");
        };
        assert!(chain.batches_seen().is_empty());
    }

    #[tokio::test]
    async fn user_stakes_are_overwritten_with_chain_values() {
        let (store, chain, service) = harness();
        let wallet = store.seed_wallet(Uuid::new_v4(), addr(0x01));
        let pool = store.seed_pool(wallet.id, ChainId::from(CHAIN), Some(addr(0x02)), None);
        store.seed_balance(wallet.id, pool.id, 500);

        chain.stage_batch(Ok(vec![CallOutcome::Returned(uint_word(1200))]));
        let Ok(refreshed) = service
            .sync_user_stakes(&wallet, vec![staked_row(pool.clone(), 500)])
            .await
        else {
            panic!("stake refresh should succeed");
        };
        assert_eq!(
            refreshed.first().map(|row| row.amount),
            Some(TokenAmount::from(1200))
        );
        assert_eq!(
            store.balance_of(wallet.id, pool.id),
            Some(TokenAmount::from(1200))
        );
    }

    #[tokio::test]
    async fn pending_rewards_are_refreshed() {
        let (store, chain, service) = harness();
        let wallet = store.seed_wallet(Uuid::new_v4(), addr(0x01));
        let pool = store.seed_pool(wallet.id, ChainId::from(CHAIN), Some(addr(0x02)), None);
        store.seed_balance(wallet.id, pool.id, 500);

        chain.stage_batch(Ok(vec![CallOutcome::Returned(uint_word(55))]));
        let Ok(refreshed) = service
            .sync_pending_rewards(&wallet, vec![staked_row(pool.clone(), 500)])
            .await
        else {
            panic!("reward refresh should succeed");
        };
        assert_eq!(
            refreshed.first().map(|row| row.pending_reward),
            Some(TokenAmount::from(55))
        );
        assert_eq!(
            store.pending_reward_of(wallet.id, pool.id),
            Some(TokenAmount::from(55))
        );
    }

    #[tokio::test]
    async fn names_are_filled_only_where_missing() {
        let (store, chain, service) = harness();
        let wallet = store.seed_wallet(Uuid::new_v4(), addr(0x01));
        let named = store.seed_pool(
            wallet.id,
            ChainId::from(CHAIN),
            Some(addr(0x02)),
            Some("Kept Name"),
        );
        let other = store.seed_wallet(Uuid::new_v4(), addr(0x03));
        let unnamed = store.seed_pool(other.id, ChainId::from(CHAIN), Some(addr(0x04)), None);

        chain.stage_batch(Ok(vec![CallOutcome::Returned(string_return("Creator Pool"))]));
        let Ok(refreshed) = service
            .sync_pool_names(vec![named.clone(), unnamed.clone()])
            .await
        else {
            panic!("name refresh should succeed");
        };
        let names: HashMap<PoolId, Option<String>> = refreshed
            .iter()
            .map(|p| (p.id, p.name.clone()))
            .collect();
        assert_eq!(names.get(&named.id), Some(&Some("Kept Name".to_string())));
        assert_eq!(
            names.get(&unnamed.id),
            Some(&Some("Creator Pool".to_string()))
        );
        assert_eq!(store.name_of(unnamed.id), Some(Some("Creator Pool".to_string())));
        // Only the unnamed pool was queried.
        assert_eq!(chain.batches_seen().first().map(Vec::len), Some(1));
    }
}
