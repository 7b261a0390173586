//! In-memory doubles and fixture builders for service tests.
//!
//! [`MemoryLedgerStore`] mirrors the PostgreSQL store's contract
//! (idempotency, all-or-nothing application) over plain collections;
//! [`MockChainReader`] replays scripted receipts and batch outcomes.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use alloy_primitives::B256;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::chain::registry::{ChainEndpoint, ChainRegistry};
use crate::chain::{CallOutcome, ChainReader, ContractCall, LogEntry, TransactionReceipt, decoder};
use crate::domain::{
    ChainAddress, ChainId, PoolId, StakeApplication, StakeEventKind, TokenAmount, WalletId,
};
use crate::error::LedgerError;
use crate::persistence::LedgerStore;
use crate::persistence::models::{
    NewPool, PoolRecord, StakeEventRecord, StakedBalanceRecord, StakedPoolRecord, WalletRecord,
};

/// Deterministic test address built from one repeated byte.
pub fn addr(byte: u8) -> ChainAddress {
    ChainAddress::from_bytes(&[byte; 20])
}

/// Registry containing a single test endpoint for the given chain id.
pub fn registry_with(chain_id: u64) -> ChainRegistry {
    ChainRegistry::new(vec![ChainEndpoint {
        chain_id: ChainId::from(chain_id),
        name: "testnet".to_string(),
        rpc_url: "http://127.0.0.1:0".to_string(),
        factory_address: addr(0xfa),
    }])
}

/// Indexed topic carrying an address.
pub fn topic_for(address: &ChainAddress) -> B256 {
    let mut word = [0u8; 32];
    for (dst, src) in word.iter_mut().skip(12).zip(address.to_bytes()) {
        *dst = src;
    }
    B256::from(word)
}

/// ABI word carrying a `uint256`, as return data or log data.
pub fn uint_word(value: u64) -> Vec<u8> {
    TokenAmount::from(value).as_u256().to_be_bytes::<32>().to_vec()
}

/// ABI-encoded dynamic string return payload.
pub fn string_return(value: &str) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&uint_word(0x20));
    data.extend_from_slice(&uint_word(value.len() as u64));
    let mut payload = value.as_bytes().to_vec();
    while payload.len() % 32 != 0 {
        payload.push(0);
    }
    data.extend_from_slice(&payload);
    data
}

/// A well-formed `Staked`/`Unstaked` log entry.
pub fn stake_log(
    kind: StakeEventKind,
    staker: &ChainAddress,
    pool: &ChainAddress,
    amount: u64,
) -> LogEntry {
    let topic0 = match kind {
        StakeEventKind::Stake => decoder::staked_topic(),
        StakeEventKind::Unstake => decoder::unstaked_topic(),
    };
    LogEntry {
        address: pool.clone(),
        topics: vec![topic0, topic_for(staker), topic_for(pool)],
        data: uint_word(amount),
    }
}

/// A successful receipt carrying the given logs.
pub fn receipt(tx_hash: &str, from: &ChainAddress, logs: Vec<LogEntry>) -> TransactionReceipt {
    TransactionReceipt {
        tx_hash: tx_hash.to_string(),
        from: from.clone(),
        succeeded: true,
        logs,
    }
}

#[derive(Debug, Default)]
struct Inner {
    wallets: Vec<WalletRecord>,
    pools: Vec<PoolRecord>,
    balances: HashMap<(WalletId, PoolId), StakedBalanceRecord>,
    events: Vec<StakeEventRecord>,
    next_event_id: i64,
}

/// In-memory [`LedgerStore`] double.
#[derive(Debug, Default)]
pub struct MemoryLedgerStore {
    inner: Mutex<Inner>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, LedgerError> {
        self.inner
            .lock()
            .map_err(|_| LedgerError::Internal("test store poisoned".to_string()))
    }

    /// Seeds a wallet row and returns it.
    pub fn seed_wallet(&self, user_id: Uuid, address: ChainAddress) -> WalletRecord {
        let record = WalletRecord {
            id: WalletId::new(),
            user_id,
            address,
            created_at: Utc::now(),
        };
        if let Ok(mut inner) = self.inner.lock() {
            inner.wallets.push(record.clone());
        }
        record
    }

    /// Seeds a pool row and returns it.
    pub fn seed_pool(
        &self,
        wallet_id: WalletId,
        chain_id: ChainId,
        address: Option<ChainAddress>,
        name: Option<&str>,
    ) -> PoolRecord {
        let record = PoolRecord {
            id: PoolId::new(),
            wallet_id,
            chain_id,
            address,
            name: name.map(ToString::to_string),
            total_staked: TokenAmount::ZERO,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        if let Ok(mut inner) = self.inner.lock() {
            inner.pools.push(record.clone());
        }
        record
    }

    /// Seeds a cached balance row.
    pub fn seed_balance(&self, wallet_id: WalletId, pool_id: PoolId, amount: u64) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.balances.insert(
                (wallet_id, pool_id),
                StakedBalanceRecord {
                    wallet_id,
                    pool_id,
                    amount: TokenAmount::from(amount),
                    pending_reward: TokenAmount::ZERO,
                    updated_at: Utc::now(),
                },
            );
        }
    }

    /// Number of journal rows.
    pub fn event_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.events.len()).unwrap_or(0)
    }

    /// Cached balance for (wallet, pool), if any.
    pub fn balance_of(&self, wallet_id: WalletId, pool_id: PoolId) -> Option<TokenAmount> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.balances.get(&(wallet_id, pool_id)).map(|row| row.amount))
    }

    /// Cached pending reward for (wallet, pool), if any.
    pub fn pending_reward_of(&self, wallet_id: WalletId, pool_id: PoolId) -> Option<TokenAmount> {
        self.inner.lock().ok().and_then(|inner| {
            inner
                .balances
                .get(&(wallet_id, pool_id))
                .map(|row| row.pending_reward)
        })
    }

    /// Stored total for a pool, if the row exists.
    pub fn total_of(&self, pool_id: PoolId) -> Option<TokenAmount> {
        self.inner.lock().ok().and_then(|inner| {
            inner
                .pools
                .iter()
                .find(|p| p.id == pool_id)
                .map(|p| p.total_staked)
        })
    }

    /// Stored name for a pool, if the row exists.
    pub fn name_of(&self, pool_id: PoolId) -> Option<Option<String>> {
        self.inner.lock().ok().and_then(|inner| {
            inner
                .pools
                .iter()
                .find(|p| p.id == pool_id)
                .map(|p| p.name.clone())
        })
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn find_wallet_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<WalletRecord>, LedgerError> {
        let inner = self.lock()?;
        Ok(inner.wallets.iter().find(|w| w.user_id == user_id).cloned())
    }

    async fn find_wallet(&self, id: WalletId) -> Result<Option<WalletRecord>, LedgerError> {
        let inner = self.lock()?;
        Ok(inner.wallets.iter().find(|w| w.id == id).cloned())
    }

    async fn find_wallet_by_address(
        &self,
        address: &ChainAddress,
    ) -> Result<Option<WalletRecord>, LedgerError> {
        let inner = self.lock()?;
        Ok(inner.wallets.iter().find(|w| w.address == *address).cloned())
    }

    async fn insert_pool(&self, new_pool: NewPool) -> Result<PoolRecord, LedgerError> {
        let mut inner = self.lock()?;
        if inner
            .pools
            .iter()
            .any(|p| p.wallet_id == new_pool.wallet_id && p.chain_id == new_pool.chain_id)
        {
            return Err(LedgerError::PoolExists(new_pool.chain_id));
        }
        let record = PoolRecord {
            id: PoolId::new(),
            wallet_id: new_pool.wallet_id,
            chain_id: new_pool.chain_id,
            address: None,
            name: new_pool.name,
            total_staked: TokenAmount::ZERO,
            image_url: new_pool.image_url,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        inner.pools.push(record.clone());
        Ok(record)
    }

    async fn find_pool(&self, id: PoolId) -> Result<Option<PoolRecord>, LedgerError> {
        let inner = self.lock()?;
        Ok(inner.pools.iter().find(|p| p.id == id).cloned())
    }

    async fn find_pool_by_address(
        &self,
        address: &ChainAddress,
    ) -> Result<Option<PoolRecord>, LedgerError> {
        let inner = self.lock()?;
        Ok(inner
            .pools
            .iter()
            .find(|p| p.address.as_ref() == Some(address))
            .cloned())
    }

    async fn find_pool_by_wallet_chain(
        &self,
        wallet_id: WalletId,
        chain_id: &ChainId,
    ) -> Result<Option<PoolRecord>, LedgerError> {
        let inner = self.lock()?;
        Ok(inner
            .pools
            .iter()
            .find(|p| p.wallet_id == wallet_id && p.chain_id == *chain_id)
            .cloned())
    }

    async fn set_pool_address(
        &self,
        id: PoolId,
        address: Option<&ChainAddress>,
    ) -> Result<(), LedgerError> {
        let mut inner = self.lock()?;
        let Some(pool) = inner.pools.iter_mut().find(|p| p.id == id) else {
            return Err(LedgerError::PoolIdNotFound(id));
        };
        pool.address = address.cloned();
        pool.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_pool(&self, id: PoolId) -> Result<bool, LedgerError> {
        let mut inner = self.lock()?;
        let before = inner.pools.len();
        inner.pools.retain(|p| p.id != id);
        Ok(inner.pools.len() < before)
    }

    async fn list_pools(
        &self,
        chain_id: Option<&ChainId>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PoolRecord>, i64), LedgerError> {
        let inner = self.lock()?;
        let mut rows: Vec<PoolRecord> = inner
            .pools
            .iter()
            .filter(|p| chain_id.is_none_or(|c| p.chain_id == *c))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect();
        Ok((page, total))
    }

    async fn list_staked_pools(
        &self,
        wallet_id: WalletId,
        chain_id: Option<&ChainId>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<StakedPoolRecord>, i64), LedgerError> {
        let inner = self.lock()?;
        let mut rows: Vec<StakedPoolRecord> = inner
            .balances
            .values()
            .filter(|b| b.wallet_id == wallet_id)
            .filter_map(|b| {
                inner
                    .pools
                    .iter()
                    .find(|p| p.id == b.pool_id)
                    .filter(|p| chain_id.is_none_or(|c| p.chain_id == *c))
                    .map(|p| StakedPoolRecord {
                        pool: p.clone(),
                        amount: b.amount,
                        pending_reward: b.pending_reward,
                    })
            })
            .collect();
        rows.sort_by(|a, b| b.pool.created_at.cmp(&a.pool.created_at));
        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect();
        Ok((page, total))
    }

    async fn staked_balance(
        &self,
        wallet_id: WalletId,
        pool_id: PoolId,
    ) -> Result<Option<StakedBalanceRecord>, LedgerError> {
        let inner = self.lock()?;
        Ok(inner.balances.get(&(wallet_id, pool_id)).cloned())
    }

    async fn find_stake_event(
        &self,
        tx_hash: &str,
        wallet_id: WalletId,
        pool_id: PoolId,
    ) -> Result<Option<StakeEventRecord>, LedgerError> {
        let inner = self.lock()?;
        Ok(inner
            .events
            .iter()
            .find(|e| e.tx_hash == tx_hash && e.wallet_id == wallet_id && e.pool_id == pool_id)
            .cloned())
    }

    async fn apply_stake_events(
        &self,
        applications: &[StakeApplication],
    ) -> Result<(), LedgerError> {
        let mut inner = self.lock()?;
        // All-or-nothing: validate the whole batch before touching state.
        for app in applications {
            if let Some(prior) = inner.events.iter().find(|e| {
                e.tx_hash == app.tx_hash && e.wallet_id == app.wallet_id && e.pool_id == app.pool_id
            }) {
                return Err(LedgerError::AlreadyProcessed {
                    prior: prior.event_type,
                });
            }
        }
        for app in applications {
            inner.next_event_id += 1;
            let id = inner.next_event_id;
            inner.events.push(StakeEventRecord {
                id,
                wallet_id: app.wallet_id,
                pool_id: app.pool_id,
                event_type: app.kind,
                amount: app.amount,
                tx_hash: app.tx_hash.clone(),
                created_at: Utc::now(),
            });
            let entry = inner
                .balances
                .entry((app.wallet_id, app.pool_id))
                .or_insert_with(|| StakedBalanceRecord {
                    wallet_id: app.wallet_id,
                    pool_id: app.pool_id,
                    amount: TokenAmount::ZERO,
                    pending_reward: TokenAmount::ZERO,
                    updated_at: Utc::now(),
                });
            entry.amount = app.new_balance;
            entry.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_pool_totals(
        &self,
        updates: &[(PoolId, TokenAmount)],
    ) -> Result<(), LedgerError> {
        let mut inner = self.lock()?;
        for (id, total) in updates {
            if let Some(pool) = inner.pools.iter_mut().find(|p| p.id == *id) {
                pool.total_staked = *total;
                pool.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn update_pool_names(&self, updates: &[(PoolId, String)]) -> Result<(), LedgerError> {
        let mut inner = self.lock()?;
        for (id, name) in updates {
            if let Some(pool) = inner.pools.iter_mut().find(|p| p.id == *id) {
                pool.name = Some(name.clone());
                pool.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn update_staked_balances(
        &self,
        wallet_id: WalletId,
        updates: &[(PoolId, TokenAmount)],
    ) -> Result<(), LedgerError> {
        let mut inner = self.lock()?;
        for (pool_id, amount) in updates {
            let entry = inner
                .balances
                .entry((wallet_id, *pool_id))
                .or_insert_with(|| StakedBalanceRecord {
                    wallet_id,
                    pool_id: *pool_id,
                    amount: TokenAmount::ZERO,
                    pending_reward: TokenAmount::ZERO,
                    updated_at: Utc::now(),
                });
            entry.amount = *amount;
            entry.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_pending_rewards(
        &self,
        wallet_id: WalletId,
        updates: &[(PoolId, TokenAmount)],
    ) -> Result<(), LedgerError> {
        let mut inner = self.lock()?;
        for (pool_id, reward) in updates {
            let entry = inner
                .balances
                .entry((wallet_id, *pool_id))
                .or_insert_with(|| StakedBalanceRecord {
                    wallet_id,
                    pool_id: *pool_id,
                    amount: TokenAmount::ZERO,
                    pending_reward: TokenAmount::ZERO,
                    updated_at: Utc::now(),
                });
            entry.pending_reward = *reward;
            entry.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// Scripted [`ChainReader`] double.
#[derive(Debug, Default)]
pub struct MockChainReader {
    receipts: Mutex<HashMap<String, TransactionReceipt>>,
    batches: Mutex<VecDeque<Result<Vec<CallOutcome>, LedgerError>>>,
    calls_seen: Mutex<Vec<Vec<ContractCall>>>,
    unavailable: Mutex<bool>,
}

impl MockChainReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a receipt under its transaction hash.
    pub fn stage_receipt(&self, receipt: TransactionReceipt) {
        if let Ok(mut receipts) = self.receipts.lock() {
            receipts.insert(receipt.tx_hash.clone(), receipt);
        }
    }

    /// Queues the next `call_batch` response.
    pub fn stage_batch(&self, outcome: Result<Vec<CallOutcome>, LedgerError>) {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push_back(outcome);
        }
    }

    /// Makes every receipt fetch fail with `ChainUnavailable`.
    pub fn set_unavailable(&self) {
        if let Ok(mut flag) = self.unavailable.lock() {
            *flag = true;
        }
    }

    /// Call batches observed so far.
    pub fn batches_seen(&self) -> Vec<Vec<ContractCall>> {
        self.calls_seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn transaction_receipt(
        &self,
        _endpoint: &ChainEndpoint,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, LedgerError> {
        let down = self.unavailable.lock().map(|flag| *flag).unwrap_or(false);
        if down {
            return Err(LedgerError::ChainUnavailable("scripted outage".to_string()));
        }
        let receipts = self
            .receipts
            .lock()
            .map_err(|_| LedgerError::Internal("mock poisoned".to_string()))?;
        Ok(receipts.get(tx_hash).cloned())
    }

    async fn call_batch(
        &self,
        _endpoint: &ChainEndpoint,
        calls: &[ContractCall],
    ) -> Result<Vec<CallOutcome>, LedgerError> {
        if let Ok(mut seen) = self.calls_seen.lock() {
            seen.push(calls.to_vec());
        }
        let next = self
            .batches
            .lock()
            .map_err(|_| LedgerError::Internal("mock poisoned".to_string()))?
            .pop_front();
        next.unwrap_or_else(|| {
            Err(LedgerError::ChainUnavailable(
                "unscripted call batch".to_string(),
            ))
        })
    }
}
