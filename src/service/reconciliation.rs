//! Confirmed-transaction reconciliation.
//!
//! The reconciliation pipeline turns a mined transaction into ledger
//! writes: fetch the receipt, decode the stake events, validate each
//! one against the pool table and the cached balance, then hand the
//! whole batch to the store for an all-or-nothing apply. Nothing is
//! written until every event in the receipt has passed validation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::chain::registry::ChainRegistry;
use crate::chain::{ChainReader, decoder};
use crate::domain::{
    AppliedStakeEvent, ChainId, PoolId, StakeApplication, StakeEventKind, TokenAmount,
};
use crate::error::LedgerError;
use crate::persistence::LedgerStore;
use crate::persistence::models::WalletRecord;

/// Result of one reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileSummary {
    /// Chain the transaction was confirmed on.
    pub chain_id: ChainId,
    /// Normalized transaction hash from the receipt.
    pub tx_hash: String,
    /// Ledger entries written, in receipt log order.
    pub applied: Vec<AppliedStakeEvent>,
}

/// Who initiated the reconciliation, and under which rules.
///
/// The user flow binds the transaction to the caller's registered
/// wallet and to one event kind; any deviation is an error. The admin
/// flow trusts the receipt's sender and tolerates foreign-staker noise
/// in the logs.
enum Flow {
    User {
        wallet: WalletRecord,
        kind: StakeEventKind,
    },
    Admin,
}

/// Turns confirmed on-chain transactions into journal entries and
/// cached balance updates.
pub struct ReconciliationService {
    store: Arc<dyn LedgerStore>,
    chain: Arc<dyn ChainReader>,
    registry: Arc<ChainRegistry>,
}

impl fmt::Debug for ReconciliationService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconciliationService").finish_non_exhaustive()
    }
}

impl ReconciliationService {
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

    /// Confirms a user-submitted stake or unstake transaction.
    ///
    /// Only events of `kind` whose staker is the caller's wallet are
    /// accepted; anything else fails the whole request.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingWallet`] when the caller has no
    /// wallet, [`LedgerError::UnsupportedChain`] for an unconfigured
    /// chain, [`LedgerError::TransactionNotFound`] or
    /// [`LedgerError::TransactionFailed`] for absent or reverted
    /// transactions, [`LedgerError::NoMatchingEvent`] when the receipt
    /// holds no event of the requested kind,
    /// [`LedgerError::SenderMismatch`] when the sender or staker is not
    /// the caller's wallet, [`LedgerError::PoolNotFound`],
    /// [`LedgerError::ChainMismatch`],
    /// [`LedgerError::AlreadyProcessed`], or
    /// [`LedgerError::InsufficientStake`] from per-event validation,
    /// and [`LedgerError::ChainUnavailable`] or
    /// [`LedgerError::Persistence`] from the infrastructure seams.
    pub async fn confirm(
        &self,
        user_id: Uuid,
        kind: StakeEventKind,
        chain_id: &ChainId,
        tx_hash: &str,
    ) -> Result<ReconcileSummary, LedgerError> {
        let wallet = self
            .store
            .find_wallet_by_user(user_id)
            .await?
            .ok_or(LedgerError::MissingWallet)?;
        self.reconcile(chain_id, tx_hash, Flow::User { wallet, kind })
            .await
    }

    /// Reconciles a transaction on behalf of operations.
    ///
    /// The wallet is resolved from the receipt's sender; both stake and
    /// unstake events are applied, and events emitted for other stakers
    /// are logged and skipped rather than failing the run.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::WalletNotFound`] when the receipt's
    /// sender has no wallet on record, plus the same chain, decoding,
    /// and per-event validation errors as
    /// [`ReconciliationService::confirm`].
    pub async fn sync_transaction(
        &self,
        chain_id: &ChainId,
        tx_hash: &str,
    ) -> Result<ReconcileSummary, LedgerError> {
        self.reconcile(chain_id, tx_hash, Flow::Admin).await
    }

    async fn reconcile(
        &self,
        chain_id: &ChainId,
        tx_hash: &str,
        flow: Flow,
    ) -> Result<ReconcileSummary, LedgerError> {
        let endpoint = self.registry.require(chain_id)?;
        let receipt = self
            .chain
            .transaction_receipt(endpoint, tx_hash)
            .await?
            .ok_or_else(|| LedgerError::TransactionNotFound(tx_hash.to_string()))?;
        if !receipt.succeeded {
            return Err(LedgerError::TransactionFailed(receipt.tx_hash));
        }

        let mut events = decoder::decode_stake_events(&receipt);
        if let Flow::User { kind, .. } = &flow {
            events.retain(|e| e.kind == *kind);
        }
        if events.is_empty() {
            return Err(LedgerError::NoMatchingEvent(receipt.tx_hash));
        }

        let wallet = match &flow {
            Flow::User { wallet, .. } => {
                if wallet.address != receipt.from {
                    return Err(LedgerError::SenderMismatch(receipt.from.clone()));
                }
                wallet.clone()
            }
            Flow::Admin => self
                .store
                .find_wallet_by_address(&receipt.from)
                .await?
                .ok_or_else(|| LedgerError::WalletNotFound(receipt.from.clone()))?,
        };

        let mut applications = Vec::with_capacity(events.len());
        let mut staged: HashMap<PoolId, StakeEventKind> = HashMap::new();
        for event in events {
            if event.staker != receipt.from {
                match &flow {
                    Flow::User { .. } => {
                        return Err(LedgerError::SenderMismatch(event.staker));
                    }
                    Flow::Admin => {
                        tracing::warn!(
                            staker = %event.staker,
                            tx_hash = %receipt.tx_hash,
                            "skipping stake event from foreign staker"
                        );
                        continue;
                    }
                }
            }

            let pool = self
                .store
                .find_pool_by_address(&event.pool)
                .await?
                .ok_or_else(|| LedgerError::PoolNotFound(event.pool.clone()))?;
            if pool.chain_id != *chain_id {
                return Err(LedgerError::ChainMismatch {
                    pool_chain: pool.chain_id,
                    claimed: chain_id.clone(),
                });
            }

            // One journal entry per (transaction, wallet, pool); a second
            // event for the same pool in this receipt is a duplicate.
            if let Some(prior) = staged.get(&pool.id) {
                return Err(LedgerError::AlreadyProcessed { prior: *prior });
            }
            if let Some(prior) = self
                .store
                .find_stake_event(&receipt.tx_hash, wallet.id, pool.id)
                .await?
            {
                return Err(LedgerError::AlreadyProcessed {
                    prior: prior.event_type,
                });
            }

            let current = self
                .store
                .staked_balance(wallet.id, pool.id)
                .await?
                .map_or(TokenAmount::ZERO, |row| row.amount);
            let new_balance = match event.kind {
                StakeEventKind::Stake => current.checked_add(&event.amount).ok_or_else(|| {
                    LedgerError::Internal("cached balance overflow".to_string())
                })?,
                StakeEventKind::Unstake => {
                    current
                        .checked_sub(&event.amount)
                        .ok_or(LedgerError::InsufficientStake {
                            have: current,
                            need: event.amount,
                        })?
                }
            };

            staged.insert(pool.id, event.kind);
            applications.push(StakeApplication {
                wallet_id: wallet.id,
                pool_id: pool.id,
                kind: event.kind,
                amount: event.amount,
                new_balance,
                tx_hash: receipt.tx_hash.clone(),
            });
        }

        if applications.is_empty() {
            return Err(LedgerError::NoMatchingEvent(receipt.tx_hash));
        }

        self.store.apply_stake_events(&applications).await?;
        tracing::info!(
            chain_id = %chain_id,
            tx_hash = %receipt.tx_hash,
            events = applications.len(),
            "reconciled transaction"
        );

        let applied = applications
            .into_iter()
            .map(|app| AppliedStakeEvent {
                kind: app.kind,
                wallet_id: app.wallet_id,
                pool_id: app.pool_id,
                amount: app.amount,
            })
            .collect();
        Ok(ReconcileSummary {
            chain_id: chain_id.clone(),
            tx_hash: receipt.tx_hash,
            applied,
        })
    }
}
