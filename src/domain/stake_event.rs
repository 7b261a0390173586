//! Stake event domain types.
//!
//! A decoded event is what the log decoder extracts from a receipt; an
//! applied event is the reconciliation summary entry returned to the
//! caller after the ledger write commits.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::address::ChainAddress;
use super::amount::TokenAmount;
use super::ids::{PoolId, WalletId};

/// Discriminator for the two journal entry types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeEventKind {
    /// Deposit into a pool; adds to the cached balance.
    Stake,
    /// Withdrawal from a pool; subtracts from the cached balance.
    Unstake,
}

impl StakeEventKind {
    /// Returns the database/text form (`"stake"` or `"unstake"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stake => "stake",
            Self::Unstake => "unstake",
        }
    }

    /// Parses the database/text form.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "stake" => Some(Self::Stake),
            "unstake" => Some(Self::Unstake),
            _ => None,
        }
    }
}

impl fmt::Display for StakeEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stake or unstake event decoded from one receipt log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedStakeEvent {
    /// Whether the log was a `Staked` or `Unstaked` emission.
    pub kind: StakeEventKind,
    /// The address that staked or unstaked (indexed topic 1).
    pub staker: ChainAddress,
    /// The pool contract the event targets (indexed topic 2).
    pub pool: ChainAddress,
    /// Event amount in wei.
    pub amount: TokenAmount,
}

/// One ledger application staged by the reconciliation service.
///
/// The store persists each application as a journal insert plus a
/// balance upsert inside a single transaction.
#[derive(Debug, Clone)]
pub struct StakeApplication {
    /// Wallet credited or debited.
    pub wallet_id: WalletId,
    /// Target pool.
    pub pool_id: PoolId,
    /// Journal entry type.
    pub kind: StakeEventKind,
    /// Event amount in wei.
    pub amount: TokenAmount,
    /// Cached balance after applying the delta.
    pub new_balance: TokenAmount,
    /// Source transaction hash (idempotency key component).
    pub tx_hash: String,
}

/// Summary entry for one applied event, returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedStakeEvent {
    /// Journal entry type.
    pub kind: StakeEventKind,
    /// Wallet credited or debited.
    pub wallet_id: WalletId,
    /// Target pool.
    pub pool_id: PoolId,
    /// Event amount in wei, as a decimal string.
    pub amount: TokenAmount,
}
