//! Receipt log decoding for the staking pool events.
//!
//! Pools emit `Staked(address indexed staker, address indexed pool,
//! uint256 amount)` and the mirror `Unstaked` event. The decoder walks
//! every log in a receipt, keeps the ones whose topic 0 matches either
//! signature hash, and skips everything else (ERC-20 transfers,
//! approval noise, malformed entries).

use alloy_primitives::{B256, keccak256};

use crate::chain::{LogEntry, TransactionReceipt};
use crate::domain::{ChainAddress, DecodedStakeEvent, StakeEventKind, TokenAmount};

/// Canonical `Staked` event signature.
pub const STAKED_SIGNATURE: &str = "Staked(address,address,uint256)";

/// Canonical `Unstaked` event signature.
pub const UNSTAKED_SIGNATURE: &str = "Unstaked(address,address,uint256)";

/// Topic 0 hash for [`STAKED_SIGNATURE`].
#[must_use]
pub fn staked_topic() -> B256 {
    keccak256(STAKED_SIGNATURE.as_bytes())
}

/// Topic 0 hash for [`UNSTAKED_SIGNATURE`].
#[must_use]
pub fn unstaked_topic() -> B256 {
    keccak256(UNSTAKED_SIGNATURE.as_bytes())
}

/// Attempts to read one log as a `Staked` event.
///
/// A log with a different topic 0, missing topics, or a short data word
/// yields `None` — mismatches are the expected common case, since a
/// receipt carries many unrelated logs.
#[must_use]
pub fn try_decode_stake(log: &LogEntry) -> Option<DecodedStakeEvent> {
    decode_log(log, staked_topic(), unstaked_topic())
        .filter(|event| event.kind == StakeEventKind::Stake)
}

/// Attempts to read one log as an `Unstaked` event.
#[must_use]
pub fn try_decode_unstake(log: &LogEntry) -> Option<DecodedStakeEvent> {
    decode_log(log, staked_topic(), unstaked_topic())
        .filter(|event| event.kind == StakeEventKind::Unstake)
}

/// Extracts every stake and unstake event from a receipt, in log order.
///
/// Logs that do not match either signature, or that match but are
/// structurally malformed (missing topics, short data), are skipped.
#[must_use]
pub fn decode_stake_events(receipt: &TransactionReceipt) -> Vec<DecodedStakeEvent> {
    let staked = staked_topic();
    let unstaked = unstaked_topic();
    receipt
        .logs
        .iter()
        .filter_map(|log| decode_log(log, staked, unstaked))
        .collect()
}

fn decode_log(log: &LogEntry, staked: B256, unstaked: B256) -> Option<DecodedStakeEvent> {
    let topic0 = log.topics.first()?;
    let kind = if *topic0 == staked {
        StakeEventKind::Stake
    } else if *topic0 == unstaked {
        StakeEventKind::Unstake
    } else {
        return None;
    };
    let staker = address_from_topic(log.topics.get(1)?)?;
    let pool = address_from_topic(log.topics.get(2)?)?;
    let amount = TokenAmount::from_be_word(log.data.get(..32)?)?;
    Some(DecodedStakeEvent {
        kind,
        staker,
        pool,
        amount,
    })
}

/// Reads a left-padded address out of an indexed topic.
fn address_from_topic(topic: &B256) -> Option<ChainAddress> {
    let tail = topic.get(12..)?;
    let bytes: [u8; 20] = tail.try_into().ok()?;
    Some(ChainAddress::from_bytes(&bytes))
}
