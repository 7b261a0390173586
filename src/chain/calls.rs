//! ABI encoding for the pool and factory read calls.
//!
//! The ledger only ever calls a handful of fixed getters, so the ABI
//! surface here is deliberately small: 4-byte selectors from
//! `keccak256` of the signature, left-padded address arguments, and
//! decoders for `uint256`, `address`, and dynamic `string` returns.

use alloy_primitives::{U256, keccak256};

use crate::chain::ContractCall;
use crate::domain::ChainAddress;

/// Error returned when contract return data does not decode.
#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    /// The return payload is shorter than one 32-byte word.
    #[error("return data too short: {0} bytes")]
    ShortReturn(usize),
    /// A dynamic string payload points outside the return data.
    #[error("malformed string return data")]
    MalformedString,
    /// The string bytes are not valid UTF-8.
    #[error("string return data is not utf-8")]
    NonUtf8String,
}

/// Computes the 4-byte function selector for a signature.
#[must_use]
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash.0[0], hash.0[1], hash.0[2], hash.0[3]]
}

/// Encodes an address argument as a left-padded 32-byte word.
#[must_use]
pub fn encode_address(addr: &ChainAddress) -> [u8; 32] {
    let mut word = [0u8; 32];
    let bytes = addr.to_bytes();
    for (dst, src) in word.iter_mut().skip(12).zip(bytes) {
        *dst = src;
    }
    word
}

/// `creatorStaked()` on a pool contract.
#[must_use]
pub fn creator_staked(pool: &ChainAddress) -> ContractCall {
    ContractCall {
        to: pool.clone(),
        data: selector("creatorStaked()").to_vec(),
    }
}

/// `totalFanStaked()` on a pool contract.
#[must_use]
pub fn total_fan_staked(pool: &ChainAddress) -> ContractCall {
    ContractCall {
        to: pool.clone(),
        data: selector("totalFanStaked()").to_vec(),
    }
}

/// `stakeOf(address)` on a pool contract.
#[must_use]
pub fn stake_of(pool: &ChainAddress, staker: &ChainAddress) -> ContractCall {
    ContractCall {
        to: pool.clone(),
        data: with_address_arg("stakeOf(address)", staker),
    }
}

/// `pendingReward(address)` on a pool contract.
#[must_use]
pub fn pending_reward(pool: &ChainAddress, staker: &ChainAddress) -> ContractCall {
    ContractCall {
        to: pool.clone(),
        data: with_address_arg("pendingReward(address)", staker),
    }
}

/// `name()` on a pool contract.
#[must_use]
pub fn pool_name(pool: &ChainAddress) -> ContractCall {
    ContractCall {
        to: pool.clone(),
        data: selector("name()").to_vec(),
    }
}

/// `poolFor(address)` on the per-chain factory contract.
#[must_use]
pub fn pool_for(factory: &ChainAddress, creator: &ChainAddress) -> ContractCall {
    ContractCall {
        to: factory.clone(),
        data: with_address_arg("poolFor(address)", creator),
    }
}

fn with_address_arg(signature: &str, arg: &ChainAddress) -> Vec<u8> {
    let mut data = selector(signature).to_vec();
    data.extend_from_slice(&encode_address(arg));
    data
}

/// Decodes a single `uint256` return value.
///
/// # Errors
///
/// Returns [`AbiError::ShortReturn`] when fewer than 32 bytes are
/// present.
pub fn decode_uint256(data: &[u8]) -> Result<U256, AbiError> {
    let word = data.get(..32).ok_or(AbiError::ShortReturn(data.len()))?;
    Ok(U256::from_be_slice(word))
}

/// Decodes a single `address` return value.
///
/// # Errors
///
/// Returns [`AbiError::ShortReturn`] when fewer than 32 bytes are
/// present.
pub fn decode_address(data: &[u8]) -> Result<ChainAddress, AbiError> {
    let word = data.get(..32).ok_or(AbiError::ShortReturn(data.len()))?;
    let tail = word.get(12..).ok_or(AbiError::ShortReturn(data.len()))?;
    let bytes: [u8; 20] = tail
        .try_into()
        .map_err(|_| AbiError::ShortReturn(data.len()))?;
    Ok(ChainAddress::from_bytes(&bytes))
}

/// Decodes a single dynamic `string` return value.
///
/// # Errors
///
/// Returns [`AbiError`] when the offset or length words point outside
/// the payload, or the bytes are not UTF-8.
pub fn decode_string(data: &[u8]) -> Result<String, AbiError> {
    let offset = word_as_usize(data, 0)?;
    let len = word_as_usize(data, offset)?;
    let start = offset.checked_add(32).ok_or(AbiError::MalformedString)?;
    let end = start.checked_add(len).ok_or(AbiError::MalformedString)?;
    let bytes = data.get(start..end).ok_or(AbiError::MalformedString)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| AbiError::NonUtf8String)
}

fn word_as_usize(data: &[u8], at: usize) -> Result<usize, AbiError> {
    let end = at.checked_add(32).ok_or(AbiError::MalformedString)?;
    let word = data.get(at..end).ok_or(AbiError::MalformedString)?;
    usize::try_from(U256::from_be_slice(word)).map_err(|_| AbiError::MalformedString)
}
