//! Chain access layer: receipt fetching and batched contract reads.
//!
//! The ledger never trusts caller-supplied amounts; everything it writes
//! is derived from chain state read through this layer. [`ChainReader`]
//! is the seam the services depend on, [`rpc::RpcChainReader`] is the
//! JSON-RPC implementation, and [`registry::ChainRegistry`] maps chain
//! ids to endpoints.

pub mod calls;
pub mod decoder;
pub mod registry;
pub mod rpc;

use alloy_primitives::B256;
use async_trait::async_trait;

use crate::domain::ChainAddress;
use crate::error::LedgerError;
use crate::chain::registry::ChainEndpoint;

/// One log entry from a transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Contract that emitted the log.
    pub address: ChainAddress,
    /// Indexed topics; topic 0 is the event signature hash.
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed event data.
    pub data: Vec<u8>,
}

/// A mined transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    /// Transaction hash, lowercase `0x`-prefixed hex.
    pub tx_hash: String,
    /// Transaction sender.
    pub from: ChainAddress,
    /// `true` when the transaction executed without reverting.
    pub succeeded: bool,
    /// Logs emitted during execution.
    pub logs: Vec<LogEntry>,
}

/// A read-only contract call: target address plus ABI-encoded calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    /// Contract to call.
    pub to: ChainAddress,
    /// Selector plus encoded arguments.
    pub data: Vec<u8>,
}

/// Per-call result of a batched read.
///
/// A batch succeeds or fails as an HTTP round trip, but each element
/// inside it can fail independently (reverted call, bad target).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// The call returned; payload is the raw ABI-encoded return data.
    Returned(Vec<u8>),
    /// The call failed; payload is the node's error message.
    Failed(String),
}

impl CallOutcome {
    /// Returns the return data, or `None` if the call failed.
    #[must_use]
    pub fn returned(&self) -> Option<&[u8]> {
        match self {
            Self::Returned(bytes) => Some(bytes),
            Self::Failed(_) => None,
        }
    }
}

/// Read-only chain access used by the reconciliation and sync services.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Fetches the receipt for a transaction hash.
    ///
    /// Returns `Ok(None)` when the transaction is unknown to the node or
    /// not yet mined.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ChainUnavailable`] when the endpoint
    /// cannot be reached or responds with a malformed payload.
    async fn transaction_receipt(
        &self,
        endpoint: &ChainEndpoint,
        tx_hash: &str,
    ) -> Result<Option<TransactionReceipt>, LedgerError>;

    /// Executes a batch of read-only calls in one round trip.
    ///
    /// The returned vector has the same length and order as `calls`;
    /// individual failures surface as [`CallOutcome::Failed`] rather
    /// than failing the batch.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::ChainUnavailable`] when the endpoint
    /// cannot be reached or the response does not cover every call.
    async fn call_batch(
        &self,
        endpoint: &ChainEndpoint,
        calls: &[ContractCall],
    ) -> Result<Vec<CallOutcome>, LedgerError>;
}
