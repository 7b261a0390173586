//! Stake/unstake confirmation and admin sync DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::AppliedStakeEvent;
use crate::service::ReconcileSummary;

/// Request body for the confirmation and sync endpoints.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ConfirmTransactionRequest {
    /// Chain the transaction was mined on (decimal string).
    #[schema(value_type = String)]
    pub chain_id: crate::domain::ChainId,
    /// Transaction hash, `0x`-prefixed hex.
    pub tx_hash: String,
}

/// One ledger entry written by a reconciliation run.
#[derive(Debug, Serialize, ToSchema)]
pub struct AppliedEventDto {
    /// `"stake"` or `"unstake"`.
    #[schema(value_type = String)]
    pub kind: crate::domain::StakeEventKind,
    /// Wallet credited or debited.
    #[schema(value_type = uuid::Uuid)]
    pub wallet_id: crate::domain::WalletId,
    /// Target pool.
    #[schema(value_type = uuid::Uuid)]
    pub pool_id: crate::domain::PoolId,
    /// Event amount in wei (decimal string).
    #[schema(value_type = String)]
    pub amount: crate::domain::TokenAmount,
}

impl From<AppliedStakeEvent> for AppliedEventDto {
    fn from(event: AppliedStakeEvent) -> Self {
        Self {
            kind: event.kind,
            wallet_id: event.wallet_id,
            pool_id: event.pool_id,
            amount: event.amount,
        }
    }
}

/// Response body for the confirmation and sync endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileResponse {
    /// Chain the transaction was confirmed on (decimal string).
    #[schema(value_type = String)]
    pub chain_id: crate::domain::ChainId,
    /// Normalized transaction hash from the receipt.
    pub tx_hash: String,
    /// Ledger entries written, in receipt log order.
    pub applied: Vec<AppliedEventDto>,
}

impl From<ReconcileSummary> for ReconcileResponse {
    fn from(summary: ReconcileSummary) -> Self {
        Self {
            chain_id: summary.chain_id,
            tx_hash: summary.tx_hash,
            applied: summary.applied.into_iter().map(Into::into).collect(),
        }
    }
}
