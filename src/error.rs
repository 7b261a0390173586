//! Ledger error types with HTTP status code mapping.
//!
//! [`LedgerError`] is the central error type for the gateway. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! Validation failures carry enough detail for the caller to act (which
//! chain, which pool, the conflicting event type); infrastructure
//! failures stay generic.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{ChainAddress, ChainId, StakeEventKind};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "message": "transaction already processed as stake",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`LedgerError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category           | HTTP Status                 |
/// |-----------|--------------------|-----------------------------|
/// | 1000–1999 | Validation         | 400 Bad Request             |
/// | 2000–2999 | Not Found/Conflict | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server/Upstream    | 500 / 503                   |
/// | 4000–4999 | Ledger-Specific    | 400 / 403 / 412             |
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The claimed chain id has no configured network.
    #[error("unsupported chain: {0}")]
    UnsupportedChain(ChainId),

    /// The transaction is absent from the chain or not yet mined.
    #[error("transaction not found or unconfirmed: {0}")]
    TransactionNotFound(String),

    /// The transaction was mined but reverted.
    #[error("transaction reverted on chain: {0}")]
    TransactionFailed(String),

    /// The receipt decoded to zero stake/unstake events.
    #[error("no matching stake event in transaction {0}")]
    NoMatchingEvent(String),

    /// The event's staker/unstaker does not match the transaction sender,
    /// or the sender does not match the caller's wallet.
    #[error("event sender does not match transaction sender {0}")]
    SenderMismatch(ChainAddress),

    /// No pool is registered at the event's pool address.
    #[error("pool not found for address {0}")]
    PoolNotFound(ChainAddress),

    /// No pool row exists with the given id.
    #[error("pool not found: {0}")]
    PoolIdNotFound(crate::domain::PoolId),

    /// No wallet row matches the transaction sender.
    #[error("no wallet on record for address {0}")]
    WalletNotFound(ChainAddress),

    /// The creator already has a pool on this chain.
    #[error("pool already exists for this wallet on chain {0}")]
    PoolExists(ChainId),

    /// The same (transaction, wallet, pool) was journaled before.
    #[error("transaction already processed as {prior}")]
    AlreadyProcessed {
        /// Event type recorded by the earlier application.
        prior: StakeEventKind,
    },

    /// Unstake amount exceeds the cached balance.
    #[error("insufficient stake: have {have}, unstake of {need} requested")]
    InsufficientStake {
        /// Current cached balance.
        have: crate::domain::TokenAmount,
        /// Requested unstake amount.
        need: crate::domain::TokenAmount,
    },

    /// The event's pool is recorded on a different chain than claimed.
    #[error("pool belongs to chain {pool_chain}, not claimed chain {claimed}")]
    ChainMismatch {
        /// Chain id stored on the pool row.
        pool_chain: ChainId,
        /// Chain id the caller claimed.
        claimed: ChainId,
    },

    /// The caller has no wallet on record.
    #[error("caller has no wallet on record")]
    MissingWallet,

    /// The chain RPC endpoint failed or timed out.
    #[error("chain unavailable: {0}")]
    ChainUnavailable(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::UnsupportedChain(_) => 1002,
            Self::TransactionNotFound(_) => 1003,
            Self::TransactionFailed(_) => 1004,
            Self::NoMatchingEvent(_) => 1005,
            Self::SenderMismatch(_) => 1006,
            Self::PoolNotFound(_) | Self::PoolIdNotFound(_) => 2001,
            Self::WalletNotFound(_) => 2002,
            Self::PoolExists(_) => 2003,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::ChainUnavailable(_) => 3002,
            Self::AlreadyProcessed { .. } => 4001,
            Self::InsufficientStake { .. } => 4002,
            Self::MissingWallet => 4003,
            Self::ChainMismatch { .. } => 4004,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_)
            | Self::UnsupportedChain(_)
            | Self::TransactionNotFound(_)
            | Self::TransactionFailed(_)
            | Self::NoMatchingEvent(_)
            | Self::SenderMismatch(_)
            | Self::AlreadyProcessed { .. }
            | Self::InsufficientStake { .. } => StatusCode::BAD_REQUEST,
            Self::PoolNotFound(_) | Self::PoolIdNotFound(_) | Self::WalletNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::PoolExists(_) => StatusCode::CONFLICT,
            Self::ChainMismatch { .. } => StatusCode::FORBIDDEN,
            Self::MissingWallet => StatusCode::PRECONDITION_FAILED,
            Self::ChainUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Persistence(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::TokenAmount;

    #[test]
    fn validation_failures_map_to_bad_request() {
        let err = LedgerError::AlreadyProcessed {
            prior: StakeEventKind::Stake,
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), 4001);

        let err = LedgerError::InsufficientStake {
            have: TokenAmount::from(100),
            need: TokenAmount::from(150),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn chain_mismatch_is_forbidden() {
        let err = LedgerError::ChainMismatch {
            pool_chain: crate::domain::ChainId::from(1),
            claimed: crate::domain::ChainId::from(137),
        };
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn missing_wallet_is_precondition_failed() {
        assert_eq!(
            LedgerError::MissingWallet.status_code(),
            StatusCode::PRECONDITION_FAILED
        );
    }

    #[test]
    fn chain_unavailable_is_retryable_503() {
        let err = LedgerError::ChainUnavailable("rpc timeout".to_string());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.error_code(), 3002);
    }

    #[test]
    fn already_processed_names_the_prior_kind() {
        let err = LedgerError::AlreadyProcessed {
            prior: StakeEventKind::Unstake,
        };
        assert!(err.to_string().contains("unstake"));
    }
}
