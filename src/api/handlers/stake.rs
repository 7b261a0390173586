//! Stake confirmation handlers: user confirm and admin sync.
//!
//! All three endpoints run the same reconciliation pipeline; they
//! differ only in who may submit and which event kinds are accepted.
//! Resubmitting a hash is safe — the journal's idempotency key turns a
//! replay into an "already processed" rejection.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{ConfirmTransactionRequest, ReconcileResponse};
use crate::api::handlers::caller_user_id;
use crate::app_state::AppState;
use crate::domain::StakeEventKind;
use crate::error::{ErrorResponse, LedgerError};

/// `POST /stakes/confirm` — Confirm a mined stake transaction.
///
/// # Errors
///
/// Returns [`LedgerError`] when the transaction is absent, reverted,
/// already processed, or fails validation against the caller's wallet.
#[utoipa::path(
    post,
    path = "/api/v1/stakes/confirm",
    tag = "Stakes",
    summary = "Confirm a stake transaction",
    description = "Fetches the receipt for the submitted hash, decodes the stake event, validates it against the caller's wallet and the target pool, and applies the ledger update exactly once.",
    params(
        ("x-user-id" = String, Header, description = "Caller's platform user id (UUID)"),
    ),
    request_body = ConfirmTransactionRequest,
    responses(
        (status = 200, description = "Stake applied to the ledger", body = ReconcileResponse),
        (status = 400, description = "Invalid, unconfirmed, or already processed transaction", body = ErrorResponse),
        (status = 403, description = "Pool belongs to a different chain", body = ErrorResponse),
        (status = 412, description = "Caller has no wallet on record", body = ErrorResponse),
    )
)]
pub async fn confirm_stake(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ConfirmTransactionRequest>,
) -> Result<impl IntoResponse, LedgerError> {
    let user_id = caller_user_id(&headers)?;
    let summary = state
        .reconciliation
        .confirm(user_id, StakeEventKind::Stake, &req.chain_id, &req.tx_hash)
        .await?;
    Ok(Json(ReconcileResponse::from(summary)))
}

/// `POST /unstakes/confirm` — Confirm a mined unstake transaction.
///
/// # Errors
///
/// Returns [`LedgerError`] on the same conditions as stake
/// confirmation, plus "insufficient stake" when the unstake exceeds the
/// cached balance.
#[utoipa::path(
    post,
    path = "/api/v1/unstakes/confirm",
    tag = "Stakes",
    summary = "Confirm an unstake transaction",
    description = "Same pipeline as stake confirmation, for withdrawal events. An unstake larger than the cached balance is rejected before any write.",
    params(
        ("x-user-id" = String, Header, description = "Caller's platform user id (UUID)"),
    ),
    request_body = ConfirmTransactionRequest,
    responses(
        (status = 200, description = "Unstake applied to the ledger", body = ReconcileResponse),
        (status = 400, description = "Invalid, already processed, or overdrawn transaction", body = ErrorResponse),
        (status = 403, description = "Pool belongs to a different chain", body = ErrorResponse),
        (status = 412, description = "Caller has no wallet on record", body = ErrorResponse),
    )
)]
pub async fn confirm_unstake(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ConfirmTransactionRequest>,
) -> Result<impl IntoResponse, LedgerError> {
    let user_id = caller_user_id(&headers)?;
    let summary = state
        .reconciliation
        .confirm(user_id, StakeEventKind::Unstake, &req.chain_id, &req.tx_hash)
        .await?;
    Ok(Json(ReconcileResponse::from(summary)))
}

/// `POST /admin/transactions/sync` — Reconcile any transaction.
///
/// # Errors
///
/// Returns [`LedgerError`] when the sender has no wallet on record or
/// the transaction fails validation.
#[utoipa::path(
    post,
    path = "/api/v1/admin/transactions/sync",
    tag = "Admin",
    summary = "Sync a transaction into the ledger",
    description = "Resolves the wallet from the transaction's sender and applies every stake and unstake event found in the receipt. Events emitted for other stakers are skipped.",
    request_body = ConfirmTransactionRequest,
    responses(
        (status = 200, description = "Events applied to the ledger", body = ReconcileResponse),
        (status = 400, description = "Invalid, unconfirmed, or already processed transaction", body = ErrorResponse),
        (status = 404, description = "No wallet on record for the sender", body = ErrorResponse),
    )
)]
pub async fn sync_transaction(
    State(state): State<AppState>,
    Json(req): Json<ConfirmTransactionRequest>,
) -> Result<impl IntoResponse, LedgerError> {
    let summary = state
        .reconciliation
        .sync_transaction(&req.chain_id, &req.tx_hash)
        .await?;
    Ok(Json(ReconcileResponse::from(summary)))
}

/// Stake confirmation and admin sync routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stakes/confirm", post(confirm_stake))
        .route("/unstakes/confirm", post(confirm_unstake))
        .route("/admin/transactions/sync", post(sync_transaction))
}
