//! REST endpoint handlers organized by resource.
//!
//! Authentication is an upstream concern: the gateway trusts the
//! `x-user-id` header injected by the fronting auth proxy. Admin routes
//! carry no caller identity at all and are expected to be mounted
//! behind operator-only network policy.

pub mod pool;
pub mod stake;
pub mod system;

use axum::Router;
use axum::http::HeaderMap;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::LedgerError;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().merge(pool::routes()).merge(stake::routes())
}

/// Reads the caller's platform user id from the `x-user-id` header.
pub(crate) fn caller_user_id(headers: &HeaderMap) -> Result<Uuid, LedgerError> {
    let raw = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| LedgerError::InvalidRequest("missing x-user-id header".to_string()))?;
    Uuid::parse_str(raw)
        .map_err(|_| LedgerError::InvalidRequest(format!("invalid x-user-id header: {raw}")))
}
