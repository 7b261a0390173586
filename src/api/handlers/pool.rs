//! Pool lifecycle handlers: create, confirm deployment, list, delete.
//!
//! List endpoints refresh cached chain values before answering, so a
//! dashboard read always reflects the freshest totals the chain would
//! give in one batched round trip — or the cached values when it won't.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ChainFilter, CreatePoolRequest, DeploymentResponse, PaginationParams, PoolDto,
    PoolListResponse, StakedPoolDto, StakedPoolListResponse,
};
use crate::api::handlers::caller_user_id;
use crate::app_state::AppState;
use crate::domain::{ChainId, PoolId};
use crate::error::{ErrorResponse, LedgerError};

/// `POST /pools` — Create a pool shell for a chain.
///
/// # Errors
///
/// Returns [`LedgerError::PoolExists`] when the caller already has a
/// pool on the chain, [`LedgerError::UnsupportedChain`] for an
/// unconfigured chain.
#[utoipa::path(
    post,
    path = "/api/v1/pools",
    tag = "Pools",
    summary = "Create a pool",
    description = "Creates a pool row with no contract address. The address is attached later by confirm-deployment once the on-chain deployment is mined.",
    params(
        ("x-user-id" = String, Header, description = "Caller's platform user id (UUID)"),
    ),
    request_body = CreatePoolRequest,
    responses(
        (status = 201, description = "Pool created", body = PoolDto),
        (status = 400, description = "Unsupported chain", body = ErrorResponse),
        (status = 409, description = "Caller already has a pool on this chain", body = ErrorResponse),
        (status = 412, description = "Caller has no wallet on record", body = ErrorResponse),
    )
)]
pub async fn create_pool(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePoolRequest>,
) -> Result<impl IntoResponse, LedgerError> {
    let user_id = caller_user_id(&headers)?;
    let chain_id = parse_chain_id(&req.chain_id)?;
    let pool = state
        .pools
        .create(user_id, chain_id, req.name, req.image_url)
        .await?;
    Ok((StatusCode::CREATED, Json(PoolDto::from(pool))))
}

/// `POST /pools/{id}/confirm-deployment` — Record the factory's answer.
///
/// # Errors
///
/// Returns [`LedgerError::PoolIdNotFound`] for an unknown pool,
/// [`LedgerError::ChainUnavailable`] when the factory cannot be read.
#[utoipa::path(
    post,
    path = "/api/v1/pools/{id}/confirm-deployment",
    tag = "Pools",
    summary = "Confirm a pool's on-chain deployment",
    description = "Asks the chain's factory contract where (and whether) the creator's pool is deployed. A zero answer clears any stale stored address.",
    params(
        ("id" = uuid::Uuid, Path, description = "Pool UUID"),
    ),
    responses(
        (status = 200, description = "Deployment status recorded", body = DeploymentResponse),
        (status = 404, description = "Pool not found", body = ErrorResponse),
        (status = 503, description = "Factory unreachable", body = ErrorResponse),
    )
)]
pub async fn confirm_deployment(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, LedgerError> {
    let (pool, deployed) = state.pools.confirm_deployment(PoolId::from_uuid(id)).await?;
    Ok(Json(DeploymentResponse {
        pool: pool.into(),
        deployed,
    }))
}

/// `GET /pools` — List pools with refreshed totals.
///
/// # Errors
///
/// Returns [`LedgerError::Persistence`] on database failure; chain
/// outages degrade to cached totals instead of failing the listing.
#[utoipa::path(
    get,
    path = "/api/v1/pools",
    tag = "Pools",
    summary = "List pools",
    description = "Returns a paginated pool listing, optionally filtered by chain. Cached totals and missing display names are refreshed from the contracts in one batched read per chain before answering.",
    params(ChainFilter, PaginationParams),
    responses(
        (status = 200, description = "Paginated pool list", body = PoolListResponse),
        (status = 400, description = "Malformed chain filter", body = ErrorResponse),
    )
)]
pub async fn list_pools(
    State(state): State<AppState>,
    Query(filter): Query<ChainFilter>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, LedgerError> {
    let params = params.clamped();
    let chain_id = parse_chain_filter(&filter)?;
    let (limit, offset) = params.limit_offset();

    let (rows, total) = state.pools.list(chain_id.as_ref(), limit, offset).await?;
    let rows = state.balance_sync.sync_pool_totals(rows).await?;
    let rows = state.balance_sync.sync_pool_names(rows).await?;

    let data: Vec<PoolDto> = rows.into_iter().map(PoolDto::from).collect();
    Ok(Json(PoolListResponse {
        data,
        pagination: params.meta(total),
    }))
}

/// `GET /pools/staked` — List the caller's staked pools, refreshed.
///
/// # Errors
///
/// Returns [`LedgerError::MissingWallet`] when the caller has no
/// wallet; chain outages degrade to cached values.
#[utoipa::path(
    get,
    path = "/api/v1/pools/staked",
    tag = "Pools",
    summary = "List the caller's staked pools",
    description = "Returns the pools the caller has a cached stake in. Staked amounts and pending rewards are re-read from the contracts in one batched call per chain before answering.",
    params(
        ("x-user-id" = String, Header, description = "Caller's platform user id (UUID)"),
        ChainFilter,
        PaginationParams,
    ),
    responses(
        (status = 200, description = "Paginated staked pool list", body = StakedPoolListResponse),
        (status = 412, description = "Caller has no wallet on record", body = ErrorResponse),
    )
)]
pub async fn list_staked_pools(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(filter): Query<ChainFilter>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, LedgerError> {
    let user_id = caller_user_id(&headers)?;
    let params = params.clamped();
    let chain_id = parse_chain_filter(&filter)?;
    let (limit, offset) = params.limit_offset();

    let (wallet, rows, total) = state
        .pools
        .list_staked(user_id, chain_id.as_ref(), limit, offset)
        .await?;
    let rows = state.balance_sync.sync_user_stakes(&wallet, rows).await?;
    let rows = state.balance_sync.sync_pending_rewards(&wallet, rows).await?;

    let data: Vec<StakedPoolDto> = rows.into_iter().map(StakedPoolDto::from).collect();
    Ok(Json(StakedPoolListResponse {
        data,
        pagination: params.meta(total),
    }))
}

/// `DELETE /pools/{id}` — Remove the caller's pool.
///
/// # Errors
///
/// Returns [`LedgerError::PoolIdNotFound`] when the pool does not exist
/// or belongs to another wallet.
#[utoipa::path(
    delete,
    path = "/api/v1/pools/{id}",
    tag = "Pools",
    summary = "Delete a pool",
    description = "Removes the caller's pool row. Cached balances and journal entries referencing it are removed with it.",
    params(
        ("x-user-id" = String, Header, description = "Caller's platform user id (UUID)"),
        ("id" = uuid::Uuid, Path, description = "Pool UUID"),
    ),
    responses(
        (status = 204, description = "Pool deleted"),
        (status = 404, description = "Pool not found", body = ErrorResponse),
    )
)]
pub async fn delete_pool(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, LedgerError> {
    let user_id = caller_user_id(&headers)?;
    state.pools.delete(user_id, PoolId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Pool management routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/pools", post(create_pool).get(list_pools))
        .route("/pools/staked", get(list_staked_pools))
        .route("/pools/{id}", delete(delete_pool))
        .route("/pools/{id}/confirm-deployment", post(confirm_deployment))
}

fn parse_chain_id(raw: &str) -> Result<ChainId, LedgerError> {
    ChainId::parse(raw).map_err(|e| LedgerError::InvalidRequest(e.to_string()))
}

fn parse_chain_filter(filter: &ChainFilter) -> Result<Option<ChainId>, LedgerError> {
    filter.chain_id.as_deref().map(parse_chain_id).transpose()
}
