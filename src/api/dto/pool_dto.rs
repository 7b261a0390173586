//! Pool-related DTOs for create, deployment, and list operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::PaginationMeta;
use crate::persistence::models::{PoolRecord, StakedPoolRecord};

/// Request body for `POST /pools`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePoolRequest {
    /// Chain the pool will be deployed on (decimal string).
    pub chain_id: String,
    /// Optional human-readable name.
    #[serde(default)]
    pub name: Option<String>,
    /// Optional display image URL.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// One pool as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PoolDto {
    /// Pool row id.
    #[schema(value_type = uuid::Uuid)]
    pub id: crate::domain::PoolId,
    /// Creator's wallet row id.
    #[schema(value_type = uuid::Uuid)]
    pub wallet_id: crate::domain::WalletId,
    /// Chain the pool lives on (decimal string).
    #[schema(value_type = String)]
    pub chain_id: crate::domain::ChainId,
    /// Deployed contract address; `null` until deployment is confirmed.
    #[schema(value_type = Option<String>)]
    pub address: Option<crate::domain::ChainAddress>,
    /// Display name read from the contract.
    pub name: Option<String>,
    /// Cached pool-wide staked total in wei (decimal string).
    #[schema(value_type = String)]
    pub total_staked: crate::domain::TokenAmount,
    /// Optional display image URL.
    pub image_url: Option<String>,
    /// Row creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<PoolRecord> for PoolDto {
    fn from(record: PoolRecord) -> Self {
        Self {
            id: record.id,
            wallet_id: record.wallet_id,
            chain_id: record.chain_id,
            address: record.address,
            name: record.name,
            total_staked: record.total_staked,
            image_url: record.image_url,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Response body for `POST /pools/{id}/confirm-deployment`.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeploymentResponse {
    /// The refreshed pool row.
    pub pool: PoolDto,
    /// Whether the factory reported a deployed contract.
    pub deployed: bool,
}

/// Paginated list response for `GET /pools`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PoolListResponse {
    /// Pool rows for the requested page.
    pub data: Vec<PoolDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}

/// One pool joined with the caller's cached stake in it.
#[derive(Debug, Serialize, ToSchema)]
pub struct StakedPoolDto {
    /// The pool row.
    pub pool: PoolDto,
    /// Caller's cached staked amount in wei (decimal string).
    #[schema(value_type = String)]
    pub amount: crate::domain::TokenAmount,
    /// Caller's cached pending reward in wei (decimal string).
    #[schema(value_type = String)]
    pub pending_reward: crate::domain::TokenAmount,
}

impl From<StakedPoolRecord> for StakedPoolDto {
    fn from(record: StakedPoolRecord) -> Self {
        Self {
            pool: record.pool.into(),
            amount: record.amount,
            pending_reward: record.pending_reward,
        }
    }
}

/// Paginated list response for `GET /pools/staked`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StakedPoolListResponse {
    /// Staked pool rows for the requested page.
    pub data: Vec<StakedPoolDto>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}
