//! PostgreSQL implementation of the ledger store.
//!
//! Follows two hard rules: the journal's unique constraint is the
//! idempotency authority (a violation is translated to "already
//! processed", never retried around), and bulk cache refreshes are
//! single parameterized `UNNEST` statements, never string-built SQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::LedgerStore;
use super::models::{
    NewPool, PoolRecord, StakeEventRecord, StakedBalanceRecord, StakedPoolRecord, WalletRecord,
};
use crate::domain::{
    ChainAddress, ChainId, PoolId, StakeApplication, StakeEventKind, TokenAmount, WalletId,
};
use crate::error::LedgerError;

/// PostgreSQL-backed ledger store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

type WalletRow = (Uuid, Uuid, String, DateTime<Utc>);
type PoolRow = (
    Uuid,
    Uuid,
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    DateTime<Utc>,
    DateTime<Utc>,
);
type StakeEventRow = (i64, Uuid, Uuid, String, String, String, DateTime<Utc>);
type StakedBalanceRow = (Uuid, Uuid, String, String, DateTime<Utc>);

const POOL_COLUMNS: &str = "id, wallet_id, chain_id, address, name, total_staked, image_url, \
     created_at, updated_at";

impl PostgresLedgerStore {
    /// Creates a store over the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn persistence(e: sqlx::Error) -> LedgerError {
    LedgerError::Persistence(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn parse_amount(raw: &str) -> Result<TokenAmount, LedgerError> {
    TokenAmount::parse(raw)
        .map_err(|_| LedgerError::Persistence(format!("corrupt amount column: {raw}")))
}

fn parse_chain(raw: &str) -> Result<ChainId, LedgerError> {
    ChainId::parse(raw)
        .map_err(|_| LedgerError::Persistence(format!("corrupt chain_id column: {raw}")))
}

fn parse_address(raw: &str) -> Result<ChainAddress, LedgerError> {
    ChainAddress::parse(raw)
        .map_err(|_| LedgerError::Persistence(format!("corrupt address column: {raw}")))
}

fn parse_kind(raw: &str) -> Result<StakeEventKind, LedgerError> {
    StakeEventKind::from_str_opt(raw)
        .ok_or_else(|| LedgerError::Persistence(format!("corrupt event_type column: {raw}")))
}

fn wallet_from_row(row: WalletRow) -> Result<WalletRecord, LedgerError> {
    let (id, user_id, address, created_at) = row;
    Ok(WalletRecord {
        id: WalletId::from_uuid(id),
        user_id,
        address: parse_address(&address)?,
        created_at,
    })
}

fn pool_from_row(row: PoolRow) -> Result<PoolRecord, LedgerError> {
    let (id, wallet_id, chain_id, address, name, total_staked, image_url, created_at, updated_at) =
        row;
    Ok(PoolRecord {
        id: PoolId::from_uuid(id),
        wallet_id: WalletId::from_uuid(wallet_id),
        chain_id: parse_chain(&chain_id)?,
        address: address.as_deref().map(parse_address).transpose()?,
        name,
        total_staked: parse_amount(&total_staked)?,
        image_url,
        created_at,
        updated_at,
    })
}

fn event_from_row(row: StakeEventRow) -> Result<StakeEventRecord, LedgerError> {
    let (id, wallet_id, pool_id, event_type, amount, tx_hash, created_at) = row;
    Ok(StakeEventRecord {
        id,
        wallet_id: WalletId::from_uuid(wallet_id),
        pool_id: PoolId::from_uuid(pool_id),
        event_type: parse_kind(&event_type)?,
        amount: parse_amount(&amount)?,
        tx_hash,
        created_at,
    })
}

fn balance_from_row(row: StakedBalanceRow) -> Result<StakedBalanceRecord, LedgerError> {
    let (wallet_id, pool_id, amount, pending_reward, updated_at) = row;
    Ok(StakedBalanceRecord {
        wallet_id: WalletId::from_uuid(wallet_id),
        pool_id: PoolId::from_uuid(pool_id),
        amount: parse_amount(&amount)?,
        pending_reward: parse_amount(&pending_reward)?,
        updated_at,
    })
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    async fn find_wallet_by_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<WalletRecord>, LedgerError> {
        let row = sqlx::query_as::<_, WalletRow>(
            "SELECT id, user_id, address, created_at FROM user_wallets WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        row.map(wallet_from_row).transpose()
    }

    async fn find_wallet(&self, id: WalletId) -> Result<Option<WalletRecord>, LedgerError> {
        let row = sqlx::query_as::<_, WalletRow>(
            "SELECT id, user_id, address, created_at FROM user_wallets WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        row.map(wallet_from_row).transpose()
    }

    async fn find_wallet_by_address(
        &self,
        address: &ChainAddress,
    ) -> Result<Option<WalletRecord>, LedgerError> {
        let row = sqlx::query_as::<_, WalletRow>(
            "SELECT id, user_id, address, created_at FROM user_wallets WHERE address = $1",
        )
        .bind(address.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        row.map(wallet_from_row).transpose()
    }

    async fn insert_pool(&self, new_pool: NewPool) -> Result<PoolRecord, LedgerError> {
        let row = sqlx::query_as::<_, PoolRow>(
            "INSERT INTO pools (wallet_id, chain_id, name, image_url) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, wallet_id, chain_id, address, name, total_staked, image_url, \
                       created_at, updated_at",
        )
        .bind(new_pool.wallet_id.as_uuid())
        .bind(new_pool.chain_id.as_str())
        .bind(&new_pool.name)
        .bind(&new_pool.image_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::PoolExists(new_pool.chain_id.clone())
            } else {
                persistence(e)
            }
        })?;

        pool_from_row(row)
    }

    async fn find_pool(&self, id: PoolId) -> Result<Option<PoolRecord>, LedgerError> {
        let row = sqlx::query_as::<_, PoolRow>(&format!(
            "SELECT {POOL_COLUMNS} FROM pools WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        row.map(pool_from_row).transpose()
    }

    async fn find_pool_by_address(
        &self,
        address: &ChainAddress,
    ) -> Result<Option<PoolRecord>, LedgerError> {
        let row = sqlx::query_as::<_, PoolRow>(&format!(
            "SELECT {POOL_COLUMNS} FROM pools WHERE address = $1"
        ))
        .bind(address.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        row.map(pool_from_row).transpose()
    }

    async fn find_pool_by_wallet_chain(
        &self,
        wallet_id: WalletId,
        chain_id: &ChainId,
    ) -> Result<Option<PoolRecord>, LedgerError> {
        let row = sqlx::query_as::<_, PoolRow>(&format!(
            "SELECT {POOL_COLUMNS} FROM pools WHERE wallet_id = $1 AND chain_id = $2"
        ))
        .bind(wallet_id.as_uuid())
        .bind(chain_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        row.map(pool_from_row).transpose()
    }

    async fn set_pool_address(
        &self,
        id: PoolId,
        address: Option<&ChainAddress>,
    ) -> Result<(), LedgerError> {
        let result =
            sqlx::query("UPDATE pools SET address = $2, updated_at = now() WHERE id = $1")
                .bind(id.as_uuid())
                .bind(address.map(ChainAddress::as_str))
                .execute(&self.pool)
                .await
                .map_err(persistence)?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::PoolIdNotFound(id));
        }
        Ok(())
    }

    async fn delete_pool(&self, id: PoolId) -> Result<bool, LedgerError> {
        let result = sqlx::query("DELETE FROM pools WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(persistence)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_pools(
        &self,
        chain_id: Option<&ChainId>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<PoolRecord>, i64), LedgerError> {
        let (rows, total) = if let Some(chain) = chain_id {
            let rows = sqlx::query_as::<_, PoolRow>(&format!(
                "SELECT {POOL_COLUMNS} FROM pools WHERE chain_id = $1 \
                 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
            ))
            .bind(chain.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;
            let total = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM pools WHERE chain_id = $1",
            )
            .bind(chain.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(persistence)?;
            (rows, total)
        } else {
            let rows = sqlx::query_as::<_, PoolRow>(&format!(
                "SELECT {POOL_COLUMNS} FROM pools ORDER BY created_at DESC LIMIT $1 OFFSET $2"
            ))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;
            let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pools")
                .fetch_one(&self.pool)
                .await
                .map_err(persistence)?;
            (rows, total)
        };

        let pools = rows
            .into_iter()
            .map(pool_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((pools, total))
    }

    async fn list_staked_pools(
        &self,
        wallet_id: WalletId,
        chain_id: Option<&ChainId>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<StakedPoolRecord>, i64), LedgerError> {
        type JoinedRow = (
            Uuid,
            Uuid,
            String,
            Option<String>,
            Option<String>,
            String,
            Option<String>,
            DateTime<Utc>,
            DateTime<Utc>,
            String,
            String,
        );

        const JOINED_COLUMNS: &str = "p.id, p.wallet_id, p.chain_id, p.address, p.name, \
             p.total_staked, p.image_url, p.created_at, p.updated_at, sp.amount, \
             sp.pending_reward";

        let (rows, total) = if let Some(chain) = chain_id {
            let rows = sqlx::query_as::<_, JoinedRow>(&format!(
                "SELECT {JOINED_COLUMNS} FROM staked_pools sp \
                 JOIN pools p ON p.id = sp.pool_id \
                 WHERE sp.wallet_id = $1 AND p.chain_id = $2 \
                 ORDER BY p.created_at DESC LIMIT $3 OFFSET $4"
            ))
            .bind(wallet_id.as_uuid())
            .bind(chain.as_str())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;
            let total = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM staked_pools sp JOIN pools p ON p.id = sp.pool_id \
                 WHERE sp.wallet_id = $1 AND p.chain_id = $2",
            )
            .bind(wallet_id.as_uuid())
            .bind(chain.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(persistence)?;
            (rows, total)
        } else {
            let rows = sqlx::query_as::<_, JoinedRow>(&format!(
                "SELECT {JOINED_COLUMNS} FROM staked_pools sp \
                 JOIN pools p ON p.id = sp.pool_id \
                 WHERE sp.wallet_id = $1 \
                 ORDER BY p.created_at DESC LIMIT $2 OFFSET $3"
            ))
            .bind(wallet_id.as_uuid())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(persistence)?;
            let total = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM staked_pools WHERE wallet_id = $1",
            )
            .bind(wallet_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(persistence)?;
            (rows, total)
        };

        let staked = rows
            .into_iter()
            .map(|row| {
                let (
                    id,
                    pool_wallet,
                    chain,
                    address,
                    name,
                    total_staked,
                    image_url,
                    created_at,
                    updated_at,
                    amount,
                    pending_reward,
                ) = row;
                Ok(StakedPoolRecord {
                    pool: pool_from_row((
                        id,
                        pool_wallet,
                        chain,
                        address,
                        name,
                        total_staked,
                        image_url,
                        created_at,
                        updated_at,
                    ))?,
                    amount: parse_amount(&amount)?,
                    pending_reward: parse_amount(&pending_reward)?,
                })
            })
            .collect::<Result<Vec<_>, LedgerError>>()?;
        Ok((staked, total))
    }

    async fn staked_balance(
        &self,
        wallet_id: WalletId,
        pool_id: PoolId,
    ) -> Result<Option<StakedBalanceRecord>, LedgerError> {
        let row = sqlx::query_as::<_, StakedBalanceRow>(
            "SELECT wallet_id, pool_id, amount, pending_reward, updated_at \
             FROM staked_pools WHERE wallet_id = $1 AND pool_id = $2",
        )
        .bind(wallet_id.as_uuid())
        .bind(pool_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        row.map(balance_from_row).transpose()
    }

    async fn find_stake_event(
        &self,
        tx_hash: &str,
        wallet_id: WalletId,
        pool_id: PoolId,
    ) -> Result<Option<StakeEventRecord>, LedgerError> {
        let row = sqlx::query_as::<_, StakeEventRow>(
            "SELECT id, wallet_id, pool_id, event_type, amount, tx_hash, created_at \
             FROM stake_events WHERE tx_hash = $1 AND wallet_id = $2 AND pool_id = $3",
        )
        .bind(tx_hash)
        .bind(wallet_id.as_uuid())
        .bind(pool_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(persistence)?;

        row.map(event_from_row).transpose()
    }

    async fn apply_stake_events(
        &self,
        applications: &[StakeApplication],
    ) -> Result<(), LedgerError> {
        if applications.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(persistence)?;

        for app in applications {
            let insert = sqlx::query(
                "INSERT INTO stake_events (wallet_id, pool_id, event_type, amount, tx_hash) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(app.wallet_id.as_uuid())
            .bind(app.pool_id.as_uuid())
            .bind(app.kind.as_str())
            .bind(app.amount.to_string())
            .bind(&app.tx_hash)
            .execute(&mut *tx)
            .await;

            if let Err(e) = insert {
                if is_unique_violation(&e) {
                    // Concurrent duplicate: the row that won the race
                    // tells us the prior event type.
                    tx.rollback().await.ok();
                    let prior = self
                        .find_stake_event(&app.tx_hash, app.wallet_id, app.pool_id)
                        .await?
                        .map_or(app.kind, |row| row.event_type);
                    return Err(LedgerError::AlreadyProcessed { prior });
                }
                return Err(persistence(e));
            }

            sqlx::query(
                "INSERT INTO staked_pools (wallet_id, pool_id, amount) VALUES ($1, $2, $3) \
                 ON CONFLICT (wallet_id, pool_id) \
                 DO UPDATE SET amount = EXCLUDED.amount, updated_at = now()",
            )
            .bind(app.wallet_id.as_uuid())
            .bind(app.pool_id.as_uuid())
            .bind(app.new_balance.to_string())
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;
        }

        tx.commit().await.map_err(persistence)?;
        Ok(())
    }

    async fn update_pool_totals(
        &self,
        updates: &[(PoolId, TokenAmount)],
    ) -> Result<(), LedgerError> {
        if updates.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = updates.iter().map(|(id, _)| *id.as_uuid()).collect();
        let totals: Vec<String> = updates.iter().map(|(_, t)| t.to_string()).collect();

        sqlx::query(
            "UPDATE pools SET total_staked = u.total, updated_at = now() \
             FROM (SELECT UNNEST($1::uuid[]) AS id, UNNEST($2::text[]) AS total) AS u \
             WHERE pools.id = u.id",
        )
        .bind(&ids)
        .bind(&totals)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    async fn update_pool_names(&self, updates: &[(PoolId, String)]) -> Result<(), LedgerError> {
        if updates.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = updates.iter().map(|(id, _)| *id.as_uuid()).collect();
        let names: Vec<String> = updates.iter().map(|(_, n)| n.clone()).collect();

        sqlx::query(
            "UPDATE pools SET name = u.name, updated_at = now() \
             FROM (SELECT UNNEST($1::uuid[]) AS id, UNNEST($2::text[]) AS name) AS u \
             WHERE pools.id = u.id",
        )
        .bind(&ids)
        .bind(&names)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    async fn update_staked_balances(
        &self,
        wallet_id: WalletId,
        updates: &[(PoolId, TokenAmount)],
    ) -> Result<(), LedgerError> {
        if updates.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = updates.iter().map(|(id, _)| *id.as_uuid()).collect();
        let amounts: Vec<String> = updates.iter().map(|(_, a)| a.to_string()).collect();

        sqlx::query(
            "INSERT INTO staked_pools (wallet_id, pool_id, amount) \
             SELECT $1, u.pool_id, u.amount \
             FROM (SELECT UNNEST($2::uuid[]) AS pool_id, UNNEST($3::text[]) AS amount) AS u \
             ON CONFLICT (wallet_id, pool_id) \
             DO UPDATE SET amount = EXCLUDED.amount, updated_at = now()",
        )
        .bind(wallet_id.as_uuid())
        .bind(&ids)
        .bind(&amounts)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }

    async fn update_pending_rewards(
        &self,
        wallet_id: WalletId,
        updates: &[(PoolId, TokenAmount)],
    ) -> Result<(), LedgerError> {
        if updates.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = updates.iter().map(|(id, _)| *id.as_uuid()).collect();
        let rewards: Vec<String> = updates.iter().map(|(_, r)| r.to_string()).collect();

        sqlx::query(
            "INSERT INTO staked_pools (wallet_id, pool_id, pending_reward) \
             SELECT $1, u.pool_id, u.reward \
             FROM (SELECT UNNEST($2::uuid[]) AS pool_id, UNNEST($3::text[]) AS reward) AS u \
             ON CONFLICT (wallet_id, pool_id) \
             DO UPDATE SET pending_reward = EXCLUDED.pending_reward, updated_at = now()",
        )
        .bind(wallet_id.as_uuid())
        .bind(&ids)
        .bind(&rewards)
        .execute(&self.pool)
        .await
        .map_err(persistence)?;
        Ok(())
    }
}
