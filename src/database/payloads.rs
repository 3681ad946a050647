//! Postgres persistence for component payloads, so live buttons survive a restart.

use crate::error::BotResult;
use crate::services::cache::{PayloadBackend, PayloadEntry};
use async_trait::async_trait;
use sqlx::PgPool;

/// Create the payload table and its expiry index if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> sqlx::Result<()> {
    sqlx::query(
        r#"CREATE TABLE IF NOT EXISTS component_payloads (
            token TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            created_at BIGINT NOT NULL,
            expires_at BIGINT NOT NULL DEFAULT 0
        )"#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS component_payloads_expiry
            ON component_payloads (expires_at) WHERE expires_at <> 0"#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub struct PgPayloadBackend {
    pool: PgPool,
}

impl PgPayloadBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PayloadBackend for PgPayloadBackend {
    async fn put(&self, entry: PayloadEntry) -> BotResult<()> {
        sqlx::query(
            r#"INSERT INTO component_payloads (token, payload, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (token) DO UPDATE SET
                payload = EXCLUDED.payload,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at"#,
        )
        .bind(&entry.token)
        .bind(&entry.payload)
        .bind(entry.created_at)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch(&self, token: &str) -> BotResult<Option<PayloadEntry>> {
        let row = sqlx::query_as::<_, PayloadEntry>(
            r#"SELECT token, payload, created_at, expires_at
            FROM component_payloads WHERE token = $1"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn remove(&self, token: &str) -> BotResult<bool> {
        let res = sqlx::query("DELETE FROM component_payloads WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn remove_expired(&self, now_millis: i64) -> BotResult<u64> {
        let res = sqlx::query(
            "DELETE FROM component_payloads WHERE expires_at <> 0 AND expires_at < $1",
        )
        .bind(now_millis)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }
}
