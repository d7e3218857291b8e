//! PostgreSQL-backed document store.
//!
//! Documents live in a single JSONB table keyed by `(collection, id)`. Every
//! write bumps the row's `version`, which batches use for optimistic
//! preconditions. Updates and batches run inside a transaction and lock the
//! rows they touch with `FOR UPDATE`.
#![allow(clippy::needless_raw_string_hashes)]

use super::{
    DocPath, Document, DocumentStore, FieldUpdates, Query, StoreError, StoreResult,
    StoredDocument, Version, WriteBatch, WriteOp, apply_updates,
};
use async_trait::async_trait;
use sqlx::{
    PgConnection, Postgres, QueryBuilder, Row,
    postgres::{PgPool, PgPoolOptions, PgRow},
    types::Json,
};
use std::{env, time::Duration};

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Connection timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,

    /// Maximum connection lifetime in seconds
    pub max_lifetime_secs: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl DatabaseConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `DATABASE_URL`: PostgreSQL connection string (default: development URL)
    /// - `DB_MAX_CONNECTIONS`: Maximum pool size (default: 20)
    /// - `DB_MIN_CONNECTIONS`: Minimum pool size (default: 2)
    /// - `DB_CONNECTION_TIMEOUT`: Connection timeout in seconds (default: 10)
    /// - `DB_IDLE_TIMEOUT`: Idle timeout in seconds (default: 600)
    /// - `DB_MAX_LIFETIME`: Max lifetime in seconds (default: 1800)
    pub fn from_env() -> Self {
        let defaults = Self::development();
        Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            max_connections: env_or("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env_or("DB_MIN_CONNECTIONS", defaults.min_connections),
            connection_timeout_secs: env_or(
                "DB_CONNECTION_TIMEOUT",
                defaults.connection_timeout_secs,
            ),
            idle_timeout_secs: env_or("DB_IDLE_TIMEOUT", defaults.idle_timeout_secs),
            max_lifetime_secs: env_or("DB_MAX_LIFETIME", defaults.max_lifetime_secs),
        }
    }

    /// Default configuration for local development
    pub fn development() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/mparty".to_string(),
            max_connections: 20,
            min_connections: 2,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::development()
    }
}

/// PostgreSQL implementation of [`DocumentStore`]
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Open a connection pool
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Create the documents table if it does not exist
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                data JSONB NOT NULL,
                version BIGINT NOT NULL DEFAULT 1,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Round-trip a trivial query to confirm the pool can reach the server
    pub async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn decode_row(row: PgRow) -> StoreResult<StoredDocument> {
    let Json(data): Json<Document> = row.try_get("data")?;
    let version: i64 = row.try_get("version")?;
    Ok(StoredDocument {
        id: row.try_get("id")?,
        data,
        version: version as Version,
    })
}

async fn set_in(conn: &mut PgConnection, path: &DocPath, data: Document) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO documents (collection, id, data)
        VALUES ($1, $2, $3)
        ON CONFLICT (collection, id)
        DO UPDATE SET data = EXCLUDED.data, version = documents.version + 1, updated_at = NOW()
        "#,
    )
    .bind(&path.collection)
    .bind(&path.id)
    .bind(Json(data))
    .execute(conn)
    .await?;
    Ok(())
}

async fn update_in(conn: &mut PgConnection, path: &DocPath, fields: &FieldUpdates) -> StoreResult<()> {
    let row = sqlx::query("SELECT data FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE")
        .bind(&path.collection)
        .bind(&path.id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StoreError::NotFound(path.clone()))?;

    let Json(mut data): Json<Document> = row.try_get("data")?;
    apply_updates(path, &mut data, fields)?;

    sqlx::query(
        r#"
        UPDATE documents
        SET data = $3, version = version + 1, updated_at = NOW()
        WHERE collection = $1 AND id = $2
        "#,
    )
    .bind(&path.collection)
    .bind(&path.id)
    .bind(Json(data))
    .execute(conn)
    .await?;
    Ok(())
}

async fn delete_in(conn: &mut PgConnection, path: &DocPath) -> StoreResult<()> {
    sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
        .bind(&path.collection)
        .bind(&path.id)
        .execute(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get_document(&self, path: &DocPath) -> StoreResult<Option<StoredDocument>> {
        sqlx::query("SELECT id, data, version FROM documents WHERE collection = $1 AND id = $2")
            .bind(&path.collection)
            .bind(&path.id)
            .fetch_optional(&self.pool)
            .await?
            .map(decode_row)
            .transpose()
    }

    async fn set_document(&self, path: &DocPath, data: Document) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        set_in(&mut *conn, path, data).await
    }

    async fn update_fields(&self, path: &DocPath, fields: FieldUpdates) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        update_in(&mut *tx, path, &fields).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete_document(&self, path: &DocPath) -> StoreResult<()> {
        let mut conn = self.pool.acquire().await?;
        delete_in(&mut *conn, path).await
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<StoredDocument>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT id, data, version FROM documents WHERE collection = ");
        builder.push_bind(query.collection.clone());

        for filter in &query.filters {
            builder
                .push(" AND data -> ")
                .push_bind(filter.field.clone())
                .push(" = ")
                .push_bind(Json(filter.value.clone()));
        }

        if let Some(order) = &query.order_by {
            builder.push(" ORDER BY data -> ").push_bind(order.field.clone());
            builder.push(if order.descending {
                " DESC NULLS LAST"
            } else {
                " ASC NULLS FIRST"
            });
        }

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        builder
            .build()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(decode_row)
            .collect()
    }

    async fn batch_write(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        for pre in &batch.preconditions {
            let current: Option<i64> = sqlx::query_scalar(
                "SELECT version FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
            )
            .bind(&pre.path.collection)
            .bind(&pre.path.id)
            .fetch_optional(&mut *tx)
            .await?;

            if current.map(|v| v as Version) != Some(pre.version) {
                log::debug!("Batch precondition failed on {}", pre.path);
                return Err(StoreError::Conflict(pre.path.clone()));
            }
        }

        for op in batch.ops {
            match op {
                WriteOp::Set { path, data } => set_in(&mut *tx, &path, data).await?,
                WriteOp::Update { path, fields } => update_in(&mut *tx, &path, &fields).await?,
                WriteOp::Delete { path } => delete_in(&mut *tx, &path).await?,
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
