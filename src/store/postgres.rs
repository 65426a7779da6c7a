//! PostgreSQL-backed [`Store`]/[`StoreTransaction`] — the production
//! adapter. Built on `tokio-postgres` + `deadpool-postgres`, the same
//! pairing the pack's Postgres-backed example repo uses.
//!
//! Transactions are driven with raw `BEGIN`/`COMMIT`/`ROLLBACK` rather
//! than `tokio_postgres::Transaction` so a [`PgTransaction`] can own its
//! pooled connection outright (a borrowed-`Transaction` type would tie
//! the adapter to a self-referential struct just to satisfy
//! `Box<dyn StoreTransaction>`'s `'static` bound).

use async_trait::async_trait;
use deadpool_postgres::{Config as PoolConfig, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::error::SqlState;
use tokio_postgres::{NoTls, Row};

use crate::config::Config;
use crate::error::StoreError;
use crate::model::{Contact, Precedence};

use super::{Store, StoreTransaction};

/// Idempotent schema migration: table, lookup indexes, and the partial
/// unique index that lets a soft-deleted `(email, phone, linked_id)`
/// triple be reinserted without conflict (Open Question 4 — this
/// implementation chose the partial-index resolution).
const MIGRATION_SQL: &str = "
CREATE TABLE IF NOT EXISTS contacts (
    id          BIGSERIAL PRIMARY KEY,
    email       TEXT,
    phone       TEXT,
    linked_id   BIGINT REFERENCES contacts(id),
    precedence  TEXT NOT NULL CHECK (precedence IN ('primary', 'secondary')),
    created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at  TIMESTAMPTZ,
    CONSTRAINT contacts_non_empty CHECK (email IS NOT NULL OR phone IS NOT NULL)
);

CREATE INDEX IF NOT EXISTS idx_contacts_email ON contacts (email) WHERE deleted_at IS NULL;
CREATE INDEX IF NOT EXISTS idx_contacts_phone ON contacts (phone) WHERE deleted_at IS NULL;
CREATE INDEX IF NOT EXISTS idx_contacts_linked_id ON contacts (linked_id) WHERE deleted_at IS NULL;

CREATE UNIQUE INDEX IF NOT EXISTS uq_contacts_identity
    ON contacts (email, phone, linked_id)
    WHERE deleted_at IS NULL;
";

const SELECT_COLUMNS: &str =
    "id, email, phone, linked_id, precedence, created_at, updated_at, deleted_at";

pub struct PgStore {
    pool: Pool,
    max_wait_ms: u64,
    statement_timeout_ms: u64,
}

impl PgStore {
    /// Builds a connection pool from `config` and runs the idempotent
    /// migration. Analogous to the teacher's `db::open` — a single
    /// ready-to-use handle constructed once at process start.
    pub async fn connect(config: &Config) -> Result<Self, StoreError> {
        let mut pool_config = PoolConfig::new();
        pool_config.url = Some(config.database_url.clone());
        pool_config.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        pool_config.pool = Some(deadpool_postgres::PoolConfig::new(config.pool_max_size));

        let pool = pool_config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let store = Self {
            pool,
            max_wait_ms: config.max_wait_ms,
            statement_timeout_ms: config.statement_timeout_ms,
        };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.batch_execute(MIGRATION_SQL).await?;
        tracing::info!("contacts schema migrated");
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let client = tokio::time::timeout(
            std::time::Duration::from_millis(self.max_wait_ms),
            self.pool.get(),
        )
        .await
        .map_err(|_| StoreError::Timeout)??;

        client
            .batch_execute(&format!(
                "SET statement_timeout = {}; BEGIN ISOLATION LEVEL SERIALIZABLE;",
                self.statement_timeout_ms
            ))
            .await?;

        Ok(Box::new(PgTransaction { client }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let client = self.pool.get().await?;
        client.batch_execute("SELECT 1").await?;
        Ok(())
    }
}

struct PgTransaction {
    client: deadpool_postgres::Object,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn find_live_matching(
        &mut self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Vec<Contact>, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM contacts
             WHERE deleted_at IS NULL
               AND (($1::text IS NOT NULL AND email = $1) OR ($2::text IS NOT NULL AND phone = $2))
             ORDER BY created_at ASC, id ASC"
        );
        let rows = self
            .client
            .query(&sql, &[&email, &phone])
            .await
            .map_err(map_pg_error)?;
        rows.iter().map(row_to_contact).collect()
    }

    async fn find_live_by_ids(&mut self, ids: &[i64]) -> Result<Vec<Contact>, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM contacts
             WHERE deleted_at IS NULL AND id = ANY($1)
             ORDER BY created_at ASC, id ASC"
        );
        let rows = self
            .client
            .query(&sql, &[&ids])
            .await
            .map_err(map_pg_error)?;
        rows.iter().map(row_to_contact).collect()
    }

    async fn find_live_group(&mut self, primary_id: i64) -> Result<Vec<Contact>, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM contacts
             WHERE deleted_at IS NULL AND (id = $1 OR linked_id = $1)
             ORDER BY created_at ASC, id ASC"
        );
        let rows = self
            .client
            .query(&sql, &[&primary_id])
            .await
            .map_err(map_pg_error)?;
        rows.iter().map(row_to_contact).collect()
    }

    async fn insert_contact(
        &mut self,
        email: Option<&str>,
        phone: Option<&str>,
        linked_id: Option<i64>,
        precedence: Precedence,
    ) -> Result<Contact, StoreError> {
        let sql = format!(
            "INSERT INTO contacts (email, phone, linked_id, precedence)
             VALUES ($1, $2, $3, $4)
             RETURNING {SELECT_COLUMNS}"
        );
        let row = self
            .client
            .query_one(&sql, &[&email, &phone, &linked_id, &precedence.as_str()])
            .await
            .map_err(map_pg_error)?;
        row_to_contact(&row)
    }

    async fn demote(&mut self, id: i64, linked_id: i64) -> Result<(), StoreError> {
        let rows = self
            .client
            .execute(
                "UPDATE contacts SET precedence = 'secondary', linked_id = $2, updated_at = now()
                 WHERE id = $1 AND deleted_at IS NULL AND precedence = 'primary'",
                &[&id, &linked_id],
            )
            .await
            .map_err(map_pg_error)?;
        if rows == 0 {
            return Err(StoreError::NotLive(id));
        }
        Ok(())
    }

    async fn relink_children(
        &mut self,
        from_linked_id: i64,
        to_linked_id: i64,
    ) -> Result<u64, StoreError> {
        let rows = self
            .client
            .execute(
                "UPDATE contacts SET linked_id = $2, updated_at = now()
                 WHERE linked_id = $1 AND deleted_at IS NULL",
                &[&from_linked_id, &to_linked_id],
            )
            .await
            .map_err(map_pg_error)?;
        Ok(rows)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.client.batch_execute("COMMIT").await.map_err(map_pg_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.client.batch_execute("ROLLBACK").await.map_err(map_pg_error)
    }
}

fn row_to_contact(row: &Row) -> Result<Contact, StoreError> {
    let precedence_raw: String = row.get("precedence");
    let precedence = Precedence::from_db_value(&precedence_raw).ok_or_else(|| {
        StoreError::CorruptRow(format!("unknown precedence value: {precedence_raw}"))
    })?;

    Ok(Contact {
        id: row.get("id"),
        email: row.get("email"),
        phone: row.get("phone"),
        linked_id: row.get("linked_id"),
        precedence,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    })
}

fn map_pg_error(err: tokio_postgres::Error) -> StoreError {
    if let Some(code) = err.code() {
        if *code == SqlState::UNIQUE_VIOLATION {
            return StoreError::UniqueConflict;
        }
        if *code == SqlState::T_R_SERIALIZATION_FAILURE {
            return StoreError::Serialization;
        }
    }
    StoreError::Driver(err)
}
