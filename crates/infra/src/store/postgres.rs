//! Postgres-backed document store.
//!
//! Every aggregate lives as one JSONB document in a single table:
//!
//! ```sql
//! CREATE TABLE aggregates (
//!     aggregate_type TEXT  NOT NULL,
//!     aggregate_key  TEXT  NOT NULL,
//!     document       JSONB NOT NULL,
//!     PRIMARY KEY (aggregate_type, aggregate_key)
//! );
//! ```
//!
//! The table is provisioned outside this crate.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Update/delete affecting 0 rows | N/A | `Missing` |
//! | Anything else | Any | `Backend` |

use std::sync::Arc;

use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use tracing::instrument;

use super::r#trait::{Mutation, MutationKind, Store, StoreError};

/// Postgres-backed document store.
///
/// `apply` runs the whole batch in one transaction, so a failing mutation
/// rolls back every earlier one.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: Arc<PgPool>,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Build a store whose pool connects on first use.
    ///
    /// Only the URL is validated here; no connection is opened. The pool
    /// spawns its maintenance tasks on the current Tokio runtime, so calling
    /// this outside one is an error.
    pub fn connect_lazy(url: &str) -> Result<Self, StoreError> {
        tokio::runtime::Handle::try_current()
            .map_err(|e| StoreError::Backend(format!("connect: no Tokio runtime: {e}")))?;

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_lazy(url)
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    #[instrument(skip(self), err)]
    async fn scan(&self, table: &str) -> Result<Vec<JsonValue>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT document
            FROM aggregates
            WHERE aggregate_type = $1
            ORDER BY aggregate_key ASC
            "#,
        )
        .bind(table)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("scan", e))?;

        rows.iter()
            .map(|row| {
                row.try_get::<JsonValue, _>("document")
                    .map_err(|e| map_sqlx_error("scan", e))
            })
            .collect()
    }

    #[instrument(skip(self), err)]
    async fn get(&self, table: &str, key: &str) -> Result<Option<JsonValue>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT document
            FROM aggregates
            WHERE aggregate_type = $1 AND aggregate_key = $2
            "#,
        )
        .bind(table)
        .bind(key)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get", e))?;

        row.map(|row| {
            row.try_get::<JsonValue, _>("document")
                .map_err(|e| map_sqlx_error("get", e))
        })
        .transpose()
    }

    #[instrument(skip(self, batch), fields(mutations = batch.len()), err)]
    async fn apply(&self, batch: Vec<Mutation>) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for m in batch {
            let result = match &m.kind {
                MutationKind::Insert(doc) => {
                    sqlx::query(
                        r#"
                        INSERT INTO aggregates (aggregate_type, aggregate_key, document)
                        VALUES ($1, $2, $3)
                        "#,
                    )
                    .bind(&m.table)
                    .bind(&m.key)
                    .bind(doc)
                    .execute(&mut *tx)
                    .await
                }
                MutationKind::Update(doc) => {
                    sqlx::query(
                        r#"
                        UPDATE aggregates
                        SET document = $3
                        WHERE aggregate_type = $1 AND aggregate_key = $2
                        "#,
                    )
                    .bind(&m.table)
                    .bind(&m.key)
                    .bind(doc)
                    .execute(&mut *tx)
                    .await
                }
                MutationKind::Delete => {
                    sqlx::query(
                        r#"
                        DELETE FROM aggregates
                        WHERE aggregate_type = $1 AND aggregate_key = $2
                        "#,
                    )
                    .bind(&m.table)
                    .bind(&m.key)
                    .execute(&mut *tx)
                    .await
                }
            };

            let outcome = match result {
                Ok(done) if done.rows_affected() == 0 => {
                    Err(StoreError::Missing(format!("{}/{}", m.table, m.key)))
                }
                Ok(_) => Ok(()),
                Err(e) if is_unique_violation(&e) => {
                    Err(StoreError::Conflict(format!("{}/{}", m.table, m.key)))
                }
                Err(e) => Err(map_sqlx_error("apply", e)),
            };

            if let Err(err) = outcome {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(err);
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(())
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}
