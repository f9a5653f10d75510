mod address;
mod order;
mod product;
mod user;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};

use crate::{
    Result, StorageError,
    store::{Transaction, Transactional},
};

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

/// Transaction handle for [`PostgresStore`].
///
/// Dropping it without committing rolls the transaction back.
pub struct PgTx(sqlx::Transaction<'static, Postgres>);

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        tracing::info!("database migrations applied");
        Ok(())
    }
}

#[async_trait]
impl Transaction for PgTx {
    async fn commit(self) -> Result<()> {
        self.0.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.0.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl Transactional for PostgresStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx> {
        Ok(PgTx(self.pool.begin().await?))
    }
}

/// SQLSTATE raised when an integer column would overflow.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// Maps unique and foreign key violations onto the matching store errors.
/// Integer overflow on write becomes a conflict.
pub(crate) fn map_constraint(
    err: sqlx::Error,
    entity: &'static str,
    key: impl ToString,
) -> StorageError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            let key = key.to_string();
            return StorageError::Conflict(format!("{entity} {key} already exists"));
        }
        if db_err.is_foreign_key_violation() {
            return StorageError::not_found(entity, key);
        }
        if db_err.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE) {
            let key = key.to_string();
            return StorageError::Conflict(format!("{entity} {key} value out of range"));
        }
    }
    StorageError::Database(err)
}
