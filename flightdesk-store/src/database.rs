use async_trait::async_trait;
use flightdesk_core::repository::TransactionalStore;
use flightdesk_core::{StoreError, StoreResult};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres};
use std::time::Duration;
use tracing::{debug, info};

use crate::app_config::DatabaseConfig;
use crate::reservation_repo::PgTransaction;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }
}

/// Postgres-backed reservation store. Every transaction it opens runs at
/// SERIALIZABLE, so conflicting bookings abort instead of interleaving.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Empty users, reservations and the capacity ledger and restart ids at 1.
    /// Flights are reference data and are left alone.
    pub async fn clear_tables(&self) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        for statement in [
            "DELETE FROM reservations",
            "DELETE FROM capacity_ledger",
            "DELETE FROM users",
            "UPDATE reservation_id_counter SET next_value = 1",
        ] {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        info!("Cleared users, reservations and capacity ledger");
        Ok(())
    }
}

impl From<DbClient> for PgStore {
    fn from(client: DbClient) -> Self {
        Self::new(client.pool)
    }
}

#[async_trait]
impl TransactionalStore for PgStore {
    type Tx = PgTransaction;

    async fn begin(&self) -> StoreResult<PgTransaction> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        debug!("Opened serializable transaction");
        Ok(PgTransaction::new(tx))
    }
}

/// Classify driver errors by SQLSTATE.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        // serialization_failure, deadlock_detected
        if matches!(db.code().as_deref(), Some("40001") | Some("40P01")) {
            return StoreError::SerializationConflict(db.message().to_string());
        }
        if db.is_unique_violation() {
            return StoreError::UniqueViolation {
                constraint: db.constraint().unwrap_or_default().to_string(),
            };
        }
    }
    StoreError::Database(err.to_string())
}
