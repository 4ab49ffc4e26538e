//! Database schema management for the account service

use common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;
use tracing::{error, info};

/// Apply the embedded schema migrations
///
/// # Arguments
/// * `pool` - PostgreSQL connection pool
pub async fn run_migrations(pool: &PgPool) -> DatabaseResult<()> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        error!("Failed to apply migrations: {}", e);
        DatabaseError::Migration(e.to_string())
    })?;

    info!("Database migrations applied successfully");
    Ok(())
}
