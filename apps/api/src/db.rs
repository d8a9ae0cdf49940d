use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::store::PgStore;

const MAX_CONNECTIONS: u32 = 10;

/// Connects to PostgreSQL and brings the schema up to date.
pub async fn connect_store(database_url: &str) -> Result<PgStore> {
    info!("Connecting to PostgreSQL...");
    let pool = PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    let store = PgStore::new(pool);
    store
        .migrate()
        .await
        .context("Failed to apply database migrations")?;
    info!("PostgreSQL store ready, migrations applied");
    Ok(store)
}
