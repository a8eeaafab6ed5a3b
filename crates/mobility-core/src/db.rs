use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::config::DbConfig;
use crate::error::LoadError;

pub type DbPool = Pool<Postgres>;

/// Establish a Postgres pool for the loader. A single file needs one
/// connection at a time; the headroom is for callers loading files in parallel.
pub async fn connect(config: &DbConfig) -> Result<DbPool, LoadError> {
    let options = config.connect_options()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;
    Ok(pool)
}
