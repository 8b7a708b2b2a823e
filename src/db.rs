//! PostgreSQL pool and schema migrations.

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

pub type DbPool = PgPool;

const MAX_CONNECTIONS: u32 = 10;

/// Requests waiting longer than this for a connection fail with a 500.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

fn pool_options(max_connections: u32) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
}

/// Connect at startup, failing fast if the database is unreachable.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    pool_options(MAX_CONNECTIONS).connect(database_url).await
}

/// Pool that opens no connection until the first query.
///
/// Lets tests drive routing, auth and validation without a live database.
pub fn create_lazy_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    pool_options(1).connect_lazy(database_url)
}

/// Apply pending migrations from `migrations/` (embedded at compile time).
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
