//! Persistence for quill: sea-orm entities, schema migrations and repositories.
//!
//! `PostgreSQL` and `SQLite` URLs are both accepted.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use std::time::Duration;

use quill_common::{AppError, AppResult, Config};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info, log::LevelFilter};

use migrations::Migrator;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const IDLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Open the connection pool described by `config.database`.
pub async fn init(config: &Config) -> AppResult<DatabaseConnection> {
    let settings = &config.database;

    // Each connection to `sqlite::memory:` is its own database.
    let (max, min) = if is_in_memory_sqlite(&settings.url) {
        (1, 1)
    } else {
        (
            settings.max_connections.max(1),
            settings.min_connections.min(settings.max_connections),
        )
    };

    let mut opt = ConnectOptions::new(&settings.url);
    opt.max_connections(max)
        .min_connections(min)
        .connect_timeout(CONNECT_TIMEOUT)
        .acquire_timeout(CONNECT_TIMEOUT)
        .idle_timeout(IDLE_TIMEOUT)
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    let db = Database::connect(opt)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    info!(backend = ?db.get_database_backend(), max_connections = max, "Database pool ready");
    Ok(db)
}

/// Apply every migration not yet recorded in the database.
pub async fn migrate(db: &DatabaseConnection) -> AppResult<()> {
    let pending = Migrator::get_pending_migrations(db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .len();

    if pending == 0 {
        debug!("Schema is up to date");
        return Ok(());
    }

    info!(pending, "Applying migrations");
    Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))
}

fn is_in_memory_sqlite(url: &str) -> bool {
    url.starts_with("sqlite:") && (url.contains(":memory:") || url.contains("mode=memory"))
}
