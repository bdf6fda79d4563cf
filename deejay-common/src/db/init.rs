//! Database initialization
//!
//! Opens (or creates) the SQLite catalog file. Table creation is an explicit
//! operator action and is not performed here.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// SQLite busy timeout applied to every pooled connection
///
/// Kept short so lock contention surfaces quickly and is handled by the
/// store's own retry with backoff.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 250;

/// Pool size for the catalog
pub const MAX_CONNECTIONS: u32 = 8;

/// Connection options shared by every connection of the pool
///
/// PRAGMAs issued against a pool only reach whichever connection ran them,
/// so foreign keys, WAL and the busy timeout are set per connection here.
pub fn connect_options(db_path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))
}

/// Open a connection pool on `db_path`, creating the file if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(connect_options(db_path))
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    Ok(pool)
}
