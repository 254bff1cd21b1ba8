//! SQLite connection management

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::infrastructure::ports::RepoError;

/// How long a writer waits on another writer's lock before giving up with `SQLITE_BUSY`.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub database_url: String,
    pub max_connections: u32,
    pub busy_timeout: Duration,
}

impl ConnectionSettings {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 8,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

/// Open the shared pool in WAL mode and make sure the schema exists.
pub async fn connect(settings: &ConnectionSettings) -> Result<SqlitePool, RepoError> {
    let options = SqliteConnectOptions::from_str(&settings.database_url)
        .map_err(|e| RepoError::database("connect", e))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(settings.busy_timeout)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| RepoError::database("connect", e))?;

    super::schema::ensure_schema(&pool).await?;
    tracing::info!(database_url = %settings.database_url, "Connected to SQLite");

    Ok(pool)
}
