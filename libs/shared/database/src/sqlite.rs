use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection};
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::error::DatabaseError;

/// Ordered schema history. A version is applied once and recorded in `schema_version`.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../migrations/001_initial.sql")),
    (2, include_str!("../migrations/002_medication_lifecycle.sql")),
    (3, include_str!("../migrations/003_reconciliation.sql")),
    (4, include_str!("../migrations/004_archive_notes.sql")),
    (5, include_str!("../migrations/005_medication_catalog.sql")),
];

/// Open a SQLite connection to the given path and run migrations
pub fn open_database(path: &Path) -> Result<Connection, DatabaseError> {
    let mut conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    run_migrations(&mut conn)?;
    Ok(conn)
}

/// Open an in-memory database (tests, throwaway runs)
pub fn open_memory_database() -> Result<Connection, DatabaseError> {
    let mut conn = Connection::open_in_memory()?;
    configure_pragmas(&conn)?;
    run_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    Ok(())
}

/// Run all pending migrations
pub fn run_migrations(conn: &mut Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );",
    )?;

    let current_version = current_version(conn)?;

    for &(version, sql) in MIGRATIONS {
        if version <= current_version {
            continue;
        }
        info!("Running migration v{}", version);

        let tx = conn.transaction()?;
        tx.execute_batch(sql).map_err(|e| DatabaseError::MigrationFailed {
            version,
            reason: e.to_string(),
        })?;
        tx.execute("INSERT INTO schema_version (version) VALUES (?1)", params![version])?;
        tx.commit()?;
    }

    Ok(())
}

/// Highest applied schema version (0 for a fresh file)
pub fn current_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(version)
}

pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|(version, _)| *version).unwrap_or(0)
}

/// Process-wide handle to the store.
///
/// Cloning shares the same connection. Every statement runs on the blocking
/// pool while holding the connection lock, so one call sees a consistent view.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DatabaseError> {
        let path = path.as_ref();
        if path.exists() {
            info!("Found existing database at {}", path.display());
        } else {
            info!("Creating new database at {}", path.display());
        }
        Ok(Self::from_connection(open_database(path)?))
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self::from_connection(open_memory_database()?))
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, DatabaseError> {
        if config.is_in_memory() {
            warn!("Using in-memory database, data will not survive a restart");
            Self::open_in_memory()
        } else {
            Self::open(&config.database_path)
        }
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `f` against the connection on the blocking pool.
    pub async fn run<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&mut Connection) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| DatabaseError::Unavailable("connection lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| DatabaseError::Unavailable(e.to_string()))?
    }

    /// Close the connection. Fails if other handles are still alive.
    pub fn close(self) -> Result<(), DatabaseError> {
        let mutex = Arc::try_unwrap(self.conn).map_err(|_| {
            DatabaseError::Unavailable("database still in use, cannot close".to_string())
        })?;
        let conn = mutex
            .into_inner()
            .map_err(|_| DatabaseError::Unavailable("connection lock poisoned".to_string()))?;
        conn.close().map_err(|(_, e)| DatabaseError::from(e))?;
        debug!("Database connection closed");
        Ok(())
    }
}

/// Count tables in the database (for verification)
pub fn count_tables(conn: &Connection) -> Result<i64, DatabaseError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(count)
}
