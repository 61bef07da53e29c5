//! Connection management for the AgentGuard database.
//!
//! One serialized connection behind a mutex: readers and the single writer
//! share it, which matches the engine's concurrency model (short-lived
//! operations, one writer at a time). File-backed databases get WAL mode;
//! in-memory databases are used by unit tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use agentguard_core::errors::StorageError;
use rusqlite::Connection;

use crate::migrations;

/// Pragmas applied to every new connection.
pub fn apply_pragmas(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )
    .map_err(|e| StorageError::SqliteError {
        message: e.to_string(),
    })
}

/// Owns the database connection and routes access through closures.
pub struct DatabaseManager {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl DatabaseManager {
    /// Open a file-backed database, creating parent directories, applying
    /// pragmas, and running migrations.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StorageError::SqliteError {
                    message: format!("cannot create {}: {e}", parent.display()),
                })?;
            }
        }

        let conn = Connection::open(path).map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })?;
        apply_pragmas(&conn)?;
        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an in-memory database (for testing). Migrations applied.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })?;
        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// Database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run a read operation against the connection.
    pub fn with_reader<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self.conn.lock().map_err(|_| StorageError::SqliteError {
            message: "connection mutex poisoned".to_string(),
        })?;
        f(&conn)
    }

    /// Run a write operation against the connection. Same connection as
    /// reads — the mutex serializes writers.
    pub fn with_writer<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        self.with_reader(f)
    }
}
