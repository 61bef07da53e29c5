//! Schema migrations, gated on SQLite `user_version`.
//!
//! Each migration is applied in its own transaction; a failure leaves the
//! version untouched so the next open retries from a clean state.

use agentguard_core::errors::StorageError;
use rusqlite::Connection;

/// `(version, sql)` pairs, applied in order when `user_version < version`.
const MIGRATIONS: &[(u32, &str)] = &[(1, V001_SCHEMA)];

const V001_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    severity TEXT NOT NULL,
    category TEXT NOT NULL,
    agent_id TEXT,
    description TEXT NOT NULL,
    evidence TEXT NOT NULL DEFAULT '{}',
    timestamp TEXT NOT NULL,
    resolved INTEGER NOT NULL DEFAULT 0,
    resolved_at TEXT,
    resolution_notes TEXT
);
CREATE INDEX IF NOT EXISTS idx_alerts_timestamp ON alerts(timestamp);
CREATE INDEX IF NOT EXISTS idx_alerts_agent ON alerts(agent_id);

CREATE TABLE IF NOT EXISTS behavior_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    agent_id TEXT NOT NULL,
    action_type TEXT NOT NULL,
    details TEXT NOT NULL DEFAULT '{}',
    token_count INTEGER NOT NULL DEFAULT 0,
    tool_usage_count INTEGER NOT NULL DEFAULT 0,
    logged_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_behavior_agent_time ON behavior_logs(agent_id, logged_at);

CREATE TABLE IF NOT EXISTS communication_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_agent TEXT NOT NULL,
    target_agent TEXT NOT NULL,
    message_type TEXT NOT NULL,
    content_hash TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS integrity_snapshots (
    file_path TEXT PRIMARY KEY,
    file_hash TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    last_modified TEXT NOT NULL,
    agent_id TEXT,
    snapshot_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS skill_scans (
    skill_name TEXT NOT NULL,
    skill_path TEXT NOT NULL,
    skill_hash TEXT NOT NULL,
    risk_score INTEGER NOT NULL,
    threats_detected TEXT NOT NULL DEFAULT '[]',
    scan_status TEXT NOT NULL,
    scanned_at TEXT NOT NULL,
    PRIMARY KEY (skill_name, skill_path)
);
CREATE INDEX IF NOT EXISTS idx_skill_scans_hash ON skill_scans(skill_hash);

CREATE TABLE IF NOT EXISTS threat_signatures (
    signature_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    pattern TEXT NOT NULL,
    pattern_type TEXT NOT NULL DEFAULT 'regex',
    severity TEXT NOT NULL DEFAULT 'MEDIUM'
);
";

/// Current schema version of a connection.
pub fn current_version(conn: &Connection) -> Result<u32, StorageError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get::<_, u32>(0))
        .map_err(|e| StorageError::SqliteError {
            message: e.to_string(),
        })
}

/// Apply all pending migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    let mut version = current_version(conn)?;

    for &(target, sql) in MIGRATIONS {
        if version >= target {
            continue;
        }

        let apply = || -> Result<(), rusqlite::Error> {
            conn.execute_batch("BEGIN")?;
            conn.execute_batch(sql)?;
            conn.execute_batch(&format!("PRAGMA user_version = {target}"))?;
            conn.execute_batch("COMMIT")?;
            Ok(())
        };

        if let Err(e) = apply() {
            let _ = conn.execute_batch("ROLLBACK");
            return Err(StorageError::MigrationFailed {
                version: target,
                message: e.to_string(),
            });
        }

        tracing::debug!(version = target, "applied schema migration");
        version = target;
    }

    Ok(())
}

/// Latest schema version this build knows about.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|&(v, _)| v).unwrap_or(0)
}
