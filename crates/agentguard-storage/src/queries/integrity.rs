//! integrity_snapshots table queries.

use agentguard_core::errors::StorageError;
use agentguard_core::traits::storage::SnapshotRow;
use rusqlite::{params, Connection};

use super::sqe;

/// Insert or overwrite a baseline snapshot. `file_path` is the primary
/// key, so re-snapshotting never duplicates.
pub fn upsert(conn: &Connection, row: &SnapshotRow) -> Result<(), StorageError> {
    conn.prepare_cached(
        "INSERT OR REPLACE INTO integrity_snapshots
         (file_path, file_hash, file_size, last_modified, agent_id, snapshot_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .map_err(sqe)?
    .execute(params![
        row.file_path,
        row.file_hash,
        row.file_size,
        row.last_modified,
        row.agent_id,
        row.snapshot_at,
    ])
    .map_err(sqe)?;

    Ok(())
}

/// Fetch the baseline for a path, if one exists.
pub fn get(conn: &Connection, file_path: &str) -> Result<Option<SnapshotRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT file_path, file_hash, file_size, last_modified, agent_id, snapshot_at
             FROM integrity_snapshots WHERE file_path = ?1",
        )
        .map_err(sqe)?;

    let mut rows = stmt
        .query_map(params![file_path], |row| {
            Ok(SnapshotRow {
                file_path: row.get(0)?,
                file_hash: row.get(1)?,
                file_size: row.get(2)?,
                last_modified: row.get(3)?,
                agent_id: row.get(4)?,
                snapshot_at: row.get(5)?,
            })
        })
        .map_err(sqe)?;

    match rows.next() {
        Some(row) => Ok(Some(row.map_err(sqe)?)),
        None => Ok(None),
    }
}
