//! communication_logs table queries.

use agentguard_core::errors::StorageError;
use agentguard_core::traits::storage::CommunicationRow;
use rusqlite::{params, Connection};

use super::sqe;

/// Append a cross-agent message to the communication log.
pub fn insert(conn: &Connection, row: &CommunicationRow) -> Result<(), StorageError> {
    conn.prepare_cached(
        "INSERT INTO communication_logs
         (source_agent, target_agent, message_type, content_hash)
         VALUES (?1, ?2, ?3, ?4)",
    )
    .map_err(sqe)?
    .execute(params![
        row.source_agent,
        row.target_agent,
        row.message_type,
        row.content_hash,
    ])
    .map_err(sqe)?;

    Ok(())
}
