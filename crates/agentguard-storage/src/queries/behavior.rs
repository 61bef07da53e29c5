//! behavior_logs table queries.

use agentguard_core::errors::StorageError;
use agentguard_core::time::iso_hours_ago;
use agentguard_core::traits::storage::{AgentActivityStats, BehaviorEventRow};
use rusqlite::{params, Connection};

use super::sqe;

/// Append a behavior event to the persistent log.
pub fn insert(conn: &Connection, row: &BehaviorEventRow) -> Result<(), StorageError> {
    conn.prepare_cached(
        "INSERT INTO behavior_logs
         (agent_id, action_type, details, token_count, tool_usage_count, logged_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .map_err(sqe)?
    .execute(params![
        row.agent_id,
        row.action_type,
        row.details_json,
        row.token_count,
        row.tool_usage_count,
        row.logged_at,
    ])
    .map_err(sqe)?;

    Ok(())
}

/// Aggregate activity for one agent over the last `hours`.
pub fn activity_stats(
    conn: &Connection,
    agent_id: &str,
    hours: i64,
) -> Result<AgentActivityStats, StorageError> {
    let cutoff = iso_hours_ago(hours);
    conn.prepare_cached(
        "SELECT COUNT(*),
                COALESCE(SUM(token_count), 0),
                COALESCE(SUM(tool_usage_count), 0)
         FROM behavior_logs
         WHERE agent_id = ?1 AND logged_at > ?2",
    )
    .map_err(sqe)?
    .query_row(params![agent_id, cutoff], |row| {
        Ok(AgentActivityStats {
            total_actions: row.get(0)?,
            total_tokens: row.get(1)?,
            total_tool_calls: row.get(2)?,
        })
    })
    .map_err(sqe)
}
