//! alerts table queries.

use agentguard_core::errors::StorageError;
use agentguard_core::time::iso_hours_ago;
use agentguard_core::traits::storage::{AlertRow, AlertStats, CountRow, NewAlertRow};
use agentguard_core::types::alert::AlertCategory;
use agentguard_core::types::severity::Severity;
use rusqlite::{params, Connection};

use super::sqe;

const ALERT_COLUMNS: &str = "id, severity, category, agent_id, description, evidence,
                             timestamp, resolved, resolved_at, resolution_notes";

/// A raw alert row before severity/category parsing.
struct RawAlertRow {
    id: i64,
    severity: String,
    category: String,
    agent_id: Option<String>,
    description: String,
    evidence_json: String,
    timestamp: String,
    resolved: bool,
    resolved_at: Option<String>,
    resolution_notes: Option<String>,
}

/// Insert an alert and return its assigned id.
pub fn insert(conn: &Connection, row: &NewAlertRow) -> Result<i64, StorageError> {
    conn.prepare_cached(
        "INSERT INTO alerts (severity, category, agent_id, description, evidence, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .map_err(sqe)?
    .execute(params![
        row.severity.as_str(),
        row.category.as_str(),
        row.agent_id,
        row.description,
        row.evidence_json,
        row.timestamp,
    ])
    .map_err(sqe)?;

    Ok(conn.last_insert_rowid())
}

/// Alerts within the last `hours`, optionally filtered, newest first.
pub fn query_recent(
    conn: &Connection,
    hours: i64,
    severity: Option<Severity>,
    agent_id: Option<&str>,
) -> Result<Vec<AlertRow>, StorageError> {
    let cutoff = iso_hours_ago(hours);
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts
             WHERE timestamp > ?1
               AND (?2 IS NULL OR severity = ?2)
               AND (?3 IS NULL OR agent_id = ?3)
             ORDER BY timestamp DESC"
        ))
        .map_err(sqe)?;

    let rows = stmt
        .query_map(
            params![cutoff, severity.map(|s| s.as_str()), agent_id],
            map_alert_row,
        )
        .map_err(sqe)?;
    collect_rows(rows)
}

/// Alerts of one category within the last `hours`, newest first.
pub fn query_by_category(
    conn: &Connection,
    category: AlertCategory,
    hours: i64,
) -> Result<Vec<AlertRow>, StorageError> {
    let cutoff = iso_hours_ago(hours);
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts
             WHERE category = ?1 AND timestamp > ?2
             ORDER BY timestamp DESC"
        ))
        .map_err(sqe)?;

    let rows = stmt
        .query_map(params![category.as_str(), cutoff], map_alert_row)
        .map_err(sqe)?;
    collect_rows(rows)
}

/// Mark an alert resolved. Returns false when the id does not exist.
pub fn resolve(
    conn: &Connection,
    id: i64,
    resolved_at: &str,
    notes: &str,
) -> Result<bool, StorageError> {
    let changed = conn
        .prepare_cached(
            "UPDATE alerts SET resolved = 1, resolved_at = ?1, resolution_notes = ?2
             WHERE id = ?3",
        )
        .map_err(sqe)?
        .execute(params![resolved_at, notes, id])
        .map_err(sqe)?;

    Ok(changed > 0)
}

/// Totals for the last `hours`, grouped by severity and by category.
pub fn stats(conn: &Connection, hours: i64) -> Result<AlertStats, StorageError> {
    let cutoff = iso_hours_ago(hours);
    let mut stats = AlertStats::default();

    let mut stmt = conn
        .prepare_cached(
            "SELECT severity, COUNT(*) FROM alerts WHERE timestamp > ?1 GROUP BY severity",
        )
        .map_err(sqe)?;
    let rows = stmt
        .query_map(params![cutoff], |row| {
            Ok(CountRow {
                key: row.get(0)?,
                count: row.get(1)?,
            })
        })
        .map_err(sqe)?;
    for row in rows {
        let row = row.map_err(sqe)?;
        stats.total += row.count;
        stats.by_severity.push(row);
    }

    let mut stmt = conn
        .prepare_cached(
            "SELECT category, COUNT(*) FROM alerts WHERE timestamp > ?1 GROUP BY category",
        )
        .map_err(sqe)?;
    let rows = stmt
        .query_map(params![cutoff], |row| {
            Ok(CountRow {
                key: row.get(0)?,
                count: row.get(1)?,
            })
        })
        .map_err(sqe)?;
    for row in rows {
        stats.by_category.push(row.map_err(sqe)?);
    }

    Ok(stats)
}

/// Shared row mapper for alert queries.
fn map_alert_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAlertRow> {
    Ok(RawAlertRow {
        id: row.get(0)?,
        severity: row.get(1)?,
        category: row.get(2)?,
        agent_id: row.get(3)?,
        description: row.get(4)?,
        evidence_json: row.get(5)?,
        timestamp: row.get(6)?,
        resolved: row.get::<_, i64>(7)? != 0,
        resolved_at: row.get(8)?,
        resolution_notes: row.get(9)?,
    })
}

/// Collect raw rows, parsing severity/category. Alerts are only ever
/// written with canonical strings, so an unknown value is an invalid row.
fn collect_rows(
    rows: rusqlite::MappedRows<'_, impl FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<RawAlertRow>>,
) -> Result<Vec<AlertRow>, StorageError> {
    let mut result = Vec::new();
    for row in rows {
        let raw = row.map_err(sqe)?;
        let severity =
            Severity::parse(&raw.severity).ok_or_else(|| StorageError::InvalidRow {
                table: "alerts".to_string(),
                message: format!("unknown severity {:?}", raw.severity),
            })?;
        let category =
            AlertCategory::parse(&raw.category).ok_or_else(|| StorageError::InvalidRow {
                table: "alerts".to_string(),
                message: format!("unknown category {:?}", raw.category),
            })?;
        result.push(AlertRow {
            id: raw.id,
            severity,
            category,
            agent_id: raw.agent_id,
            description: raw.description,
            evidence_json: raw.evidence_json,
            timestamp: raw.timestamp,
            resolved: raw.resolved,
            resolved_at: raw.resolved_at,
            resolution_notes: raw.resolution_notes,
        });
    }
    Ok(result)
}
