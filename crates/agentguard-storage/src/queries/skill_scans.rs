//! skill_scans table queries.

use agentguard_core::errors::StorageError;
use agentguard_core::traits::storage::SkillScanRow;
use rusqlite::{params, Connection};

use super::sqe;

const SCAN_COLUMNS: &str =
    "skill_name, skill_path, skill_hash, risk_score, threats_detected, scan_status, scanned_at";

/// Insert or overwrite a scan result keyed by `(skill_name, skill_path)`.
pub fn upsert(conn: &Connection, row: &SkillScanRow) -> Result<(), StorageError> {
    conn.prepare_cached(
        "INSERT OR REPLACE INTO skill_scans
         (skill_name, skill_path, skill_hash, risk_score, threats_detected, scan_status, scanned_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .map_err(sqe)?
    .execute(params![
        row.skill_name,
        row.skill_path,
        row.skill_hash,
        row.risk_score,
        row.threats_json,
        row.scan_status,
        row.scanned_at,
    ])
    .map_err(sqe)?;

    Ok(())
}

/// Scans at or above `min_risk`, highest risk first.
pub fn query_high_risk(
    conn: &Connection,
    min_risk: i64,
) -> Result<Vec<SkillScanRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {SCAN_COLUMNS} FROM skill_scans
             WHERE risk_score >= ?1 ORDER BY risk_score DESC"
        ))
        .map_err(sqe)?;

    let rows = stmt.query_map(params![min_risk], map_scan_row).map_err(sqe)?;

    let mut result = Vec::new();
    for row in rows {
        result.push(row.map_err(sqe)?);
    }
    Ok(result)
}

/// Look up a scan by content hash.
pub fn get_by_hash(
    conn: &Connection,
    skill_hash: &str,
) -> Result<Option<SkillScanRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {SCAN_COLUMNS} FROM skill_scans WHERE skill_hash = ?1"
        ))
        .map_err(sqe)?;

    let mut rows = stmt.query_map(params![skill_hash], map_scan_row).map_err(sqe)?;

    match rows.next() {
        Some(row) => Ok(Some(row.map_err(sqe)?)),
        None => Ok(None),
    }
}

/// Shared row mapper for scan queries.
fn map_scan_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SkillScanRow> {
    Ok(SkillScanRow {
        skill_name: row.get(0)?,
        skill_path: row.get(1)?,
        skill_hash: row.get(2)?,
        risk_score: row.get(3)?,
        threats_json: row.get(4)?,
        scan_status: row.get(5)?,
        scanned_at: row.get(6)?,
    })
}
