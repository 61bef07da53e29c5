//! threat_signatures table queries.

use agentguard_core::errors::StorageError;
use agentguard_core::traits::storage::ThreatSignatureRow;
use agentguard_core::types::severity::Severity;
use rusqlite::Connection;

use super::sqe;

/// Load all threat signatures. A row with an unknown severity is skipped
/// with a warning — one bad signature never disables the rest.
pub fn load_all(conn: &Connection) -> Result<Vec<ThreatSignatureRow>, StorageError> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT signature_id, name, description, pattern, pattern_type, severity
             FROM threat_signatures",
        )
        .map_err(sqe)?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })
        .map_err(sqe)?;

    let mut result = Vec::new();
    for row in rows {
        let (signature_id, name, description, pattern, pattern_type, severity) =
            row.map_err(sqe)?;
        let Some(severity) = Severity::parse(&severity) else {
            tracing::warn!(
                signature_id,
                severity,
                "skipping threat signature with unknown severity"
            );
            continue;
        };
        result.push(ThreatSignatureRow {
            signature_id,
            name,
            description,
            pattern,
            pattern_type,
            severity,
        });
    }
    Ok(result)
}

/// Insert a threat signature (used by bootstrap and tests).
pub fn insert(conn: &Connection, row: &ThreatSignatureRow) -> Result<(), StorageError> {
    conn.prepare_cached(
        "INSERT OR REPLACE INTO threat_signatures
         (signature_id, name, description, pattern, pattern_type, severity)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .map_err(sqe)?
    .execute(rusqlite::params![
        row.signature_id,
        row.name,
        row.description,
        row.pattern,
        row.pattern_type,
        row.severity.as_str(),
    ])
    .map_err(sqe)?;

    Ok(())
}
