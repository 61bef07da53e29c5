//! Storage trait seams and row types.
//!
//! The detection components talk to persistence exclusively through these
//! object-safe traits; the storage crate provides the single SQLite-backed
//! implementation. Row types carry persisted shapes — timestamps are
//! ISO-8601 UTC strings, evidence is JSON text.

use crate::errors::StorageError;
use crate::types::alert::AlertCategory;
use crate::types::severity::Severity;

// ─── Alerts ─────────────────────────────────────────────────────────────────

/// A new alert to persist. `evidence_json` is serialized evidence.
#[derive(Debug, Clone)]
pub struct NewAlertRow {
    pub severity: Severity,
    pub category: AlertCategory,
    pub agent_id: Option<String>,
    pub description: String,
    pub evidence_json: String,
    pub timestamp: String,
}

/// A persisted alert.
#[derive(Debug, Clone)]
pub struct AlertRow {
    pub id: i64,
    pub severity: Severity,
    pub category: AlertCategory,
    pub agent_id: Option<String>,
    pub description: String,
    pub evidence_json: String,
    pub timestamp: String,
    pub resolved: bool,
    pub resolved_at: Option<String>,
    pub resolution_notes: Option<String>,
}

/// One `(key, count)` bucket of an aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountRow {
    pub key: String,
    pub count: i64,
}

/// Alert totals grouped by severity and category.
#[derive(Debug, Clone, Default)]
pub struct AlertStats {
    pub total: i64,
    pub by_severity: Vec<CountRow>,
    pub by_category: Vec<CountRow>,
}

/// Persistence operations for alerts.
pub trait AlertStore: Send + Sync {
    /// Insert an alert and return its assigned id.
    fn insert_alert(&self, row: &NewAlertRow) -> Result<i64, StorageError>;

    /// Alerts within the last `hours`, optionally filtered, newest first.
    fn query_recent_alerts(
        &self,
        hours: i64,
        severity: Option<Severity>,
        agent_id: Option<&str>,
    ) -> Result<Vec<AlertRow>, StorageError>;

    /// Alerts of one category within the last `hours`, newest first.
    fn query_alerts_by_category(
        &self,
        category: AlertCategory,
        hours: i64,
    ) -> Result<Vec<AlertRow>, StorageError>;

    /// Mark an alert resolved. Returns false when the id does not exist.
    fn resolve_alert(
        &self,
        id: i64,
        resolved_at: &str,
        notes: &str,
    ) -> Result<bool, StorageError>;

    /// Totals for the last `hours`, grouped by severity and by category.
    fn alert_stats(&self, hours: i64) -> Result<AlertStats, StorageError>;
}

// ─── Behavior ───────────────────────────────────────────────────────────────

/// A behavior event row for the append-only log.
#[derive(Debug, Clone)]
pub struct BehaviorEventRow {
    pub agent_id: String,
    pub action_type: String,
    pub details_json: String,
    pub token_count: i64,
    pub tool_usage_count: i64,
    pub logged_at: String,
}

/// A cross-agent communication row.
#[derive(Debug, Clone)]
pub struct CommunicationRow {
    pub source_agent: String,
    pub target_agent: String,
    pub message_type: String,
    pub content_hash: String,
}

/// Aggregate activity for one agent over a time window.
#[derive(Debug, Clone, Default)]
pub struct AgentActivityStats {
    pub total_actions: i64,
    pub total_tokens: i64,
    pub total_tool_calls: i64,
}

/// Persistence operations for the behavior stream.
pub trait BehaviorStore: Send + Sync {
    fn insert_behavior_event(&self, row: &BehaviorEventRow) -> Result<(), StorageError>;

    fn insert_communication(&self, row: &CommunicationRow) -> Result<(), StorageError>;

    /// Totals over the last `hours` of the persistent log.
    fn agent_activity_stats(
        &self,
        agent_id: &str,
        hours: i64,
    ) -> Result<AgentActivityStats, StorageError>;
}

// ─── Integrity ──────────────────────────────────────────────────────────────

/// A baseline snapshot row, unique by `file_path`.
#[derive(Debug, Clone)]
pub struct SnapshotRow {
    pub file_path: String,
    pub file_hash: String,
    pub file_size: i64,
    pub last_modified: String,
    pub agent_id: Option<String>,
    pub snapshot_at: String,
}

/// Persistence operations for integrity baselines.
pub trait IntegrityStore: Send + Sync {
    /// Insert or overwrite the baseline for a path.
    fn upsert_snapshot(&self, row: &SnapshotRow) -> Result<(), StorageError>;

    fn get_snapshot(&self, file_path: &str) -> Result<Option<SnapshotRow>, StorageError>;
}

// ─── Skills ─────────────────────────────────────────────────────────────────

/// A skill scan result row, unique by `(skill_name, skill_path)`.
#[derive(Debug, Clone)]
pub struct SkillScanRow {
    pub skill_name: String,
    pub skill_path: String,
    pub skill_hash: String,
    pub risk_score: i64,
    pub threats_json: String,
    pub scan_status: String,
    pub scanned_at: String,
}

/// A threat signature row loaded from the `threat_signatures` table.
#[derive(Debug, Clone)]
pub struct ThreatSignatureRow {
    pub signature_id: String,
    pub name: String,
    pub description: String,
    pub pattern: String,
    /// `regex` or `string`.
    pub pattern_type: String,
    pub severity: Severity,
}

/// Persistence operations for skill scans and their signature table.
pub trait SkillStore: Send + Sync {
    fn upsert_scan(&self, row: &SkillScanRow) -> Result<(), StorageError>;

    /// Scans at or above `min_risk`, highest risk first.
    fn query_high_risk_scans(&self, min_risk: i64) -> Result<Vec<SkillScanRow>, StorageError>;

    fn get_scan_by_hash(&self, skill_hash: &str) -> Result<Option<SkillScanRow>, StorageError>;

    fn load_threat_signatures(&self) -> Result<Vec<ThreatSignatureRow>, StorageError>;
}
