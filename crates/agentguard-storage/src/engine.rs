//! `GuardStorageEngine` — unified storage engine implementing the
//! `agentguard-core` storage traits.
//!
//! Wraps `DatabaseManager`. All reads go through `with_reader()`, all
//! writes through `with_writer()`. This is the single owner of the
//! connection — no code outside this crate touches a raw `&Connection`.

use std::path::Path;

use agentguard_core::errors::StorageError;
use agentguard_core::traits::storage::{
    AgentActivityStats, AlertRow, AlertStats, AlertStore, BehaviorEventRow, BehaviorStore,
    CommunicationRow, IntegrityStore, NewAlertRow, SkillScanRow, SkillStore, SnapshotRow,
    ThreatSignatureRow,
};
use agentguard_core::types::alert::AlertCategory;
use agentguard_core::types::severity::Severity;

use crate::connection::DatabaseManager;
use crate::queries;

/// The unified AgentGuard storage engine.
pub struct GuardStorageEngine {
    db: DatabaseManager,
}

impl GuardStorageEngine {
    /// Open a file-backed storage engine at the given path.
    /// Runs migrations and applies pragmas.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let db = DatabaseManager::open(path)?;
        Ok(Self { db })
    }

    /// Open an in-memory storage engine (for testing).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let db = DatabaseManager::open_in_memory()?;
        Ok(Self { db })
    }

    /// Database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.db.path()
    }

    /// Raw read access — for operations not yet covered by a trait method.
    /// Prefer trait methods where possible.
    pub fn with_reader<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, StorageError>,
    {
        self.db.with_reader(f)
    }

    /// Raw write access — for operations not yet covered by a trait method.
    /// Prefer trait methods where possible.
    pub fn with_writer<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T, StorageError>,
    {
        self.db.with_writer(f)
    }

    /// Seed a threat signature row (bootstrap and tests).
    pub fn insert_threat_signature(&self, row: &ThreatSignatureRow) -> Result<(), StorageError> {
        self.db.with_writer(|conn| queries::signatures::insert(conn, row))
    }
}

impl AlertStore for GuardStorageEngine {
    fn insert_alert(&self, row: &NewAlertRow) -> Result<i64, StorageError> {
        self.db.with_writer(|conn| queries::alerts::insert(conn, row))
    }

    fn query_recent_alerts(
        &self,
        hours: i64,
        severity: Option<Severity>,
        agent_id: Option<&str>,
    ) -> Result<Vec<AlertRow>, StorageError> {
        self.db
            .with_reader(|conn| queries::alerts::query_recent(conn, hours, severity, agent_id))
    }

    fn query_alerts_by_category(
        &self,
        category: AlertCategory,
        hours: i64,
    ) -> Result<Vec<AlertRow>, StorageError> {
        self.db
            .with_reader(|conn| queries::alerts::query_by_category(conn, category, hours))
    }

    fn resolve_alert(
        &self,
        id: i64,
        resolved_at: &str,
        notes: &str,
    ) -> Result<bool, StorageError> {
        self.db
            .with_writer(|conn| queries::alerts::resolve(conn, id, resolved_at, notes))
    }

    fn alert_stats(&self, hours: i64) -> Result<AlertStats, StorageError> {
        self.db.with_reader(|conn| queries::alerts::stats(conn, hours))
    }
}

impl BehaviorStore for GuardStorageEngine {
    fn insert_behavior_event(&self, row: &BehaviorEventRow) -> Result<(), StorageError> {
        self.db.with_writer(|conn| queries::behavior::insert(conn, row))
    }

    fn insert_communication(&self, row: &CommunicationRow) -> Result<(), StorageError> {
        self.db
            .with_writer(|conn| queries::communications::insert(conn, row))
    }

    fn agent_activity_stats(
        &self,
        agent_id: &str,
        hours: i64,
    ) -> Result<AgentActivityStats, StorageError> {
        self.db
            .with_reader(|conn| queries::behavior::activity_stats(conn, agent_id, hours))
    }
}

impl IntegrityStore for GuardStorageEngine {
    fn upsert_snapshot(&self, row: &SnapshotRow) -> Result<(), StorageError> {
        self.db.with_writer(|conn| queries::integrity::upsert(conn, row))
    }

    fn get_snapshot(&self, file_path: &str) -> Result<Option<SnapshotRow>, StorageError> {
        self.db
            .with_reader(|conn| queries::integrity::get(conn, file_path))
    }
}

impl SkillStore for GuardStorageEngine {
    fn upsert_scan(&self, row: &SkillScanRow) -> Result<(), StorageError> {
        self.db.with_writer(|conn| queries::skill_scans::upsert(conn, row))
    }

    fn query_high_risk_scans(&self, min_risk: i64) -> Result<Vec<SkillScanRow>, StorageError> {
        self.db
            .with_reader(|conn| queries::skill_scans::query_high_risk(conn, min_risk))
    }

    fn get_scan_by_hash(&self, skill_hash: &str) -> Result<Option<SkillScanRow>, StorageError> {
        self.db
            .with_reader(|conn| queries::skill_scans::get_by_hash(conn, skill_hash))
    }

    fn load_threat_signatures(&self) -> Result<Vec<ThreatSignatureRow>, StorageError> {
        self.db.with_reader(queries::signatures::load_all)
    }
}
