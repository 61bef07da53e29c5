//! The integrity checker.
//!
//! SHA-256 baselines for protected files. Verification reports
//! modification and deletion; a file seen without a baseline is
//! snapshotted on the spot.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use agentguard_core::config::IntegrityConfig;
use agentguard_core::time::{iso_utc, utc_now_iso};
use agentguard_core::traits::storage::{AlertRow, AlertStore, IntegrityStore, SnapshotRow};
use agentguard_core::types::alert::AlertCategory;
use agentguard_core::types::integrity::{IntegrityViolation, ViolationKind};
use agentguard_core::types::severity::Severity;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Critical per-agent files checked under `{workspace_base}/{agent_id}/`.
pub const CRITICAL_AGENT_FILES: [&str; 6] = [
    "SOUL.md",
    "IDENTITY.md",
    "BOOTSTRAP.md",
    "USER.md",
    "AGENTS.md",
    ".env",
];

/// Counts from a baseline initialization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaselineStats {
    pub created: usize,
    pub failed: usize,
}

/// Checks protected files against stored baselines.
pub struct IntegrityChecker {
    store: Arc<dyn IntegrityStore>,
    workspace_base: PathBuf,
    protected_paths: Vec<PathBuf>,
}

impl IntegrityChecker {
    pub fn new(store: Arc<dyn IntegrityStore>, config: &IntegrityConfig) -> Self {
        Self {
            store,
            workspace_base: config.workspace_base.clone(),
            protected_paths: config.protected_paths.clone(),
        }
    }

    /// SHA-256 of the file contents. I/O failure yields an empty hash and
    /// a log entry.
    pub fn compute_hash(&self, path: &Path) -> String {
        match std::fs::read(path) {
            Ok(bytes) => {
                let digest = Sha256::digest(&bytes);
                digest.iter().map(|b| format!("{b:02x}")).collect()
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to hash file");
                String::new()
            }
        }
    }

    /// Create or overwrite the baseline snapshot for a file.
    pub fn snapshot(&self, path: &Path, agent_id: Option<&str>) -> bool {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "file not found for snapshot");
            return false;
        }

        let file_hash = self.compute_hash(path);
        if file_hash.is_empty() {
            return false;
        }

        let (file_size, last_modified) = match std::fs::metadata(path) {
            Ok(meta) => {
                let mtime = meta
                    .modified()
                    .map(|t| iso_utc(DateTime::<Utc>::from(t)))
                    .unwrap_or_else(|_| utc_now_iso());
                (meta.len() as i64, mtime)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to stat file");
                return false;
            }
        };

        let row = SnapshotRow {
            file_path: path.to_string_lossy().to_string(),
            file_hash,
            file_size,
            last_modified,
            agent_id: agent_id.map(|s| s.to_string()),
            snapshot_at: utc_now_iso(),
        };

        match self.store.upsert_snapshot(&row) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "baseline snapshot created");
                true
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to store snapshot");
                false
            }
        }
    }

    /// Verify one file against its baseline.
    ///
    /// Missing file with a baseline: FILE_DELETED. Present file without a
    /// baseline: snapshot now, no violation. Hash mismatch: FILE_MODIFIED
    /// carrying both hashes and the baseline's owning agent.
    pub fn verify_file(&self, path: &Path) -> Option<IntegrityViolation> {
        let key = path.to_string_lossy().to_string();

        if !path.exists() {
            match self.store.get_snapshot(&key) {
                Ok(Some(baseline)) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| key.clone());
                    return Some(IntegrityViolation {
                        file_path: key,
                        expected_hash: baseline.file_hash,
                        actual_hash: String::new(),
                        kind: ViolationKind::FileDeleted,
                        agent_id: baseline.agent_id,
                        severity: Severity::High,
                        description: format!("Protected file was deleted: {name}"),
                    });
                }
                Ok(None) => return None,
                Err(e) => {
                    tracing::error!(path = %key, error = %e, "baseline lookup failed");
                    return None;
                }
            }
        }

        let current_hash = self.compute_hash(path);

        match self.store.get_snapshot(&key) {
            Ok(Some(baseline)) => {
                if baseline.file_hash != current_hash {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| key.clone());
                    return Some(IntegrityViolation {
                        file_path: key,
                        expected_hash: baseline.file_hash,
                        actual_hash: current_hash,
                        kind: ViolationKind::FileModified,
                        agent_id: baseline.agent_id,
                        severity: Severity::High,
                        description: format!("Protected file was modified: {name}"),
                    });
                }
                None
            }
            Ok(None) => {
                // First sighting: establish the baseline.
                self.snapshot(path, None);
                None
            }
            Err(e) => {
                tracing::error!(path = %key, error = %e, "baseline lookup failed");
                None
            }
        }
    }

    /// Verify every critical config file present for one agent.
    pub fn verify_agent_configs(&self, agent_id: &str) -> Vec<IntegrityViolation> {
        let mut violations = Vec::new();
        let agent_dir = self.workspace_base.join(agent_id);

        if !agent_dir.exists() {
            tracing::warn!(agent_id, dir = %agent_dir.display(), "agent directory not found");
            return violations;
        }

        for filename in CRITICAL_AGENT_FILES {
            let file_path = agent_dir.join(filename);
            if file_path.exists() {
                if let Some(violation) = self.verify_file(&file_path) {
                    violations.push(violation);
                }
            }
        }

        violations
    }

    /// Run all integrity checks for one agent.
    pub fn verify(&self, agent_id: &str) -> Vec<IntegrityViolation> {
        self.verify_agent_configs(agent_id)
    }

    /// Verify a file against an explicit expected hash. Returns the
    /// actual hash (or a diagnostic for missing files).
    pub fn hash_verification(&self, path: &Path, expected_hash: &str) -> (bool, String) {
        if !path.exists() {
            return (false, "File not found".to_string());
        }
        let actual = self.compute_hash(path);
        (actual == expected_hash, actual)
    }

    /// Snapshot every critical file for each agent, then every global
    /// protected path. Returns created/failed counts.
    pub fn initialize_baseline(&self, agent_ids: &[String]) -> BaselineStats {
        let mut stats = BaselineStats::default();

        for agent_id in agent_ids {
            let agent_dir = self.workspace_base.join(agent_id);
            if !agent_dir.exists() {
                continue;
            }

            for filename in CRITICAL_AGENT_FILES {
                let file_path = agent_dir.join(filename);
                if file_path.exists() {
                    if self.snapshot(&file_path, Some(agent_id)) {
                        stats.created += 1;
                    } else {
                        stats.failed += 1;
                    }
                }
            }
        }

        for path in &self.protected_paths {
            if path.exists() {
                if self.snapshot(path, None) {
                    stats.created += 1;
                } else {
                    stats.failed += 1;
                }
            }
        }

        tracing::info!(created = stats.created, failed = stats.failed, "baseline initialized");
        stats
    }

    /// Recent INTEGRITY alerts, read back from the alert store.
    pub fn violation_history(&self, alerts: &dyn AlertStore, hours: i64) -> Vec<AlertRow> {
        match alerts.query_alerts_by_category(AlertCategory::Integrity, hours) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, "failed to read violation history");
                Vec::new()
            }
        }
    }

}
