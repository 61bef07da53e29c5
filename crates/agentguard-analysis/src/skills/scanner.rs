//! The skill scanner: static evaluation of source artifacts.
//!
//! Produces a bounded 0-100 risk score from the built-in risk categories
//! plus matches against the threat signature table, and upserts the
//! result into the scan store.

use std::path::Path;
use std::sync::Arc;

use agentguard_core::time::utc_now_iso;
use agentguard_core::traits::storage::{SkillScanRow, SkillStore, ThreatSignatureRow};
use agentguard_core::types::severity::Severity;
use agentguard_core::types::truncate_chars;
use regex::RegexBuilder;
use rustc_hash::FxHashSet;
use serde_json::json;
use sha2::{Digest, Sha256};

use super::risk_patterns::CompiledRiskMatcher;

/// One threat-signature hit inside a skill file.
#[derive(Debug, Clone)]
pub struct ThreatMatch {
    pub signature_id: String,
    pub name: String,
    pub description: String,
    pub pattern: String,
    pub severity: Severity,
    /// 1-based line number.
    pub line_number: usize,
    /// Matched text, truncated to 100 characters.
    pub matched_text: String,
}

/// Whether the file could be read and scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    Scanned,
    Error,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Scanned => "scanned",
            ScanStatus::Error => "error",
        }
    }
}

/// The outcome of scanning one skill file.
#[derive(Debug, Clone)]
pub struct SkillScanResult {
    pub skill_name: String,
    pub skill_path: String,
    /// SHA-256 of the file contents; empty on read failure.
    pub skill_hash: String,
    /// Always within 0..=100.
    pub risk_score: u32,
    pub threats: Vec<ThreatMatch>,
    pub status: ScanStatus,
    pub scanned_at: String,
}

enum CompiledThreatPattern {
    Regex(regex::Regex),
    /// Lowercased needle for case-insensitive substring search.
    Substring(String),
}

struct CompiledThreatSignature {
    row: ThreatSignatureRow,
    pattern: CompiledThreatPattern,
}

/// Scans skill files for malicious patterns.
pub struct SkillScanner {
    store: Arc<dyn SkillStore>,
    signatures: Vec<CompiledThreatSignature>,
    risk_matcher: CompiledRiskMatcher,
}

impl SkillScanner {
    /// Build a scanner, loading and compiling the threat signature table.
    /// A load failure leaves the table empty; the scanner still runs the
    /// built-in risk categories.
    pub fn new(store: Arc<dyn SkillStore>) -> Self {
        let rows = match store.load_threat_signatures() {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, "failed to load threat signatures");
                Vec::new()
            }
        };

        let mut signatures = Vec::with_capacity(rows.len());
        for row in rows {
            let pattern = if row.pattern_type == "regex" {
                match RegexBuilder::new(&row.pattern).case_insensitive(true).build() {
                    Ok(re) => CompiledThreatPattern::Regex(re),
                    Err(e) => {
                        tracing::warn!(
                            signature_id = %row.signature_id,
                            error = %e,
                            "invalid threat signature pattern skipped"
                        );
                        continue;
                    }
                }
            } else {
                CompiledThreatPattern::Substring(row.pattern.to_lowercase())
            };
            signatures.push(CompiledThreatSignature { row, pattern });
        }

        tracing::info!(signatures = signatures.len(), "skill scanner initialized");
        Self {
            store,
            signatures,
            risk_matcher: CompiledRiskMatcher::new(),
        }
    }

    /// Scan a single skill file. Read failures yield an `error` result
    /// with an empty hash; the result is persisted only on success.
    pub fn scan_file(&self, path: &Path) -> SkillScanResult {
        let skill_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let skill_path = path.to_string_lossy().to_string();

        tracing::debug!(skill = %skill_name, "scanning skill");

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(skill = %skill_name, error = %e, "failed to read skill file");
                return SkillScanResult {
                    skill_name,
                    skill_path,
                    skill_hash: String::new(),
                    risk_score: 0,
                    threats: Vec::new(),
                    status: ScanStatus::Error,
                    scanned_at: utc_now_iso(),
                };
            }
        };

        let content = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = content.split('\n').collect();

        let skill_hash = {
            let digest = Sha256::digest(content.as_bytes());
            digest.iter().map(|b| format!("{b:02x}")).collect()
        };

        let threats = self.check_threat_signatures(&lines);
        let risk_score = self.generate_risk_score(&lines, &threats);

        let result = SkillScanResult {
            skill_name,
            skill_path,
            skill_hash,
            risk_score,
            threats,
            status: ScanStatus::Scanned,
            scanned_at: utc_now_iso(),
        };

        self.store_result(&result);
        result
    }

    /// Per-line evaluation of the threat signature table: one match per
    /// signature per line.
    fn check_threat_signatures(&self, lines: &[&str]) -> Vec<ThreatMatch> {
        let mut threats = Vec::new();

        for sig in &self.signatures {
            for (idx, line) in lines.iter().enumerate() {
                let matched_text = match &sig.pattern {
                    CompiledThreatPattern::Regex(re) => {
                        re.find(line).map(|m| m.as_str().to_string())
                    }
                    CompiledThreatPattern::Substring(needle) => {
                        if line.to_lowercase().contains(needle) {
                            Some(sig.row.pattern.clone())
                        } else {
                            None
                        }
                    }
                };

                if let Some(text) = matched_text {
                    threats.push(ThreatMatch {
                        signature_id: sig.row.signature_id.clone(),
                        name: sig.row.name.clone(),
                        description: sig.row.description.clone(),
                        pattern: sig.row.pattern.clone(),
                        severity: sig.row.severity,
                        line_number: idx + 1,
                        matched_text: truncate_chars(&text, 100).to_string(),
                    });
                }
            }
        }

        threats
    }

    /// Risk score: weighted category hits (capped at 5 per category),
    /// a multi-category bonus, and severity addenda per threat match.
    /// Saturated at 100.
    pub fn generate_risk_score(&self, lines: &[&str], threats: &[ThreatMatch]) -> u32 {
        let mut score = 0.0f64;
        let mut found: FxHashSet<&str> = FxHashSet::default();

        for hits in self.risk_matcher.category_hits(lines) {
            found.insert(hits.name);
            let capped = hits.hits.min(5) as f64;
            score += hits.weight * capped / 5.0;
        }

        if found.len() >= 3 {
            score += 15.0;
        } else if found.len() >= 2 {
            score += 10.0;
        }

        for threat in threats {
            score += match threat.severity {
                Severity::Critical => 20.0,
                Severity::High => 15.0,
                Severity::Medium => 10.0,
                Severity::Low => 5.0,
            };
        }

        (score as u32).min(100)
    }

    fn store_result(&self, result: &SkillScanResult) {
        let threats_json = serde_json::to_string(
            &result
                .threats
                .iter()
                .map(|t| {
                    json!({
                        "signature_id": t.signature_id,
                        "name": t.name,
                        "severity": t.severity.as_str(),
                        "line_number": t.line_number,
                        "matched_text": t.matched_text,
                    })
                })
                .collect::<Vec<_>>(),
        )
        .unwrap_or_else(|_| "[]".to_string());

        let row = SkillScanRow {
            skill_name: result.skill_name.clone(),
            skill_path: result.skill_path.clone(),
            skill_hash: result.skill_hash.clone(),
            risk_score: result.risk_score as i64,
            threats_json,
            scan_status: result.status.as_str().to_string(),
            scanned_at: result.scanned_at.clone(),
        };

        if let Err(e) = self.store.upsert_scan(&row) {
            tracing::error!(skill = %result.skill_name, error = %e, "failed to store scan result");
        }
    }

    /// Scan every `.py` file under a directory.
    pub fn scan_directory(&self, directory: &Path, recursive: bool) -> Vec<SkillScanResult> {
        if !directory.is_dir() {
            tracing::warn!(directory = %directory.display(), "scan directory not found");
            return Vec::new();
        }

        let pattern = if recursive { "**/*.py" } else { "*.py" };
        let full = directory.join(pattern);
        let mut results = Vec::new();

        match glob::glob(&full.to_string_lossy()) {
            Ok(paths) => {
                for path in paths.flatten() {
                    if path.is_file() {
                        results.push(self.scan_file(&path));
                    }
                }
            }
            Err(e) => {
                tracing::error!(directory = %directory.display(), error = %e, "bad scan glob");
            }
        }

        tracing::info!(
            count = results.len(),
            directory = %directory.display(),
            "directory scan complete"
        );
        results
    }

    /// Persisted scans at or above `min_risk`, highest first.
    pub fn high_risk_skills(&self, min_risk: u32) -> Vec<SkillScanRow> {
        match self.store.query_high_risk_scans(min_risk as i64) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, "failed to query high-risk skills");
                Vec::new()
            }
        }
    }

    /// Look up a known scan by content hash.
    pub fn check_skill_hash(&self, skill_hash: &str) -> Option<SkillScanRow> {
        match self.store.get_scan_by_hash(skill_hash) {
            Ok(row) => row,
            Err(e) => {
                tracing::error!(error = %e, "failed to check skill hash");
                None
            }
        }
    }

    /// Move a skill into quarantine: copy to `{dir}/{stem}_quarantined.py`
    /// then delete the original. Returns false on any failure, without
    /// partial rollback.
    pub fn quarantine(&self, skill_path: &Path, quarantine_dir: &Path) -> bool {
        let attempt = || -> std::io::Result<std::path::PathBuf> {
            std::fs::create_dir_all(quarantine_dir)?;
            let stem = skill_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "skill".to_string());
            let dest = quarantine_dir.join(format!("{stem}_quarantined.py"));

            let content = std::fs::read(skill_path)?;
            std::fs::write(&dest, content)?;
            std::fs::remove_file(skill_path)?;
            Ok(dest)
        };

        match attempt() {
            Ok(dest) => {
                tracing::warn!(
                    from = %skill_path.display(),
                    to = %dest.display(),
                    "skill quarantined"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    skill = %skill_path.display(),
                    error = %e,
                    "failed to quarantine skill"
                );
                false
            }
        }
    }
}
