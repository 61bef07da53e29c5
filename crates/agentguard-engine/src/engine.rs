//! The monitoring engine — a thin scheduler over the detection core.
//!
//! One tick at a time on a single worker: behavior and integrity checks
//! per agent, then the skill sweep, with findings routed through the
//! alert manager. The prompt-filter path is synchronous and bypasses the
//! scheduler. A component panic is caught and converted into a per-tick
//! no-op; the next tick retries from a clean state.

use std::collections::BTreeSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agentguard_analysis::behavior::BehaviorMonitor;
use agentguard_analysis::integrity::{BaselineStats, IntegrityChecker};
use agentguard_analysis::prompt::{FilterAction, PromptFilter};
use agentguard_analysis::skills::SkillScanner;
use agentguard_core::config::GuardConfig;
use agentguard_core::types::alert::AlertCategory;
use agentguard_core::types::evidence::{evidence_from, Evidence};
use agentguard_core::types::severity::Severity;
use agentguard_core::types::truncate_chars;
use agentguard_storage::GuardStorageEngine;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::alerts::manager::AlertManager;

/// Sleep quantum between stop-flag checks; the loop wakes within this
/// bound on shutdown.
const SLEEP_QUANTUM: Duration = Duration::from_secs(1);

/// Skill risk at or above this raises an alert.
const SKILL_ALERT_THRESHOLD: u32 = 70;
/// Skill risk at or above this raises a CRITICAL alert.
const SKILL_CRITICAL_THRESHOLD: u32 = 90;

/// Outcome of the synchronous prompt-filter path.
#[derive(Debug, Clone)]
pub struct PromptDecision {
    pub allowed: bool,
    /// The prompt to dispatch: sanitized when available, original otherwise.
    pub prompt: String,
    pub blocked: bool,
    pub risk_score: u32,
    pub matched_signatures: Vec<String>,
    /// Present when a block raised an alert.
    pub alert: Option<PromptAlertInfo>,
}

/// Summary of the alert raised for a blocked prompt.
#[derive(Debug, Clone)]
pub struct PromptAlertInfo {
    pub severity: Severity,
    pub matched_signature: Option<String>,
    pub action_taken: &'static str,
}

/// The main security monitoring engine.
pub struct GuardEngine {
    config: GuardConfig,
    alert_manager: AlertManager,
    behavior_monitor: BehaviorMonitor,
    skill_scanner: SkillScanner,
    integrity_checker: IntegrityChecker,
    prompt_filter: PromptFilter,
    cycle_count: AtomicU64,
}

impl GuardEngine {
    /// Wire every component to the shared storage engine.
    pub fn new(config: GuardConfig, storage: Arc<GuardStorageEngine>) -> Self {
        let alert_manager = AlertManager::new(storage.clone(), config.alerting.clone());
        let behavior_monitor =
            BehaviorMonitor::new(storage.clone(), config.behavior.clone());
        let skill_scanner = SkillScanner::new(storage.clone());
        let integrity_checker = IntegrityChecker::new(storage.clone(), &config.integrity);
        let prompt_filter = PromptFilter::new(&config.prompt_filtering);

        tracing::info!("monitoring engine initialized");
        Self {
            config,
            alert_manager,
            behavior_monitor,
            skill_scanner,
            integrity_checker,
            prompt_filter,
            cycle_count: AtomicU64::new(0),
        }
    }

    pub fn alert_manager(&self) -> &AlertManager {
        &self.alert_manager
    }

    pub fn behavior_monitor(&self) -> &BehaviorMonitor {
        &self.behavior_monitor
    }

    pub fn integrity_checker(&self) -> &IntegrityChecker {
        &self.integrity_checker
    }

    pub fn skill_scanner(&self) -> &SkillScanner {
        &self.skill_scanner
    }

    pub fn prompt_filter(&self) -> &PromptFilter {
        &self.prompt_filter
    }

    /// Screen a prompt before it reaches the LLM. Synchronous; bypasses
    /// the scheduler entirely. Blocked prompts raise a PROMPT_INJECTION
    /// alert.
    pub fn filter_prompt(
        &self,
        prompt: &str,
        agent_id: &str,
        context: Evidence,
    ) -> PromptDecision {
        if !self.config.monitoring.enable_prompt_filtering {
            return PromptDecision {
                allowed: true,
                prompt: prompt.to_string(),
                blocked: false,
                risk_score: 0,
                matched_signatures: Vec::new(),
                alert: None,
            };
        }

        let result = self
            .prompt_filter
            .scan_prompt(prompt, agent_id, context.clone());

        let mut decision = PromptDecision {
            allowed: result.action != FilterAction::Block,
            prompt: result
                .sanitized_prompt
                .clone()
                .unwrap_or_else(|| prompt.to_string()),
            blocked: result.is_blocked,
            risk_score: result.risk_score,
            matched_signatures: result.matched_signatures.clone(),
            alert: None,
        };

        if result.is_blocked {
            let severity = if result.risk_score >= 70 {
                Severity::Critical
            } else {
                Severity::High
            };
            let matched = result.matches.first();

            let prompt_hash: String = {
                let digest = Sha256::digest(prompt.as_bytes());
                let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
                hex[..16].to_string()
            };
            let excerpt = if prompt.chars().count() > 200 {
                format!("{}...", truncate_chars(prompt, 200))
            } else {
                prompt.to_string()
            };
            let mut categories: Vec<String> =
                result.matches.iter().map(|m| m.category.clone()).collect();
            categories.sort();
            categories.dedup();

            self.alert_manager.create_alert(
                severity,
                AlertCategory::PromptInjection,
                Some(agent_id.to_string()),
                format!(
                    "Blocked prompt injection attempt: {} (Risk Score: {})",
                    matched.map(|m| m.signature_name.as_str()).unwrap_or("Unknown"),
                    result.risk_score
                ),
                evidence_from(vec![
                    ("matched_signatures", json!(result.matched_signatures)),
                    (
                        "signature_names",
                        json!(result
                            .matches
                            .iter()
                            .map(|m| m.signature_name.clone())
                            .collect::<Vec<_>>()),
                    ),
                    ("categories", json!(categories)),
                    ("risk_score", json!(result.risk_score)),
                    ("prompt_excerpt", json!(excerpt)),
                    ("prompt_hash", json!(prompt_hash)),
                    ("context", serde_json::Value::Object(context)),
                    ("processing_time_ms", json!(result.processing_time_ms)),
                ]),
            );

            decision.alert = Some(PromptAlertInfo {
                severity,
                matched_signature: matched.map(|m| m.signature_id.clone()),
                action_taken: "BLOCKED",
            });

            tracing::error!(
                agent_id,
                risk_score = result.risk_score,
                signatures = ?result.matched_signatures,
                "prompt blocked"
            );
        } else if result.risk_score >= 30 {
            tracing::warn!(
                agent_id,
                risk_score = result.risk_score,
                action = result.action.as_str(),
                "prompt flagged"
            );
        }

        decision
    }

    /// Run behavior and integrity checks for one agent, routing findings
    /// through the alert manager.
    pub fn check_agent(&self, agent_id: &str) {
        tracing::debug!(agent_id, "checking agent");

        if self.config.monitoring.enable_behavior_monitoring {
            for anomaly in self.behavior_monitor.check(agent_id) {
                self.alert_manager.create_alert(
                    anomaly.severity,
                    AlertCategory::Behavior,
                    Some(agent_id.to_string()),
                    anomaly.description.clone(),
                    evidence_from(vec![
                        ("anomaly_type", json!(anomaly.anomaly_type)),
                        ("anomaly_score", json!(anomaly.anomaly_score)),
                        ("details", serde_json::Value::Object(anomaly.evidence)),
                    ]),
                );
            }
        }

        if self.config.monitoring.enable_integrity_checking {
            for violation in self.integrity_checker.verify(agent_id) {
                self.alert_manager.create_alert(
                    violation.severity,
                    AlertCategory::Integrity,
                    Some(agent_id.to_string()),
                    violation.description.clone(),
                    evidence_from(vec![
                        ("file_path", json!(violation.file_path)),
                        ("violation_type", json!(violation.kind.as_str())),
                        ("expected_hash", json!(violation.expected_hash)),
                        ("actual_hash", json!(violation.actual_hash)),
                    ]),
                );
            }
        }
    }

    /// Expand the configured scan globs to a deduplicated skill file list.
    pub fn installed_skills(&self) -> Vec<PathBuf> {
        let mut skills: BTreeSet<PathBuf> = BTreeSet::new();

        for pattern in &self.config.skill_scanning.scan_paths {
            let paths = match glob::glob(pattern) {
                Ok(paths) => paths,
                Err(e) => {
                    tracing::warn!(pattern, error = %e, "bad skill scan glob");
                    continue;
                }
            };
            for path in paths.flatten() {
                if path.is_dir() {
                    let nested = path.join("**/*.py");
                    if let Ok(files) = glob::glob(&nested.to_string_lossy()) {
                        for file in files.flatten() {
                            if file.is_file() {
                                skills.insert(file);
                            }
                        }
                    }
                } else if path.extension().is_some_and(|ext| ext == "py") {
                    skills.insert(path);
                }
            }
        }

        skills.into_iter().collect()
    }

    /// Scan every installed skill, alerting on high-risk results.
    pub fn scan_skills(&self) {
        if !self.config.monitoring.enable_skill_scanning {
            return;
        }

        let skills = self.installed_skills();
        tracing::info!(count = skills.len(), "scanning skills");

        for skill_path in skills {
            let result = self.skill_scanner.scan_file(&skill_path);
            if result.risk_score < SKILL_ALERT_THRESHOLD {
                continue;
            }

            let severity = if result.risk_score >= SKILL_CRITICAL_THRESHOLD {
                Severity::Critical
            } else {
                Severity::High
            };

            self.alert_manager.create_alert(
                severity,
                AlertCategory::Skill,
                None,
                format!(
                    "High-risk skill detected: {} (Risk Score: {})",
                    result.skill_name, result.risk_score
                ),
                evidence_from(vec![
                    ("skill_name", json!(result.skill_name)),
                    ("skill_path", json!(result.skill_path)),
                    ("risk_score", json!(result.risk_score)),
                    (
                        "threats",
                        json!(result
                            .threats
                            .iter()
                            .map(|t| {
                                json!({
                                    "name": t.name,
                                    "severity": t.severity.as_str(),
                                    "line": t.line_number,
                                })
                            })
                            .collect::<Vec<_>>()),
                    ),
                ]),
            );
        }
    }

    /// One monitoring cycle: Behavior → Integrity per agent, then Skill.
    pub fn run_cycle(&self) {
        let cycle = self.cycle_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(cycle, "monitoring cycle started");

        let agents = self.config.monitoring.agents.clone();
        for agent_id in &agents {
            let outcome = catch_unwind(AssertUnwindSafe(|| self.check_agent(agent_id)));
            if outcome.is_err() {
                tracing::error!(agent_id, "agent check panicked; skipping until next tick");
            }
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| self.scan_skills()));
        if outcome.is_err() {
            tracing::error!("skill scan panicked; skipping until next tick");
        }

        let stats = self.alert_manager.stats(1);
        tracing::info!(cycle, alerts_last_hour = stats.total, "cycle complete");
    }

    /// Create baseline snapshots for the configured agents.
    pub fn init_baselines(&self) -> BaselineStats {
        tracing::info!("initializing integrity baselines");
        self.integrity_checker
            .initialize_baseline(&self.config.monitoring.agents)
    }

    /// The main monitoring loop. Runs a cycle, then sleeps the configured
    /// interval in 1 s quanta; a message (or disconnect) on `stop` ends
    /// the loop at the next quantum boundary.
    pub fn start_monitoring(&self, stop: Receiver<()>) {
        tracing::info!(
            agents = ?self.config.monitoring.agents,
            interval_seconds = self.config.monitoring.interval_seconds,
            "security monitoring started"
        );

        let stats = self.init_baselines();
        tracing::info!(created = stats.created, "baseline snapshots created");

        loop {
            self.run_cycle();

            for _ in 0..self.config.monitoring.interval_seconds.max(1) {
                match stop.recv_timeout(SLEEP_QUANTUM) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        tracing::info!("monitoring engine stopped");
                        return;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                }
            }
        }
    }

    /// Run a single monitoring cycle and return.
    pub fn run_once(&self) {
        self.run_cycle();
    }

    /// Number of completed cycles.
    pub fn cycles(&self) -> u64 {
        self.cycle_count.load(Ordering::Relaxed)
    }
}
