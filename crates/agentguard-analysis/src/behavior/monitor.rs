//! The behavior monitor.
//!
//! Ingests per-agent timestamped action events into bounded in-memory
//! windows, persists them, and runs five detectors plus a cross-agent
//! collusion pass. All window pruning uses the monotonic clock; wall time
//! only stamps persisted rows and evidence.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use agentguard_core::config::BehaviorConfig;
use agentguard_core::time::iso_utc;
use agentguard_core::traits::storage::{
    AgentActivityStats, BehaviorEventRow, BehaviorStore, CommunicationRow,
};
use agentguard_core::types::behavior::{AgentMessage, AnomalyReport, BehaviorEvent};
use agentguard_core::types::evidence::{self, Evidence};
use agentguard_core::types::severity::Severity;
use chrono::{Local, Timelike, Utc};
use rustc_hash::FxHashMap;
use serde_json::json;
use std::collections::BTreeMap;

/// Fixed policy table: suspicious action kind, anomaly weight, description.
const SUSPICIOUS_ACTIONS: &[(&str, f64, &str)] = &[
    ("CREDENTIAL_ACCESS", 0.80, "Access to credentials/secrets"),
    ("FILE_ESCAPE", 0.90, "File access outside workspace"),
    ("NETWORK_CALL", 0.70, "Network activity detected"),
    ("CODE_EXECUTION", 0.95, "Code execution attempted"),
    ("MASS_DELETION", 0.85, "Mass file deletion detected"),
    ("OFF_HOURS_ACTIVITY", 0.40, "Activity during off-hours"),
    ("EXCESSIVE_TOKENS", 0.60, "Unusually high token usage"),
    ("RAPID_TOOL_CALLS", 0.70, "Rapid successive tool calls"),
    ("CROSS_AGENT_MESSAGE", 0.50, "Communication with other agents"),
];

/// Event window horizon.
const EVENT_WINDOW: Duration = Duration::from_secs(3600);
/// Tool-call window horizon.
const TOOL_WINDOW: Duration = Duration::from_secs(60);
/// Hard cap on retained events per agent; the 1-hour horizon does the
/// real bounding, this stops a runaway burst from growing memory.
const MAX_WINDOW_EVENTS: usize = 10_000;
/// Off-hours detector only fires above this many events in the window.
const OFF_HOURS_EVENT_THRESHOLD: usize = 5;
/// Mass-deletion detector only fires above this many delete events.
const MASS_DELETION_THRESHOLD: usize = 10;

fn lookup_suspicious(action_type: &str) -> Option<(f64, &'static str)> {
    SUSPICIOUS_ACTIONS
        .iter()
        .find(|(kind, _, _)| *kind == action_type)
        .map(|&(_, weight, description)| (weight, description))
}

struct TimedEvent {
    at: Instant,
    event: BehaviorEvent,
}

#[derive(Default)]
struct AgentWindow {
    events: VecDeque<TimedEvent>,
    token_samples: VecDeque<(Instant, u32)>,
    tool_calls: VecDeque<Instant>,
}

impl AgentWindow {
    fn prune_events(&mut self) {
        while let Some(front) = self.events.front() {
            if front.at.elapsed() > EVENT_WINDOW {
                self.events.pop_front();
            } else {
                break;
            }
        }
        while self.events.len() > MAX_WINDOW_EVENTS {
            self.events.pop_front();
        }
    }

    fn prune_tokens(&mut self) {
        while let Some(&(at, _)) = self.token_samples.front() {
            if at.elapsed() > EVENT_WINDOW {
                self.token_samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn prune_tools(&mut self) {
        while let Some(&at) = self.tool_calls.front() {
            if at.elapsed() > TOOL_WINDOW {
                self.tool_calls.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Monitors agent action streams for security anomalies.
pub struct BehaviorMonitor {
    store: Arc<dyn BehaviorStore>,
    config: BehaviorConfig,
    windows: Mutex<FxHashMap<String, AgentWindow>>,
}

impl BehaviorMonitor {
    pub fn new(store: Arc<dyn BehaviorStore>, config: BehaviorConfig) -> Self {
        Self {
            store,
            config,
            windows: Mutex::new(FxHashMap::default()),
        }
    }

    /// Ingest one agent action: append to the in-memory windows and the
    /// persistent log. Persistence failures are logged and swallowed —
    /// the in-memory window stays authoritative.
    pub fn log_action(
        &self,
        agent_id: &str,
        action_type: &str,
        details: Evidence,
        token_count: u32,
        tool_usage_count: u32,
    ) {
        let now = Instant::now();
        let event = BehaviorEvent {
            agent_id: agent_id.to_string(),
            action_type: action_type.to_string(),
            details,
            timestamp: Utc::now(),
            token_count,
            tool_usage_count,
        };

        if let Ok(mut windows) = self.windows.lock() {
            let window = windows.entry(agent_id.to_string()).or_default();
            window.events.push_back(TimedEvent {
                at: now,
                event: event.clone(),
            });
            window.prune_events();

            if token_count > 0 {
                window.token_samples.push_back((now, token_count));
            }
            for _ in 0..tool_usage_count {
                window.tool_calls.push_back(now);
            }
        }

        let row = BehaviorEventRow {
            agent_id: event.agent_id.clone(),
            action_type: event.action_type.clone(),
            details_json: evidence::to_json(&event.details),
            token_count: event.token_count as i64,
            tool_usage_count: event.tool_usage_count as i64,
            logged_at: iso_utc(event.timestamp),
        };
        if let Err(e) = self.store.insert_behavior_event(&row) {
            tracing::error!(agent_id, error = %e, "failed to persist behavior event");
        }

        tracing::debug!(agent_id, action_type, "action logged");
    }

    /// Run every behavior detector for one agent.
    pub fn check(&self, agent_id: &str) -> Vec<AnomalyReport> {
        let mut anomalies = self.detect_anomalous_patterns(agent_id);
        if let Some(report) = self.check_token_usage_anomaly(agent_id) {
            anomalies.push(report);
        }
        if let Some(report) = self.check_tool_usage_anomaly(agent_id) {
            anomalies.push(report);
        }
        anomalies
    }

    /// Detector 1-3: suspicious action kinds, off-hours bursts, and mass
    /// deletions within the event window.
    pub fn detect_anomalous_patterns(&self, agent_id: &str) -> Vec<AnomalyReport> {
        let mut anomalies = Vec::new();
        let Ok(mut windows) = self.windows.lock() else {
            return anomalies;
        };
        let Some(window) = windows.get_mut(agent_id) else {
            return anomalies;
        };
        window.prune_events();

        for timed in &window.events {
            let event = &timed.event;
            if let Some((weight, description)) = lookup_suspicious(&event.action_type) {
                anomalies.push(AnomalyReport {
                    agent_id: agent_id.to_string(),
                    anomaly_type: event.action_type.clone(),
                    severity: Severity::from_anomaly_score(weight),
                    description: description.to_string(),
                    evidence: evidence::evidence_from(vec![
                        (
                            "action_details",
                            serde_json::Value::Object(event.details.clone()),
                        ),
                        ("timestamp", iso_utc(event.timestamp).into()),
                    ]),
                    anomaly_score: weight,
                });
            }
        }

        let recent_count = window.events.len();
        if self.is_off_hours() && recent_count > OFF_HOURS_EVENT_THRESHOLD {
            let score = 0.4 + (recent_count.min(20) as f64) / 50.0;
            anomalies.push(AnomalyReport {
                agent_id: agent_id.to_string(),
                anomaly_type: "OFF_HOURS_ACTIVITY".to_string(),
                severity: Severity::from_anomaly_score(score),
                description: format!("{recent_count} actions during off-hours"),
                evidence: evidence::evidence_from(vec![
                    ("action_count", json!(recent_count)),
                    ("hour", json!(Local::now().hour())),
                ]),
                anomaly_score: score,
            });
        }

        let delete_count = window
            .events
            .iter()
            .filter(|t| t.event.action_type.to_lowercase().contains("delete"))
            .count();
        if delete_count > MASS_DELETION_THRESHOLD {
            anomalies.push(AnomalyReport {
                agent_id: agent_id.to_string(),
                anomaly_type: "MASS_DELETION".to_string(),
                severity: Severity::High,
                description: format!("{delete_count} deletion actions detected"),
                evidence: evidence::evidence_from(vec![("deletion_count", json!(delete_count))]),
                anomaly_score: 0.85,
            });
        }

        anomalies
    }

    /// Detector 4: token spend over the last hour against the configured
    /// ceiling. Prunes stale samples as a side effect.
    pub fn check_token_usage_anomaly(&self, agent_id: &str) -> Option<AnomalyReport> {
        let threshold = self.config.max_tokens_per_hour;
        let recent_tokens: u64 = {
            let mut windows = self.windows.lock().ok()?;
            let window = windows.get_mut(agent_id)?;
            window.prune_tokens();
            window.token_samples.iter().map(|&(_, c)| c as u64).sum()
        };

        if recent_tokens <= threshold {
            return None;
        }

        let score = (recent_tokens as f64 / threshold as f64).min(2.0) / 2.0;
        Some(AnomalyReport {
            agent_id: agent_id.to_string(),
            anomaly_type: "EXCESSIVE_TOKENS".to_string(),
            severity: Severity::from_anomaly_score(score),
            description: format!("Token usage {recent_tokens} exceeds threshold {threshold}"),
            evidence: evidence::evidence_from(vec![
                ("tokens_used", json!(recent_tokens)),
                ("threshold", json!(threshold)),
                ("time_window", json!("1 hour")),
            ]),
            anomaly_score: score,
        })
    }

    /// Detector 5: tool-call rate over the last minute against the
    /// configured ceiling. Prunes stale timestamps as a side effect.
    pub fn check_tool_usage_anomaly(&self, agent_id: &str) -> Option<AnomalyReport> {
        let threshold = self.config.max_tool_calls_per_minute;
        let recent_calls = {
            let mut windows = self.windows.lock().ok()?;
            let window = windows.get_mut(agent_id)?;
            window.prune_tools();
            window.tool_calls.len()
        };

        if recent_calls <= threshold {
            return None;
        }

        let score = (recent_calls as f64 / threshold as f64).min(2.0) / 2.0;
        Some(AnomalyReport {
            agent_id: agent_id.to_string(),
            anomaly_type: "RAPID_TOOL_CALLS".to_string(),
            severity: Severity::from_anomaly_score(score),
            description: format!(
                "{recent_calls} tool calls in 1 minute exceeds threshold {threshold}"
            ),
            evidence: evidence::evidence_from(vec![
                ("tool_calls", json!(recent_calls)),
                ("threshold", json!(threshold)),
                ("time_window", json!("1 minute")),
            ]),
            anomaly_score: score,
        })
    }

    /// Cross-agent collusion pass over one batch of observed messages.
    /// Every message is persisted to the communication log.
    pub fn detect_collusion(&self, messages: &[AgentMessage]) -> Vec<AnomalyReport> {
        let mut anomalies = Vec::new();

        for msg in messages {
            let row = CommunicationRow {
                source_agent: msg.source.clone(),
                target_agent: msg.target.clone(),
                message_type: msg.message_type.clone(),
                content_hash: msg.content_hash.clone(),
            };
            if let Err(e) = self.store.insert_communication(&row) {
                tracing::error!(error = %e, "failed to log communication");
            }
        }

        // High-frequency pairs, unordered.
        let mut pairs: BTreeMap<(String, String), usize> = BTreeMap::new();
        for msg in messages {
            let pair = if msg.source <= msg.target {
                (msg.source.clone(), msg.target.clone())
            } else {
                (msg.target.clone(), msg.source.clone())
            };
            *pairs.entry(pair).or_insert(0) += 1;
        }

        for ((a, b), count) in &pairs {
            if *count > 20 {
                let score = 0.6 + (*count as f64 / 100.0).min(0.4);
                anomalies.push(AnomalyReport {
                    agent_id: format!("{a}->{b}"),
                    anomaly_type: "CROSS_AGENT_COLLUSION".to_string(),
                    severity: Severity::High,
                    description: format!("High-frequency communication: {count} messages"),
                    evidence: evidence::evidence_from(vec![
                        ("message_count", json!(count)),
                        ("agents", json!([a, b])),
                    ]),
                    anomaly_score: score,
                });
            }
        }

        // Identical payloads repeated across the batch.
        let mut content_hashes: BTreeMap<&str, usize> = BTreeMap::new();
        for msg in messages {
            if !msg.content_hash.is_empty() {
                *content_hashes.entry(msg.content_hash.as_str()).or_insert(0) += 1;
            }
        }

        for (hash, count) in &content_hashes {
            if *count > 5 {
                anomalies.push(AnomalyReport {
                    agent_id: "multiple".to_string(),
                    anomaly_type: "SUSPICIOUS_COORDINATION".to_string(),
                    severity: Severity::High,
                    description: format!("Identical message content sent {count} times"),
                    evidence: evidence::evidence_from(vec![
                        ("duplicate_count", json!(count)),
                        ("content_hash", json!(hash)),
                    ]),
                    anomaly_score: 0.70,
                });
            }
        }

        anomalies
    }

    /// Aggregate persisted activity for one agent.
    pub fn agent_stats(&self, agent_id: &str, hours: i64) -> AgentActivityStats {
        match self.store.agent_activity_stats(agent_id, hours) {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(agent_id, error = %e, "failed to read agent stats");
                AgentActivityStats::default()
            }
        }
    }

    fn is_off_hours(&self) -> bool {
        is_off_hours_at(
            Local::now().hour(),
            self.config.off_hours_start,
            self.config.off_hours_end,
        )
    }
}

/// `[start, end)` in local hours, wrapping midnight when `start > end`.
fn is_off_hours_at(hour: u32, start: u32, end: u32) -> bool {
    if start > end {
        hour >= start || hour < end
    } else {
        start <= hour && hour < end
    }
}
