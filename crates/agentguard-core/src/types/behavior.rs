//! Behavior-stream types: events, anomaly reports, cross-agent messages.

use chrono::{DateTime, Utc};

use super::evidence::Evidence;
use super::severity::Severity;

/// A single timestamped agent action. Appended to the in-memory window and
/// the persistent log; never mutated.
#[derive(Debug, Clone)]
pub struct BehaviorEvent {
    pub agent_id: String,
    /// Free-text action kind (e.g. `CREDENTIAL_ACCESS`, `FILE_DELETE`).
    /// Kept open so policy tables can extend it without code changes.
    pub action_type: String,
    pub details: Evidence,
    pub timestamp: DateTime<Utc>,
    pub token_count: u32,
    pub tool_usage_count: u32,
}

/// An anomaly finding from the behavior monitor. Ephemeral: either
/// converted into an alert or discarded.
#[derive(Debug, Clone)]
pub struct AnomalyReport {
    pub agent_id: String,
    pub anomaly_type: String,
    pub severity: Severity,
    pub description: String,
    pub evidence: Evidence,
    /// Always within [0, 1].
    pub anomaly_score: f64,
}

/// A cross-agent message observed by the communication tap.
#[derive(Debug, Clone)]
pub struct AgentMessage {
    pub source: String,
    pub target: String,
    pub message_type: String,
    pub content_hash: String,
}
