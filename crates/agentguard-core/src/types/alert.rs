//! Alert model — the convergence type every detector produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::evidence::Evidence;
use super::severity::Severity;
use super::truncate_chars;

/// Closed set of alert categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertCategory {
    #[serde(rename = "BEHAVIOR")]
    Behavior,
    #[serde(rename = "SKILL")]
    Skill,
    #[serde(rename = "INTEGRITY")]
    Integrity,
    #[serde(rename = "COMMUNICATION")]
    Communication,
    #[serde(rename = "PROMPT_INJECTION")]
    PromptInjection,
}

impl AlertCategory {
    /// Canonical upper-case string form, as persisted.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertCategory::Behavior => "BEHAVIOR",
            AlertCategory::Skill => "SKILL",
            AlertCategory::Integrity => "INTEGRITY",
            AlertCategory::Communication => "COMMUNICATION",
            AlertCategory::PromptInjection => "PROMPT_INJECTION",
        }
    }

    /// Parse the canonical string form.
    pub fn parse(s: &str) -> Option<AlertCategory> {
        match s {
            "BEHAVIOR" => Some(AlertCategory::Behavior),
            "SKILL" => Some(AlertCategory::Skill),
            "INTEGRITY" => Some(AlertCategory::Integrity),
            "COMMUNICATION" => Some(AlertCategory::Communication),
            "PROMPT_INJECTION" => Some(AlertCategory::PromptInjection),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlertCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A security alert. `id` is assigned on the first successful insert.
#[derive(Debug, Clone)]
pub struct Alert {
    pub id: Option<i64>,
    pub severity: Severity,
    pub category: AlertCategory,
    pub agent_id: Option<String>,
    pub description: String,
    pub evidence: Evidence,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
}

impl Alert {
    /// Create an unresolved alert stamped with the current time.
    pub fn new(
        severity: Severity,
        category: AlertCategory,
        agent_id: Option<String>,
        description: impl Into<String>,
        evidence: Evidence,
    ) -> Self {
        Self {
            id: None,
            severity,
            category,
            agent_id,
            description: description.into(),
            evidence,
            timestamp: Utc::now(),
            resolved: false,
        }
    }

    /// Cooldown deduplication key: category, agent, and the first 50
    /// characters of the description.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.category,
            self.agent_id.as_deref().unwrap_or("-"),
            truncate_chars(&self.description, 50)
        )
    }
}
