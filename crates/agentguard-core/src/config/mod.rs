//! Engine configuration model.
//!
//! Loaded from a YAML file by the CLI; every section and key has a working
//! default so a partial file configures only what it names.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::severity::Severity;

/// Top-level configuration. Sections mirror the subsystems they configure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    pub monitoring: MonitoringConfig,
    pub behavior: BehaviorConfig,
    pub alerting: AlertingConfig,
    pub skill_scanning: SkillScanningConfig,
    pub integrity: IntegrityConfig,
    pub prompt_filtering: PromptFilteringConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Scheduler section: which agents to watch and which subsystems run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Agent ids under watch.
    pub agents: Vec<String>,
    /// Seconds between monitoring cycles.
    pub interval_seconds: u64,
    pub enable_behavior_monitoring: bool,
    pub enable_integrity_checking: bool,
    pub enable_skill_scanning: bool,
    pub enable_prompt_filtering: bool,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            agents: Vec::new(),
            interval_seconds: 30,
            enable_behavior_monitoring: true,
            enable_integrity_checking: true,
            enable_skill_scanning: true,
            enable_prompt_filtering: true,
        }
    }
}

/// Behavior monitor thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub max_tokens_per_hour: u64,
    pub max_tool_calls_per_minute: usize,
    /// Off-hours window `[start, end)` in local hours, wrapping midnight
    /// when `start > end`.
    pub off_hours_start: u32,
    pub off_hours_end: u32,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_hour: 100_000,
            max_tool_calls_per_minute: 60,
            off_hours_start: 23,
            off_hours_end: 6,
        }
    }
}

/// Alert manager sinks and dedup window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    pub enable_console_alerts: bool,
    pub enable_database_alerts: bool,
    pub enable_discord_alerts: bool,
    pub alert_cooldown_seconds: u64,
    pub discord_webhook: String,
    /// Minimum severity forwarded to the webhook sink.
    pub min_severity: Severity,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            enable_console_alerts: true,
            enable_database_alerts: true,
            enable_discord_alerts: false,
            alert_cooldown_seconds: 300,
            discord_webhook: String::new(),
            min_severity: Severity::Medium,
        }
    }
}

/// Skill scanner section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillScanningConfig {
    /// Glob patterns expanded to skill files each cycle.
    pub scan_paths: Vec<String>,
}

/// Integrity checker section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityConfig {
    /// Directory holding one subdirectory per agent.
    pub workspace_base: PathBuf,
    /// Global protected files snapshotted at baseline init.
    pub protected_paths: Vec<PathBuf>,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            workspace_base: PathBuf::from("workspace/agents"),
            protected_paths: Vec::new(),
        }
    }
}

/// Prompt filter section. The `Option` fields override the signature file's
/// own `detection_config` when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptFilteringConfig {
    /// Capacity of the in-memory injection attempt ring.
    pub max_log_size: usize,
    /// Path to the signature JSON; the built-in corpus is used when unset.
    pub signatures_path: Option<PathBuf>,
    pub min_match_confidence: Option<f64>,
    pub blocked_categories: Option<Vec<String>>,
    pub max_prompt_length: Option<usize>,
    pub enable_entropy_analysis: Option<bool>,
    pub entropy_threshold: Option<f64>,
}

impl Default for PromptFilteringConfig {
    fn default() -> Self {
        Self {
            max_log_size: 1000,
            signatures_path: None,
            min_match_confidence: None,
            blocked_categories: None,
            max_prompt_length: None,
            enable_entropy_analysis: None,
            entropy_threshold: None,
        }
    }
}

/// Persistent store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("agentguard.db"),
        }
    }
}

/// Logging bootstrap hints consumed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
