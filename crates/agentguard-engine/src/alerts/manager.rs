//! The alert manager — central ingest for every producer.
//!
//! Deduplicates via a cooldown map keyed on category/agent/description,
//! then fans out to the enabled sinks: console log, persistent store, and
//! webhook. A suppressed alert is still returned to the caller but is
//! neither persisted nor fanned out.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use agentguard_core::config::AlertingConfig;
use agentguard_core::time::utc_now_iso;
use agentguard_core::traits::storage::{AlertRow, AlertStats, AlertStore, NewAlertRow};
use agentguard_core::types::alert::{Alert, AlertCategory};
use agentguard_core::types::evidence::{self, Evidence};
use agentguard_core::types::severity::Severity;
use rustc_hash::FxHashMap;

use super::webhook::WebhookNotifier;

/// Manages security alerts and notifications.
pub struct AlertManager {
    store: Arc<dyn AlertStore>,
    config: AlertingConfig,
    webhook: WebhookNotifier,
    cooldowns: Mutex<FxHashMap<String, Instant>>,
}

impl AlertManager {
    pub fn new(store: Arc<dyn AlertStore>, config: AlertingConfig) -> Self {
        let webhook =
            WebhookNotifier::new(config.discord_webhook.clone(), config.min_severity);
        Self {
            store,
            config,
            webhook,
            cooldowns: Mutex::new(FxHashMap::default()),
        }
    }

    /// Create and process a new alert. Within the cooldown window for the
    /// same dedup key, the alert is returned unpersisted.
    pub fn create_alert(
        &self,
        severity: Severity,
        category: AlertCategory,
        agent_id: Option<String>,
        description: impl Into<String>,
        evidence: Evidence,
    ) -> Alert {
        let mut alert = Alert::new(severity, category, agent_id, description, evidence);

        if self.is_on_cooldown(&alert) {
            tracing::debug!(
                key = %alert.dedup_key(),
                "alert suppressed by cooldown"
            );
            return alert;
        }

        if self.config.enable_console_alerts {
            self.log_to_console(&alert);
        }

        if self.config.enable_database_alerts {
            let row = NewAlertRow {
                severity: alert.severity,
                category: alert.category,
                agent_id: alert.agent_id.clone(),
                description: alert.description.clone(),
                evidence_json: evidence::to_json(&alert.evidence),
                timestamp: agentguard_core::time::iso_utc(alert.timestamp),
            };
            match self.store.insert_alert(&row) {
                Ok(id) => alert.id = Some(id),
                Err(e) => {
                    tracing::error!(error = %e, "failed to persist alert");
                }
            }
        }

        if self.config.enable_discord_alerts {
            self.webhook.send(&alert);
        }

        self.record_cooldown(&alert);
        alert
    }

    fn is_on_cooldown(&self, alert: &Alert) -> bool {
        let window = Duration::from_secs(self.config.alert_cooldown_seconds);
        let Ok(cooldowns) = self.cooldowns.lock() else {
            return false;
        };
        match cooldowns.get(&alert.dedup_key()) {
            Some(last) => last.elapsed() < window,
            None => false,
        }
    }

    fn record_cooldown(&self, alert: &Alert) {
        if let Ok(mut cooldowns) = self.cooldowns.lock() {
            cooldowns.insert(alert.dedup_key(), Instant::now());
        }
    }

    fn log_to_console(&self, alert: &Alert) {
        let evidence = if alert.evidence.is_empty() {
            String::new()
        } else {
            format!(
                "\nEvidence: {}",
                serde_json::to_string_pretty(&alert.evidence)
                    .unwrap_or_else(|_| "{}".to_string())
            )
        };
        let block = format!(
            "AGENTGUARD ALERT [{severity}]\nCategory: {category}\nAgent: {agent}\n\n{description}{evidence}",
            severity = alert.severity,
            category = alert.category,
            agent = alert.agent_id.as_deref().unwrap_or("N/A"),
            description = alert.description,
        );

        match alert.severity {
            Severity::Critical | Severity::High => tracing::error!("{block}"),
            Severity::Medium => tracing::warn!("{block}"),
            Severity::Low => tracing::info!("{block}"),
        }
    }

    /// Recent alerts, newest first, optionally filtered.
    pub fn recent(
        &self,
        hours: i64,
        severity: Option<Severity>,
        agent_id: Option<&str>,
    ) -> Vec<AlertRow> {
        match self.store.query_recent_alerts(hours, severity, agent_id) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(error = %e, "failed to retrieve alerts");
                Vec::new()
            }
        }
    }

    /// Mark an alert resolved with a note.
    pub fn resolve(&self, alert_id: i64, notes: &str) -> bool {
        match self.store.resolve_alert(alert_id, &utc_now_iso(), notes) {
            Ok(true) => {
                tracing::info!(alert_id, "alert resolved");
                true
            }
            Ok(false) => false,
            Err(e) => {
                tracing::error!(alert_id, error = %e, "failed to resolve alert");
                false
            }
        }
    }

    /// Totals grouped by severity and category for the window.
    pub fn stats(&self, hours: i64) -> AlertStats {
        match self.store.alert_stats(hours) {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!(error = %e, "failed to get alert stats");
                AlertStats::default()
            }
        }
    }

    /// Configured cooldown window in seconds.
    pub fn cooldown_seconds(&self) -> u64 {
        self.config.alert_cooldown_seconds
    }
}
