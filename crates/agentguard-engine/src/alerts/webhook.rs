//! Webhook notification sink (Discord-style embed payload).
//!
//! Best-effort: timeouts, non-204 responses, and transport errors are
//! logged and swallowed; a send never aborts the producer.

use std::time::Duration;

use agentguard_core::types::alert::Alert;
use agentguard_core::types::severity::Severity;
use agentguard_core::types::truncate_chars;
use serde_json::{json, Value};

/// Webhook request timeout.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);
/// Evidence blocks are truncated to this many characters in the embed.
const MAX_EVIDENCE_CHARS: usize = 1000;

/// Embed accent color per severity.
fn severity_color(severity: Severity) -> u32 {
    match severity {
        Severity::Low => 0x3498db,
        Severity::Medium => 0xf1c40f,
        Severity::High => 0xe67e22,
        Severity::Critical => 0xe74c3c,
    }
}

/// Build the embed document for one alert.
pub fn build_embed(alert: &Alert) -> Value {
    let mut fields = vec![json!({
        "name": "Category",
        "value": alert.category.as_str(),
        "inline": true,
    })];

    if let Some(agent_id) = &alert.agent_id {
        fields.push(json!({
            "name": "Agent",
            "value": agent_id,
            "inline": true,
        }));
    }

    if !alert.evidence.is_empty() {
        let pretty = serde_json::to_string_pretty(&alert.evidence)
            .unwrap_or_else(|_| "{}".to_string());
        let truncated = truncate_chars(&pretty, MAX_EVIDENCE_CHARS);
        fields.push(json!({
            "name": "Evidence",
            "value": format!("```json\n{truncated}\n```"),
            "inline": false,
        }));
    }

    json!({
        "title": format!("AgentGuard Alert: {}", alert.severity),
        "description": alert.description,
        "color": severity_color(alert.severity),
        "timestamp": agentguard_core::time::iso_utc(alert.timestamp),
        "fields": fields,
        "footer": { "text": "AgentGuard Security Monitoring" },
    })
}

/// Posts alert embeds to a configured webhook URL.
pub struct WebhookNotifier {
    client: Option<reqwest::blocking::Client>,
    url: String,
    min_severity: Severity,
}

impl WebhookNotifier {
    pub fn new(url: String, min_severity: Severity) -> Self {
        let client = match reqwest::blocking::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
        {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::error!(error = %e, "failed to build webhook client");
                None
            }
        };
        Self {
            client,
            url,
            min_severity,
        }
    }

    /// Send one alert. Returns true only on a 204 response.
    pub fn send(&self, alert: &Alert) -> bool {
        if self.url.is_empty() {
            tracing::warn!("webhook not configured");
            return false;
        }
        if alert.severity.rank() < self.min_severity.rank() {
            return false;
        }
        let Some(client) = &self.client else {
            return false;
        };

        let payload = json!({ "embeds": [build_embed(alert)] });

        match client.post(&self.url).json(&payload).send() {
            Ok(response) if response.status().as_u16() == 204 => {
                tracing::info!(
                    description = truncate_chars(&alert.description, 50),
                    "alert sent to webhook"
                );
                true
            }
            Ok(response) => {
                tracing::error!(status = %response.status(), "webhook delivery failed");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "webhook send error");
                false
            }
        }
    }
}
