//! The prompt filter engine.
//!
//! Deterministic pipeline per prompt: normalize, match every signature,
//! aggregate a 0-100 risk score, pick an action, optionally sanitize, and
//! record CRITICAL/HIGH attempts in a bounded in-memory ring.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Instant;

use agentguard_core::config::PromptFilteringConfig;
use agentguard_core::types::evidence::Evidence;
use agentguard_core::types::severity::Severity;
use agentguard_core::types::truncate_chars;
use chrono::{DateTime, Duration, Utc};
use regex::RegexBuilder;
use rustc_hash::FxHashSet;
use sha2::{Digest, Sha256};

use super::entropy::shannon_entropy;
use super::normalize::{normalize_text, strip_zero_width};
use super::signatures::{DetectionMode, SignatureSet};

/// What to do with a scanned prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    Allow,
    Block,
    Sanitize,
    Flag,
}

impl FilterAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterAction::Allow => "allow",
            FilterAction::Block => "block",
            FilterAction::Sanitize => "sanitize",
            FilterAction::Flag => "flag",
        }
    }
}

/// One signature hit inside a prompt.
#[derive(Debug, Clone)]
pub struct SignatureMatch {
    pub signature_id: String,
    pub signature_name: String,
    pub category: String,
    pub severity: Severity,
    pub matched_pattern: String,
    /// Matched text, truncated to 100 characters.
    pub matched_text: String,
    pub position: usize,
    pub confidence: f64,
}

/// The outcome of scanning one prompt.
#[derive(Debug, Clone)]
pub struct FilterResult {
    pub action: FilterAction,
    pub original_prompt: String,
    /// Absent exactly when the prompt is blocked.
    pub sanitized_prompt: Option<String>,
    pub is_blocked: bool,
    pub is_sanitized: bool,
    pub matches: Vec<SignatureMatch>,
    /// Always within 0..=100.
    pub risk_score: u32,
    pub matched_signatures: Vec<String>,
    pub processing_time_ms: f64,
    pub metadata: Evidence,
}

/// A recorded injection attempt in the bounded ring.
#[derive(Debug, Clone)]
pub struct InjectionAttempt {
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub signature_id: String,
    pub severity: Severity,
    pub prompt_excerpt: String,
    /// First 16 hex chars of the prompt's SHA-256.
    pub prompt_hash: String,
    pub context: Evidence,
}

/// Aggregate filter statistics.
#[derive(Debug, Clone)]
pub struct FilterStats {
    pub signatures_loaded: usize,
    pub attempts_logged: usize,
    pub categories: Vec<String>,
    pub severity_distribution: Vec<(Severity, usize)>,
}

/// Fixed short-list patterns used by `quick_scan`.
const QUICK_PATTERNS: [&str; 3] = [
    r"ignore\s+(all\s+)?(previous\s+)?instructions",
    r"\[\s*SYSTEM\s*",
    r"you\s+are\s+now\s+(DAN|unfiltered)",
];

/// The pre-LLM prompt security filter.
pub struct PromptFilter {
    set: SignatureSet,
    quick_patterns: Vec<regex::Regex>,
    max_log_size: usize,
    injection_log: Mutex<VecDeque<InjectionAttempt>>,
}

impl PromptFilter {
    /// Build a filter from the prompt-filtering configuration.
    pub fn new(cfg: &PromptFilteringConfig) -> Self {
        Self::with_signature_set(SignatureSet::from_config(cfg), cfg.max_log_size)
    }

    /// Build a filter around an explicit signature set.
    pub fn with_signature_set(set: SignatureSet, max_log_size: usize) -> Self {
        let quick_patterns = QUICK_PATTERNS
            .iter()
            .filter_map(|p| {
                RegexBuilder::new(p).case_insensitive(true).build().ok()
            })
            .collect();

        Self {
            set,
            quick_patterns,
            max_log_size,
            injection_log: Mutex::new(VecDeque::new()),
        }
    }

    /// Scan a prompt and decide its fate.
    pub fn scan_prompt(&self, prompt: &str, agent_id: &str, context: Evidence) -> FilterResult {
        let start = Instant::now();

        let normalized = normalize_text(prompt);
        let mut matches = Vec::new();
        for compiled in &self.set.signatures {
            self.check_signature(compiled, prompt, &normalized, &mut matches);
        }

        let risk_score = self.calculate_risk_score(&matches);
        let (action, sanitized) = self.determine_action(prompt, &matches, risk_score);

        for m in &matches {
            if m.severity >= Severity::High {
                self.log_injection_attempt(agent_id, m, prompt, &context);
            }
        }

        let processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        let mut metadata = Evidence::new();
        metadata.insert("agent_id".to_string(), agent_id.into());
        metadata.insert("context".to_string(), serde_json::Value::Object(context));
        metadata.insert("signature_count".to_string(), self.set.len().into());
        metadata.insert(
            "timestamp".to_string(),
            agentguard_core::time::utc_now_iso().into(),
        );

        FilterResult {
            is_blocked: action == FilterAction::Block,
            is_sanitized: action == FilterAction::Sanitize,
            matched_signatures: matches.iter().map(|m| m.signature_id.clone()).collect(),
            action,
            original_prompt: prompt.to_string(),
            sanitized_prompt: sanitized,
            matches,
            risk_score,
            processing_time_ms,
            metadata,
        }
    }

    /// Evaluate one compiled signature against the appropriate text.
    fn check_signature(
        &self,
        compiled: &super::signatures::CompiledSignature,
        original: &str,
        normalized: &str,
        out: &mut Vec<SignatureMatch>,
    ) {
        let sig = &compiled.signature;
        let text = match sig.detection_mode {
            DetectionMode::UnicodeNormalization => normalized,
            _ => original,
        };

        for (pattern_src, re) in &compiled.regexes {
            for m in re.find_iter(text) {
                let confidence = self.calculate_confidence(m.as_str(), compiled);
                if confidence < self.set.config.min_match_confidence {
                    continue;
                }
                out.push(SignatureMatch {
                    signature_id: sig.id.clone(),
                    signature_name: sig.name.clone(),
                    category: sig.category.clone(),
                    severity: sig.severity,
                    matched_pattern: pattern_src.clone(),
                    matched_text: truncate_chars(m.as_str(), 100).to_string(),
                    position: m.start(),
                    confidence,
                });
            }
        }
    }

    /// Confidence heuristic: base 0.90, +0.05 when the match is at least
    /// as long as the signature's mean pattern, +0.05 on prefix equality
    /// with the signature's example.
    fn calculate_confidence(
        &self,
        matched: &str,
        compiled: &super::signatures::CompiledSignature,
    ) -> f64 {
        let mut confidence: f64 = 0.90;

        let match_len = matched.chars().count();
        if match_len as f64 >= compiled.mean_pattern_len {
            confidence += 0.05;
        }

        let example = &compiled.signature.example;
        if !example.is_empty() {
            let matched_lower = matched.to_lowercase();
            let example_prefix: String =
                example.to_lowercase().chars().take(match_len).collect();
            if matched_lower == example_prefix {
                confidence += 0.05;
            }
        }

        confidence.min(1.0)
    }

    /// Aggregate risk score: severity weight per match, +10 for each new
    /// category, +50 per CRITICAL match, saturated at 100.
    fn calculate_risk_score(&self, matches: &[SignatureMatch]) -> u32 {
        if matches.is_empty() {
            return 0;
        }

        let mut score: u32 = 0;
        let mut seen_categories: FxHashSet<&str> = FxHashSet::default();

        for m in matches {
            score += self.set.weights.weight(m.severity);
            if seen_categories.insert(m.category.as_str()) {
                score += 10;
            }
            if m.severity == Severity::Critical {
                score += 50;
            }
        }

        score.min(100)
    }

    /// The action ladder. Blocked prompts never carry a sanitized form.
    fn determine_action(
        &self,
        prompt: &str,
        matches: &[SignatureMatch],
        risk_score: u32,
    ) -> (FilterAction, Option<String>) {
        if matches.iter().any(|m| m.severity == Severity::Critical) {
            return (FilterAction::Block, None);
        }

        let blocked = &self.set.config.blocked_categories;
        if matches.iter().any(|m| blocked.contains(&m.category)) {
            return (FilterAction::Block, None);
        }

        if risk_score >= 70 {
            return (FilterAction::Block, None);
        }

        if risk_score >= 30 {
            let sanitized = self.sanitize_prompt(prompt, matches);
            return (FilterAction::Sanitize, Some(sanitized));
        }

        if risk_score > 0 {
            return (FilterAction::Flag, Some(prompt.to_string()));
        }

        (FilterAction::Allow, Some(prompt.to_string()))
    }

    /// Sanitize a prompt: strip zero-width characters, normalize, and
    /// replace matched texts longer than 5 characters with `[FILTERED]`,
    /// iterating to a fixed point within the configured depth. Matches are
    /// processed in descending-position order so earlier offsets stay valid.
    pub fn sanitize_prompt(&self, prompt: &str, matches: &[SignatureMatch]) -> String {
        let rules = &self.set.config.sanitization_rules;
        let mut sanitized = prompt.to_string();

        let mut ordered: Vec<&SignatureMatch> = matches.iter().collect();
        ordered.sort_by(|a, b| b.position.cmp(&a.position));

        for _ in 0..rules.max_replacement_depth {
            let prev = sanitized.clone();

            if rules.remove_zero_width {
                sanitized = strip_zero_width(&sanitized);
            }
            if rules.normalize_unicode {
                sanitized = normalize_text(&sanitized);
            }
            for m in &ordered {
                if m.matched_text.chars().count() > 5 {
                    sanitized = sanitized.replacen(&m.matched_text, "[FILTERED]", 1);
                }
            }

            if sanitized == prev {
                break;
            }
        }

        sanitized
    }

    /// Record a CRITICAL/HIGH match in the bounded ring.
    fn log_injection_attempt(
        &self,
        agent_id: &str,
        m: &SignatureMatch,
        prompt: &str,
        context: &Evidence,
    ) {
        let prompt_hash = {
            let digest = Sha256::digest(prompt.as_bytes());
            let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
            hex[..16].to_string()
        };

        let excerpt = if prompt.chars().count() > 200 {
            format!("{}...", truncate_chars(prompt, 200))
        } else {
            prompt.to_string()
        };

        let attempt = InjectionAttempt {
            timestamp: Utc::now(),
            agent_id: agent_id.to_string(),
            signature_id: m.signature_id.clone(),
            severity: m.severity,
            prompt_excerpt: excerpt,
            prompt_hash,
            context: context.clone(),
        };

        if let Ok(mut log) = self.injection_log.lock() {
            log.push_back(attempt);
            while log.len() > self.max_log_size {
                log.pop_front();
            }
        }

        tracing::warn!(
            signature_id = %m.signature_id,
            severity = %m.severity,
            agent_id,
            category = %m.category,
            pattern = truncate_chars(&m.matched_pattern, 50),
            "injection attempt detected"
        );
    }

    /// Recent injection attempts, filtered by window and optional agent.
    pub fn injection_history(
        &self,
        agent_id: Option<&str>,
        hours: i64,
    ) -> Vec<InjectionAttempt> {
        let cutoff = Utc::now() - Duration::hours(hours);
        let log = match self.injection_log.lock() {
            Ok(log) => log,
            Err(_) => return Vec::new(),
        };
        log.iter()
            .filter(|a| a.timestamp >= cutoff)
            .filter(|a| agent_id.map_or(true, |id| a.agent_id == id))
            .cloned()
            .collect()
    }

    /// Aggregate filter statistics.
    pub fn stats(&self) -> FilterStats {
        let mut categories: Vec<String> = self
            .set
            .signatures
            .iter()
            .map(|c| c.signature.category.clone())
            .collect();
        categories.sort();
        categories.dedup();

        let severity_distribution = [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
        ]
        .into_iter()
        .map(|sev| {
            let count = self
                .set
                .signatures
                .iter()
                .filter(|c| c.signature.severity == sev)
                .count();
            (sev, count)
        })
        .collect();

        FilterStats {
            signatures_loaded: self.set.len(),
            attempts_logged: self.injection_log.lock().map(|l| l.len()).unwrap_or(0),
            categories,
            severity_distribution,
        }
    }

    /// Shannon entropy of `text` — exposed for obfuscation heuristics.
    pub fn check_entropy(&self, text: &str) -> f64 {
        shannon_entropy(text)
    }

    /// Cheap pre-check: true when the text looks safe, false when it is
    /// oversized, high-entropy, or hits an obvious injection pattern.
    pub fn quick_scan(&self, text: &str) -> bool {
        if text.chars().count() > self.set.config.max_prompt_length {
            return false;
        }

        if self.set.config.enable_entropy_analysis
            && shannon_entropy(text) > self.set.config.entropy_threshold
        {
            return false;
        }

        !self.quick_patterns.iter().any(|re| re.is_match(text))
    }
}
