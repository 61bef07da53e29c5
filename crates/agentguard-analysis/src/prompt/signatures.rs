//! Prompt-injection signature corpus: JSON schema, loading, and one-time
//! regex compilation.
//!
//! The built-in corpus ships with the crate; a configured path overrides
//! it. An unreadable file falls back to an empty set (the engine still
//! starts), and an invalid pattern disables only itself.

use std::path::Path;

use agentguard_core::config::PromptFilteringConfig;
use agentguard_core::types::severity::Severity;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

/// Built-in signature corpus, compiled into the binary.
const BUILTIN_SIGNATURES: &str = include_str!("../../data/prompt_injection_signatures.json");

/// How a signature's patterns are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMode {
    /// Case-insensitive match against the original prompt.
    #[default]
    CaseInsensitive,
    /// Match against the homoglyph-folded, NFKC-normalized prompt.
    UnicodeNormalization,
    /// Case-sensitive match against the raw prompt (e.g. zero-width scans).
    BinaryScan,
}

/// One signature from the corpus.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptSignature {
    pub id: String,
    pub name: String,
    pub category: String,
    pub severity: Severity,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub detection_mode: DetectionMode,
    #[serde(default)]
    pub example: String,
}

/// Sanitization knobs from the corpus file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SanitizationRules {
    pub remove_zero_width: bool,
    pub normalize_unicode: bool,
    pub max_replacement_depth: usize,
}

impl Default for SanitizationRules {
    fn default() -> Self {
        Self {
            remove_zero_width: true,
            normalize_unicode: true,
            max_replacement_depth: 3,
        }
    }
}

/// Detection thresholds from the corpus file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub min_match_confidence: f64,
    pub blocked_categories: Vec<String>,
    pub max_prompt_length: usize,
    pub enable_entropy_analysis: bool,
    pub entropy_threshold: f64,
    pub sanitization_rules: SanitizationRules,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_match_confidence: 0.85,
            blocked_categories: vec!["GLOSSOPETRAE".to_string()],
            max_prompt_length: 100_000,
            enable_entropy_analysis: true,
            entropy_threshold: 4.5,
            sanitization_rules: SanitizationRules::default(),
        }
    }
}

/// Per-severity risk score weights.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeverityWeights {
    #[serde(rename = "CRITICAL")]
    pub critical: u32,
    #[serde(rename = "HIGH")]
    pub high: u32,
    #[serde(rename = "MEDIUM")]
    pub medium: u32,
    #[serde(rename = "LOW")]
    pub low: u32,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            critical: 100,
            high: 50,
            medium: 20,
            low: 5,
        }
    }
}

impl SeverityWeights {
    pub fn weight(&self, severity: Severity) -> u32 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }
}

/// The signature file as deserialized.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SignatureFile {
    pub signatures: Vec<PromptSignature>,
    pub detection_config: DetectionConfig,
    pub severity_weights: SeverityWeights,
}

/// A signature with its patterns compiled.
#[derive(Debug)]
pub struct CompiledSignature {
    pub signature: PromptSignature,
    /// `(source pattern, compiled regex)` pairs; invalid patterns are
    /// dropped at compile time.
    pub regexes: Vec<(String, Regex)>,
    /// Mean source-pattern length, used by the confidence heuristic.
    pub mean_pattern_len: f64,
}

/// The compiled, process-wide read-only signature registry.
#[derive(Debug)]
pub struct SignatureSet {
    pub signatures: Vec<CompiledSignature>,
    pub config: DetectionConfig,
    pub weights: SeverityWeights,
}

impl SignatureSet {
    /// Compile the built-in corpus.
    pub fn builtin() -> Self {
        match serde_json::from_str::<SignatureFile>(BUILTIN_SIGNATURES) {
            Ok(file) => Self::compile(file),
            Err(e) => {
                tracing::error!(error = %e, "built-in signature corpus failed to parse");
                Self::compile(SignatureFile::default())
            }
        }
    }

    /// Load and compile a corpus from disk. Unreadable or malformed files
    /// yield an empty set so the engine still starts.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "cannot read signature file");
                return Self::compile(SignatureFile::default());
            }
        };
        match serde_json::from_str::<SignatureFile>(&text) {
            Ok(file) => Self::compile(file),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "malformed signature file");
                Self::compile(SignatureFile::default())
            }
        }
    }

    /// Load per the prompt-filtering config: explicit path wins, built-in
    /// corpus otherwise; `detection_config` overrides applied on top.
    pub fn from_config(cfg: &PromptFilteringConfig) -> Self {
        let mut set = match &cfg.signatures_path {
            Some(path) => Self::load(path),
            None => Self::builtin(),
        };
        if let Some(v) = cfg.min_match_confidence {
            set.config.min_match_confidence = v;
        }
        if let Some(v) = &cfg.blocked_categories {
            set.config.blocked_categories = v.clone();
        }
        if let Some(v) = cfg.max_prompt_length {
            set.config.max_prompt_length = v;
        }
        if let Some(v) = cfg.enable_entropy_analysis {
            set.config.enable_entropy_analysis = v;
        }
        if let Some(v) = cfg.entropy_threshold {
            set.config.entropy_threshold = v;
        }
        set
    }

    /// Compile every pattern once. Multiline and dot-all are always on;
    /// case-insensitivity only for `case_insensitive` signatures.
    fn compile(file: SignatureFile) -> Self {
        let mut compiled = Vec::with_capacity(file.signatures.len());
        for sig in file.signatures {
            let mut regexes = Vec::with_capacity(sig.patterns.len());
            for pattern in &sig.patterns {
                let built = RegexBuilder::new(pattern)
                    .multi_line(true)
                    .dot_matches_new_line(true)
                    .case_insensitive(sig.detection_mode == DetectionMode::CaseInsensitive)
                    .build();
                match built {
                    Ok(re) => regexes.push((pattern.clone(), re)),
                    Err(e) => {
                        tracing::warn!(
                            signature_id = %sig.id,
                            pattern,
                            error = %e,
                            "invalid signature pattern skipped"
                        );
                    }
                }
            }

            let mean_pattern_len = if sig.patterns.is_empty() {
                0.0
            } else {
                sig.patterns.iter().map(|p| p.chars().count()).sum::<usize>() as f64
                    / sig.patterns.len() as f64
            };

            compiled.push(CompiledSignature {
                signature: sig,
                regexes,
                mean_pattern_len,
            });
        }

        tracing::info!(signatures = compiled.len(), "signature corpus compiled");
        Self {
            signatures: compiled,
            config: file.detection_config,
            weights: file.severity_weights,
        }
    }

    /// Number of signatures in the set.
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}
