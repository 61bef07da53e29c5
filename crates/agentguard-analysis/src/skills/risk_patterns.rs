//! Built-in risk categories for skill scanning.
//!
//! Six weighted categories of suspicious constructs. Hits are counted per
//! `(line, pattern)` pair, capped at 5 per category, and scaled by the
//! category weight.

use regex::{Regex, RegexBuilder};

/// A weighted risk category with its pattern list.
#[derive(Debug)]
pub struct RiskCategory {
    pub name: &'static str,
    pub weight: f64,
    pub patterns: &'static [&'static str],
}

/// Built-in risk categories.
pub static RISK_CATEGORIES: &[RiskCategory] = &[
    RiskCategory {
        name: "credential_access",
        weight: 25.0,
        patterns: &[
            r"os\.environ\[",
            r"os\.getenv\s*\(",
            r"environ\[",
            r"getenv\s*\(",
            r"load_dotenv",
            r"env::var",
            r"\.env\b",
        ],
    },
    RiskCategory {
        name: "network_activity",
        weight: 20.0,
        patterns: &[
            r"requests\.(get|post|put|delete|patch)",
            r"urllib\.request",
            r"socket\.(socket|connect)",
            r"http\.client",
            r"httpx\.",
            r"aiohttp",
            r"fetch\s*\(",
        ],
    },
    RiskCategory {
        name: "code_execution",
        weight: 30.0,
        patterns: &[
            r"os\.system\s*\(",
            r"subprocess\.(run|call|Popen)",
            r"exec\s*\(",
            r"eval\s*\(",
            r"compile\s*\(",
            r"__import__\s*\(",
            r"importlib",
            r"ctypes\.",
        ],
    },
    RiskCategory {
        name: "file_escape",
        weight: 20.0,
        patterns: &[
            r"\.\./",
            r"\.\.\\",
            r"/etc/passwd",
            r"/root/",
            r"/home/",
            r"C:\\Windows",
            r"/\.ssh",
            r"~/\.ssh",
        ],
    },
    RiskCategory {
        name: "obfuscation",
        weight: 15.0,
        patterns: &[
            r"base64\.(b64decode|decode)",
            r"binascii\.(unhexlify|a2b)",
            r"zlib\.(decompress|unpack)",
            r#"decode\s*\(\s*['"]rot13"#,
            r"chr\s*\(\s*\d+\s*\)",
            r"\\x[0-9a-fA-F]{2}",
            r"\\u[0-9a-fA-F]{4}",
        ],
    },
    RiskCategory {
        name: "data_collection",
        weight: 10.0,
        patterns: &[
            r"pyperclip",
            r"clipboard",
            r"pasteboard",
            r"pyautogui\.screenshot",
            r"ImageGrab",
            r"\bmss\b",
            r"pynput",
            r"keyboard\.(listen|read)",
        ],
    },
];

/// Per-category hit counts for one file.
#[derive(Debug, Clone)]
pub struct CategoryHits {
    pub name: &'static str,
    pub weight: f64,
    pub hits: usize,
}

/// Pre-compiled risk matcher — compiles every category pattern once.
pub struct CompiledRiskMatcher {
    compiled: Vec<(&'static RiskCategory, Vec<Regex>)>,
}

impl Default for CompiledRiskMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CompiledRiskMatcher {
    /// Compile all category patterns once. Call once, reuse across files.
    pub fn new() -> Self {
        let compiled = RISK_CATEGORIES
            .iter()
            .map(|category| {
                let regexes = category
                    .patterns
                    .iter()
                    .filter_map(|p| {
                        RegexBuilder::new(p).case_insensitive(true).build().ok()
                    })
                    .collect();
                (category, regexes)
            })
            .collect();
        Self { compiled }
    }

    /// Count `(line, pattern)` hits per category. Categories with zero
    /// hits are omitted.
    pub fn category_hits(&self, lines: &[&str]) -> Vec<CategoryHits> {
        let mut result = Vec::new();
        for (category, regexes) in &self.compiled {
            let mut hits = 0usize;
            for re in regexes {
                for line in lines {
                    if re.is_match(line) {
                        hits += 1;
                    }
                }
            }
            if hits > 0 {
                result.push(CategoryHits {
                    name: category.name,
                    weight: category.weight,
                    hits,
                });
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_source_has_no_hits() {
        let matcher = CompiledRiskMatcher::new();
        let lines = ["def add(a, b):", "    return a + b"];
        assert!(matcher.category_hits(&lines).is_empty());
    }

    #[test]
    fn categories_count_line_pattern_pairs() {
        let matcher = CompiledRiskMatcher::new();
        let lines = [
            "import os",
            "key = os.getenv('API_KEY')",
            "other = os.environ['SECRET']",
            "requests.post(url, data=payload)",
        ];
        let hits = matcher.category_hits(&lines);
        // `os.getenv(` and `os.environ[` each hit two overlapping patterns.
        let creds = hits.iter().find(|h| h.name == "credential_access").unwrap();
        assert_eq!(creds.hits, 4);
        let net = hits.iter().find(|h| h.name == "network_activity").unwrap();
        assert_eq!(net.hits, 1);
    }
}
