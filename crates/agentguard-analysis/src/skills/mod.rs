//! Static skill scanning — pattern analysis over source artifacts.

pub mod risk_patterns;
pub mod scanner;

pub use scanner::{ScanStatus, SkillScanResult, SkillScanner, ThreatMatch};
