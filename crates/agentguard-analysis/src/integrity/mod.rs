//! File integrity checking against content-hash baselines.

pub mod checker;

pub use checker::{BaselineStats, IntegrityChecker, CRITICAL_AGENT_FILES};
