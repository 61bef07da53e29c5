//! # agentguard-core
//!
//! Foundation crate for the AgentGuard security monitoring engine.
//! Defines the alert/event/violation types, severity model, errors,
//! configuration, and storage trait seams. Every other crate in the
//! workspace depends on this.

pub mod config;
pub mod errors;
pub mod time;
pub mod traits;
pub mod types;

// Re-export the most commonly used types at the crate root.
pub use config::GuardConfig;
pub use errors::{ConfigError, StorageError};
pub use types::alert::{Alert, AlertCategory};
pub use types::behavior::{AgentMessage, AnomalyReport, BehaviorEvent};
pub use types::evidence::Evidence;
pub use types::integrity::{IntegrityViolation, ViolationKind};
pub use types::severity::Severity;
