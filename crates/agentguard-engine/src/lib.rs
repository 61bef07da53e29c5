//! # agentguard-engine
//!
//! The convergence layer: the alert manager (dedup, persistence, fan-out)
//! and the monitoring engine that drives the detection components on a
//! periodic tick.

pub mod alerts;
pub mod engine;

pub use alerts::manager::AlertManager;
pub use engine::{GuardEngine, PromptDecision};
