//! # agentguard-analysis
//!
//! The AgentGuard detection core: synchronous prompt filtering, static
//! skill scanning, streaming behavior anomaly detection, and file
//! integrity checking. Persistence flows through the storage traits in
//! `agentguard-core`.

pub mod behavior;
pub mod integrity;
pub mod prompt;
pub mod skills;
