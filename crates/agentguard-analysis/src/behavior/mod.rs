//! Streaming behavior anomaly detection over per-agent action windows.

pub mod monitor;

pub use monitor::BehaviorMonitor;
