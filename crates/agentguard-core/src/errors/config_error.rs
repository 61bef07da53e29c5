//! Configuration loading errors.
//!
//! A malformed configuration file is the only fatal startup surface; every
//! other component failure falls back to defaults and logs.

use std::path::PathBuf;

/// Errors raised while loading the YAML configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("Malformed config file {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}
