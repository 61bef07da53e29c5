//! Per-table query modules.

pub mod alerts;
pub mod behavior;
pub mod communications;
pub mod integrity;
pub mod signatures;
pub mod skill_scans;

use agentguard_core::errors::StorageError;

/// Map any displayable error into a `StorageError::SqliteError`.
pub(crate) fn sqe(e: impl std::fmt::Display) -> StorageError {
    StorageError::SqliteError {
        message: e.to_string(),
    }
}
