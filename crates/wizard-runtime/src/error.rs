use std::time::Duration;
use thiserror::Error;
use wizard_core::{error::PersistenceError, readiness::BlockReason};

/// Errors of the simulated backend operations.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// A prerequisite step has not been saved yet.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Cannot start migration: {}", join_reasons(.0))]
    Blocked(Vec<BlockReason>),

    #[error("A migration is already running")]
    AlreadyRunning,

    #[error("Invalid simulation settings: {0}")]
    InvalidSettings(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

fn join_reasons(reasons: &[BlockReason]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
