use thiserror::Error;
use wizard_core::{error::WizardError, readiness::BlockReason};
use wizard_runtime::error::SimulationError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to read the input file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to deserialize the input file as JSON: {0}")]
    ConfigDeserialize(#[from] serde_json::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wizard error: {0}")]
    Wizard(#[from] WizardError),

    #[error("Simulation failed: {0}")]
    Simulation(#[from] SimulationError),

    #[error("Cannot leave step {step}: {}", join_reasons(.reasons))]
    StepBlocked {
        step: i64,
        reasons: Vec<BlockReason>,
    },

    #[error("Connection test failed: {0}")]
    ConnectionFailed(String),
}

fn join_reasons(reasons: &[BlockReason]) -> String {
    reasons
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
