use thiserror::Error;

#[derive(Error, Debug)]
pub enum WizardError {
    #[error("Failed to write log export: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to (de)serialize wizard data: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Persistence backend error: {0}")]
    Backend(String),
}
