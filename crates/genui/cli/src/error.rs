use genui_orchestrator::{ErrorCode, ModelError, OrchestratorError};
use genui_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("output error: {0}")]
    Output(#[from] serde_json::Error),

    #[error("generation failed with {code}: {message}")]
    Generation { code: ErrorCode, message: String },
}

pub type CliResult<T> = Result<T, CliError>;
