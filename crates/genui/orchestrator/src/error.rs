use genui_storage::StorageError;
use genui_types::PatchError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by a model collaborator.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("model request failed: {0}")]
    Request(String),

    #[error("model stream failed: {0}")]
    Stream(String),
}

/// Errors raised by a context collaborator.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    #[error("component context unavailable: {0}")]
    Unavailable(String),
}

/// Codes carried by the terminal `error` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ThreadNotFound,
    BaseVersionConflict,
    GenerationException,
    FallbackInvalid,
    NoValidCandidate,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ThreadNotFound => "THREAD_NOT_FOUND",
            ErrorCode::BaseVersionConflict => "BASE_VERSION_CONFLICT",
            ErrorCode::GenerationException => "GENERATION_EXCEPTION",
            ErrorCode::FallbackInvalid => "FALLBACK_INVALID",
            ErrorCode::NoValidCandidate => "NO_VALID_CANDIDATE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator failures. Every variant except `Cancelled` ends a
/// generation with an `error` event.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("thread {0} not found")]
    ThreadNotFound(String),

    #[error("base version {0} does not exist on this thread")]
    BaseVersionConflict(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("patch: {0}")]
    Patch(#[from] PatchError),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("fallback spec failed validation: {0}")]
    FallbackInvalid(String),

    #[error("no attempt produced an acceptable spec")]
    NoValidCandidate,

    #[error("canonical spec diverged from accepted candidate")]
    Diverged,

    #[error("invalid orchestrator setup: {0}")]
    Setup(String),

    #[error("event receiver dropped")]
    Cancelled,
}

impl OrchestratorError {
    pub fn code(&self) -> ErrorCode {
        match self {
            OrchestratorError::ThreadNotFound(_) => ErrorCode::ThreadNotFound,
            OrchestratorError::BaseVersionConflict(_) => ErrorCode::BaseVersionConflict,
            OrchestratorError::FallbackInvalid(_) => ErrorCode::FallbackInvalid,
            OrchestratorError::NoValidCandidate => ErrorCode::NoValidCandidate,
            _ => ErrorCode::GenerationException,
        }
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
