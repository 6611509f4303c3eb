use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage-layer errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("thread {thread_id} not found")]
    ThreadNotFound { thread_id: String },

    #[error("version {version_id} not found on thread {thread_id}")]
    VersionNotFound {
        thread_id: String,
        version_id: String,
    },

    #[error("spec hash mismatch on thread {thread_id}: declared {declared}, computed {computed}")]
    HashMismatch {
        thread_id: String,
        declared: String,
        computed: String,
    },

    #[error("spec serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The adapter itself failed, e.g. a poisoned lock.
    #[error("storage backend failed during {operation}: {reason}")]
    Backend {
        operation: &'static str,
        reason: String,
    },
}

impl StorageError {
    pub fn thread_not_found(thread_id: impl Into<String>) -> Self {
        StorageError::ThreadNotFound {
            thread_id: thread_id.into(),
        }
    }

    pub fn version_not_found(thread_id: impl Into<String>, version_id: impl Into<String>) -> Self {
        StorageError::VersionNotFound {
            thread_id: thread_id.into(),
            version_id: version_id.into(),
        }
    }

    /// Whether the error names a missing thread or version.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::ThreadNotFound { .. } | StorageError::VersionNotFound { .. }
        )
    }
}
