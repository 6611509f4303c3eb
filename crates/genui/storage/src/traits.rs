use crate::model::{
    FailureRecord, PersistGeneration, PersistedGeneration, ThreadBundle, ThreadRecord,
    VersionRecord,
};
use crate::StorageResult;
use async_trait::async_trait;

/// Storage interface for threads and their spec versions.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Create an empty thread with no active version.
    async fn create_thread(&self, title: &str) -> StorageResult<ThreadRecord>;

    /// Load a thread with its versions and messages.
    async fn get_bundle(&self, thread_id: &str) -> StorageResult<Option<ThreadBundle>>;

    /// Load one version of a thread; `None` selects the active version.
    async fn get_version(
        &self,
        thread_id: &str,
        version_id: Option<&str>,
    ) -> StorageResult<Option<VersionRecord>>;

    /// Write one version, one assistant message and one log record, and
    /// move the thread's active version to the new version. All or nothing.
    async fn persist_generation(
        &self,
        generation: PersistGeneration,
    ) -> StorageResult<PersistedGeneration>;

    /// Record a failed generation.
    async fn record_failure(&self, failure: FailureRecord) -> StorageResult<()>;

    /// Point the thread's active version at an existing version.
    async fn revert(&self, thread_id: &str, version_id: &str) -> StorageResult<VersionRecord>;

    /// Failures recorded for a thread, oldest first.
    async fn list_failures(&self, thread_id: &str) -> StorageResult<Vec<FailureRecord>>;
}
