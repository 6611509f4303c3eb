//! In-memory reference implementation of [`ThreadStore`].
//!
//! All tables sit behind one lock so a persisted generation (version,
//! message, log and active pointer) becomes visible atomically.

use crate::model::{
    FailureRecord, GenerationLog, MessageRecord, MessageRole, PersistGeneration,
    PersistedGeneration, ThreadBundle, ThreadRecord, VersionRecord,
};
use crate::traits::ThreadStore;
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    threads: HashMap<String, ThreadRecord>,
    versions: HashMap<String, VersionRecord>,
    /// version ids per thread, in creation order
    history: HashMap<String, Vec<String>>,
    messages: Vec<MessageRecord>,
    logs: Vec<GenerationLog>,
    failures: Vec<FailureRecord>,
}

impl Tables {
    fn version_of(&self, thread_id: &str, version_id: &str) -> Option<&VersionRecord> {
        self.versions
            .get(version_id)
            .filter(|version| version.thread_id == thread_id)
    }
}

/// In-memory thread store.
#[derive(Default)]
pub struct InMemoryThreadStore {
    tables: RwLock<Tables>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, operation: &'static str) -> StorageResult<RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| StorageError::Backend {
            operation,
            reason: "lock poisoned".to_string(),
        })
    }

    fn write(&self, operation: &'static str) -> StorageResult<RwLockWriteGuard<'_, Tables>> {
        self.tables.write().map_err(|_| StorageError::Backend {
            operation,
            reason: "lock poisoned".to_string(),
        })
    }

    /// Generation logs for a thread, oldest first.
    pub fn logs(&self, thread_id: &str) -> StorageResult<Vec<GenerationLog>> {
        let guard = self.read("logs")?;
        Ok(guard
            .logs
            .iter()
            .filter(|log| log.thread_id == thread_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ThreadStore for InMemoryThreadStore {
    async fn create_thread(&self, title: &str) -> StorageResult<ThreadRecord> {
        let now = Utc::now();
        let thread = ThreadRecord {
            thread_id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            active_version_id: None,
            created_at: now,
            updated_at: now,
        };
        let mut guard = self.write("create_thread")?;
        guard.history.insert(thread.thread_id.clone(), Vec::new());
        guard.threads.insert(thread.thread_id.clone(), thread.clone());
        Ok(thread)
    }

    async fn get_bundle(&self, thread_id: &str) -> StorageResult<Option<ThreadBundle>> {
        let guard = self.read("get_bundle")?;
        let Some(thread) = guard.threads.get(thread_id).cloned() else {
            return Ok(None);
        };
        let versions = guard
            .history
            .get(thread_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| guard.versions.get(id).cloned())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let active_version = thread
            .active_version_id
            .as_deref()
            .and_then(|id| guard.version_of(thread_id, id).cloned());
        let messages = guard
            .messages
            .iter()
            .filter(|message| message.thread_id == thread_id)
            .cloned()
            .collect();
        Ok(Some(ThreadBundle {
            thread,
            active_version,
            versions,
            messages,
        }))
    }

    async fn get_version(
        &self,
        thread_id: &str,
        version_id: Option<&str>,
    ) -> StorageResult<Option<VersionRecord>> {
        let guard = self.read("get_version")?;
        let Some(thread) = guard.threads.get(thread_id) else {
            return Ok(None);
        };
        let Some(id) = version_id.or(thread.active_version_id.as_deref()) else {
            return Ok(None);
        };
        Ok(guard.version_of(thread_id, id).cloned())
    }

    async fn persist_generation(
        &self,
        generation: PersistGeneration,
    ) -> StorageResult<PersistedGeneration> {
        let computed = generation.spec.content_hash()?;
        if computed != generation.spec_hash {
            return Err(StorageError::HashMismatch {
                thread_id: generation.thread_id,
                declared: generation.spec_hash,
                computed,
            });
        }

        let mut guard = self.write("persist_generation")?;
        if !guard.threads.contains_key(&generation.thread_id) {
            return Err(StorageError::thread_not_found(generation.thread_id));
        }
        if let Some(parent) = generation.parent_version_id.as_deref() {
            if guard.version_of(&generation.thread_id, parent).is_none() {
                return Err(StorageError::version_not_found(
                    generation.thread_id.as_str(),
                    parent,
                ));
            }
        }

        let now = Utc::now();
        let version = VersionRecord {
            version_id: Uuid::new_v4().to_string(),
            thread_id: generation.thread_id.clone(),
            parent_version_id: generation.parent_version_id,
            spec: generation.spec,
            spec_hash: generation.spec_hash,
            prompt: generation.prompt.clone(),
            created_at: now,
        };
        let message = MessageRecord {
            message_id: Uuid::new_v4().to_string(),
            thread_id: generation.thread_id.clone(),
            role: MessageRole::Assistant,
            content: generation.assistant_message,
            version_id: Some(version.version_id.clone()),
            created_at: now,
        };
        let log = GenerationLog {
            log_id: Uuid::new_v4().to_string(),
            thread_id: generation.thread_id.clone(),
            version_id: version.version_id.clone(),
            prompt: generation.prompt,
            attempts: generation.attempts,
            warning_count: generation.warning_count,
            patch_count: generation.patch_count,
            fallback_used: generation.fallback_used,
            prompt_tokens: generation.prompt_tokens,
            completion_tokens: generation.completion_tokens,
            created_at: now,
        };

        if let Some(thread) = guard.threads.get_mut(&generation.thread_id) {
            thread.active_version_id = Some(version.version_id.clone());
            thread.updated_at = now;
        }
        guard
            .history
            .entry(generation.thread_id)
            .or_default()
            .push(version.version_id.clone());
        guard
            .versions
            .insert(version.version_id.clone(), version.clone());
        guard.messages.push(message.clone());
        guard.logs.push(log.clone());

        Ok(PersistedGeneration {
            version,
            message,
            log,
        })
    }

    async fn record_failure(&self, failure: FailureRecord) -> StorageResult<()> {
        let mut guard = self.write("record_failure")?;
        guard.failures.push(failure);
        Ok(())
    }

    async fn revert(&self, thread_id: &str, version_id: &str) -> StorageResult<VersionRecord> {
        let mut guard = self.write("revert")?;
        let version = guard
            .version_of(thread_id, version_id)
            .cloned()
            .ok_or_else(|| StorageError::version_not_found(thread_id, version_id))?;
        let thread = guard
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| StorageError::thread_not_found(thread_id))?;
        thread.active_version_id = Some(version.version_id.clone());
        thread.updated_at = Utc::now();
        Ok(version)
    }

    async fn list_failures(&self, thread_id: &str) -> StorageResult<Vec<FailureRecord>> {
        let guard = self.read("list_failures")?;
        Ok(guard
            .failures
            .iter()
            .filter(|failure| failure.thread_id == thread_id)
            .cloned()
            .collect())
    }
}
