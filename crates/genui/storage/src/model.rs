use chrono::{DateTime, Utc};
use genui_types::{Spec, SpecHash};
use serde::{Deserialize, Serialize};

/// A conversation that owns a line of spec versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadRecord {
    pub thread_id: String,
    pub title: String,
    /// `None` until the first generation is persisted.
    pub active_version_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Immutable snapshot of a thread's spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version_id: String,
    pub thread_id: String,
    pub parent_version_id: Option<String>,
    pub spec: Spec,
    pub spec_hash: SpecHash,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub message_id: String,
    pub thread_id: String,
    pub role: MessageRole,
    pub content: String,
    pub version_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Bookkeeping for one completed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationLog {
    pub log_id: String,
    pub thread_id: String,
    pub version_id: String,
    pub prompt: String,
    pub attempts: u32,
    pub warning_count: u32,
    pub patch_count: u32,
    pub fallback_used: bool,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub created_at: DateTime<Utc>,
}

/// A thread with its versions (oldest first) and messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadBundle {
    pub thread: ThreadRecord,
    pub active_version: Option<VersionRecord>,
    pub versions: Vec<VersionRecord>,
    pub messages: Vec<MessageRecord>,
}

/// Everything written at the end of a successful generation. Ids and
/// timestamps are assigned by storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistGeneration {
    pub thread_id: String,
    /// Version the new spec was derived from; `None` for a thread's first
    /// version. Must belong to `thread_id`.
    pub parent_version_id: Option<String>,
    pub prompt: String,
    pub spec: Spec,
    pub spec_hash: SpecHash,
    pub assistant_message: String,
    pub attempts: u32,
    pub warning_count: u32,
    pub patch_count: u32,
    pub fallback_used: bool,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// The records written by one `persist_generation` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedGeneration {
    pub version: VersionRecord,
    pub message: MessageRecord,
    pub log: GenerationLog,
}

/// A generation that ended in a terminal error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub thread_id: String,
    pub code: String,
    pub message: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
}

impl FailureRecord {
    pub fn new(
        thread_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            thread_id: thread_id.into(),
            code: code.into(),
            message: message.into(),
            prompt: prompt.into(),
            created_at: Utc::now(),
        }
    }
}
