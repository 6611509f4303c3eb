//! Model collaborator seam.
//!
//! The orchestrator never builds prompts. It hands the model a structured
//! [`DesignRequest`] (prompt, prior spec, component context and the
//! feedback from the previous attempt) and consumes the text it streams.

use async_trait::async_trait;
use futures::stream::BoxStream;
use genui_types::Spec;
use serde::{Deserialize, Serialize};

use crate::context::ComponentContext;
use crate::error::ModelError;

/// What the model thinks the user is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Create,
    Modify,
    Unknown,
}

/// Result of the component extraction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentExtraction {
    pub components: Vec<String>,
    pub intent_kind: IntentKind,
    pub confidence: f64,
}

/// One problem carried from an attempt into the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptIssue {
    pub code: String,
    pub message: String,
}

impl AttemptIssue {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Retry feedback for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptContext {
    /// 1-based.
    pub attempt: u32,
    pub max_attempts: u32,
    /// Issues found in the previous attempt; empty on the first one.
    pub issues: Vec<AttemptIssue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesignRequest {
    pub prompt: String,
    pub prior_spec: Option<Spec>,
    pub context: ComponentContext,
    pub attempt: AttemptContext,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// One item of a design stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DesignChunk {
    Text(String),
    Usage(TokenUsage),
}

pub type DesignStream = BoxStream<'static, Result<DesignChunk, ModelError>>;

/// Trait implemented by text-generation backends.
#[async_trait]
pub trait DesignModel: Send + Sync {
    /// Report which components the prompt calls for.
    async fn extract_components(
        &self,
        prompt: &str,
        prior_spec: Option<&Spec>,
    ) -> Result<ComponentExtraction, ModelError>;

    /// Stream design text. The concatenated text holds zero or more JSON
    /// node trees, possibly surrounded by prose.
    async fn stream_design(&self, request: DesignRequest) -> Result<DesignStream, ModelError>;
}
