//! Events streamed to the caller of a generation.
//!
//! A run emits any number of status, patch, warning and usage events and
//! then exactly one terminal event: `done` or `error`.

use genui_types::Patch;
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::model::TokenUsage;

/// Warning codes emitted by the orchestrator itself. Validation and
/// constraint warnings reuse the engine's issue codes.
pub mod warning {
    pub const STREAM_ERROR: &str = "STREAM_ERROR";
    pub const NO_VALID_OUTPUT: &str = "NO_VALID_OUTPUT";
    pub const INVALID_JSON: &str = "INVALID_JSON";
    pub const NO_STRUCTURAL_CHANGE: &str = "NO_STRUCTURAL_CHANGE";
    pub const FALLBACK_APPLIED: &str = "FALLBACK_APPLIED";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ThreadLookup,
    BaseVersionCheck,
    ExtractComponents,
    FetchContext,
    Attempt,
    Fallback,
    Persist,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GenerationEvent {
    Status {
        stage: Stage,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attempt: Option<u32>,
    },
    Patch {
        patch: Patch,
    },
    Warning {
        code: String,
        message: String,
    },
    Usage(TokenUsage),
    Done {
        #[serde(rename = "versionId")]
        version_id: String,
        #[serde(rename = "specHash")]
        spec_hash: String,
    },
    Error {
        code: ErrorCode,
        message: String,
    },
}

impl GenerationEvent {
    pub fn status(stage: Stage) -> Self {
        GenerationEvent::Status {
            stage,
            attempt: None,
        }
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        GenerationEvent::Warning {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            GenerationEvent::Status { .. } => "status",
            GenerationEvent::Patch { .. } => "patch",
            GenerationEvent::Warning { .. } => "warning",
            GenerationEvent::Usage(_) => "usage",
            GenerationEvent::Done { .. } => "done",
            GenerationEvent::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationEvent::Done { .. } | GenerationEvent::Error { .. }
        )
    }

    /// Render as one server-sent-events frame.
    pub fn to_sse_frame(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_default();
        format!("event: {}\ndata: {}\n\n", self.event_type(), json)
    }
}
