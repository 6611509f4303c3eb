//! GenUI generation orchestrator.
//!
//! Turns a prompt into a validated, persisted UI spec. A run streams
//! design text from a [`DesignModel`], extracts JSON node trees as they
//! complete, normalizes and validates each one, checks it against
//! prompt-derived constraints, and diffs the first acceptable candidate
//! into the thread's canonical spec as RFC 6902 patches. Failed attempts
//! feed their issues into the next attempt; when every attempt fails a
//! deterministic fallback is applied instead.
//!
//! Callers consume a stream of [`GenerationEvent`]s that always ends with
//! exactly one `done` or `error` event.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod config;
mod context;
mod error;
mod events;
pub mod mocks;
mod model;
mod offline;
mod orchestrator;

pub use config::GenerationConfig;
pub use context::{CatalogContext, ComponentContext, ComponentRule, ContextProvider};
pub use error::{ContextError, ErrorCode, ModelError, OrchestratorError, OrchestratorResult};
pub use events::{warning, GenerationEvent, Stage};
pub use mocks::{FailingModel, FailurePoint, ScriptStep, ScriptedModel, StaticContext};
pub use model::{
    AttemptContext, AttemptIssue, ComponentExtraction, DesignChunk, DesignModel, DesignRequest,
    DesignStream, IntentKind, TokenUsage,
};
pub use offline::OfflineModel;
pub use orchestrator::{GenerationRequest, Orchestrator};
