//! Scripted collaborators for tests and demos.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use genui_types::Spec;
use std::sync::Mutex;

use crate::context::{ComponentContext, ComponentRule, ContextProvider};
use crate::error::{ContextError, ModelError};
use crate::model::{
    ComponentExtraction, DesignChunk, DesignModel, DesignRequest, DesignStream, IntentKind,
    TokenUsage,
};

/// One item of a scripted design stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptStep {
    Text(String),
    Usage(TokenUsage),
    /// Yield a stream error at this point.
    Fail(String),
}

/// Model that replays a fixed script per attempt. Attempts past the end of
/// the script replay its last entry.
pub struct ScriptedModel {
    components: Vec<String>,
    attempts: Vec<Vec<ScriptStep>>,
    requests: Mutex<Vec<DesignRequest>>,
}

impl ScriptedModel {
    pub fn new(attempts: Vec<Vec<ScriptStep>>) -> Self {
        Self {
            components: Vec::new(),
            attempts,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer every attempt with `text` in one chunk.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::new(vec![vec![ScriptStep::Text(text.into())]])
    }

    pub fn with_components(mut self, components: &[&str]) -> Self {
        self.components = components.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Requests received by `stream_design`, in order.
    pub fn requests(&self) -> Vec<DesignRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DesignModel for ScriptedModel {
    async fn extract_components(
        &self,
        _prompt: &str,
        prior_spec: Option<&Spec>,
    ) -> Result<ComponentExtraction, ModelError> {
        Ok(ComponentExtraction {
            components: self.components.clone(),
            intent_kind: if prior_spec.is_some() {
                IntentKind::Modify
            } else {
                IntentKind::Create
            },
            confidence: 1.0,
        })
    }

    async fn stream_design(&self, request: DesignRequest) -> Result<DesignStream, ModelError> {
        let index = (request.attempt.attempt as usize).saturating_sub(1);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let steps = self
            .attempts
            .get(index)
            .or_else(|| self.attempts.last())
            .cloned()
            .unwrap_or_default();
        let items = steps.into_iter().map(|step| match step {
            ScriptStep::Text(text) => Ok(DesignChunk::Text(text)),
            ScriptStep::Usage(usage) => Ok(DesignChunk::Usage(usage)),
            ScriptStep::Fail(message) => Err(ModelError::Stream(message)),
        });
        Ok(stream::iter(items).boxed())
    }
}

/// Where a [`FailingModel`] breaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// `extract_components` returns an error.
    Extract,
    /// `stream_design` returns an error instead of a stream.
    OpenStream,
    /// `extract_components` panics.
    Panic,
}

pub struct FailingModel {
    point: FailurePoint,
}

impl FailingModel {
    pub fn new(point: FailurePoint) -> Self {
        Self { point }
    }
}

#[async_trait]
impl DesignModel for FailingModel {
    async fn extract_components(
        &self,
        _prompt: &str,
        _prior_spec: Option<&Spec>,
    ) -> Result<ComponentExtraction, ModelError> {
        match self.point {
            FailurePoint::Extract => Err(ModelError::Request("extraction refused".to_string())),
            FailurePoint::Panic => panic!("model backend crashed"),
            FailurePoint::OpenStream => Ok(ComponentExtraction {
                components: Vec::new(),
                intent_kind: IntentKind::Unknown,
                confidence: 0.0,
            }),
        }
    }

    async fn stream_design(&self, _request: DesignRequest) -> Result<DesignStream, ModelError> {
        Err(ModelError::Request("stream refused".to_string()))
    }
}

/// Context provider serving a fixed context, or failing when built with
/// [`StaticContext::unavailable`].
pub struct StaticContext {
    context: Option<ComponentContext>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl StaticContext {
    pub fn new(context_version: impl Into<String>) -> Self {
        Self {
            context: Some(ComponentContext {
                context_version: context_version.into(),
                rules: Vec::new(),
            }),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            context: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_rule(mut self, component: &str, rule: &str) -> Self {
        if let Some(context) = self.context.as_mut() {
            context.rules.push(ComponentRule {
                component: component.to_string(),
                rules: vec![rule.to_string()],
            });
        }
        self
    }

    /// Component lists passed to `fetch_context`, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ContextProvider for StaticContext {
    async fn fetch_context(&self, components: &[String]) -> Result<ComponentContext, ContextError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(components.to_vec());
        }
        self.context
            .clone()
            .ok_or_else(|| ContextError::Unavailable("static context disabled".to_string()))
    }
}
