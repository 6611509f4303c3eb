//! Deterministic model that needs no network.
//!
//! It derives the same constraints the orchestrator will enforce and
//! streams a nested card tree that satisfies them, wrapped in prose and a
//! fenced block and split into small chunks the way a hosted model would
//! deliver it.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use genui_engine::{prompt_title, ComponentCatalog, ConstraintBuilder};
use genui_types::Spec;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::ModelError;
use crate::model::{
    ComponentExtraction, DesignChunk, DesignModel, DesignRequest, DesignStream, IntentKind,
    TokenUsage,
};

const DEFAULT_CHUNK_CHARS: usize = 24;

/// Types the card skeleton already provides.
const SKELETON: &[&str] = &["Card", "CardHeader", "CardTitle", "CardContent", "CardFooter"];

pub struct OfflineModel {
    constraints: ConstraintBuilder,
    chunk_chars: usize,
}

impl OfflineModel {
    pub fn new(catalog: Arc<ComponentCatalog>) -> Result<Self, ModelError> {
        let constraints =
            ConstraintBuilder::new(catalog).map_err(|err| ModelError::Request(err.to_string()))?;
        Ok(Self {
            constraints,
            chunk_chars: DEFAULT_CHUNK_CHARS,
        })
    }

    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self
    }

    /// The nested tree this model answers `prompt` with.
    pub fn design(&self, prompt: &str) -> Value {
        let set = self.constraints.build(prompt, &[]);
        let catalog = self.constraints.catalog();
        let title = prompt_title(prompt);

        let mut body = vec![json!(format!("{}.", title))];
        body.extend(set.required_tokens.iter().map(|token| json!(token)));
        let mut controls = Vec::new();
        for component in &set.required_types {
            if SKELETON.contains(&component.as_str()) {
                continue;
            }
            let node = sample(component, &title);
            if catalog.is_control(component) {
                controls.push(node);
            } else {
                body.push(node);
            }
        }
        if set.require_interactive && controls.is_empty() {
            controls.push(sample("Button", &title));
        }

        let mut children = vec![
            json!({
                "type": "CardHeader",
                "children": [{"type": "CardTitle", "props": {"text": title}}]
            }),
            json!({"type": "CardContent", "children": body}),
        ];
        if !controls.is_empty() {
            children.push(json!({"type": "CardFooter", "children": controls}));
        }
        json!({"id": "card", "type": "Card", "children": children})
    }

    fn chunks(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars
            .chunks(self.chunk_chars)
            .map(|chunk| chunk.iter().collect())
            .collect()
    }
}

fn sample(component: &str, title: &str) -> Value {
    let props = match component {
        "Button" => json!({"label": "Get started"}),
        "Input" | "Textarea" => json!({"placeholder": "Type here"}),
        "Select" | "RadioGroup" => json!({"options": ["Option A", "Option B"]}),
        "Checkbox" | "Switch" => json!({"label": "Enabled"}),
        "Slider" => json!({"min": 0, "max": 100, "value": 50}),
        "Link" => json!({"href": "https://example.com", "text": "Learn more"}),
        "Image" => json!({"src": "https://placehold.co/600x400", "alt": title}),
        "Avatar" => json!({"src": "https://placehold.co/64x64", "alt": title}),
        "Progress" => json!({"value": 60}),
        "Table" => json!({"columns": ["Name", "Value"], "rows": []}),
        _ => json!({"text": title}),
    };
    json!({"type": component, "props": props})
}

#[async_trait]
impl DesignModel for OfflineModel {
    async fn extract_components(
        &self,
        prompt: &str,
        prior_spec: Option<&Spec>,
    ) -> Result<ComponentExtraction, ModelError> {
        let set = self.constraints.build(prompt, &[]);
        let components: Vec<String> = set.required_types.into_iter().collect();
        Ok(ComponentExtraction {
            confidence: if components.is_empty() { 0.3 } else { 0.8 },
            components,
            intent_kind: if prior_spec.is_some() {
                IntentKind::Modify
            } else {
                IntentKind::Create
            },
        })
    }

    async fn stream_design(&self, request: DesignRequest) -> Result<DesignStream, ModelError> {
        let tree = serde_json::to_string_pretty(&self.design(&request.prompt))
            .map_err(|err| ModelError::Request(err.to_string()))?;
        let text = format!("Here is a layout for your request.\n```json\n{}\n```\n", tree);

        let mut chunks: Vec<DesignChunk> =
            self.chunks(&text).into_iter().map(DesignChunk::Text).collect();
        let usage = TokenUsage::new(
            request.prompt.split_whitespace().count() as u64,
            chunks.len() as u64,
        );
        chunks.push(DesignChunk::Usage(usage));
        Ok(stream::iter(chunks.into_iter().map(Ok)).boxed())
    }
}
