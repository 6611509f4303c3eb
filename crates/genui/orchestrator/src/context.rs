//! Component-context collaborator seam.
//!
//! Context is guidance for the model (per-component usage rules). It is
//! fetched once per generation and passed to every attempt unchanged.

use async_trait::async_trait;
use genui_engine::{ComponentCatalog, ComponentRole};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ContextError;

/// Usage rules for one component type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRule {
    pub component: String,
    pub rules: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentContext {
    pub context_version: String,
    pub rules: Vec<ComponentRule>,
}

impl ComponentContext {
    pub fn rules_for(&self, component: &str) -> Option<&ComponentRule> {
        self.rules.iter().find(|rule| rule.component == component)
    }
}

/// Trait implemented by component-context sources.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Fetch usage rules for the given canonical component names.
    async fn fetch_context(&self, components: &[String]) -> Result<ComponentContext, ContextError>;
}

/// Context derived from the roles a [`ComponentCatalog`] assigns.
pub struct CatalogContext {
    catalog: Arc<ComponentCatalog>,
}

impl CatalogContext {
    pub const VERSION: &'static str = "catalog-1";

    pub fn new(catalog: Arc<ComponentCatalog>) -> Self {
        Self { catalog }
    }

    fn rules(&self, component: &str) -> Vec<String> {
        let mut rules = match self.catalog.role(component) {
            Some(ComponentRole::Container) => vec![
                "Wrap related content in a single container.".to_string(),
                "Give the container a header and a body section.".to_string(),
            ],
            Some(ComponentRole::Header) => {
                vec!["Place inside a container, before its body.".to_string()]
            }
            Some(ComponentRole::Body) => {
                vec!["Hold the main content of its container.".to_string()]
            }
            Some(ComponentRole::Control) => {
                vec!["Give the control a visible label.".to_string()]
            }
            Some(ComponentRole::Content) => {
                vec!["Keep text short and put it in props.text.".to_string()]
            }
            None => Vec::new(),
        };
        match component {
            "Select" | "RadioGroup" => rules.push(
                "props.options is an array of strings or {label, value} objects.".to_string(),
            ),
            "Image" => rules.push("props.src is a non-empty URL.".to_string()),
            "Link" => rules.push("props.href is a non-empty URL.".to_string()),
            "Slider" => rules.push("props.min must not exceed props.max.".to_string()),
            _ => {}
        }
        rules
    }
}

#[async_trait]
impl ContextProvider for CatalogContext {
    async fn fetch_context(&self, components: &[String]) -> Result<ComponentContext, ContextError> {
        let rules = components
            .iter()
            .filter_map(|name| self.catalog.canonicalize(name))
            .map(|component| ComponentRule {
                component: component.to_string(),
                rules: self.rules(component),
            })
            .collect();
        Ok(ComponentContext {
            context_version: Self::VERSION.to_string(),
            rules,
        })
    }
}
