use genui_engine::{ComponentCatalog, NormalizeOptions, ValidatorOptions};
use serde::{Deserialize, Serialize};

/// Knobs for one [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Upper bound on streamed attempts per generation.
    pub max_attempts: u32,
    pub max_elements: usize,
    pub max_depth: usize,
    /// Node type for literal string children.
    pub text_node_type: String,
    /// Reject element types the catalog does not know.
    pub enforce_allow_list: bool,
    /// Substitute the deterministic fallback when every attempt fails.
    pub fallback_enabled: bool,
    /// Capacity of the event channel behind `generate`.
    pub event_buffer: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_elements: 1500,
            max_depth: 30,
            text_node_type: "Text".to_string(),
            enforce_allow_list: true,
            fallback_enabled: true,
            event_buffer: 64,
        }
    }
}

impl GenerationConfig {
    pub fn validator_options(&self, catalog: &ComponentCatalog) -> ValidatorOptions {
        ValidatorOptions {
            allowed_types: self
                .enforce_allow_list
                .then(|| catalog.allowed_types()),
            max_elements: self.max_elements,
            max_depth: self.max_depth,
        }
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            text_node_type: self.text_node_type.clone(),
            ..NormalizeOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: GenerationConfig =
            serde_json::from_str(r#"{"max_attempts": 5, "fallback_enabled": false}"#).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert!(!config.fallback_enabled);
        assert_eq!(config.max_depth, 30);
        assert_eq!(config.text_node_type, "Text");
    }

    #[test]
    fn allow_list_follows_catalog() {
        let catalog = ComponentCatalog::standard();
        let options = GenerationConfig::default().validator_options(&catalog);
        assert!(options.allowed_types.unwrap().contains("CardTitle"));

        let open = GenerationConfig {
            enforce_allow_list: false,
            ..GenerationConfig::default()
        };
        assert!(open.validator_options(&catalog).allowed_types.is_none());
    }
}
