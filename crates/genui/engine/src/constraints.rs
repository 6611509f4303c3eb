//! Prompt-derived requirements and the checker that enforces them.
//!
//! Constraints are soft: a violation is reported as a warning and fed
//! back into the next attempt, it never makes a spec invalid.

use genui_types::Spec;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::catalog::ComponentCatalog;

const CONTAINER_PATTERN: &str =
    r"(?i)\b(?:cards?|panels?|tiles?|pricing|profile|summary|widgets?|dashboard)\b";

const INTERACTIVE_PATTERN: &str = r"(?i)\b(?:buttons?|cta|call\s+to\s+action|forms?|inputs?|submit|sign\s*up|subscribe|checkout|buy|toggles?|dropdowns?|checkbox(?:es)?|sliders?|links?)\b";

const QUOTED_PATTERN: &str = r#""([^"\n]{1,80})"|\x{201C}([^\x{201D}\n]{1,80})\x{201D}"#;

/// Constraint violation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationCode {
    MissingRequiredType,
    BelowMinNodes,
    MissingRequiredToken,
    IncompleteContainer,
    MissingInteractiveControl,
}

impl ViolationCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationCode::MissingRequiredType => "MISSING_REQUIRED_TYPE",
            ViolationCode::BelowMinNodes => "BELOW_MIN_NODES",
            ViolationCode::MissingRequiredToken => "MISSING_REQUIRED_TOKEN",
            ViolationCode::IncompleteContainer => "INCOMPLETE_CONTAINER",
            ViolationCode::MissingInteractiveControl => "MISSING_INTERACTIVE_CONTROL",
        }
    }
}

impl fmt::Display for ViolationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    pub code: ViolationCode,
    pub message: String,
}

impl ConstraintViolation {
    fn new(code: ViolationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Requirements for one generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSet {
    pub required_types: BTreeSet<String>,
    pub min_nodes: usize,
    pub required_tokens: Vec<String>,
    pub require_container: bool,
    pub require_interactive: bool,
}

impl ConstraintSet {
    /// Check the nodes reachable from the root of `spec`.
    pub fn check(&self, spec: &Spec, catalog: &ComponentCatalog) -> Vec<ConstraintViolation> {
        let mut violations = Vec::new();
        let reachable = spec.reachable_ids();
        let types: BTreeSet<&str> = reachable
            .iter()
            .filter_map(|id| spec.get(id))
            .map(|node| node.node_type.as_str())
            .collect();

        for required in &self.required_types {
            if !types.contains(required.as_str()) {
                violations.push(ConstraintViolation::new(
                    ViolationCode::MissingRequiredType,
                    format!("expected a `{}` component", required),
                ));
            }
        }

        if reachable.len() < self.min_nodes {
            violations.push(ConstraintViolation::new(
                ViolationCode::BelowMinNodes,
                format!(
                    "expected at least {} nodes, found {}",
                    self.min_nodes,
                    reachable.len()
                ),
            ));
        }

        if !self.required_tokens.is_empty() {
            let mut text = String::new();
            for id in &reachable {
                if let Some(node) = spec.get(id) {
                    collect_strings(&node.props, &mut text);
                }
            }
            for token in &self.required_tokens {
                if !text.contains(&token.to_lowercase()) {
                    violations.push(ConstraintViolation::new(
                        ViolationCode::MissingRequiredToken,
                        format!("expected the text \"{}\"", token),
                    ));
                }
            }
        }

        if self.require_container {
            let containers: Vec<&String> = reachable
                .iter()
                .filter(|id| spec.get(id).is_some_and(|n| catalog.is_container(&n.node_type)))
                .collect();
            let complete = containers
                .iter()
                .any(|id| container_is_complete(spec, id, catalog));
            if !containers.is_empty() && !complete {
                violations.push(ConstraintViolation::new(
                    ViolationCode::IncompleteContainer,
                    "container needs both a header and a content section",
                ));
            }
        }

        if self.require_interactive && !types.iter().any(|t| catalog.is_control(t)) {
            violations.push(ConstraintViolation::new(
                ViolationCode::MissingInteractiveControl,
                "expected at least one interactive control",
            ));
        }

        violations
    }
}

fn container_is_complete(spec: &Spec, id: &str, catalog: &ComponentCatalog) -> bool {
    let mut header = false;
    let mut body = false;
    let mut seen: HashSet<&str> = HashSet::from([id]);
    let mut stack: Vec<&str> = spec
        .get(id)
        .map(|node| node.children.iter().map(String::as_str).collect())
        .unwrap_or_default();
    while let Some(current) = stack.pop() {
        if !seen.insert(current) {
            continue;
        }
        let Some(node) = spec.get(current) else {
            continue;
        };
        header |= catalog.is_header(&node.node_type);
        body |= catalog.is_body(&node.node_type);
        stack.extend(node.children.iter().map(String::as_str));
    }
    header && body
}

fn collect_strings(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => {
            out.push_str(&s.to_lowercase());
            out.push('\n');
        }
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_strings(item, out)),
        _ => {}
    }
}

/// Derives a [`ConstraintSet`] from a prompt and the components the model
/// said it would use. Shared across generations.
#[derive(Debug, Clone)]
pub struct ConstraintBuilder {
    catalog: Arc<ComponentCatalog>,
    container: Regex,
    interactive: Regex,
    quoted: Regex,
    keywords: Option<Regex>,
    keyword_types: HashMap<String, String>,
}

fn phrase_key(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl ConstraintBuilder {
    pub fn new(catalog: Arc<ComponentCatalog>) -> Result<Self, regex::Error> {
        let pairs = catalog.keywords();
        let keyword_types = pairs
            .iter()
            .map(|(phrase, canonical)| (phrase_key(phrase), canonical.to_string()))
            .collect();
        let keywords = if pairs.is_empty() {
            None
        } else {
            let alternation = pairs
                .iter()
                .map(|(phrase, _)| {
                    phrase
                        .split_whitespace()
                        .map(regex::escape)
                        .collect::<Vec<_>>()
                        .join(r"\s+")
                })
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))?)
        };

        Ok(Self {
            container: Regex::new(CONTAINER_PATTERN)?,
            interactive: Regex::new(INTERACTIVE_PATTERN)?,
            quoted: Regex::new(QUOTED_PATTERN)?,
            keywords,
            keyword_types,
            catalog,
        })
    }

    pub fn catalog(&self) -> &Arc<ComponentCatalog> {
        &self.catalog
    }

    /// Build the constraint set for `prompt` given the model's reported
    /// component names. Unknown names are ignored.
    pub fn build(&self, prompt: &str, reported: &[String]) -> ConstraintSet {
        let mut required_types = BTreeSet::new();
        let mut require_container = self.container.is_match(prompt);
        let mut require_interactive = self.interactive.is_match(prompt);

        for name in reported {
            match self.catalog.canonicalize(name) {
                Some(canonical) => {
                    require_container |= self.catalog.is_container(canonical);
                    require_interactive |= self.catalog.is_control(canonical);
                    required_types.insert(canonical.to_string());
                }
                None => tracing::debug!(component = %name, "ignoring unknown component"),
            }
        }

        if let Some(keywords) = &self.keywords {
            for found in keywords.find_iter(prompt) {
                if let Some(canonical) = self.keyword_types.get(&phrase_key(found.as_str())) {
                    required_types.insert(canonical.clone());
                }
            }
        }

        let mut required_tokens: Vec<String> = Vec::new();
        for captures in self.quoted.captures_iter(prompt) {
            let token = captures
                .get(1)
                .or_else(|| captures.get(2))
                .map(|m| m.as_str().trim())
                .unwrap_or_default();
            if !token.is_empty() && !required_tokens.iter().any(|t| t == token) {
                required_tokens.push(token.to_string());
            }
        }

        let structural = if require_container { 2 } else { 0 };
        ConstraintSet {
            min_nodes: (required_types.len() + structural).max(1),
            required_types,
            required_tokens,
            require_container,
            require_interactive,
        }
    }
}
