//! Deterministic spec used when no attempt produced an acceptable one.
//!
//! The output depends only on the prompt, the constraint flags and the
//! catalog's text type. It must always pass validation against the stock
//! catalog; the orchestrator treats a failure as fatal.

use genui_types::{Node, Spec};
use serde_json::json;

use crate::catalog::ComponentCatalog;
use crate::constraints::ConstraintSet;

const ID_PREFIX: &str = "fallback-";
const TITLE_CHARS: usize = 60;
const SUMMARY_CHARS: usize = 140;

const LEADING_FILLER: &[&str] = &[
    "please", "create", "build", "make", "design", "generate", "render", "show", "give", "add",
    "me", "us", "a", "an", "the", "some",
];

fn id(name: &str) -> String {
    format!("{}{}", ID_PREFIX, name)
}

/// Build the fallback spec for `prompt`.
pub fn build_fallback(
    prompt: &str,
    constraints: &ConstraintSet,
    catalog: &ComponentCatalog,
) -> Spec {
    let text_type = catalog.text_type();
    let mut spec = Spec::with_root(id("card"));

    let mut card_children = vec![id("header"), id("content")];
    if constraints.require_interactive {
        card_children.push(id("footer"));
    }
    spec.insert(id("card"), Node::new("Card").with_children(card_children));

    spec.insert(id("header"), Node::new("CardHeader").with_children([id("title")]));
    spec.insert(
        id("title"),
        Node::new("CardTitle").with_prop("text", json!(prompt_title(prompt))),
    );

    let mut content_children = vec![id("summary")];
    spec.insert(
        id("summary"),
        Node::new(text_type).with_prop("text", json!(summary_from(prompt))),
    );
    for (index, token) in constraints.required_tokens.iter().enumerate() {
        let token_id = id(&format!("token-{}", index));
        spec.insert(
            token_id.clone(),
            Node::new(text_type).with_prop("text", json!(token)),
        );
        content_children.push(token_id);
    }
    spec.insert(
        id("content"),
        Node::new("CardContent").with_children(content_children),
    );

    if constraints.require_interactive {
        spec.insert(id("footer"), Node::new("CardFooter").with_children([id("action")]));
        spec.insert(
            id("action"),
            Node::new("Button").with_prop("label", json!("Continue")),
        );
    }

    spec
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

/// Short title derived from a prompt: leading filler words dropped, first
/// letter capitalized.
pub fn prompt_title(prompt: &str) -> String {
    let words: Vec<&str> = prompt.split_whitespace().collect();
    let skip = words
        .iter()
        .take_while(|word| {
            let bare = word.trim_matches(|c: char| !c.is_alphanumeric());
            LEADING_FILLER.contains(&bare.to_lowercase().as_str())
        })
        .count();
    let rest = words[skip..].join(" ");
    let rest = rest.trim_matches(|c: char| c == '.' || c == '!' || c == '?');
    let mut chars = rest.chars();
    let title = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => "Untitled".to_string(),
    };
    truncate(&title, TITLE_CHARS)
}

fn summary_from(prompt: &str) -> String {
    let collapsed = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "Nothing to show yet.".to_string();
    }
    truncate(&collapsed, SUMMARY_CHARS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{Validator, ValidatorOptions};

    fn interactive() -> ConstraintSet {
        ConstraintSet {
            require_interactive: true,
            required_tokens: vec!["$29".into()],
            ..ConstraintSet::default()
        }
    }

    #[test]
    fn fallback_is_valid_against_stock_catalog() {
        let catalog = ComponentCatalog::standard();
        let validator = Validator::new(ValidatorOptions {
            allowed_types: Some(catalog.allowed_types()),
            ..ValidatorOptions::default()
        });
        for constraints in [ConstraintSet::default(), interactive()] {
            let spec = build_fallback("Create a pricing card with CTA", &constraints, &catalog);
            let report = validator.validate(&spec);
            assert!(report.valid, "{:?}", report.issues);
        }
    }

    #[test]
    fn fallback_is_deterministic() {
        let catalog = ComponentCatalog::standard();
        let a = build_fallback("show me a profile", &interactive(), &catalog);
        let b = build_fallback("show me a profile", &interactive(), &catalog);
        assert_eq!(a.content_hash().unwrap(), b.content_hash().unwrap());
        assert!(a.elements.keys().all(|id| id.starts_with("fallback-")));
    }

    #[test]
    fn title_strips_leading_filler() {
        assert_eq!(prompt_title("Create a pricing card with CTA"), "Pricing card with CTA");
        assert_eq!(prompt_title("please make me the dashboard!"), "Dashboard");
        assert_eq!(prompt_title("  "), "Untitled");
        assert_eq!(prompt_title(&"x".repeat(100)).chars().count(), TITLE_CHARS);
    }

    #[test]
    fn interactive_flag_adds_a_button() {
        let catalog = ComponentCatalog::standard();
        let spec = build_fallback("a form", &interactive(), &catalog);
        assert_eq!(spec.reachable_types().last().map(String::as_str), Some("Button"));
        assert_eq!(spec.get("fallback-token-0").map(|n| n.props["text"].clone()), Some(json!("$29")));

        let plain = build_fallback("a form", &ConstraintSet::default(), &catalog);
        assert!(!plain.reachable_types().contains(&"Button".to_string()));
    }
}
