//! Prop contracts for a closed set of recognized component types.

use genui_types::DynamicValueExpr;
use serde_json::Value;

/// Check `props` against the contract for `node_type`. Types without a
/// contract always pass.
pub(super) fn check(node_type: &str, props: &Value) -> Option<String> {
    let props = props.as_object()?;
    match node_type {
        "Select" | "RadioGroup" => match props.get("options") {
            None => Some(format!("{} requires `options`", node_type)),
            Some(options) if is_dynamic(options) => None,
            Some(Value::Array(options)) => options
                .iter()
                .position(|option| !is_option(option))
                .map(|index| {
                    format!(
                        "option {} must be a string or {{label, value}} object",
                        index
                    )
                }),
            Some(_) => Some("`options` must be an array".to_string()),
        },
        "Image" => require_string(props.get("src"), "src"),
        "Link" => require_string(props.get("href"), "href"),
        "Button" => match props.get("label") {
            None | Some(Value::String(_)) => None,
            Some(label) if is_dynamic(label) => None,
            Some(_) => Some("`label` must be a string".to_string()),
        },
        "Slider" => match (props.get("min"), props.get("max")) {
            (Some(min), Some(max)) if is_dynamic(min) || is_dynamic(max) => None,
            (Some(min), Some(max)) => match (min.as_f64(), max.as_f64()) {
                (Some(lo), Some(hi)) if lo <= hi => None,
                (Some(_), Some(_)) => Some("`min` must not exceed `max`".to_string()),
                _ => Some("`min` and `max` must be numbers".to_string()),
            },
            _ => None,
        },
        _ => None,
    }
}

fn is_dynamic(value: &Value) -> bool {
    value
        .as_object()
        .map(|map| !DynamicValueExpr::discriminators(map).is_empty())
        .unwrap_or(false)
}

fn is_option(option: &Value) -> bool {
    match option {
        Value::String(_) => true,
        Value::Object(map) => {
            matches!(map.get("label"), Some(Value::String(_)))
                && matches!(map.get("value"), Some(Value::String(_)) | Some(Value::Number(_)))
        }
        _ => false,
    }
}

fn require_string(value: Option<&Value>, key: &str) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => None,
        Some(value) if is_dynamic(value) => None,
        _ => Some(format!("`{}` must be a non-empty string", key)),
    }
}
