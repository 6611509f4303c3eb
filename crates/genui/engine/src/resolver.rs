//! Runtime resolution of dynamic values and visibility.
//!
//! Everything here fails soft: unknown state paths fall back to the
//! expression's `default`, malformed expressions are treated as plain data,
//! and malformed visibility conditions render as visible. The validator is
//! where those same shapes are rejected.

use genui_types::{BindingRef, BindingSource, DynamicValueExpr, VisibilityExpr};
use serde_json::{Map, Value};

/// Current element of a repeated node.
#[derive(Debug, Clone, Copy)]
pub struct RepeatScope<'a> {
    pub item: &'a Value,
    pub index: usize,
}

/// Inputs for resolution: the state object and an optional repeat scope.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub state: &'a Value,
    pub scope: Option<RepeatScope<'a>>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(state: &'a Value) -> Self {
        Self { state, scope: None }
    }

    pub fn with_scope(self, item: &'a Value, index: usize) -> Self {
        Self {
            scope: Some(RepeatScope { item, index }),
            ..self
        }
    }
}

/// Resolve every dynamic expression inside `value`.
///
/// Keys whose expression resolves to nothing are dropped from objects;
/// inside arrays (and at the top level) they become `null`.
pub fn resolve_value(value: &Value, ctx: &ResolveContext<'_>) -> Value {
    resolve_inner(value, ctx).unwrap_or(Value::Null)
}

fn resolve_inner(value: &Value, ctx: &ResolveContext<'_>) -> Option<Value> {
    match value {
        Value::Array(items) => Some(Value::Array(
            items
                .iter()
                .map(|item| resolve_inner(item, ctx).unwrap_or(Value::Null))
                .collect(),
        )),
        Value::Object(map) => match DynamicValueExpr::detect(map) {
            Some(Ok(expr)) => resolve_expr(&expr, ctx),
            // Malformed expressions render as the data they look like.
            Some(Err(_)) | None => Some(resolve_object(map, ctx)),
        },
        other => Some(other.clone()),
    }
}

fn resolve_object(map: &Map<String, Value>, ctx: &ResolveContext<'_>) -> Value {
    let mut out = Map::new();
    for (key, value) in map {
        if let Some(resolved) = resolve_inner(value, ctx) {
            out.insert(key.clone(), resolved);
        }
    }
    Value::Object(out)
}

fn resolve_expr(expr: &DynamicValueExpr, ctx: &ResolveContext<'_>) -> Option<Value> {
    match expr {
        DynamicValueExpr::StateRef { path, default } => ctx
            .state
            .pointer(path)
            .cloned()
            .or_else(|| default.clone()),
        DynamicValueExpr::ItemField { field, default } => ctx
            .scope
            .and_then(|scope| item_lookup(scope.item, field))
            .cloned()
            .or_else(|| default.clone()),
        DynamicValueExpr::Index => ctx.scope.map(|scope| Value::from(scope.index)),
        DynamicValueExpr::BindState { path } => Some(
            BindingRef {
                source: BindingSource::State,
                path: path.clone(),
                index: None,
            }
            .to_descriptor(),
        ),
        DynamicValueExpr::BindItem { field } => Some(
            BindingRef {
                source: BindingSource::Item,
                path: field.clone(),
                index: ctx.scope.map(|scope| scope.index),
            }
            .to_descriptor(),
        ),
    }
}

/// Field lookup inside a repeat item: `""` is the item itself, a leading
/// `/` is a JSON pointer, anything else is a dotted path.
fn item_lookup<'v>(item: &'v Value, field: &str) -> Option<&'v Value> {
    if field.is_empty() {
        return Some(item);
    }
    if field.starts_with('/') {
        return item.pointer(field);
    }
    field.split('.').try_fold(item, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Evaluate a visibility condition. Absent, `null` or malformed conditions
/// are visible.
pub fn evaluate_visibility(condition: Option<&Value>, ctx: &ResolveContext<'_>) -> bool {
    match condition {
        None | Some(Value::Null) => true,
        Some(value) => evaluate_raw(value, ctx),
    }
}

fn evaluate_raw(value: &Value, ctx: &ResolveContext<'_>) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Object(map) if map.len() == 1 && map.contains_key("and") => match &map["and"] {
            Value::Array(items) => items.iter().all(|item| evaluate_raw(item, ctx)),
            _ => true,
        },
        Value::Object(map) if map.len() == 1 && map.contains_key("or") => match &map["or"] {
            Value::Array(items) => items.iter().any(|item| evaluate_raw(item, ctx)),
            _ => true,
        },
        Value::Object(_) => match VisibilityExpr::parse(value) {
            Ok(expr) => evaluate_expr(&expr, ctx),
            Err(_) => true,
        },
        _ => true,
    }
}

fn evaluate_expr(expr: &VisibilityExpr, ctx: &ResolveContext<'_>) -> bool {
    match expr {
        VisibilityExpr::Literal(flag) => *flag,
        VisibilityExpr::Compare {
            state_ref,
            comparator,
            operand,
            negate,
        } => {
            let actual = ctx.state.pointer(state_ref).unwrap_or(&Value::Null);
            comparator.evaluate(actual, operand) != *negate
        }
        VisibilityExpr::And(items) => items.iter().all(|item| evaluate_expr(item, ctx)),
        VisibilityExpr::Or(items) => items.iter().any(|item| evaluate_expr(item, ctx)),
    }
}
