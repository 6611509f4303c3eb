//! Typed views over the dynamic metadata a node may carry.
//!
//! Nodes store these as raw JSON; parsing is strict here, while the
//! runtime resolver falls back to permissive defaults when parsing fails.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::pointer;

/// Shape errors for dynamic expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("expected {expected}, found {found}")]
    WrongType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing required key `{0}`")]
    MissingKey(&'static str),

    #[error("unexpected key `{0}`")]
    UnexpectedKey(String),

    #[error("conflicting keys: {0}")]
    Conflicting(String),

    #[error("`{key}` must be a JSON pointer starting with '/', found {found:?}")]
    NotAPointer { key: &'static str, found: String },

    #[error("{0}")]
    Invalid(String),
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn as_object<'a>(
    value: &'a Value,
    expected: &'static str,
) -> Result<&'a Map<String, Value>, ExprError> {
    value.as_object().ok_or(ExprError::WrongType {
        expected,
        found: kind_of(value),
    })
}

fn pointer_field(map: &Map<String, Value>, key: &'static str) -> Result<String, ExprError> {
    let raw = map.get(key).ok_or(ExprError::MissingKey(key))?;
    let text = raw.as_str().ok_or(ExprError::WrongType {
        expected: "string",
        found: kind_of(raw),
    })?;
    if !pointer::is_state_pointer(text) {
        return Err(ExprError::NotAPointer {
            key,
            found: text.to_string(),
        });
    }
    Ok(text.to_string())
}

fn reject_unknown(map: &Map<String, Value>, allowed: &[&str]) -> Result<(), ExprError> {
    match map.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(ExprError::UnexpectedKey(key.clone())),
        None => Ok(()),
    }
}

// ── Visibility ───────────────────────────────────────────────────────

/// Comparison operator of a visibility condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparator {
    pub const ALL: [Comparator; 6] = [
        Comparator::Eq,
        Comparator::Neq,
        Comparator::Gt,
        Comparator::Gte,
        Comparator::Lt,
        Comparator::Lte,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Comparator::Eq => "eq",
            Comparator::Neq => "neq",
            Comparator::Gt => "gt",
            Comparator::Gte => "gte",
            Comparator::Lt => "lt",
            Comparator::Lte => "lte",
        }
    }

    /// Apply the comparator. Numeric comparators are false unless both
    /// sides are numbers.
    pub fn evaluate(self, actual: &Value, operand: &Value) -> bool {
        match self {
            Comparator::Eq => actual == operand,
            Comparator::Neq => actual != operand,
            _ => {
                let (Some(lhs), Some(rhs)) = (actual.as_f64(), operand.as_f64()) else {
                    return false;
                };
                match self {
                    Comparator::Gt => lhs > rhs,
                    Comparator::Gte => lhs >= rhs,
                    Comparator::Lt => lhs < rhs,
                    Comparator::Lte => lhs <= rhs,
                    Comparator::Eq | Comparator::Neq => false,
                }
            }
        }
    }
}

/// Visibility predicate attached to a node.
#[derive(Debug, Clone, PartialEq)]
pub enum VisibilityExpr {
    Literal(bool),
    Compare {
        state_ref: String,
        comparator: Comparator,
        operand: Value,
        negate: bool,
    },
    And(Vec<VisibilityExpr>),
    Or(Vec<VisibilityExpr>),
}

impl VisibilityExpr {
    /// Strict parse: exactly one comparator per condition, no stray keys.
    pub fn parse(value: &Value) -> Result<Self, ExprError> {
        if let Value::Bool(flag) = value {
            return Ok(VisibilityExpr::Literal(*flag));
        }
        let map = as_object(value, "boolean or object")?;

        if let Some(items) = map.get("and") {
            return Ok(VisibilityExpr::And(parse_combinator(map, "and", items)?));
        }
        if let Some(items) = map.get("or") {
            return Ok(VisibilityExpr::Or(parse_combinator(map, "or", items)?));
        }

        let state_ref = pointer_field(map, "stateRef")?;
        let present = Comparator::ALL
            .into_iter()
            .filter(|cmp| map.contains_key(cmp.key()))
            .collect::<Vec<_>>();
        let comparator = match present.as_slice() {
            [single] => *single,
            [] => {
                return Err(ExprError::Invalid(
                    "condition needs exactly one comparator (eq, neq, gt, gte, lt, lte)"
                        .to_string(),
                ))
            }
            many => {
                return Err(ExprError::Conflicting(
                    many.iter()
                        .map(|cmp| cmp.key())
                        .collect::<Vec<_>>()
                        .join(", "),
                ))
            }
        };
        let negate = match map.get("not") {
            None => false,
            Some(Value::Bool(flag)) => *flag,
            Some(other) => {
                return Err(ExprError::WrongType {
                    expected: "boolean",
                    found: kind_of(other),
                })
            }
        };
        reject_unknown(map, &["stateRef", comparator.key(), "not"])?;

        Ok(VisibilityExpr::Compare {
            state_ref,
            comparator,
            operand: map.get(comparator.key()).cloned().unwrap_or(Value::Null),
            negate,
        })
    }
}

fn parse_combinator(
    map: &Map<String, Value>,
    key: &str,
    items: &Value,
) -> Result<Vec<VisibilityExpr>, ExprError> {
    if map.len() != 1 {
        return Err(ExprError::Conflicting(format!(
            "`{}` cannot be combined with other keys",
            key
        )));
    }
    let items = items.as_array().ok_or(ExprError::WrongType {
        expected: "array",
        found: kind_of(items),
    })?;
    items.iter().map(VisibilityExpr::parse).collect()
}

// ── Dynamic values ───────────────────────────────────────────────────

/// Keys that mark an object as a dynamic value expression.
pub const DYNAMIC_DISCRIMINATORS: [&str; 5] =
    ["stateRef", "itemField", "index", "bindState", "bindItem"];

/// A prop value computed from state or the current repeat item.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicValueExpr {
    StateRef { path: String, default: Option<Value> },
    ItemField { field: String, default: Option<Value> },
    Index,
    BindState { path: String },
    BindItem { field: String },
}

impl DynamicValueExpr {
    /// Discriminator keys present on `map`. `index` only counts when it is
    /// literally `true`, so ordinary `{"index": 3}` props stay plain data.
    pub fn discriminators(map: &Map<String, Value>) -> Vec<&'static str> {
        DYNAMIC_DISCRIMINATORS
            .into_iter()
            .filter(|key| match map.get(*key) {
                Some(Value::Bool(true)) if *key == "index" => true,
                Some(_) => *key != "index",
                None => false,
            })
            .collect()
    }

    /// `None` for plain data objects, otherwise the strict parse result.
    pub fn detect(map: &Map<String, Value>) -> Option<Result<Self, ExprError>> {
        let found = Self::discriminators(map);
        match found.as_slice() {
            [] => None,
            [single] => Some(Self::parse_single(map, *single)),
            many => Some(Err(ExprError::Conflicting(many.join(", ")))),
        }
    }

    fn parse_single(map: &Map<String, Value>, key: &'static str) -> Result<Self, ExprError> {
        match key {
            "stateRef" => {
                reject_unknown(map, &["stateRef", "default"])?;
                Ok(DynamicValueExpr::StateRef {
                    path: pointer_field(map, "stateRef")?,
                    default: map.get("default").cloned(),
                })
            }
            "itemField" => {
                reject_unknown(map, &["itemField", "default"])?;
                let raw = &map["itemField"];
                let field = raw.as_str().ok_or(ExprError::WrongType {
                    expected: "string",
                    found: kind_of(raw),
                })?;
                Ok(DynamicValueExpr::ItemField {
                    field: field.to_string(),
                    default: map.get("default").cloned(),
                })
            }
            "index" => {
                reject_unknown(map, &["index"])?;
                Ok(DynamicValueExpr::Index)
            }
            "bindState" => {
                reject_unknown(map, &["bindState"])?;
                Ok(DynamicValueExpr::BindState {
                    path: pointer_field(map, "bindState")?,
                })
            }
            "bindItem" => {
                reject_unknown(map, &["bindItem"])?;
                match map["bindItem"].as_str() {
                    Some(field) if !field.is_empty() => Ok(DynamicValueExpr::BindItem {
                        field: field.to_string(),
                    }),
                    Some(_) => Err(ExprError::Invalid(
                        "`bindItem` must name a field".to_string(),
                    )),
                    None => Err(ExprError::WrongType {
                        expected: "string",
                        found: kind_of(&map["bindItem"]),
                    }),
                }
            }
            other => Err(ExprError::UnexpectedKey(other.to_string())),
        }
    }
}

/// Where a two-way binding writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingSource {
    State,
    Item,
}

/// Opaque write target produced by `bindState` / `bindItem`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingRef {
    pub source: BindingSource,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl BindingRef {
    pub const DESCRIPTOR_KEY: &'static str = "$binding";

    pub fn to_descriptor(&self) -> Value {
        let mut outer = Map::new();
        outer.insert(
            Self::DESCRIPTOR_KEY.to_string(),
            serde_json::to_value(self).unwrap_or(Value::Null),
        );
        Value::Object(outer)
    }

    pub fn from_descriptor(value: &Value) -> Option<Self> {
        let inner = value.as_object()?.get(Self::DESCRIPTOR_KEY)?;
        serde_json::from_value(inner.clone()).ok()
    }
}

// ── Repeat ───────────────────────────────────────────────────────────

/// Renders a node once per entry of a state array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatSpec {
    pub state_path: String,
    pub key: Option<String>,
}

impl RepeatSpec {
    pub fn parse(value: &Value) -> Result<Self, ExprError> {
        let map = as_object(value, "object")?;
        reject_unknown(map, &["statePath", "key"])?;
        let state_path = pointer_field(map, "statePath")?;
        let key = match map.get("key") {
            None | Some(Value::Null) => None,
            Some(Value::String(key)) => Some(key.clone()),
            Some(other) => {
                return Err(ExprError::WrongType {
                    expected: "string",
                    found: kind_of(other),
                })
            }
        };
        Ok(RepeatSpec { state_path, key })
    }
}

// ── Actions ──────────────────────────────────────────────────────────

/// Closed vocabulary of actions a binding may trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    SetState,
    PushState,
    RemoveState,
    ValidateForm,
}

impl ActionKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "setState" => Some(ActionKind::SetState),
            "pushState" => Some(ActionKind::PushState),
            "removeState" => Some(ActionKind::RemoveState),
            "validateForm" => Some(ActionKind::ValidateForm),
            _ => None,
        }
    }
}

/// One action triggered by an event or a watched state path.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionBinding {
    pub action: ActionKind,
    pub params: Option<Map<String, Value>>,
}

impl ActionBinding {
    /// Parse a binding value: a single binding object or a list of them.
    pub fn parse_list(value: &Value) -> Result<Vec<Self>, ExprError> {
        match value {
            Value::Array(items) if items.is_empty() => {
                Err(ExprError::Invalid("action list is empty".to_string()))
            }
            Value::Array(items) => items.iter().map(Self::parse).collect(),
            other => Ok(vec![Self::parse(other)?]),
        }
    }

    pub fn parse(value: &Value) -> Result<Self, ExprError> {
        let map = as_object(value, "object")?;
        reject_unknown(map, &["action", "params"])?;
        let raw = map.get("action").ok_or(ExprError::MissingKey("action"))?;
        let name = raw.as_str().ok_or(ExprError::WrongType {
            expected: "string",
            found: kind_of(raw),
        })?;
        let action = ActionKind::from_name(name)
            .ok_or_else(|| ExprError::Invalid(format!("unknown action `{}`", name)))?;
        let params = match map.get("params") {
            None | Some(Value::Null) => None,
            Some(Value::Object(params)) => Some(params.clone()),
            Some(other) => {
                return Err(ExprError::WrongType {
                    expected: "object",
                    found: kind_of(other),
                })
            }
        };
        let binding = ActionBinding { action, params };
        binding.check_params()?;
        Ok(binding)
    }

    /// Per-action parameter contract.
    pub fn check_params(&self) -> Result<(), ExprError> {
        let empty = Map::new();
        let params = self.params.as_ref().unwrap_or(&empty);
        match self.action {
            ActionKind::SetState | ActionKind::PushState => {
                pointer_field(params, "statePath")?;
                if !params.contains_key("value") {
                    return Err(ExprError::MissingKey("value"));
                }
            }
            ActionKind::RemoveState => {
                pointer_field(params, "statePath")?;
                if let Some(index) = params.get("index") {
                    if index.as_u64().is_none() {
                        return Err(ExprError::Invalid(
                            "`index` must be a non-negative integer".to_string(),
                        ));
                    }
                }
            }
            ActionKind::ValidateForm => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn visibility_accepts_single_comparator() {
        let expr =
            VisibilityExpr::parse(&json!({"stateRef": "/plan", "eq": "pro", "not": true})).unwrap();
        assert_eq!(
            expr,
            VisibilityExpr::Compare {
                state_ref: "/plan".into(),
                comparator: Comparator::Eq,
                operand: json!("pro"),
                negate: true,
            }
        );
    }

    #[test]
    fn visibility_rejects_two_comparators() {
        let err = VisibilityExpr::parse(&json!({"stateRef": "/n", "gt": 1, "lt": 5})).unwrap_err();
        assert!(matches!(err, ExprError::Conflicting(_)));
    }

    #[test]
    fn visibility_rejects_missing_comparator_and_bad_pointer() {
        assert!(VisibilityExpr::parse(&json!({"stateRef": "/n"})).is_err());
        assert!(VisibilityExpr::parse(&json!({"stateRef": "n", "eq": 1})).is_err());
        assert!(VisibilityExpr::parse(&json!("yes")).is_err());
    }

    #[test]
    fn visibility_combinators_nest() {
        let expr = VisibilityExpr::parse(&json!({
            "or": [true, {"and": [{"stateRef": "/a", "gte": 2}]}]
        }))
        .unwrap();
        assert!(matches!(expr, VisibilityExpr::Or(ref items) if items.len() == 2));
    }

    #[test]
    fn numeric_comparators_need_numbers() {
        assert!(Comparator::Gt.evaluate(&json!(3), &json!(2)));
        assert!(!Comparator::Gt.evaluate(&json!("3"), &json!(2)));
        assert!(Comparator::Neq.evaluate(&json!("3"), &json!(3)));
    }

    #[test]
    fn dynamic_value_detection() {
        let plain = json!({"index": 3, "label": "x"});
        assert!(DynamicValueExpr::detect(plain.as_object().unwrap()).is_none());

        let index = json!({"index": true});
        assert_eq!(
            DynamicValueExpr::detect(index.as_object().unwrap()),
            Some(Ok(DynamicValueExpr::Index))
        );

        let conflict = json!({"stateRef": "/a", "bindState": "/a"});
        assert!(matches!(
            DynamicValueExpr::detect(conflict.as_object().unwrap()),
            Some(Err(ExprError::Conflicting(_)))
        ));

        let stray = json!({"itemField": "name", "fallback": 1});
        assert!(matches!(
            DynamicValueExpr::detect(stray.as_object().unwrap()),
            Some(Err(ExprError::UnexpectedKey(_)))
        ));
    }

    #[test]
    fn binding_descriptor_round_trips() {
        let binding = BindingRef {
            source: BindingSource::State,
            path: "/form/email".into(),
            index: None,
        };
        let descriptor = binding.to_descriptor();
        assert_eq!(
            descriptor,
            json!({"$binding": {"source": "state", "path": "/form/email"}})
        );
        assert_eq!(BindingRef::from_descriptor(&descriptor), Some(binding));
    }

    #[test]
    fn repeat_requires_pointer() {
        assert!(RepeatSpec::parse(&json!({"statePath": "/items", "key": "id"})).is_ok());
        assert!(RepeatSpec::parse(&json!({"statePath": "items"})).is_err());
        assert!(RepeatSpec::parse(&json!({"statePath": "/items", "by": "id"})).is_err());
    }

    #[test]
    fn action_params_contracts() {
        let ok = json!([
            {"action": "setState", "params": {"statePath": "/open", "value": true}},
            {"action": "validateForm"}
        ]);
        assert_eq!(ActionBinding::parse_list(&ok).unwrap().len(), 2);

        let missing_value = json!({"action": "pushState", "params": {"statePath": "/todos"}});
        assert_eq!(
            ActionBinding::parse_list(&missing_value).unwrap_err(),
            ExprError::MissingKey("value")
        );

        let unknown = json!({"action": "navigate"});
        assert!(ActionBinding::parse(&unknown).is_err());

        let bad_index =
            json!({"action": "removeState", "params": {"statePath": "/todos", "index": -1}});
        assert!(ActionBinding::parse(&bad_index).is_err());
    }
}
