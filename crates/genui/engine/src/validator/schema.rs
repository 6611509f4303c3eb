use genui_types::{pointer, ActionBinding, RepeatSpec, Spec, VisibilityExpr};
use serde_json::Value;

use super::{IssueCode, ValidationIssue};

/// A shape failure and the document path where it was found.
#[derive(Debug, Clone)]
pub(crate) struct SchemaFailure {
    pub path: Vec<String>,
    pub message: String,
}

impl SchemaFailure {
    fn new<I, S>(path: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            message: message.into(),
        }
    }

    /// Coarse code, picked by the field under `/elements/<id>/` that failed.
    pub fn code(&self) -> IssueCode {
        if self.path.first().map(String::as_str) != Some("elements") {
            return IssueCode::SchemaError;
        }
        match self.path.get(2).map(String::as_str) {
            Some("visible") => IssueCode::InvalidVisibility,
            Some("repeat") => IssueCode::InvalidRepeat,
            Some("on") | Some("watch") => IssueCode::InvalidAction,
            Some("props") => IssueCode::InvalidProps,
            _ => IssueCode::SchemaError,
        }
    }

    pub fn into_issue(self) -> ValidationIssue {
        let pointer = self
            .path
            .iter()
            .fold(String::new(), |acc, token| pointer::push(&acc, token));
        let mut issue = ValidationIssue::new(self.code(), format!("{}: {}", pointer, self.message));
        if self.path.first().map(String::as_str) == Some("elements") {
            if let Some(id) = self.path.get(1) {
                issue = issue.at(id.clone());
            }
        }
        issue
    }
}

fn kind(value: Option<&Value>) -> &'static str {
    match value {
        None => "nothing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

/// Shape checks over an untyped document.
pub(crate) fn check_document(doc: &Value) -> Vec<SchemaFailure> {
    let mut failures = Vec::new();
    let Some(map) = doc.as_object() else {
        failures.push(SchemaFailure::new(
            Vec::<String>::new(),
            format!("spec must be an object, found {}", kind(Some(doc))),
        ));
        return failures;
    };

    if !matches!(map.get("root"), Some(Value::String(_))) {
        failures.push(SchemaFailure::new(
            ["root"],
            format!("`root` must be a string, found {}", kind(map.get("root"))),
        ));
    }
    if !matches!(map.get("state"), None | Some(Value::Null) | Some(Value::Object(_))) {
        failures.push(SchemaFailure::new(
            ["state"],
            format!("`state` must be an object, found {}", kind(map.get("state"))),
        ));
    }
    match map.get("elements") {
        Some(Value::Object(elements)) => {
            for (id, element) in elements {
                check_element(id, element, &mut failures);
            }
        }
        other => failures.push(SchemaFailure::new(
            ["elements"],
            format!("`elements` must be an object, found {}", kind(other)),
        )),
    }
    failures
}

fn check_element(id: &str, element: &Value, failures: &mut Vec<SchemaFailure>) {
    let Some(fields) = element.as_object() else {
        failures.push(SchemaFailure::new(
            ["elements", id],
            format!("element must be an object, found {}", kind(Some(element))),
        ));
        return;
    };

    match fields.get("type") {
        Some(Value::String(t)) if !t.is_empty() => {}
        other => failures.push(SchemaFailure::new(
            ["elements", id, "type"],
            format!("`type` must be a non-empty string, found {}", kind(other)),
        )),
    }
    if let Some(props) = fields.get("props") {
        check_props(id, props, failures);
    }
    match fields.get("children") {
        None => {}
        Some(Value::Array(children)) => {
            for (index, child) in children.iter().enumerate() {
                if !child.is_string() {
                    let index = index.to_string();
                    failures.push(SchemaFailure::new(
                        ["elements", id, "children", index.as_str()],
                        format!("child ids must be strings, found {}", kind(Some(child))),
                    ));
                }
            }
        }
        Some(other) => failures.push(SchemaFailure::new(
            ["elements", id, "children"],
            format!("`children` must be an array, found {}", kind(Some(other))),
        )),
    }

    check_expressions(
        id,
        non_null(fields.get("visible")),
        non_null(fields.get("repeat")),
        non_null(fields.get("on")),
        non_null(fields.get("watch")),
        failures,
    );
}

fn non_null(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// Shape checks over an already decoded spec. Decoding guarantees field
/// types, so only props and the dynamic metadata remain.
pub(crate) fn check_metadata(spec: &Spec) -> Vec<SchemaFailure> {
    let mut failures = Vec::new();
    for (id, node) in &spec.elements {
        if node.node_type.is_empty() {
            failures.push(SchemaFailure::new(
                ["elements", id.as_str(), "type"],
                "`type` must be a non-empty string",
            ));
        }
        check_props(id, &node.props, &mut failures);
        check_expressions(
            id,
            node.visible.as_ref(),
            node.repeat.as_ref(),
            node.on.as_ref(),
            node.watch.as_ref(),
            &mut failures,
        );
    }
    failures
}

fn check_props(id: &str, props: &Value, failures: &mut Vec<SchemaFailure>) {
    if !props.is_object() {
        failures.push(SchemaFailure::new(
            ["elements", id, "props"],
            format!("`props` must be an object, found {}", kind(Some(props))),
        ));
    }
}

fn check_expressions(
    id: &str,
    visible: Option<&Value>,
    repeat: Option<&Value>,
    on: Option<&Value>,
    watch: Option<&Value>,
    failures: &mut Vec<SchemaFailure>,
) {
    if let Some(visible) = visible {
        if let Err(err) = VisibilityExpr::parse(visible) {
            failures.push(SchemaFailure::new(["elements", id, "visible"], err.to_string()));
        }
    }
    if let Some(repeat) = repeat {
        if let Err(err) = RepeatSpec::parse(repeat) {
            failures.push(SchemaFailure::new(["elements", id, "repeat"], err.to_string()));
        }
    }
    if let Some(on) = on {
        check_bindings(id, "on", on, failures, |key| !key.is_empty());
    }
    if let Some(watch) = watch {
        check_bindings(id, "watch", watch, failures, pointer::is_state_pointer);
    }
}

fn check_bindings(
    id: &str,
    field: &str,
    value: &Value,
    failures: &mut Vec<SchemaFailure>,
    key_ok: impl Fn(&str) -> bool,
) {
    let Some(map) = value.as_object() else {
        failures.push(SchemaFailure::new(
            ["elements", id, field],
            format!("`{}` must be an object, found {}", field, kind(Some(value))),
        ));
        return;
    };
    for (key, bindings) in map {
        let path = ["elements", id, field, key.as_str()];
        if !key_ok(key) {
            failures.push(SchemaFailure::new(path, format!("invalid `{}` key {:?}", field, key)));
            continue;
        }
        if let Err(err) = ActionBinding::parse_list(bindings) {
            failures.push(SchemaFailure::new(path, err.to_string()));
        }
    }
}
