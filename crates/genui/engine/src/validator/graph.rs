use genui_types::{DynamicValueExpr, RepeatSpec, Spec};
use serde_json::Value;
use std::collections::HashSet;

use super::contracts;
use super::{IssueCode, ValidationIssue, ValidatorOptions};

pub(super) fn check(spec: &Spec, options: &ValidatorOptions) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if spec.elements.len() > options.max_elements {
        issues.push(ValidationIssue::new(
            IssueCode::TooManyElements,
            format!(
                "spec has {} elements, limit is {}",
                spec.elements.len(),
                options.max_elements
            ),
        ));
    }

    if let Some(allowed) = &options.allowed_types {
        for (id, node) in &spec.elements {
            if !allowed.contains(&node.node_type) {
                issues.push(
                    ValidationIssue::new(
                        IssueCode::UnknownType,
                        format!("type `{}` is not in the component catalog", node.node_type),
                    )
                    .at(id.clone()),
                );
            }
        }
    }

    if spec.root.is_empty() || !spec.elements.contains_key(&spec.root) {
        issues.push(ValidationIssue::new(
            IssueCode::MissingRoot,
            format!("root `{}` is not an element", spec.root),
        ));
    } else {
        let mut walk = Walk {
            spec,
            max_depth: options.max_depth,
            on_path: HashSet::new(),
            visited: HashSet::new(),
            depth_reported: false,
            issues: &mut issues,
        };
        walk.visit(&spec.root, 1);
    }

    let state = spec.state_value();
    for (id, node) in &spec.elements {
        check_dynamic_values(id, &node.props, &mut issues);
        if let Some(Ok(repeat)) = node.repeat.as_ref().map(RepeatSpec::parse) {
            if let Some(current) = state.pointer(&repeat.state_path) {
                if !current.is_array() {
                    issues.push(
                        ValidationIssue::new(
                            IssueCode::InvalidRepeat,
                            format!("repeat source {} is not an array", repeat.state_path),
                        )
                        .at(id.clone()),
                    );
                }
            }
        }
        if let Some(message) = contracts::check(&node.node_type, &node.props) {
            issues.push(ValidationIssue::new(IssueCode::InvalidProps, message).at(id.clone()));
        }
    }

    issues
}

/// Depth-first reachability walk.
///
/// A child already on the current path is a cycle and is reported as
/// `CYCLE_DETECTED`. A child visited through another parent is shared and
/// is not walked again. Both checks happen before the depth comparison, so
/// termination never depends on the depth limit.
struct Walk<'a> {
    spec: &'a Spec,
    max_depth: usize,
    on_path: HashSet<&'a str>,
    visited: HashSet<&'a str>,
    depth_reported: bool,
    issues: &'a mut Vec<ValidationIssue>,
}

impl<'a> Walk<'a> {
    fn visit(&mut self, id: &'a str, depth: usize) {
        let Some(node) = self.spec.elements.get(id) else {
            return;
        };
        self.visited.insert(id);
        self.on_path.insert(id);

        for child in &node.children {
            let child = child.as_str();
            if !self.spec.elements.contains_key(child) {
                self.issues.push(
                    ValidationIssue::new(
                        IssueCode::MissingChild,
                        format!("child `{}` does not exist", child),
                    )
                    .at(id),
                );
                continue;
            }
            if self.on_path.contains(child) {
                self.issues.push(
                    ValidationIssue::new(
                        IssueCode::CycleDetected,
                        format!("`{}` is its own ancestor", child),
                    )
                    .at(id),
                );
                continue;
            }
            if self.visited.contains(child) {
                continue;
            }
            if depth + 1 > self.max_depth {
                if !self.depth_reported {
                    self.depth_reported = true;
                    self.issues.push(
                        ValidationIssue::new(
                            IssueCode::DepthExceeded,
                            format!("graph is deeper than {} levels", self.max_depth),
                        )
                        .at(child),
                    );
                }
                continue;
            }
            self.visit(child, depth + 1);
        }

        self.on_path.remove(id);
    }
}

fn check_dynamic_values(id: &str, value: &Value, issues: &mut Vec<ValidationIssue>) {
    match value {
        Value::Array(items) => {
            for item in items {
                check_dynamic_values(id, item, issues);
            }
        }
        Value::Object(map) => match DynamicValueExpr::detect(map) {
            Some(Ok(_)) => {}
            Some(Err(err)) => issues.push(
                ValidationIssue::new(
                    IssueCode::InvalidDynamicValue,
                    format!("invalid dynamic value: {}", err),
                )
                .at(id),
            ),
            None => {
                for nested in map.values() {
                    check_dynamic_values(id, nested, issues);
                }
            }
        },
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genui_types::Node;
    use serde_json::json;

    fn options(max_depth: usize) -> ValidatorOptions {
        ValidatorOptions {
            max_depth,
            ..ValidatorOptions::default()
        }
    }

    fn codes(issues: &[ValidationIssue]) -> Vec<IssueCode> {
        issues.iter().map(|issue| issue.code).collect()
    }

    fn chain(len: usize) -> Spec {
        let mut spec = Spec::with_root("n0");
        for i in 0..len {
            let node = if i + 1 < len {
                Node::new("Stack").with_children([format!("n{}", i + 1)])
            } else {
                Node::new("Text")
            };
            spec.insert(format!("n{}", i), node);
        }
        spec
    }

    #[test]
    fn reports_missing_children() {
        let mut spec = Spec::with_root("a");
        spec.insert("a", Node::new("Stack").with_children(["ghost"]));
        let issues = check(&spec, &options(30));
        assert_eq!(codes(&issues), vec![IssueCode::MissingChild]);
        assert_eq!(issues[0].element_id.as_deref(), Some("a"));
    }

    #[test]
    fn cycles_are_reported_even_without_depth_limit() {
        let mut spec = Spec::with_root("a");
        spec.insert("a", Node::new("Stack").with_children(["b"]));
        spec.insert("b", Node::new("Stack").with_children(["a"]));
        let issues = check(&spec, &options(usize::MAX));
        assert_eq!(codes(&issues), vec![IssueCode::CycleDetected]);

        let mut spec = Spec::with_root("a");
        spec.insert("a", Node::new("Stack").with_children(["a"]));
        assert_eq!(codes(&check(&spec, &options(30))), vec![IssueCode::CycleDetected]);
    }

    #[test]
    fn shared_children_are_not_cycles() {
        let mut spec = Spec::with_root("a");
        spec.insert("a", Node::new("Stack").with_children(["b", "c"]));
        spec.insert("b", Node::new("Stack").with_children(["c"]));
        spec.insert("c", Node::new("Text"));
        assert!(check(&spec, &options(30)).is_empty());
    }

    #[test]
    fn depth_is_counted_from_root() {
        assert!(check(&chain(3), &options(3)).is_empty());
        let issues = check(&chain(6), &options(3));
        assert_eq!(codes(&issues), vec![IssueCode::DepthExceeded]);
        assert_eq!(issues[0].element_id.as_deref(), Some("n3"));
    }

    #[test]
    fn dynamic_values_are_checked_inside_props() {
        let mut spec = Spec::with_root("a");
        spec.insert(
            "a",
            Node::new("Text")
                .with_prop("text", json!({"stateRef": "/name", "default": "x"}))
                .with_prop("items", json!([{"nested": {"index": true, "extra": 1}}])),
        );
        let issues = check(&spec, &options(30));
        assert_eq!(codes(&issues), vec![IssueCode::InvalidDynamicValue]);
    }

    #[test]
    fn repeat_source_must_be_array_when_present() {
        let mut spec = Spec::with_root("a");
        spec.state = json!({"todos": [], "title": "x"}).as_object().cloned();
        spec.insert("a", Node::new("Stack").with_children(["b", "c", "d"]));
        spec.insert("b", Node::new("Text").with_repeat(json!({"statePath": "/todos"})));
        spec.insert("c", Node::new("Text").with_repeat(json!({"statePath": "/missing"})));
        spec.insert("d", Node::new("Text").with_repeat(json!({"statePath": "/title"})));
        let issues = check(&spec, &options(30));
        assert_eq!(codes(&issues), vec![IssueCode::InvalidRepeat]);
        assert_eq!(issues[0].element_id.as_deref(), Some("d"));
    }
}
