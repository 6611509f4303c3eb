//! Two-pass spec validation.
//!
//! Pass 1 checks shape: field types and the strict parse of every
//! visibility, repeat and action payload. Its failures are bucketed into a
//! few coarse codes by the path that failed. Pass 2 runs only on a clean
//! pass 1 and checks the graph: root, size, allow-list, reachability,
//! depth, cycles, dynamic values and per-type prop contracts.
//!
//! The validator never fails on bad input. Everything it finds ends up in
//! the returned [`ValidationReport`].

mod contracts;
mod graph;
mod schema;

use genui_types::Spec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

pub(crate) use schema::SchemaFailure;

/// Issue codes reported by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    SchemaError,
    InvalidVisibility,
    InvalidRepeat,
    InvalidAction,
    InvalidProps,
    MissingRoot,
    TooManyElements,
    UnknownType,
    MissingChild,
    DepthExceeded,
    CycleDetected,
    InvalidDynamicValue,
}

impl IssueCode {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueCode::SchemaError => "SCHEMA_ERROR",
            IssueCode::InvalidVisibility => "INVALID_VISIBILITY",
            IssueCode::InvalidRepeat => "INVALID_REPEAT",
            IssueCode::InvalidAction => "INVALID_ACTION",
            IssueCode::InvalidProps => "INVALID_PROPS",
            IssueCode::MissingRoot => "MISSING_ROOT",
            IssueCode::TooManyElements => "TOO_MANY_ELEMENTS",
            IssueCode::UnknownType => "UNKNOWN_TYPE",
            IssueCode::MissingChild => "MISSING_CHILD",
            IssueCode::DepthExceeded => "DEPTH_EXCEEDED",
            IssueCode::CycleDetected => "CYCLE_DETECTED",
            IssueCode::InvalidDynamicValue => "INVALID_DYNAMIC_VALUE",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One problem found in a spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
}

impl ValidationIssue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            element_id: None,
        }
    }

    pub fn at(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self
    }
}

/// Outcome of validating one spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
        }
    }

    pub fn has(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }
}

/// Limits and vocabulary applied by a [`Validator`].
#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    /// When set, every element type must be in this set.
    pub allowed_types: Option<BTreeSet<String>>,
    pub max_elements: usize,
    /// Maximum reachable depth; the root is at depth 1.
    pub max_depth: usize,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            allowed_types: None,
            max_elements: 1500,
            max_depth: 30,
        }
    }
}

/// Stateless validator; cheap to clone and share.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    options: ValidatorOptions,
}

impl Validator {
    pub fn new(options: ValidatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Validate an untyped document, as produced by an untrusted source.
    pub fn validate_value(&self, doc: &Value) -> ValidationReport {
        let failures = schema::check_document(doc);
        if !failures.is_empty() {
            return Self::schema_report(failures);
        }
        match serde_json::from_value::<Spec>(doc.clone()) {
            Ok(spec) => self.validate(&spec),
            Err(err) => ValidationReport::from_issues(vec![ValidationIssue::new(
                IssueCode::SchemaError,
                err.to_string(),
            )]),
        }
    }

    /// Validate a decoded spec.
    pub fn validate(&self, spec: &Spec) -> ValidationReport {
        let failures = schema::check_metadata(spec);
        if !failures.is_empty() {
            return Self::schema_report(failures);
        }
        let issues = graph::check(spec, &self.options);
        if !issues.is_empty() {
            tracing::debug!(issues = issues.len(), "spec failed graph checks");
        }
        ValidationReport::from_issues(issues)
    }

    fn schema_report(failures: Vec<SchemaFailure>) -> ValidationReport {
        tracing::debug!(failures = failures.len(), "spec failed schema checks");
        ValidationReport::from_issues(failures.into_iter().map(SchemaFailure::into_issue).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genui_types::Node;
    use serde_json::json;

    fn card() -> Spec {
        let mut spec = Spec::with_root("card");
        spec.insert("card", Node::new("Card").with_children(["title", "body"]));
        spec.insert("title", Node::new("CardTitle").with_prop("text", json!("Pro")));
        spec.insert("body", Node::new("CardContent").with_children(["price"]));
        spec.insert("price", Node::new("Text").with_prop("text", json!("$29")));
        spec
    }

    fn codes(report: &ValidationReport) -> Vec<IssueCode> {
        report.issues.iter().map(|issue| issue.code).collect()
    }

    #[test]
    fn accepts_well_formed_spec() {
        let report = Validator::default().validate(&card());
        assert!(report.valid, "{:?}", report.issues);
    }

    #[test]
    fn schema_failures_are_bucketed_by_path() {
        let doc = json!({
            "root": "a",
            "elements": {
                "a": {"type": "Stack", "children": ["b", "c", "d"], "visible": {"stateRef": "/x"}},
                "b": {"type": "List", "repeat": {"statePath": "items"}},
                "c": {"type": "Button", "on": {"press": {"action": "navigate"}}},
                "d": {"type": "Text", "props": "hello"}
            }
        });
        let report = Validator::default().validate_value(&doc);
        assert!(!report.valid);
        assert_eq!(
            codes(&report),
            vec![
                IssueCode::InvalidVisibility,
                IssueCode::InvalidRepeat,
                IssueCode::InvalidAction,
                IssueCode::InvalidProps,
            ]
        );
        assert_eq!(report.issues[0].element_id.as_deref(), Some("a"));
    }

    #[test]
    fn generic_shape_errors_are_schema_errors() {
        let report = Validator::default().validate_value(&json!({"root": 1, "elements": []}));
        assert!(report.issues.iter().all(|i| i.code == IssueCode::SchemaError));
        assert_eq!(report.issues.len(), 2);

        let report = Validator::default()
            .validate_value(&json!({"root": "a", "elements": {"a": {"children": [1]}}}));
        assert_eq!(codes(&report), vec![IssueCode::SchemaError, IssueCode::SchemaError]);
    }

    #[test]
    fn graph_checks_run_after_clean_schema() {
        let mut spec = card();
        spec.root = "nope".into();
        let report = Validator::default().validate(&spec);
        assert_eq!(codes(&report), vec![IssueCode::MissingRoot]);
    }

    #[test]
    fn allow_list_and_size_ceiling() {
        let options = ValidatorOptions {
            allowed_types: Some(["Card", "CardTitle", "CardContent"].map(String::from).into()),
            max_elements: 3,
            ..ValidatorOptions::default()
        };
        let report = Validator::new(options).validate(&card());
        assert!(report.has(IssueCode::TooManyElements));
        let unknown: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.code == IssueCode::UnknownType)
            .collect();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].element_id.as_deref(), Some("price"));
    }

    #[test]
    fn issues_serialize_with_camel_case() {
        let issue = ValidationIssue::new(IssueCode::MissingChild, "gone").at("card");
        assert_eq!(
            serde_json::to_value(&issue).unwrap(),
            json!({"code": "MISSING_CHILD", "message": "gone", "elementId": "card"})
        );
    }
}
