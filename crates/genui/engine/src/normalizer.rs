//! Flattening of nested node trees into a [`Spec`].
//!
//! Producers emit trees where `children` may hold nested node objects or
//! bare string literals. Literals become leaf nodes of the configured text
//! type. Ids are synthesized where missing, from the parent id and child
//! position, and never collide with ids the producer chose.

use genui_types::{Node, NodeId, Spec};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Options controlling normalization.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Node type used for literal string children.
    pub text_node_type: String,
    /// Id used for a root node that carries none.
    pub root_id: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            text_node_type: "Text".to_string(),
            root_id: "root".to_string(),
        }
    }
}

/// Errors raised when a tree cannot be flattened.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("node at {path} is not an object")]
    NotAnObject { path: String },

    #[error("node at {path} has a missing or non-string `type`")]
    InvalidType { path: String },

    #[error("node at {path} has a non-string or empty `id`")]
    InvalidId { path: String },

    #[error("node {id} has non-array `children`")]
    InvalidChildren { id: String },

    #[error("child {index} of node {parent} is neither a node nor a literal")]
    InvalidChild { parent: String, index: usize },

    #[error("duplicate node id {0}")]
    DuplicateId(String),

    #[error("flat spec does not decode: {0}")]
    InvalidFlatSpec(#[from] serde_json::Error),
}

/// Flatten `tree` into a spec.
///
/// A value that already looks flat (`root` + `elements`) is decoded as-is;
/// structural checks on it are left to the validator. A nested root may
/// carry a `state` object, which becomes the spec's state.
pub fn normalize(tree: &Value, options: &NormalizeOptions) -> Result<Spec, NormalizeError> {
    let map = tree.as_object().ok_or_else(|| NormalizeError::NotAnObject {
        path: "$".to_string(),
    })?;

    if map.contains_key("root") && map.contains_key("elements") {
        return Ok(serde_json::from_value(tree.clone())?);
    }

    let mut taken = HashSet::new();
    collect_ids(tree, "$", &mut taken)?;

    let mut flattener = Flattener {
        options,
        taken,
        elements: BTreeMap::new(),
    };
    let root = flattener.visit(map, None, "$")?;

    let state = match map.get("state") {
        Some(Value::Object(state)) => Some(state.clone()),
        _ => None,
    };

    tracing::debug!(root = %root, elements = flattener.elements.len(), "normalized tree");
    Ok(Spec {
        root,
        elements: flattener.elements,
        state,
    })
}

fn explicit_id(map: &Map<String, Value>, path: &str) -> Result<Option<String>, NormalizeError> {
    match map.get("id") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) if !id.is_empty() => Ok(Some(id.clone())),
        Some(_) => Err(NormalizeError::InvalidId {
            path: path.to_string(),
        }),
    }
}

fn collect_ids(
    value: &Value,
    path: &str,
    taken: &mut HashSet<String>,
) -> Result<(), NormalizeError> {
    let Some(map) = value.as_object() else {
        return Ok(());
    };
    if let Some(id) = explicit_id(map, path)? {
        if !taken.insert(id.clone()) {
            return Err(NormalizeError::DuplicateId(id));
        }
    }
    if let Some(Value::Array(children)) = map.get("children") {
        for (index, child) in children.iter().enumerate() {
            collect_ids(child, &format!("{}.children[{}]", path, index), taken)?;
        }
    }
    Ok(())
}

struct Flattener<'o> {
    options: &'o NormalizeOptions,
    taken: HashSet<String>,
    elements: BTreeMap<NodeId, Node>,
}

impl Flattener<'_> {
    /// Reserve `base`, or `base_1`, `base_2`, ... if it is already in use.
    fn allocate(&mut self, base: String) -> String {
        if self.taken.insert(base.clone()) {
            return base;
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    fn visit(
        &mut self,
        map: &Map<String, Value>,
        synthesized: Option<String>,
        path: &str,
    ) -> Result<NodeId, NormalizeError> {
        let node_type = match map.get("type") {
            Some(Value::String(t)) if !t.is_empty() => t.clone(),
            _ => {
                return Err(NormalizeError::InvalidType {
                    path: path.to_string(),
                })
            }
        };
        let id = match explicit_id(map, path)? {
            Some(id) => id,
            None => {
                let base = synthesized.unwrap_or_else(|| self.options.root_id.clone());
                self.allocate(base)
            }
        };

        let mut children = Vec::new();
        match map.get("children") {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) => {
                for (index, child) in items.iter().enumerate() {
                    let child_path = format!("{}.children[{}]", path, index);
                    let child_id = match child {
                        Value::Object(child_map) => {
                            let base = format!(
                                "{}__{}_{}",
                                id,
                                type_slug(child_map.get("type")),
                                index
                            );
                            self.visit(child_map, Some(base), &child_path)?
                        }
                        Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                            self.literal(&id, index, child)
                        }
                        _ => {
                            return Err(NormalizeError::InvalidChild {
                                parent: id.clone(),
                                index,
                            })
                        }
                    };
                    children.push(child_id);
                }
            }
            Some(_) => return Err(NormalizeError::InvalidChildren { id }),
        }

        let node = Node {
            node_type,
            props: map
                .get("props")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
            children,
            visible: non_null(map.get("visible")),
            repeat: non_null(map.get("repeat")),
            on: non_null(map.get("on")),
            watch: non_null(map.get("watch")),
        };
        self.elements.insert(id.clone(), node);
        Ok(id)
    }

    fn literal(&mut self, parent: &str, index: usize, literal: &Value) -> NodeId {
        let text = match literal {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let id = self.allocate(format!("{}__text_{}", parent, index));
        let node = Node::new(self.options.text_node_type.clone())
            .with_prop("text", Value::String(text));
        self.elements.insert(id.clone(), node);
        id
    }
}

fn non_null(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !v.is_null()).cloned()
}

fn type_slug(node_type: Option<&Value>) -> String {
    node_type
        .and_then(Value::as_str)
        .map(|t| {
            t.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| "node".to_string())
}
