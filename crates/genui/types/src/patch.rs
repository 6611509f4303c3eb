//! JSON patch operations over a serialized [`Spec`].
//!
//! Patches are the only channel through which graph mutations reach
//! downstream consumers, so application is strict: a missing target or a
//! failed `test` aborts the whole batch.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::pointer;
use crate::spec::Spec;

/// Patch operation kind. Declaration order is the tie-break order used
/// when sorting patches that share a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

/// One atomic mutation addressed by a JSON pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Patch {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.into(),
            from: None,
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: path.into(),
            from: None,
            value: None,
        }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.into(),
            from: None,
            value: Some(value),
        }
    }

    pub fn move_from(from: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Move,
            path: path.into(),
            from: Some(from.into()),
            value: None,
        }
    }

    pub fn copy_from(from: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Copy,
            path: path.into(),
            from: Some(from.into()),
            value: None,
        }
    }

    pub fn test(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Test,
            path: path.into(),
            from: None,
            value: Some(value),
        }
    }
}

/// Patch application failures.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("invalid pointer: {0:?}")]
    InvalidPointer(String),

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("array index out of bounds at {0}")]
    IndexOutOfBounds(String),

    #[error("{op:?} at {path} requires `{field}`")]
    MissingField {
        op: PatchOp,
        path: String,
        field: &'static str,
    },

    #[error("test failed at {0}")]
    TestFailed(String),

    #[error("cannot move {from} into its own child {path}")]
    MoveIntoChild { from: String, path: String },

    #[error("patched document is not a valid spec: {0}")]
    InvalidSpec(#[from] serde_json::Error),
}

/// Apply `patches` in order to a spec and decode the result.
pub fn apply_patches(spec: &Spec, patches: &[Patch]) -> Result<Spec, PatchError> {
    let mut doc = serde_json::to_value(spec)?;
    apply_patches_to_value(&mut doc, patches)?;
    Ok(serde_json::from_value(doc)?)
}

/// Apply `patches` in order to an arbitrary JSON document.
pub fn apply_patches_to_value(doc: &mut Value, patches: &[Patch]) -> Result<(), PatchError> {
    for patch in patches {
        apply_one(doc, patch)?;
    }
    Ok(())
}

fn required_value(patch: &Patch) -> Result<Value, PatchError> {
    patch.value.clone().ok_or_else(|| PatchError::MissingField {
        op: patch.op,
        path: patch.path.clone(),
        field: "value",
    })
}

fn required_from(patch: &Patch) -> Result<&str, PatchError> {
    patch
        .from
        .as_deref()
        .ok_or_else(|| PatchError::MissingField {
            op: patch.op,
            path: patch.path.clone(),
            field: "from",
        })
}

fn apply_one(doc: &mut Value, patch: &Patch) -> Result<(), PatchError> {
    match patch.op {
        PatchOp::Add => insert(doc, &patch.path, required_value(patch)?),
        PatchOp::Remove => take(doc, &patch.path).map(|_| ()),
        PatchOp::Replace => {
            let value = required_value(patch)?;
            let target = lookup_mut(doc, &patch.path)?;
            *target = value;
            Ok(())
        }
        PatchOp::Move => {
            let from = required_from(patch)?;
            if from == patch.path {
                return Ok(());
            }
            if patch.path.starts_with(&format!("{}/", from)) {
                return Err(PatchError::MoveIntoChild {
                    from: from.to_string(),
                    path: patch.path.clone(),
                });
            }
            let value = take(doc, from)?;
            insert(doc, &patch.path, value)
        }
        PatchOp::Copy => {
            let from = required_from(patch)?;
            let value = lookup_mut(doc, from)?.clone();
            insert(doc, &patch.path, value)
        }
        PatchOp::Test => {
            let expected = required_value(patch)?;
            if *lookup_mut(doc, &patch.path)? == expected {
                Ok(())
            } else {
                Err(PatchError::TestFailed(patch.path.clone()))
            }
        }
    }
}

fn split_parent(path: &str) -> Result<(Vec<String>, String), PatchError> {
    let mut tokens =
        pointer::tokens(path).ok_or_else(|| PatchError::InvalidPointer(path.to_string()))?;
    let last = tokens
        .pop()
        .ok_or_else(|| PatchError::InvalidPointer(path.to_string()))?;
    Ok((tokens, last))
}

fn walk_mut<'a>(
    mut current: &'a mut Value,
    tokens: &[String],
    path: &str,
) -> Result<&'a mut Value, PatchError> {
    for token in tokens {
        current = match current {
            Value::Object(map) => map
                .get_mut(token)
                .ok_or_else(|| PatchError::PathNotFound(path.to_string()))?,
            Value::Array(items) => {
                let index = parse_index(token, path)?;
                items
                    .get_mut(index)
                    .ok_or_else(|| PatchError::IndexOutOfBounds(path.to_string()))?
            }
            _ => return Err(PatchError::PathNotFound(path.to_string())),
        };
    }
    Ok(current)
}

fn lookup_mut<'a>(doc: &'a mut Value, path: &str) -> Result<&'a mut Value, PatchError> {
    let tokens =
        pointer::tokens(path).ok_or_else(|| PatchError::InvalidPointer(path.to_string()))?;
    walk_mut(doc, &tokens, path)
}

fn parse_index(token: &str, path: &str) -> Result<usize, PatchError> {
    if token.len() > 1 && token.starts_with('0') {
        return Err(PatchError::InvalidPointer(path.to_string()));
    }
    token
        .parse::<usize>()
        .map_err(|_| PatchError::InvalidPointer(path.to_string()))
}

fn insert(doc: &mut Value, path: &str, value: Value) -> Result<(), PatchError> {
    if path.is_empty() {
        *doc = value;
        return Ok(());
    }
    let (parent_tokens, last) = split_parent(path)?;
    match walk_mut(doc, &parent_tokens, path)? {
        Value::Object(map) => {
            map.insert(last, value);
            Ok(())
        }
        Value::Array(items) => {
            if last == "-" {
                items.push(value);
                return Ok(());
            }
            let index = parse_index(&last, path)?;
            if index > items.len() {
                return Err(PatchError::IndexOutOfBounds(path.to_string()));
            }
            items.insert(index, value);
            Ok(())
        }
        _ => Err(PatchError::PathNotFound(path.to_string())),
    }
}

fn take(doc: &mut Value, path: &str) -> Result<Value, PatchError> {
    if path.is_empty() {
        return Ok(std::mem::take(doc));
    }
    let (parent_tokens, last) = split_parent(path)?;
    match walk_mut(doc, &parent_tokens, path)? {
        Value::Object(map) => map
            .remove(&last)
            .ok_or_else(|| PatchError::PathNotFound(path.to_string())),
        Value::Array(items) => {
            let index = parse_index(&last, path)?;
            if index >= items.len() {
                return Err(PatchError::IndexOutOfBounds(path.to_string()));
            }
            Ok(items.remove(index))
        }
        _ => Err(PatchError::PathNotFound(path.to_string())),
    }
}
