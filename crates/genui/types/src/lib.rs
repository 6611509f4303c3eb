//! Core data model for GenUI.
//!
//! A UI description is a flat graph ([`Spec`]): a root id plus a map of
//! node id to [`Node`]. Nodes carry their dynamic metadata (visibility,
//! repeat, action bindings) as raw JSON because it is authored by an
//! untrusted producer; the typed views in [`expr`] are parsed on demand.
//!
//! Graph mutations travel downstream only as ordered [`Patch`] lists.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod expr;
pub mod patch;
pub mod pointer;
mod spec;

pub use expr::{
    ActionBinding, ActionKind, BindingRef, BindingSource, Comparator, DynamicValueExpr,
    ExprError, RepeatSpec, VisibilityExpr,
};
pub use patch::{apply_patches, apply_patches_to_value, Patch, PatchError, PatchOp};
pub use spec::{Node, NodeId, Spec, SpecHash};
