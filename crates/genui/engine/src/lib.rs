//! GenUI spec engine.
//!
//! Pure, synchronous building blocks used by the generation orchestrator:
//!
//! - [`resolver`]: dynamic values and visibility against state
//! - [`extractor`]: complete JSON objects out of a growing text buffer
//! - [`normalizer`]: nested node trees into a flat [`Spec`](genui_types::Spec)
//! - [`validator`]: two-pass structural and semantic validation
//! - [`catalog`]: component vocabulary and alias table
//! - [`constraints`]: prompt-derived requirements and their checker
//! - [`diff`]: minimal, deterministic patch sets between specs
//! - [`fallback`]: the deterministic spec used when every attempt fails
//!
//! Rendering is permissive (the resolver fails open) while authoring is
//! strict (the validator rejects the same malformed shapes).

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod catalog;
pub mod constraints;
pub mod diff;
pub mod extractor;
pub mod fallback;
pub mod normalizer;
pub mod resolver;
pub mod validator;

pub use catalog::{ComponentCatalog, ComponentRole};
pub use constraints::{ConstraintBuilder, ConstraintSet, ConstraintViolation, ViolationCode};
pub use diff::{diff_specs, diff_values};
pub use extractor::{extract, Extracted, Extraction, MalformedObject, ObjectExtractor};
pub use fallback::{build_fallback, prompt_title};
pub use normalizer::{normalize, NormalizeError, NormalizeOptions};
pub use resolver::{evaluate_visibility, resolve_value, RepeatScope, ResolveContext};
pub use validator::{IssueCode, ValidationIssue, ValidationReport, Validator, ValidatorOptions};
