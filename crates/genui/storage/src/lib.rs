//! GenUI persistence contract.
//!
//! The orchestrator reads and writes threads only through [`ThreadStore`]:
//! - threads, each with a single active-version pointer
//! - immutable version snapshots of a spec, linked to their parent
//! - assistant messages and generation logs written with each version
//! - failure records for generations that ended in an error
//!
//! [`memory::InMemoryThreadStore`] is the reference adapter.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod model;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryThreadStore;
pub use model::{
    FailureRecord, GenerationLog, MessageRecord, MessageRole, PersistGeneration,
    PersistedGeneration, ThreadBundle, ThreadRecord, VersionRecord,
};
pub use traits::ThreadStore;
