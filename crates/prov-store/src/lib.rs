//! `prov-store`: the `ResultTracker` storage facade.
//!
//! This crate sits one layer above `prov-core`'s digest/codec leaf: it owns
//! the storage-facing interface that the provenance graph resolves
//! against — blobs, call/result records, and the memoization index mapping
//! `(functionName, functionVersion, inputGroupDigest) -> outputDigest` —
//! but content addressing itself (`Digest`, canonical JSON) and `BuildInfo`
//! live in `prov_core`, the actual leaf of the dependency graph.
//!
//! Two implementations ship here. [`memory::InMemoryResultTracker`] is the
//! default for tests and single-process use. [`fs::FsResultTracker`] is the
//! "real" backend: a content-addressed filesystem store sharded the way
//! git shards loose objects, which is the reference adapter over exactly
//! the get/put/list primitives the spec assigns to an external blob store.

pub mod config;
pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use config::FsTrackerConfig;
pub use error::{StorageError, StorageResult};
pub use fs::FsResultTracker;
pub use memory::InMemoryResultTracker;
pub use traits::{MemoEntry, MemoKey, ResultTracker};
