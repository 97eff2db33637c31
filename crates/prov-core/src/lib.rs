//! `prov-core`: content addressing plus the provenance graph algebra.
//!
//! This crate is pure data and pure functions — no async, no I/O, no
//! `ResultTracker`. It is the leaf of the workspace's dependency graph:
//! `prov-store` and `prov-engine` both depend on it, never the reverse. It
//! defines:
//!
//! - [`digest`]: `Digest` and the canonical-JSON content-addressing rule.
//! - [`build`]: `BuildInfo`/`BuildInfoBrief`, the build context attached to
//!   every result.
//! - [`codec`]: the `Codec<T>` trait, digesting helpers bridging typed
//!   values to content-addressed bytes, and `CodecRegistry`.
//! - [`version`]: function version identifiers.
//! - [`virtual_value`]: the tri-state wrapper for values whose
//!   resolvedness depends on an upstream call.
//! - [`graph`]: `ValueWithProvenance<T>` and its six shapes.
//! - [`serializable`]: the tagged-enum wire format for those shapes.
//! - [`registry`]: the function name-to-implementation map.
//!
//! Resolving a pending call against storage (the part that actually needs
//! `ResultTracker` and `async`) lives one layer up, in `prov_engine`.

pub mod build;
pub mod codec;
pub mod digest;
pub mod error;
pub mod graph;
pub mod registry;
pub mod serializable;
pub mod version;
pub mod virtual_value;

pub use build::{BuildInfo, BuildInfoBrief};
pub use codec::{
    check_consistency, digest_bytes, digest_object, digest_value, serialize_and_digest, Codec,
    CodecRegistry, JsonCodec,
};
pub use digest::{canonical_json, digest_json, Digest, DigestError};
pub use error::{ProvenanceError, Result};
pub use graph::{
    FunctionCallDeflatedNode, FunctionCallNode, FunctionCallResultDeflatedNode,
    FunctionCallResultNode, ProvenanceNode, UnknownProvenanceNode, UnknownProvenanceResolvedNode,
    ValueWithProvenance,
};
pub use registry::{Function, FunctionRegistry};
pub use serializable::{input_group_bytes, input_group_digest, Serializable};
pub use version::Version;
pub use virtual_value::VirtualValue;

/// Crate version, exposed the way the teacher exposes its own.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
