//! Errors for the resolution engine. `prov_core::ProvenanceError` covers
//! graph-construction and codec failures; `prov_store::StorageError` covers
//! the tracker backend. This crate is the one place that legitimately
//! depends on both, so it's the one that bridges them.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Provenance(#[from] prov_core::ProvenanceError),

    #[error(transparent)]
    Storage(#[from] prov_store::StorageError),

    /// Serialization errors raised directly against wire records this
    /// crate builds (call/result records), rather than ones routed
    /// through `prov_core`'s codec layer.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Canonical-JSON digesting called directly on a function's raw output,
    /// rather than through a `Codec` (which already routes its own digest
    /// errors through `ProvenanceError`).
    #[error("digest error: {0}")]
    Digest(#[from] prov_core::DigestError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
