//! Error taxonomy for the provenance graph algebra.

use thiserror::Error;

use crate::digest::DigestError;

/// Errors raised while building, saving, or inflating provenance nodes.
#[derive(Debug, Error)]
pub enum ProvenanceError {
    /// A call was asked to save while its `Version` leaf is itself an
    /// unresolved call. The enclosing save should embed the call's
    /// `WithInputs` form rather than a `WithoutInputs` digest stub until
    /// the version resolves.
    #[error("function version is unresolved for call {function_name}")]
    UnresolvedVersion { function_name: String },

    /// A codec/function lookup for `class_name` failed in the current
    /// process. Fatal on load; a no-op for pure transport of the record.
    #[error("class not found: {class_name}")]
    ClassNotFound { class_name: String },

    /// `serialize`/`deserialize` raised.
    #[error("codec failure on {class_name}: {message}")]
    CodecFailure { class_name: String, message: String },

    /// `check_consistency` found that deserialize-then-reserialize did not
    /// round-trip to the same bytes.
    #[error("inconsistent digest for {class_name}: expected {expected}, got {actual}")]
    InconsistentDigest {
        class_name: String,
        expected: String,
        actual: String,
    },

    /// A serializable record carried a `_subclass` discriminator this
    /// process doesn't recognize.
    #[error("unexpected variant discriminator: {0}")]
    UnexpectedVariant(String),

    /// `FunctionRegistry::resolve` found no function registered under this
    /// name. There is no reflective fallback — register the function.
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// Propagated verbatim from canonical-JSON digest computation.
    #[error("digest error: {0}")]
    Digest(#[from] DigestError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProvenanceError>;
