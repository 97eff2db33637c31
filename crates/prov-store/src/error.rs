//! Errors for the [`crate::ResultTracker`] abstraction.

use thiserror::Error;

use prov_core::DigestError;

/// Errors for the storage trait abstraction (`ResultTracker` and its
/// implementations).
#[derive(Error, Debug)]
pub enum StorageError {
    /// Blob, call, or result record not found by digest.
    #[error("content not found: {digest}")]
    NotFound { digest: String },

    /// A digest string failed to parse (not valid 64-char hex).
    #[error("invalid digest: {0}")]
    InvalidDigest(#[from] DigestError),

    /// Backend I/O error (filesystem, network, …).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Serialization/deserialization error while reading or writing a
    /// stored record.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
