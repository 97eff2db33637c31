//! The `ResultTracker` storage facade.
//!
//! `ResultTracker` is deliberately narrow: it knows nothing about the shape
//! of a call or result record, only that each is a digest-addressed blob of
//! bytes. The graph algebra in `prov-core` owns the `CallSerializable` /
//! `ResultSerializable` schemas and serializes them to bytes before handing
//! them to a tracker; this keeps the storage layer reusable for any
//! encoding the Serializable Mirror evolves into.
//!
//! Guarantees an implementation must uphold:
//! - `save_blob`, `save_call_record`, and `save_result_record` are
//!   idempotent: calling them twice with the same digest is a no-op on the
//!   second call.
//! - Once `save_result_record` returns, a subsequent `find_memo` for that
//!   result's key returns its output digest, even from a different
//!   `ResultTracker` instance backed by the same storage (the "fsynced
//!   before return" contract from the spec).
//! - The memo entry for a result is written last, after the blob and the
//!   result record — a partially-recorded call never has a memo entry
//!   pointing at a record that isn't readable yet.

use async_trait::async_trait;
use prov_core::{BuildInfo, Digest};
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;

/// The memoization key: `(functionName, functionVersion, inputGroupDigest)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoKey {
    pub function_name: String,
    pub function_version: String,
    pub input_group_digest: Digest,
}

impl MemoKey {
    pub fn new(
        function_name: impl Into<String>,
        function_version: impl Into<String>,
        input_group_digest: Digest,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            function_version: function_version.into(),
            input_group_digest,
        }
    }
}

/// What the memoization index maps a [`MemoKey`] to: the output digest
/// (cheap to hand straight back to a caller that only needs the value) and
/// the digest of the full result record (so a cache hit can still recover
/// the `BuildInfo` that produced it, by loading that record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoEntry {
    pub output_digest: Digest,
    pub result_digest: Digest,
}

/// The storage-facing interface: blobs, call/result records, the
/// memoization index, and the current build context.
#[async_trait]
pub trait ResultTracker: Send + Sync {
    /// Store `data` under its content digest. Idempotent.
    async fn save_blob(&self, data: &[u8]) -> StorageResult<Digest>;

    /// Load a previously-saved blob by digest.
    async fn load_blob(&self, digest: &Digest) -> StorageResult<Vec<u8>>;

    /// Check whether a blob exists without reading it.
    async fn has_blob(&self, digest: &Digest) -> StorageResult<bool>;

    /// Persist a call record's serialized bytes under `digest`. Idempotent.
    async fn save_call_record(&self, digest: Digest, bytes: Vec<u8>) -> StorageResult<()>;

    /// Load a call record's serialized bytes, if present.
    async fn load_call_record(&self, digest: &Digest) -> StorageResult<Option<Vec<u8>>>;

    /// Persist a result record's serialized bytes (keyed by its own digest)
    /// and update the memoization index to point `memo_key` at
    /// `output_digest`. The memo index update happens last.
    async fn save_result_record(
        &self,
        digest: Digest,
        bytes: Vec<u8>,
        memo_key: MemoKey,
        output_digest: Digest,
    ) -> StorageResult<()>;

    /// Load a result record's serialized bytes by the result record's own
    /// digest.
    async fn load_result_record(&self, digest: &Digest) -> StorageResult<Option<Vec<u8>>>;

    /// Look up the memoization index: returns the output and result
    /// digests recorded for `key`, if any prior call recorded one.
    async fn find_memo(&self, key: &MemoKey) -> StorageResult<Option<MemoEntry>>;

    /// Persist a `BuildInfo` blob and return its digest.
    async fn save_build_info(&self, info: &BuildInfo) -> StorageResult<Digest>;

    /// The build context this tracker stamps onto newly-recorded results.
    fn current_build_info(&self) -> &BuildInfo;
}
