//! In-memory `ResultTracker`, the default for tests and single-process use.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use prov_core::{BuildInfo, Digest};
use tracing::{debug, instrument};

use crate::error::{StorageError, StorageResult};
use crate::traits::{MemoEntry, MemoKey, ResultTracker};

/// `Mutex`-guarded `HashMap`s, one per key space (`data`, `calls`,
/// `results`, `memo`), matching the blob store key space the spec lays out.
pub struct InMemoryResultTracker {
    data: Mutex<HashMap<Digest, Vec<u8>>>,
    calls: Mutex<HashMap<Digest, Vec<u8>>>,
    results: Mutex<HashMap<Digest, Vec<u8>>>,
    memo: Mutex<HashMap<MemoKey, MemoEntry>>,
    build_info: BuildInfo,
}

impl InMemoryResultTracker {
    pub fn new(build_info: BuildInfo) -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            results: Mutex::new(HashMap::new()),
            memo: Mutex::new(HashMap::new()),
            build_info,
        }
    }
}

#[async_trait]
impl ResultTracker for InMemoryResultTracker {
    async fn save_blob(&self, data: &[u8]) -> StorageResult<Digest> {
        let digest = Digest::of_bytes(data);
        self.data.lock().unwrap().entry(digest).or_insert_with(|| data.to_vec());
        Ok(digest)
    }

    async fn load_blob(&self, digest: &Digest) -> StorageResult<Vec<u8>> {
        self.data
            .lock()
            .unwrap()
            .get(digest)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                digest: digest.to_hex(),
            })
    }

    async fn has_blob(&self, digest: &Digest) -> StorageResult<bool> {
        Ok(self.data.lock().unwrap().contains_key(digest))
    }

    async fn save_call_record(&self, digest: Digest, bytes: Vec<u8>) -> StorageResult<()> {
        self.calls.lock().unwrap().entry(digest).or_insert(bytes);
        Ok(())
    }

    async fn load_call_record(&self, digest: &Digest) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.calls.lock().unwrap().get(digest).cloned())
    }

    #[instrument(skip(self, bytes), fields(function_name = %memo_key.function_name))]
    async fn save_result_record(
        &self,
        digest: Digest,
        bytes: Vec<u8>,
        memo_key: MemoKey,
        output_digest: Digest,
    ) -> StorageResult<()> {
        self.results.lock().unwrap().entry(digest).or_insert(bytes);
        // Written last: a reader can never observe a memo entry whose
        // result record isn't there yet.
        self.memo.lock().unwrap().insert(
            memo_key,
            MemoEntry {
                output_digest,
                result_digest: digest,
            },
        );
        debug!(%digest, %output_digest, "result record and memo entry saved");
        Ok(())
    }

    async fn load_result_record(&self, digest: &Digest) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.results.lock().unwrap().get(digest).cloned())
    }

    async fn find_memo(&self, key: &MemoKey) -> StorageResult<Option<MemoEntry>> {
        Ok(self.memo.lock().unwrap().get(key).copied())
    }

    async fn save_build_info(&self, info: &BuildInfo) -> StorageResult<Digest> {
        let bytes = serde_json::to_vec(info)?;
        self.save_blob(&bytes).await
    }

    fn current_build_info(&self) -> &BuildInfo {
        &self.build_info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> InMemoryResultTracker {
        InMemoryResultTracker::new(BuildInfo::new("deadbeef", "build-1"))
    }

    #[tokio::test]
    async fn blob_roundtrip_and_dedupe() {
        let t = tracker();
        let d1 = t.save_blob(b"hello").await.unwrap();
        let d2 = t.save_blob(b"hello").await.unwrap();
        assert_eq!(d1, d2);
        assert_eq!(t.load_blob(&d1).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let t = tracker();
        let missing = Digest::of_bytes(b"never stored");
        assert!(matches!(
            t.load_blob(&missing).await,
            Err(StorageError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn memo_index_resolves_after_save() {
        let t = tracker();
        let input_group = Digest::of_bytes(b"[]");
        let key = MemoKey::new("add", "1.0", input_group);
        assert!(t.find_memo(&key).await.unwrap().is_none());

        let output_digest = t.save_blob(b"5").await.unwrap();
        let result_digest = Digest::of_bytes(b"result-record");
        t.save_result_record(
            result_digest,
            b"record-bytes".to_vec(),
            key.clone(),
            output_digest,
        )
        .await
        .unwrap();

        assert_eq!(
            t.find_memo(&key).await.unwrap(),
            Some(MemoEntry {
                output_digest,
                result_digest
            })
        );
    }

    #[tokio::test]
    async fn current_build_info_is_stable() {
        let t = tracker();
        assert_eq!(t.current_build_info().commit_id, "deadbeef");
    }
}
