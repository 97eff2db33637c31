//! Filesystem-backed `ResultTracker`.
//!
//! Layout mirrors the blob store key space from the spec, sharded
//! git-style by the first two hex characters of each digest:
//!
//! ```text
//! <root>/data/<aa>/<...>      content blobs
//! <root>/calls/<aa>/<...>     call records
//! <root>/results/<aa>/<...>   result records
//! <root>/memo/<function>/<version>/<input-group-digest>   -> output digest
//! <root>/builds/<aa>/<...>    BuildInfo blobs
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use prov_core::{BuildInfo, Digest};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use crate::config::FsTrackerConfig;
use crate::error::{StorageError, StorageResult};
use crate::traits::{MemoEntry, MemoKey, ResultTracker};

/// Content-addressed store rooted at a directory on disk.
pub struct FsResultTracker {
    root: PathBuf,
    build_info: BuildInfo,
}

impl FsResultTracker {
    /// Open (creating if needed) a filesystem-backed tracker at `root`.
    pub fn new(root: impl AsRef<Path>, build_info: BuildInfo) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        for dir in ["data", "calls", "results", "memo", "builds"] {
            fs::create_dir_all(root.join(dir))?;
        }
        Ok(Self { root, build_info })
    }

    /// Open a tracker at the root named by `config`, the counterpart to
    /// [`new`](Self::new) for processes that load [`FsTrackerConfig`] from
    /// TOML rather than hard-coding a path.
    pub fn from_config(config: &FsTrackerConfig, build_info: BuildInfo) -> StorageResult<Self> {
        Self::new(&config.root, build_info)
    }

    fn shard_path(&self, space: &str, digest: &Digest) -> PathBuf {
        let hex = digest.to_hex();
        self.root.join(space).join(&hex[..2]).join(&hex[2..])
    }

    fn memo_path(&self, key: &MemoKey) -> PathBuf {
        self.root
            .join("memo")
            .join(sanitize(&key.function_name))
            .join(sanitize(&key.function_version))
            .join(key.input_group_digest.to_hex())
    }

    fn write_atomic(path: &Path, data: &[u8]) -> StorageResult<()> {
        if path.exists() {
            return Ok(());
        }
        let dir = path.parent().expect("shard path always has a parent");
        fs::create_dir_all(dir)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data)?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn read_space(&self, space: &str, digest: &Digest) -> StorageResult<Option<Vec<u8>>> {
        let path = self.shard_path(space, digest);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Function/version names embed into path components; keep this narrow
/// rather than trying to escape every OS-reserved character.
fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

#[async_trait]
impl ResultTracker for FsResultTracker {
    #[instrument(skip(self, data))]
    async fn save_blob(&self, data: &[u8]) -> StorageResult<Digest> {
        let digest = Digest::of_bytes(data);
        Self::write_atomic(&self.shard_path("data", &digest), data)?;
        Ok(digest)
    }

    async fn load_blob(&self, digest: &Digest) -> StorageResult<Vec<u8>> {
        self.read_space("data", digest)?
            .ok_or_else(|| StorageError::NotFound {
                digest: digest.to_hex(),
            })
    }

    async fn has_blob(&self, digest: &Digest) -> StorageResult<bool> {
        Ok(self.shard_path("data", digest).exists())
    }

    async fn save_call_record(&self, digest: Digest, bytes: Vec<u8>) -> StorageResult<()> {
        Self::write_atomic(&self.shard_path("calls", &digest), &bytes)
    }

    async fn load_call_record(&self, digest: &Digest) -> StorageResult<Option<Vec<u8>>> {
        self.read_space("calls", digest)
    }

    #[instrument(skip(self, bytes), fields(function_name = %memo_key.function_name))]
    async fn save_result_record(
        &self,
        digest: Digest,
        bytes: Vec<u8>,
        memo_key: MemoKey,
        output_digest: Digest,
    ) -> StorageResult<()> {
        Self::write_atomic(&self.shard_path("results", &digest), &bytes)?;
        // Memo entry written last: a reader that finds the memo entry can
        // always load the result record it points at.
        let memo_bytes = format!("{}\n{}\n", output_digest.to_hex(), digest.to_hex());
        Self::write_atomic(&self.memo_path(&memo_key), memo_bytes.as_bytes())?;
        debug!(%digest, %output_digest, "result record and memo entry persisted");
        Ok(())
    }

    async fn load_result_record(&self, digest: &Digest) -> StorageResult<Option<Vec<u8>>> {
        self.read_space("results", digest)
    }

    #[instrument(skip(self), fields(function_name = %key.function_name))]
    async fn find_memo(&self, key: &MemoKey) -> StorageResult<Option<MemoEntry>> {
        let path = self.memo_path(key);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                debug!("memo hit");
                let mut lines = contents.lines();
                let output_digest = lines
                    .next()
                    .ok_or_else(|| StorageError::Backend("malformed memo entry".to_string()))?
                    .parse()?;
                let result_digest = lines
                    .next()
                    .ok_or_else(|| StorageError::Backend("malformed memo entry".to_string()))?
                    .parse()?;
                Ok(Some(MemoEntry {
                    output_digest,
                    result_digest,
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("memo miss");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save_build_info(&self, info: &BuildInfo) -> StorageResult<Digest> {
        let bytes = serde_json::to_vec(info)?;
        let digest = Digest::of_bytes(&bytes);
        Self::write_atomic(&self.shard_path("builds", &digest), &bytes)?;
        Ok(digest)
    }

    fn current_build_info(&self) -> &BuildInfo {
        &self.build_info
    }
}
