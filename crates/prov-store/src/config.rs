//! Configuration for [`crate::fs::FsResultTracker`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// On-disk layout knobs for [`crate::fs::FsResultTracker`]. Everything has
/// a sane default so a tracker can be stood up with `FsTrackerConfig::default()`;
/// `from_toml_str`/`load` exist for processes that want the root directory
/// configurable without a recompile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsTrackerConfig {
    /// Root directory the content-addressed tree is rooted at.
    pub root: PathBuf,
}

impl Default for FsTrackerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./prov-data"),
        }
    }
}

impl FsTrackerConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_toml_str(toml_str: &str) -> StorageResult<Self> {
        toml::from_str(toml_str).map_err(|e| StorageError::Backend(e.to_string()))
    }

    pub fn load(path: &std::path::Path) -> StorageResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
