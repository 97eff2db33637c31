//! Build context attached to every result.
//!
//! Capturing this from source control (the commit under test, the CI build
//! that ran it, …) is the job of a separate tool; this crate only threads
//! the value the caller hands it through to storage. There is no
//! process-global "current build" — every [`crate::registry::FunctionRegistry`]-
//! driven resolution is handed the `BuildInfo` it will stamp onto new results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Commit identity plus build identity, attached to every result node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    pub commit_id: String,
    pub build_id: String,
    /// When this build context was captured, matching the teacher's
    /// `created_at`/`completed_at` convention on its own run records.
    pub recorded_at: DateTime<Utc>,
    /// Arbitrary additional build metadata (CI job URL, builder hostname, …).
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl BuildInfo {
    pub fn new(commit_id: impl Into<String>, build_id: impl Into<String>) -> Self {
        Self {
            commit_id: commit_id.into(),
            build_id: build_id.into(),
            recorded_at: Utc::now(),
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn brief(&self) -> BuildInfoBrief {
        BuildInfoBrief {
            commit_id: self.commit_id.clone(),
            build_id: self.build_id.clone(),
        }
    }
}

/// The two identifiers from [`BuildInfo`] without the extra metadata —
/// what gets embedded in a result record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfoBrief {
    pub commit_id: String,
    pub build_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brief_drops_extra_metadata() {
        let info = BuildInfo::new("abc123", "build-42").with_extra("host", "runner-7");
        let brief = info.brief();
        assert_eq!(brief.commit_id, "abc123");
        assert_eq!(brief.build_id, "build-42");
    }
}
