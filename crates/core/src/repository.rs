//! Repository records: the permanent archive entry for every repository.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Persisted metadata for one snapshot repository.
///
/// Created when the repository is provisioned (mounted, no time range),
/// updated with the retained `@timestamp` range when it is decommissioned,
/// and flagged while its objects are thawed. Records are never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryRecord {
    pub name: String,
    pub bucket: String,
    pub base_path: String,
    /// Earliest retained timestamp across the repository's indices.
    #[serde(with = "time::serde::rfc3339::option")]
    pub start: Option<OffsetDateTime>,
    /// Latest retained timestamp across the repository's indices.
    #[serde(with = "time::serde::rfc3339::option")]
    pub end: Option<OffsetDateTime>,
    pub is_mounted: bool,
    pub is_thawed: bool,
}

impl RepositoryRecord {
    /// Record for a freshly provisioned repository.
    pub fn mounted(
        name: impl Into<String>,
        bucket: impl Into<String>,
        base_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            bucket: bucket.into(),
            base_path: base_path.into(),
            start: None,
            end: None,
            is_mounted: true,
            is_thawed: false,
        }
    }

    /// Closed-interval overlap with `[start, end]`.
    ///
    /// A record without a resolved range never overlaps.
    pub fn overlaps(&self, start: OffsetDateTime, end: OffsetDateTime) -> bool {
        match (self.start, self.end) {
            (Some(repo_start), Some(repo_end)) => repo_start <= end && repo_end >= start,
            _ => false,
        }
    }

    /// Single-letter state used in status listings.
    pub fn state_code(&self) -> &'static str {
        if self.is_thawed {
            "T"
        } else if self.is_mounted {
            "M"
        } else {
            "U"
        }
    }
}
