//! Request and response shapes of the cluster REST API.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// Upper bound on hits returned by one search (the default result window).
pub const SEARCH_SIZE: usize = 10_000;

/// Field holding event time in snapshotted indices.
pub const TIMESTAMP_FIELD: &str = "@timestamp";

// =============================================================================
// Documents
// =============================================================================

/// Subset of the query DSL used against the status index.
#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    MatchAll,
    /// `match` on one field.
    Match { field: String, value: Value },
    /// Every sub-query must match.
    All(Vec<Query>),
}

impl Query {
    pub fn field(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Match {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn and(self, other: Query) -> Self {
        match self {
            Self::All(mut queries) => {
                queries.push(other);
                Self::All(queries)
            }
            first => Self::All(vec![first, other]),
        }
    }

    /// Render as query DSL.
    pub fn to_json(&self) -> Value {
        match self {
            Self::MatchAll => json!({ "match_all": {} }),
            Self::Match { field, value } => {
                let mut clause = Map::new();
                clause.insert(field.clone(), value.clone());
                json!({ "match": clause })
            }
            Self::All(queries) => {
                let filters: Vec<Value> = queries.iter().map(Query::to_json).collect();
                json!({ "bool": { "filter": filters } })
            }
        }
    }

    /// Evaluate against a document source with exact field equality.
    pub fn matches(&self, source: &Value) -> bool {
        match self {
            Self::MatchAll => true,
            Self::Match { field, value } => source.get(field) == Some(value),
            Self::All(queries) => queries.iter().all(|q| q.matches(source)),
        }
    }
}

/// One search hit.
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub id: String,
    pub source: Value,
}

/// Earliest and latest `@timestamp` across a set of indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimestampRange {
    pub earliest: Option<OffsetDateTime>,
    pub latest: Option<OffsetDateTime>,
}

// =============================================================================
// Snapshot repositories
// =============================================================================

/// Registered snapshot repository.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub settings: RepositorySettings,
}

/// Repository settings. Values come back from the cluster as strings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositorySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canned_acl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RepositoryInfo {
    /// S3 repository definition.
    pub fn s3(
        bucket: impl Into<String>,
        base_path: impl Into<String>,
        canned_acl: impl Into<String>,
        storage_class: impl Into<String>,
    ) -> Self {
        Self {
            kind: "s3".to_string(),
            settings: RepositorySettings {
                bucket: Some(bucket.into()),
                base_path: Some(base_path.into()),
                canned_acl: Some(canned_acl.into()),
                storage_class: Some(storage_class.into()),
                extra: BTreeMap::new(),
            },
        }
    }
}

/// One snapshot and the indices it contains.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub snapshot: String,
    #[serde(default)]
    pub indices: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotList {
    #[serde(default)]
    pub snapshots: Vec<SnapshotInfo>,
}

// =============================================================================
// Lifecycle policies
// =============================================================================

/// A lifecycle policy as returned by `GET /_ilm/policy`, with usage info.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PolicyEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<String>,
    pub policy: LifecyclePolicy,
    #[serde(default)]
    pub in_use_by: InUseBy,
}

/// Indices and data streams managed by a policy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InUseBy {
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default)]
    pub data_streams: Vec<String>,
    #[serde(default)]
    pub composable_templates: Vec<String>,
}

/// Policy body. Unknown keys (such as `_meta`) are carried through unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecyclePolicy {
    #[serde(default)]
    pub phases: BTreeMap<String, Phase>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One lifecycle phase (`hot`, `cold`, `frozen`, `delete`, ...).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    #[serde(default)]
    pub actions: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Phase {
    /// Repository named by this phase's `searchable_snapshot` action.
    pub fn snapshot_repository(&self) -> Option<&str> {
        self.actions
            .get("searchable_snapshot")?
            .get("snapshot_repository")?
            .as_str()
    }

    /// Point the `searchable_snapshot` action at `repo`. Returns false when
    /// the phase has no such action.
    pub fn set_snapshot_repository(&mut self, repo: &str) -> bool {
        match self
            .actions
            .get_mut("searchable_snapshot")
            .and_then(Value::as_object_mut)
        {
            Some(action) => {
                action.insert(
                    "snapshot_repository".to_string(),
                    Value::String(repo.to_string()),
                );
                true
            }
            None => false,
        }
    }
}

impl LifecyclePolicy {
    /// Whether any phase mounts searchable snapshots from `repo`.
    pub fn references_repository(&self, repo: &str) -> bool {
        self.phases
            .values()
            .any(|phase| phase.snapshot_repository() == Some(repo))
    }

    /// Rewrite every phase that points at `from` to point at `to`.
    ///
    /// Returns the names of the rewritten phases; empty means the policy is unchanged.
    pub fn retarget_repository(&mut self, from: &str, to: &str) -> Vec<String> {
        let mut changed = Vec::new();
        for (name, phase) in &mut self.phases {
            if phase.snapshot_repository() == Some(from) && phase.set_snapshot_repository(to) {
                changed.push(name.clone());
            }
        }
        changed
    }

    /// Whether a `delete` phase would delete the searchable snapshot along
    /// with the index. The cluster default is to delete it.
    pub fn deletes_searchable_snapshot(&self) -> bool {
        let Some(delete) = self
            .phases
            .get("delete")
            .and_then(|phase| phase.actions.get("delete"))
        else {
            return false;
        };
        delete
            .get("delete_searchable_snapshot")
            .and_then(Value::as_bool)
            .unwrap_or(true)
    }
}

// =============================================================================
// Cluster
// =============================================================================

/// Response of `GET /_cluster/health`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterHealth {
    pub cluster_name: String,
    pub status: String,
}
