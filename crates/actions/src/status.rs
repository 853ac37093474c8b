//! Read-only status report.

use crate::context::Deepfreeze;
use crate::error::ActionResult;
use deepfreeze_core::{RepoTarget, Settings, ThawSet};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// One repository as shown in the status listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoRow {
    pub name: String,
    /// `M` mounted, `M*` mounted and active, `U` decommissioned, `T` thawed.
    pub state: String,
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
}

/// A lifecycle policy that mounts from the active repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyRow {
    pub name: String,
    pub indices: usize,
    pub data_streams: usize,
}

#[derive(Clone, Debug)]
pub struct StatusReport {
    pub cluster_name: String,
    pub settings: Settings,
    pub active_repo: Option<String>,
    pub active_bucket: Option<String>,
    pub active_base_path: Option<String>,
    pub repositories: Vec<RepoRow>,
    pub policies: Vec<PolicyRow>,
    pub thawsets: Vec<(String, ThawSet)>,
}

pub struct Status;

impl Status {
    /// Gather the report. Issues no writes.
    pub async fn collect(ctx: &Deepfreeze) -> ActionResult<StatusReport> {
        let cluster_name = ctx.cluster.health().await?.cluster_name;
        let settings = ctx.settings().await?;
        let active_repo = settings.active_repo_name();

        let mut rows: BTreeMap<String, RepoRow> = BTreeMap::new();
        for record in ctx.metadata.list_repositories().await? {
            rows.insert(
                record.name.clone(),
                RepoRow {
                    state: record.state_code().to_string(),
                    name: record.name,
                    start: record.start,
                    end: record.end,
                },
            );
        }
        for name in ctx.matching_repositories(&settings.repo_name_prefix).await? {
            let row = rows.entry(name.clone()).or_insert_with(|| RepoRow {
                name: name.clone(),
                state: String::new(),
                start: None,
                end: None,
            });
            row.state = if active_repo.as_deref() == Some(name.as_str()) {
                "M*".to_string()
            } else {
                "M".to_string()
            };
        }

        let (mut active_bucket, mut active_base_path) = (None, None);
        if let Some(active) = &active_repo {
            if let Some(info) = ctx.cluster.get_repository(active).await? {
                active_bucket = info.settings.bucket;
                active_base_path = info.settings.base_path;
            }
            if active_bucket.is_none()
                && let Some(suffix) = &settings.last_suffix
            {
                let target = RepoTarget::derive(&settings, suffix);
                active_bucket = Some(target.bucket);
                active_base_path = Some(target.base_path);
            }
        }

        let mut policies = Vec::new();
        if let Some(active) = &active_repo {
            for (name, entry) in ctx.cluster.list_policies().await? {
                if entry.policy.references_repository(active) {
                    policies.push(PolicyRow {
                        name,
                        indices: entry.in_use_by.indices.len(),
                        data_streams: entry.in_use_by.data_streams.len(),
                    });
                }
            }
        }

        let thawsets = ctx.metadata.list_thawsets().await?;

        Ok(StatusReport {
            cluster_name,
            settings,
            active_repo,
            active_bucket,
            active_base_path,
            repositories: rows.into_values().collect(),
            policies,
            thawsets,
        })
    }
}
