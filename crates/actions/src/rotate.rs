//! Repository rotation.
//!
//! A rotation provisions the next repository, points lifecycle policies at
//! it, and decommissions everything beyond the newest `keep` repositories.
//! Decommissioning records the retained `@timestamp` range before the
//! repository registration is removed; snapshot data in the bucket is never
//! touched.

use crate::context::Deepfreeze;
use crate::error::{ActionError, ActionResult};
use deepfreeze_cluster::ClusterError;
use deepfreeze_core::naming::{next_suffix, sort_newest_first};
use deepfreeze_core::{RepoTarget, RepositoryRecord, Settings};
use deepfreeze_storage::ObjectStore;
use std::collections::BTreeSet;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::instrument;

/// Mounted repositories kept by default.
pub const DEFAULT_KEEP: usize = 6;

/// Parameters for [`Rotate::prepare`].
#[derive(Clone, Copy, Debug)]
pub struct RotateOptions {
    /// Number of newest repositories to leave mounted, including the new one.
    pub keep: usize,
    /// Date-style suffix overrides.
    pub year: Option<i32>,
    pub month: Option<u8>,
}

impl Default for RotateOptions {
    fn default() -> Self {
        Self {
            keep: DEFAULT_KEEP,
            year: None,
            month: None,
        }
    }
}

/// One lifecycle policy pointed at the new repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyUpdate {
    pub name: String,
    /// Phases whose searchable snapshot repository was rewritten.
    pub phases: Vec<String>,
}

/// One repository taken out of service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decommission {
    pub name: String,
    pub bucket: String,
    pub base_path: String,
    pub index_count: usize,
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
}

/// Decisions made by a rotation. A dry-run produces the same report.
#[derive(Clone, Debug)]
pub struct RotationReport {
    pub target: RepoTarget,
    /// Newest repository before this rotation.
    pub latest_repo: String,
    pub policies: Vec<PolicyUpdate>,
    /// Policies whose delete phase would remove searchable snapshots.
    pub delete_warnings: Vec<String>,
    /// Repositories left mounted, newest first.
    pub retained: Vec<String>,
    pub decommissioned: Vec<Decommission>,
    pub dry_run: bool,
}

/// A validated rotation, ready to run.
pub struct Rotate<'a> {
    ctx: &'a Deepfreeze,
    store: Arc<dyn ObjectStore>,
    settings: Settings,
    keep: usize,
    target: RepoTarget,
    latest_repo: String,
    existing: Vec<String>,
}

impl<'a> Rotate<'a> {
    /// Load settings, compute the next target and check it against the
    /// registered repositories.
    #[instrument(skip(ctx))]
    pub async fn prepare(ctx: &'a Deepfreeze, options: RotateOptions) -> ActionResult<Self> {
        if options.keep < 1 {
            return Err(ActionError::InvalidConfiguration(
                "keep must be at least 1".to_string(),
            ));
        }

        let settings = ctx.settings().await?;
        let store = ctx.object_store(settings.provider)?;

        let suffix = next_suffix(
            settings.suffix_style,
            settings.last_suffix.as_deref(),
            options.year,
            options.month,
        )?;
        let target = RepoTarget::derive(&settings, &suffix);

        let existing = ctx.matching_repositories(&settings.repo_name_prefix).await?;
        let Some(latest_repo) = existing.first().cloned() else {
            return Err(ActionError::NoRepositories(settings.repo_name_prefix));
        };
        if existing.contains(&target.repo_name) {
            return Err(ActionError::DuplicateRepository(target.repo_name));
        }

        tracing::debug!(
            new_repo = %target.repo_name,
            latest_repo = %latest_repo,
            existing = existing.len(),
            "Rotation prepared"
        );
        Ok(Self {
            ctx,
            store,
            settings,
            keep: options.keep,
            target,
            latest_repo,
            existing,
        })
    }

    pub fn target(&self) -> &RepoTarget {
        &self.target
    }

    pub fn latest_repo(&self) -> &str {
        &self.latest_repo
    }

    #[instrument(skip(self), fields(new_repo = %self.target.repo_name))]
    pub async fn run(self, dry_run: bool) -> ActionResult<RotationReport> {
        let mut report = RotationReport {
            target: self.target.clone(),
            latest_repo: self.latest_repo.clone(),
            policies: Vec::new(),
            delete_warnings: Vec::new(),
            retained: Vec::new(),
            decommissioned: Vec::new(),
            dry_run,
        };

        if self.latest_repo == self.target.repo_name {
            tracing::info!(repo = %self.latest_repo, "Already rotated; nothing to do");
            report.retained = self.existing.clone();
            return Ok(report);
        }

        if dry_run {
            tracing::info!(
                repo = %self.target.repo_name,
                bucket = %self.target.bucket,
                base_path = %self.target.base_path,
                "dry-run: would create bucket and register repository"
            );
        } else {
            self.ctx.metadata.ensure_exists().await?;
            self.ctx
                .provision(self.store.as_ref(), &self.settings, &self.target)
                .await?;

            let settings = Settings {
                last_suffix: Some(self.target.suffix.clone()),
                ..self.settings.clone()
            };
            self.ctx.metadata.save_settings(&settings).await?;
            self.ctx
                .metadata
                .upsert_repository(&RepositoryRecord::mounted(
                    &self.target.repo_name,
                    &self.target.bucket,
                    &self.target.base_path,
                ))
                .await?;
        }

        self.migrate_policies(dry_run, &mut report).await?;

        let mut repos = self.existing.clone();
        repos.push(self.target.repo_name.clone());
        sort_newest_first(&mut repos, &self.settings.repo_name_prefix);
        repos.dedup();
        let retire = repos.split_off(self.keep.min(repos.len()));
        report.retained = repos;

        for name in retire {
            let decommission = self.decommission(&name, dry_run).await?;
            report.decommissioned.push(decommission);
        }

        tracing::info!(
            new_repo = %self.target.repo_name,
            policies = report.policies.len(),
            decommissioned = report.decommissioned.len(),
            dry_run,
            "Rotation complete"
        );
        Ok(report)
    }

    /// Point every lifecycle phase that uses the latest repository at the new one.
    async fn migrate_policies(
        &self,
        dry_run: bool,
        report: &mut RotationReport,
    ) -> ActionResult<()> {
        let policies = self.ctx.cluster.list_policies().await?;
        for (name, entry) in policies {
            let mut policy = entry.policy;
            let phases = policy.retarget_repository(&self.latest_repo, &self.target.repo_name);
            if phases.is_empty() {
                continue;
            }

            if policy.deletes_searchable_snapshot() {
                tracing::warn!(
                    policy = %name,
                    "Delete phase removes searchable snapshots; set delete_searchable_snapshot to false to keep archived data"
                );
                report.delete_warnings.push(name.clone());
            }

            if dry_run {
                tracing::info!(policy = %name, phases = ?phases, "dry-run: would update policy");
            } else {
                self.ctx.cluster.put_policy(&name, &policy).await?;
                tracing::info!(policy = %name, phases = ?phases, "Policy updated");
            }
            report.policies.push(PolicyUpdate { name, phases });
        }
        Ok(())
    }

    /// Record the retained time range of `name`, then unregister it.
    async fn decommission(&self, name: &str, dry_run: bool) -> ActionResult<Decommission> {
        let cluster = &self.ctx.cluster;

        let info = cluster
            .get_repository(name)
            .await?
            .ok_or_else(|| ClusterError::NotFound(name.to_string()))?;
        let previous = self.ctx.metadata.get_repository(name).await?;
        let bucket = info
            .settings
            .bucket
            .or_else(|| previous.as_ref().map(|r| r.bucket.clone()))
            .ok_or_else(|| {
                ActionError::InvalidConfiguration(format!("repository {name} has no bucket"))
            })?;
        let base_path = info
            .settings
            .base_path
            .or_else(|| previous.as_ref().map(|r| r.base_path.clone()))
            .unwrap_or_default();

        let indices: BTreeSet<String> = cluster
            .list_snapshots(name)
            .await?
            .into_iter()
            .flat_map(|snapshot| snapshot.indices)
            .collect();
        let indices: Vec<String> = indices.into_iter().collect();
        let range = cluster.timestamp_range(&indices).await?;

        let decommission = Decommission {
            name: name.to_string(),
            bucket,
            base_path,
            index_count: indices.len(),
            start: range.earliest,
            end: range.latest,
        };

        if dry_run {
            tracing::info!(repo = %name, indices = indices.len(), "dry-run: would decommission repository");
            return Ok(decommission);
        }

        let record = RepositoryRecord {
            name: decommission.name.clone(),
            bucket: decommission.bucket.clone(),
            base_path: decommission.base_path.clone(),
            start: decommission.start,
            end: decommission.end,
            is_mounted: false,
            is_thawed: previous.is_some_and(|r| r.is_thawed),
        };
        self.ctx.metadata.upsert_repository(&record).await?;
        cluster.delete_repository(name).await?;
        tracing::info!(
            repo = %name,
            start = ?decommission.start,
            end = ?decommission.end,
            "Repository decommissioned"
        );
        Ok(decommission)
    }
}
