//! Thaw: restore archived repositories covering a time window.

use crate::context::Deepfreeze;
use crate::error::{ActionError, ActionResult};
use deepfreeze_core::{RepositoryRecord, Settings, ThawSet, ThawedRepo};
use deepfreeze_storage::{ArchiveReport, ObjectStore, RestoreOptions, RetrievalTier, restore_prefix};
use std::collections::BTreeSet;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::instrument;

/// Days a restored copy stays readable by default.
pub const DEFAULT_RETAIN_DAYS: u32 = 7;

/// Parameters for [`Thaw::prepare`].
#[derive(Clone, Copy, Debug)]
pub struct ThawOptions {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
    pub retain_days: u32,
    pub retrieval_tier: RetrievalTier,
    /// Allow a window whose repositories live in more than one bucket.
    pub enable_multiple_buckets: bool,
}

impl ThawOptions {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Self {
        Self {
            start,
            end,
            retain_days: DEFAULT_RETAIN_DAYS,
            retrieval_tier: RetrievalTier::default(),
            enable_multiple_buckets: false,
        }
    }
}

/// Restore outcome for one repository.
#[derive(Clone, Debug)]
pub struct RepoBatch {
    pub name: String,
    pub archive: ArchiveReport,
    /// Set when the repository's objects could not be listed at all.
    pub error: Option<String>,
}

impl RepoBatch {
    pub(crate) fn listed(name: &str, archive: ArchiveReport) -> Self {
        Self {
            name: name.to_string(),
            archive,
            error: None,
        }
    }

    pub(crate) fn unlisted(record: &RepositoryRecord, error: String) -> Self {
        Self {
            name: record.name.clone(),
            archive: ArchiveReport {
                bucket: record.bucket.clone(),
                prefix: record.base_path.clone(),
                ..ArchiveReport::default()
            },
            error: Some(error),
        }
    }

    /// Failed requests, counting an unreadable listing as one.
    pub fn failed(&self) -> usize {
        self.archive.failed + usize::from(self.error.is_some())
    }

    /// Whether the repository's data is restored, restoring, or was never
    /// archived. False when every request failed or the listing did.
    pub fn is_readable(&self) -> bool {
        self.error.is_none() && (self.archive.requested > 0 || self.archive.is_clean())
    }
}

#[derive(Clone, Debug)]
pub struct ThawReport {
    /// Identifier of the persisted thaw set. None in dry-run or when nothing matched.
    pub thawset_id: Option<String>,
    pub thawset: ThawSet,
    pub repos: Vec<RepoBatch>,
    pub dry_run: bool,
}

impl ThawReport {
    pub fn failed(&self) -> usize {
        self.repos.iter().map(RepoBatch::failed).sum()
    }
}

/// A validated thaw request with its matching repositories.
pub struct Thaw<'a> {
    ctx: &'a Deepfreeze,
    store: Arc<dyn ObjectStore>,
    settings: Settings,
    options: ThawOptions,
    matches: Vec<RepositoryRecord>,
}

/// Decommissioned records whose retained range overlaps `[start, end]`, by name.
pub fn overlapping(
    records: Vec<RepositoryRecord>,
    start: OffsetDateTime,
    end: OffsetDateTime,
) -> Vec<RepositoryRecord> {
    let mut matches: Vec<_> = records
        .into_iter()
        .filter(|record| !record.is_mounted && record.overlaps(start, end))
        .collect();
    matches.sort_by(|a, b| a.name.cmp(&b.name));
    matches
}

impl<'a> Thaw<'a> {
    #[instrument(skip(ctx))]
    pub async fn prepare(ctx: &'a Deepfreeze, options: ThawOptions) -> ActionResult<Self> {
        if options.start > options.end {
            return Err(ActionError::InvalidConfiguration(format!(
                "start {} is after end {}",
                options.start, options.end
            )));
        }
        if options.retain_days == 0 {
            return Err(ActionError::InvalidConfiguration(
                "retain_days must be at least 1".to_string(),
            ));
        }

        let settings = ctx.settings().await?;
        let store = ctx.object_store(settings.provider)?;

        let unmounted = ctx.metadata.list_unmounted().await?;
        let matches = overlapping(unmounted, options.start, options.end);

        let buckets: BTreeSet<&str> = matches.iter().map(|r| r.bucket.as_str()).collect();
        if buckets.len() > 1 && !options.enable_multiple_buckets {
            return Err(ActionError::InvalidConfiguration(format!(
                "matching repositories span {} buckets ({}); enable multiple buckets to thaw them",
                buckets.len(),
                buckets.into_iter().collect::<Vec<_>>().join(", ")
            )));
        }

        tracing::debug!(matches = matches.len(), "Thaw prepared");
        Ok(Self {
            ctx,
            store,
            settings,
            options,
            matches,
        })
    }

    /// Repositories selected for the window, sorted by name.
    pub fn matches(&self) -> &[RepositoryRecord] {
        &self.matches
    }

    #[instrument(skip(self), fields(matches = self.matches.len()))]
    pub async fn run(self, dry_run: bool) -> ActionResult<ThawReport> {
        let mut thawset = ThawSet::new(
            self.options.start,
            self.options.end,
            self.options.retain_days,
        );
        let mut repos = Vec::with_capacity(self.matches.len());

        if self.matches.is_empty() {
            tracing::warn!(
                start = %self.options.start,
                end = %self.options.end,
                "No decommissioned repositories overlap the requested window"
            );
        }

        let restore = RestoreOptions {
            days: self.options.retain_days,
            tier: self.options.retrieval_tier,
            dry_run,
        };
        for record in &self.matches {
            let batch =
                match restore_prefix(self.store.as_ref(), &record.bucket, &record.base_path, restore)
                    .await
                {
                    Ok(archive) => RepoBatch::listed(&record.name, archive),
                    Err(e) => {
                        tracing::error!(
                            repo = %record.name,
                            bucket = %record.bucket,
                            error = %e,
                            "Could not list repository objects"
                        );
                        RepoBatch::unlisted(record, e.to_string())
                    }
                };

            if batch.is_readable() {
                if !batch.archive.is_clean() {
                    tracing::warn!(repo = %record.name, failed = batch.archive.failed, "Some restore requests failed");
                }
                if !dry_run {
                    self.ctx.metadata.set_thawed(&record.name, true).await?;
                }
                thawset.add(ThawedRepo::from_record(record, self.settings.provider));
            } else {
                tracing::warn!(
                    repo = %record.name,
                    failed = batch.failed(),
                    "Repository left frozen; no restore could be requested"
                );
            }
            repos.push(batch);
        }

        let thawset_id = if dry_run || thawset.is_empty() {
            None
        } else {
            Some(self.ctx.metadata.save_thawset(&thawset).await?)
        };

        tracing::info!(
            repos = repos.len(),
            thawset = ?thawset_id,
            dry_run,
            "Thaw requested"
        );
        Ok(ThawReport {
            thawset_id,
            thawset,
            repos,
            dry_run,
        })
    }
}
