//! Refreeze: return thawed repositories to an archival storage class.

use crate::context::Deepfreeze;
use crate::error::{ActionError, ActionResult};
use crate::thaw::RepoBatch;
use deepfreeze_core::RepositoryRecord;
use deepfreeze_storage::{ObjectStore, StorageClass, refreeze_prefix};
use std::sync::Arc;
use tracing::instrument;

/// Parameters for [`Refreeze::prepare`].
#[derive(Clone, Debug)]
pub struct RefreezeOptions {
    /// Repository to refreeze. None selects every thawed repository.
    pub repo: Option<String>,
    pub storage_class: StorageClass,
}

impl Default for RefreezeOptions {
    fn default() -> Self {
        Self {
            repo: None,
            storage_class: StorageClass::Glacier,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RefreezeReport {
    pub repos: Vec<RepoBatch>,
    /// Repositories whose thawed flag was cleared.
    pub refrozen: Vec<String>,
    pub dry_run: bool,
}

impl RefreezeReport {
    pub fn failed(&self) -> usize {
        self.repos.iter().map(RepoBatch::failed).sum()
    }
}

pub struct Refreeze<'a> {
    ctx: &'a Deepfreeze,
    store: Arc<dyn ObjectStore>,
    storage_class: StorageClass,
    targets: Vec<RepositoryRecord>,
}

impl<'a> Refreeze<'a> {
    #[instrument(skip(ctx))]
    pub async fn prepare(ctx: &'a Deepfreeze, options: RefreezeOptions) -> ActionResult<Self> {
        if !options.storage_class.is_archival() {
            return Err(ActionError::InvalidConfiguration(format!(
                "storage class {} is not an archival class",
                options.storage_class
            )));
        }

        let settings = ctx.settings().await?;
        let store = ctx.object_store(settings.provider)?;

        let targets = match options.repo {
            Some(name) => {
                let record = ctx
                    .metadata
                    .get_repository(&name)
                    .await?
                    .ok_or(ActionError::RepositoryNotFound(name))?;
                if !record.is_thawed {
                    tracing::warn!(repo = %record.name, "Repository is not marked thawed");
                }
                vec![record]
            }
            None => ctx.metadata.list_thawed().await?,
        };

        Ok(Self {
            ctx,
            store,
            storage_class: options.storage_class,
            targets,
        })
    }

    pub fn targets(&self) -> &[RepositoryRecord] {
        &self.targets
    }

    #[instrument(skip(self), fields(targets = self.targets.len(), class = %self.storage_class))]
    pub async fn run(self, dry_run: bool) -> ActionResult<RefreezeReport> {
        let mut report = RefreezeReport {
            repos: Vec::with_capacity(self.targets.len()),
            refrozen: Vec::new(),
            dry_run,
        };

        for record in &self.targets {
            let batch = match refreeze_prefix(
                self.store.as_ref(),
                &record.bucket,
                &record.base_path,
                &self.storage_class,
                dry_run,
            )
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

            if batch.failed() == 0 {
                if !dry_run {
                    self.ctx.metadata.set_thawed(&record.name, false).await?;
                }
                report.refrozen.push(record.name.clone());
            } else {
                tracing::warn!(
                    repo = %record.name,
                    failed = batch.failed(),
                    "Repository stays thawed until every object is refrozen"
                );
            }
            report.repos.push(batch);
        }

        tracing::info!(
            repos = report.repos.len(),
            refrozen = report.refrozen.len(),
            dry_run,
            "Refreeze complete"
        );
        Ok(report)
    }
}
