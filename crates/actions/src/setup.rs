//! First-time setup: the initial bucket, repository and settings.

use crate::context::Deepfreeze;
use crate::error::{ActionError, ActionResult};
use deepfreeze_cluster::LifecyclePolicy;
use deepfreeze_core::naming::initial_suffix;
use deepfreeze_core::{Provider, RepoTarget, RepositoryRecord, RotateBy, Settings, SuffixStyle};
use deepfreeze_storage::ObjectStore;
use serde_json::json;
use std::sync::Arc;

pub const DEFAULT_ILM_POLICY_NAME: &str = "deepfreeze-sample-policy";

/// Parameters for [`Setup::prepare`].
#[derive(Clone, Debug)]
pub struct SetupOptions {
    pub repo_name_prefix: String,
    pub bucket_name_prefix: String,
    pub base_path_prefix: String,
    pub canned_acl: String,
    pub storage_class: String,
    pub provider: Provider,
    pub rotate_by: RotateBy,
    pub suffix_style: SuffixStyle,
    /// Date-style suffix overrides.
    pub year: Option<i32>,
    pub month: Option<u8>,
    pub create_sample_ilm_policy: bool,
    pub ilm_policy_name: String,
}

impl Default for SetupOptions {
    fn default() -> Self {
        let settings = Settings::default();
        Self {
            repo_name_prefix: settings.repo_name_prefix,
            bucket_name_prefix: settings.bucket_name_prefix,
            base_path_prefix: settings.base_path_prefix,
            canned_acl: settings.canned_acl,
            storage_class: settings.storage_class,
            provider: settings.provider,
            rotate_by: settings.rotate_by,
            suffix_style: settings.suffix_style,
            year: None,
            month: None,
            create_sample_ilm_policy: false,
            ilm_policy_name: DEFAULT_ILM_POLICY_NAME.to_string(),
        }
    }
}

/// What setup did, or would do in dry-run.
#[derive(Clone, Debug)]
pub struct SetupReport {
    pub target: RepoTarget,
    pub settings: Settings,
    /// Name of the sample lifecycle policy, when one was requested.
    pub sample_policy: Option<String>,
    pub dry_run: bool,
}

/// A validated setup, ready to run.
pub struct Setup<'a> {
    ctx: &'a Deepfreeze,
    store: Arc<dyn ObjectStore>,
    settings: Settings,
    target: RepoTarget,
    sample_policy: Option<String>,
}

impl<'a> Setup<'a> {
    /// Validate options and check that no repository of this rotation exists yet.
    pub async fn prepare(ctx: &'a Deepfreeze, options: SetupOptions) -> ActionResult<Self> {
        let mut settings = Settings {
            repo_name_prefix: options.repo_name_prefix,
            bucket_name_prefix: options.bucket_name_prefix,
            base_path_prefix: options.base_path_prefix,
            canned_acl: options.canned_acl,
            storage_class: options.storage_class,
            provider: options.provider,
            rotate_by: options.rotate_by,
            suffix_style: options.suffix_style,
            last_suffix: None,
        };
        settings
            .validate()
            .map_err(|e| ActionError::InvalidConfiguration(e.to_string()))?;
        if options.create_sample_ilm_policy && options.ilm_policy_name.is_empty() {
            return Err(ActionError::InvalidConfiguration(
                "ilm_policy_name must not be empty".to_string(),
            ));
        }

        let store = ctx.object_store(settings.provider)?;
        let suffix = initial_suffix(settings.suffix_style, options.year, options.month)?;
        let target = RepoTarget::derive(&settings, &suffix);
        settings.last_suffix = Some(suffix);

        let existing = ctx.matching_repositories(&settings.repo_name_prefix).await?;
        if !existing.is_empty() {
            return Err(ActionError::RepositoriesExist {
                prefix: settings.repo_name_prefix,
                existing,
            });
        }

        Ok(Self {
            ctx,
            store,
            settings,
            target,
            sample_policy: options
                .create_sample_ilm_policy
                .then_some(options.ilm_policy_name),
        })
    }

    pub fn target(&self) -> &RepoTarget {
        &self.target
    }

    pub async fn run(self, dry_run: bool) -> ActionResult<SetupReport> {
        let report = SetupReport {
            target: self.target.clone(),
            settings: self.settings.clone(),
            sample_policy: self.sample_policy.clone(),
            dry_run,
        };

        if dry_run {
            tracing::info!(
                repo = %self.target.repo_name,
                bucket = %self.target.bucket,
                base_path = %self.target.base_path,
                "dry-run: would create bucket and register repository"
            );
            return Ok(report);
        }

        self.ctx.metadata.ensure_exists().await?;
        self.ctx
            .provision(self.store.as_ref(), &self.settings, &self.target)
            .await?;
        self.ctx.metadata.save_settings(&self.settings).await?;
        self.ctx
            .metadata
            .upsert_repository(&RepositoryRecord::mounted(
                &self.target.repo_name,
                &self.target.bucket,
                &self.target.base_path,
            ))
            .await?;

        if let Some(name) = &self.sample_policy {
            let policy = sample_policy(&self.target.repo_name)?;
            self.ctx.cluster.put_policy(name, &policy).await?;
            tracing::info!(policy = %name, repo = %self.target.repo_name, "Created sample lifecycle policy");
        }

        tracing::info!(
            repo = %self.target.repo_name,
            "Setup complete; lifecycle policies using this repository must set delete_searchable_snapshot to false"
        );
        Ok(report)
    }
}

/// Lifecycle policy that rolls over hot indices, mounts them from `repo` in
/// the frozen phase and keeps the snapshot when the index is deleted.
pub fn sample_policy(repo: &str) -> ActionResult<LifecyclePolicy> {
    let body = json!({
        "phases": {
            "hot": {
                "min_age": "0ms",
                "actions": {"rollover": {"max_age": "30d", "max_primary_shard_size": "50gb"}}
            },
            "frozen": {
                "min_age": "30d",
                "actions": {"searchable_snapshot": {"snapshot_repository": repo}}
            },
            "delete": {
                "min_age": "365d",
                "actions": {"delete": {"delete_searchable_snapshot": false}}
            }
        }
    });
    serde_json::from_value(body).map_err(|e| ActionError::InvalidConfiguration(e.to_string()))
}
