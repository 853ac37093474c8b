//! Command-line tool for deepfreeze snapshot repository rotation.

mod config;
mod render;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use deepfreeze_actions::{
    Deepfreeze, Refreeze, RefreezeOptions, Rotate, RotateOptions, Setup, SetupOptions, Status,
    Thaw, ThawOptions,
};
use deepfreeze_core::settings::{
    DEFAULT_BASE_PATH_PREFIX, DEFAULT_BUCKET_NAME_PREFIX, DEFAULT_CANNED_ACL,
    DEFAULT_REPO_NAME_PREFIX, DEFAULT_STORAGE_CLASS,
};
use deepfreeze_core::{Provider, RotateBy, SuffixStyle, parse_timestamp};
use deepfreeze_storage::{RetrievalTier, StorageClass};
use std::path::Path;
use time::OffsetDateTime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "deepfreeze")]
#[command(about = "Rotate, archive and thaw cold-storage snapshot repositories")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "DEEPFREEZE_CONFIG",
        default_value = "config/deepfreeze.toml"
    )]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Copy)]
struct DryRunArgs {
    /// Report what would change without changing anything
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Args, Clone, Copy)]
struct SuffixArgs {
    /// Year for date-style suffixes (defaults to the current year)
    #[arg(long)]
    year: Option<i32>,
    /// Month for date-style suffixes (defaults to the current month)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=12))]
    month: Option<u8>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the first bucket and repository and store the settings
    Setup {
        #[arg(long, default_value = DEFAULT_REPO_NAME_PREFIX)]
        repo_name_prefix: String,
        #[arg(long, default_value = DEFAULT_BUCKET_NAME_PREFIX)]
        bucket_name_prefix: String,
        #[arg(long, default_value = DEFAULT_BASE_PATH_PREFIX)]
        base_path_prefix: String,
        #[arg(long, default_value = DEFAULT_CANNED_ACL)]
        canned_acl: String,
        /// Storage class written into the repository settings
        #[arg(long, default_value = DEFAULT_STORAGE_CLASS)]
        storage_class: String,
        #[arg(long, default_value = "aws")]
        provider: Provider,
        /// Rotate by `bucket` or `path`
        #[arg(long, default_value = "path")]
        rotate_by: RotateBy,
        /// Suffix style: `oneup` or `date`
        #[arg(long, default_value = "oneup")]
        style: SuffixStyle,
        /// Also create a sample lifecycle policy using the new repository
        #[arg(long, default_value_t = false)]
        create_sample_ilm_policy: bool,
        #[arg(long, default_value = deepfreeze_actions::setup::DEFAULT_ILM_POLICY_NAME)]
        ilm_policy_name: String,
        #[command(flatten)]
        suffix: SuffixArgs,
        #[command(flatten)]
        dry_run: DryRunArgs,
    },
    /// Create the next repository and decommission the oldest
    Rotate {
        /// Number of repositories to keep mounted
        #[arg(long, default_value_t = deepfreeze_actions::rotate::DEFAULT_KEEP)]
        keep: usize,
        #[command(flatten)]
        suffix: SuffixArgs,
        #[command(flatten)]
        dry_run: DryRunArgs,
    },
    /// Restore archived repositories covering a time window
    Thaw {
        /// Start of the window (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        start: OffsetDateTime,
        /// End of the window (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        end: OffsetDateTime,
        /// Days restored copies stay readable
        #[arg(long, default_value_t = deepfreeze_actions::thaw::DEFAULT_RETAIN_DAYS)]
        retain_days: u32,
        /// Retrieval tier: standard, expedited or bulk
        #[arg(long, default_value = "standard")]
        retrieval_tier: RetrievalTier,
        /// Allow repositories spread over several buckets
        #[arg(long, default_value_t = false)]
        enable_multiple_buckets: bool,
        #[command(flatten)]
        dry_run: DryRunArgs,
    },
    /// Return thawed repositories to an archival storage class
    Refreeze {
        /// Repository to refreeze (default: every thawed repository)
        #[arg(long)]
        repo: Option<String>,
        /// Target storage class
        #[arg(long, default_value = "GLACIER")]
        storage_class: String,
        #[command(flatten)]
        dry_run: DryRunArgs,
    },
    /// Show settings, repositories, policies and thaw sets
    Status,
}

fn parse_date(input: &str) -> std::result::Result<OffsetDateTime, String> {
    parse_timestamp(input).map_err(|e| e.to_string())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Cli { config, command } = Cli::parse();
    let config = config::load_config(Path::new(&config))?;
    let ctx = Deepfreeze::from_config(&config).context("failed to initialize clients")?;

    match command {
        Commands::Setup {
            repo_name_prefix,
            bucket_name_prefix,
            base_path_prefix,
            canned_acl,
            storage_class,
            provider,
            rotate_by,
            style,
            create_sample_ilm_policy,
            ilm_policy_name,
            suffix,
            dry_run,
        } => {
            let options = SetupOptions {
                repo_name_prefix,
                bucket_name_prefix,
                base_path_prefix,
                canned_acl,
                storage_class,
                provider,
                rotate_by,
                suffix_style: style,
                year: suffix.year,
                month: suffix.month,
                create_sample_ilm_policy,
                ilm_policy_name,
            };
            let report = Setup::prepare(&ctx, options)
                .await
                .context("setup preconditions failed")?
                .run(dry_run.dry_run)
                .await
                .context("setup failed")?;
            render::setup(&report);
        }
        Commands::Rotate {
            keep,
            suffix,
            dry_run,
        } => {
            let options = RotateOptions {
                keep,
                year: suffix.year,
                month: suffix.month,
            };
            let report = Rotate::prepare(&ctx, options)
                .await
                .context("rotation preconditions failed")?
                .run(dry_run.dry_run)
                .await
                .context("rotation failed")?;
            render::rotation(&report);
        }
        Commands::Thaw {
            start,
            end,
            retain_days,
            retrieval_tier,
            enable_multiple_buckets,
            dry_run,
        } => {
            let options = ThawOptions {
                start,
                end,
                retain_days,
                retrieval_tier,
                enable_multiple_buckets,
            };
            let report = Thaw::prepare(&ctx, options)
                .await
                .context("thaw preconditions failed")?
                .run(dry_run.dry_run)
                .await
                .context("thaw failed")?;
            render::thaw(&report);
            if report.failed() > 0 {
                anyhow::bail!("{} restore requests failed", report.failed());
            }
        }
        Commands::Refreeze {
            repo,
            storage_class,
            dry_run,
        } => {
            let options = RefreezeOptions {
                repo,
                storage_class: StorageClass::parse(&storage_class),
            };
            let report = Refreeze::prepare(&ctx, options)
                .await
                .context("refreeze preconditions failed")?
                .run(dry_run.dry_run)
                .await
                .context("refreeze failed")?;
            render::refreeze(&report);
            if report.failed() > 0 {
                anyhow::bail!("{} objects could not be refrozen", report.failed());
            }
        }
        Commands::Status => {
            let report = Status::collect(&ctx)
                .await
                .context("failed to collect status")?;
            render::status(&report);
        }
    }

    Ok(())
}
