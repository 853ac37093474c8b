//! Configuration loading.

use anyhow::{Context, Result};
use deepfreeze_core::AppConfig;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::path::Path;

pub const ENV_PREFIX: &str = "DEEPFREEZE_";

/// Merge the TOML file at `path` (when present) with `DEEPFREEZE_*`
/// environment variables, then validate the result.
///
/// Nested keys use a double underscore: `DEEPFREEZE_CLUSTER__URL`.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let mut figment = Figment::new();

    if path.exists() {
        tracing::debug!(config_path = %path.display(), "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {}", path.display());
    }

    let config: AppConfig = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()
        .context("failed to load configuration")?;
    config
        .validate()
        .map_err(|msg| anyhow::anyhow!("invalid configuration: {msg}"))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.status.index, "deepfreeze-status");
        assert_eq!(config.status.settings_id, "1");
    }

    #[test]
    fn file_values_are_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deepfreeze.toml");
        std::fs::write(
            &path,
            r#"
[cluster]
url = "https://search.internal:9200"
api_key = "c2VjcmV0"
timeout_secs = 15

[status]
index = "df-status"

[object_store]
region = "eu-west-1"
force_path_style = true
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.cluster.url, "https://search.internal:9200");
        assert_eq!(config.cluster.timeout_secs, 15);
        assert_eq!(config.status.index, "df-status");
        assert_eq!(config.object_store.region.as_deref(), Some("eu-west-1"));
        assert!(config.object_store.force_path_style);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deepfreeze.toml");
        std::fs::write(&path, "[cluster]\nusername = \"elastic\"\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(format!("{err:#}").contains("invalid configuration"));
    }
}
