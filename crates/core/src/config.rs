//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default status index holding settings, repository records and thaw sets.
pub const DEFAULT_STATUS_INDEX: &str = "deepfreeze-status";

/// Default document identifier of the settings singleton.
pub const DEFAULT_SETTINGS_ID: &str = "1";

/// Search cluster connection configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Base URL of the cluster REST API.
    #[serde(default = "default_cluster_url")]
    pub url: String,
    /// Basic auth username.
    pub username: Option<String>,
    /// Basic auth password.
    /// WARNING: Prefer DEEPFREEZE_CLUSTER__PASSWORD over storing it in the config file.
    pub password: Option<String>,
    /// Encoded API key, sent as `Authorization: ApiKey <key>`.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_cluster_url() -> String {
    "http://127.0.0.1:9200".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            url: default_cluster_url(),
            username: None,
            password: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClusterConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate cluster configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("cluster.url must not be empty".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("cluster.timeout_secs must be at least 1".to_string());
        }
        match (self.username.as_ref(), self.password.as_ref()) {
            (Some(_), Some(_)) | (None, None) => {}
            _ => {
                return Err(
                    "cluster config requires both username and password when either is set"
                        .to_string(),
                );
            }
        }
        if self.api_key.is_some() && self.username.is_some() {
            return Err("cluster config accepts either api_key or username/password, not both"
                .to_string());
        }
        Ok(())
    }
}

/// Location of the status index inside the cluster.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusConfig {
    /// Index name.
    #[serde(default = "default_status_index")]
    pub index: String,
    /// Document id of the settings singleton.
    #[serde(default = "default_settings_id")]
    pub settings_id: String,
}

fn default_status_index() -> String {
    DEFAULT_STATUS_INDEX.to_string()
}

fn default_settings_id() -> String {
    DEFAULT_SETTINGS_ID.to_string()
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            index: default_status_index(),
            settings_id: default_settings_id(),
        }
    }
}

impl StatusConfig {
    /// Validate status index configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.index.is_empty() || self.index != self.index.to_lowercase() {
            return Err(format!(
                "status.index must be a non-empty lowercase index name, got {:?}",
                self.index
            ));
        }
        if self.settings_id.is_empty() {
            return Err("status.settings_id must not be empty".to_string());
        }
        Ok(())
    }
}

/// Object storage client configuration (connection only; naming lives in settings).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Region. Defaults to us-east-1.
    pub region: Option<String>,
    /// Optional endpoint URL (for MinIO, LocalStack, etc.).
    pub endpoint: Option<String>,
    /// Access key ID. Falls back to the ambient AWS credential chain if not set.
    /// WARNING: Prefer env vars or IAM roles over storing secrets in config files.
    pub access_key_id: Option<String>,
    /// Secret access key. Falls back to the ambient AWS credential chain if not set.
    pub secret_access_key: Option<String>,
    /// Force path-style URLs (`endpoint/bucket/key`). Required for MinIO.
    #[serde(default)]
    pub force_path_style: bool,
}

impl ObjectStoreConfig {
    /// Validate object store configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match (
            self.access_key_id.as_ref(),
            self.secret_access_key.as_ref(),
        ) {
            (Some(_), Some(_)) | (None, None) => Ok(()),
            _ => Err(
                "object_store config requires both access_key_id and secret_access_key when either is set"
                    .to_string(),
            ),
        }
    }
}

/// Top-level configuration for the deepfreeze tool.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cluster connection.
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Status index location.
    #[serde(default)]
    pub status: StatusConfig,
    /// Object store connection.
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
}

impl AppConfig {
    /// Validate every section, reporting the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        self.cluster.validate()?;
        self.status.validate()?;
        self.object_store.validate()?;
        Ok(())
    }
}
