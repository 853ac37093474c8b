//! Persisted rotation settings and the enums they are built from.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default prefix for repository names.
pub const DEFAULT_REPO_NAME_PREFIX: &str = "deepfreeze";
/// Default prefix for bucket names.
pub const DEFAULT_BUCKET_NAME_PREFIX: &str = "deepfreeze";
/// Default prefix for the path inside a bucket where snapshots are written.
pub const DEFAULT_BASE_PATH_PREFIX: &str = "snapshots";
/// Default canned ACL applied to snapshot objects.
pub const DEFAULT_CANNED_ACL: &str = "private";
/// Default storage class for newly written snapshot objects.
pub const DEFAULT_STORAGE_CLASS: &str = "intelligent_tiering";

/// Object storage provider backing the snapshot repositories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Amazon S3.
    Aws,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "aws" => Ok(Self::Aws),
            "gcp" | "azure" => Err(Error::InvalidConfiguration(format!(
                "provider {s} is not implemented"
            ))),
            other => Err(Error::InvalidConfiguration(format!(
                "unsupported provider: {other}"
            ))),
        }
    }
}

/// Which name component changes on every rotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotateBy {
    /// Every rotation gets a new bucket; the base path stays fixed.
    Bucket,
    /// One bucket for all rotations; every rotation gets a new base path.
    Path,
}

impl RotateBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bucket => "bucket",
            Self::Path => "path",
        }
    }
}

impl fmt::Display for RotateBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RotateBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "bucket" => Ok(Self::Bucket),
            "path" => Ok(Self::Path),
            other => Err(Error::InvalidConfiguration(format!(
                "invalid rotate_by value: {other} (expected bucket or path)"
            ))),
        }
    }
}

/// Format of the rotation suffix appended to repository, bucket and path names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuffixStyle {
    /// Zero-padded counter: `000001`, `000002`, ...
    Oneup,
    /// Calendar month: `2024.03`.
    Date,
}

impl SuffixStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Oneup => "oneup",
            Self::Date => "date",
        }
    }
}

impl fmt::Display for SuffixStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuffixStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "oneup" => Ok(Self::Oneup),
            "date" => Ok(Self::Date),
            other => Err(Error::InvalidConfiguration(format!(
                "invalid suffix style: {other} (expected oneup or date)"
            ))),
        }
    }
}

/// Singleton settings document describing naming and rotation behavior.
///
/// `last_suffix` is the suffix of the most recently created repository and is
/// the only field that changes after setup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub repo_name_prefix: String,
    pub bucket_name_prefix: String,
    pub base_path_prefix: String,
    pub canned_acl: String,
    pub storage_class: String,
    pub provider: Provider,
    pub rotate_by: RotateBy,
    #[serde(rename = "style")]
    pub suffix_style: SuffixStyle,
    pub last_suffix: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            repo_name_prefix: DEFAULT_REPO_NAME_PREFIX.to_string(),
            bucket_name_prefix: DEFAULT_BUCKET_NAME_PREFIX.to_string(),
            base_path_prefix: DEFAULT_BASE_PATH_PREFIX.to_string(),
            canned_acl: DEFAULT_CANNED_ACL.to_string(),
            storage_class: DEFAULT_STORAGE_CLASS.to_string(),
            provider: Provider::Aws,
            rotate_by: RotateBy::Path,
            suffix_style: SuffixStyle::Oneup,
            last_suffix: None,
        }
    }
}

impl Settings {
    /// Name of the repository created by the most recent rotation, if any.
    pub fn active_repo_name(&self) -> Option<String> {
        self.last_suffix
            .as_deref()
            .map(|suffix| crate::naming::repo_name(&self.repo_name_prefix, suffix))
    }

    /// Reject prefixes that cannot form valid repository or bucket names.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("repo_name_prefix", &self.repo_name_prefix),
            ("bucket_name_prefix", &self.bucket_name_prefix),
            ("base_path_prefix", &self.base_path_prefix),
        ] {
            if value.is_empty() {
                return Err(Error::InvalidConfiguration(format!(
                    "{field} must not be empty"
                )));
            }
        }
        if self.bucket_name_prefix != self.bucket_name_prefix.to_lowercase() {
            return Err(Error::InvalidConfiguration(format!(
                "bucket_name_prefix must be lowercase: {}",
                self.bucket_name_prefix
            )));
        }
        Ok(())
    }
}
