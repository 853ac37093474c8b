//! Documents stored in the status index.

use crate::error::{MetadataError, MetadataResult};
use deepfreeze_core::{RepositoryRecord, Settings, ThawSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every document in the status index, discriminated by `doctype`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "doctype", rename_all = "lowercase")]
pub enum StatusDoc {
    Settings(Settings),
    Repository(RepositoryRecord),
    Thawset(ThawSet),
}

impl StatusDoc {
    pub fn doctype(&self) -> &'static str {
        match self {
            Self::Settings(_) => "settings",
            Self::Repository(_) => "repository",
            Self::Thawset(_) => "thawset",
        }
    }

    pub fn to_value(&self) -> MetadataResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode a stored document, rejecting unknown or missing fields.
    pub fn from_value(id: &str, source: Value) -> MetadataResult<Self> {
        serde_json::from_value(source).map_err(|e| MetadataError::InvalidDocument {
            id: id.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn into_settings(self, id: &str) -> MetadataResult<Settings> {
        match self {
            Self::Settings(settings) => Ok(settings),
            other => Err(unexpected(id, "settings", &other)),
        }
    }

    pub fn into_repository(self, id: &str) -> MetadataResult<RepositoryRecord> {
        match self {
            Self::Repository(record) => Ok(record),
            other => Err(unexpected(id, "repository", &other)),
        }
    }

    pub fn into_thawset(self, id: &str) -> MetadataResult<ThawSet> {
        match self {
            Self::Thawset(set) => Ok(set),
            other => Err(unexpected(id, "thawset", &other)),
        }
    }
}

fn unexpected(id: &str, expected: &str, found: &StatusDoc) -> MetadataError {
    MetadataError::InvalidDocument {
        id: id.to_string(),
        reason: format!("expected doctype {expected}, found {}", found.doctype()),
    }
}
