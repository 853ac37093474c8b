//! Results of a thaw operation.

use crate::repository::RepositoryRecord;
use crate::settings::Provider;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// One repository whose objects were submitted for restoration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThawedRepo {
    pub repo_name: String,
    pub bucket: String,
    pub base_path: String,
    pub provider: Provider,
    /// Indices discovered after the restore completes. Empty when recorded.
    #[serde(default)]
    pub indices: Vec<String>,
}

impl ThawedRepo {
    pub fn from_record(record: &RepositoryRecord, provider: Provider) -> Self {
        Self {
            repo_name: record.name.clone(),
            bucket: record.bucket.clone(),
            base_path: record.base_path.clone(),
            provider,
            indices: Vec::new(),
        }
    }

    pub fn add_index(&mut self, index: impl Into<String>) {
        self.indices.push(index.into());
    }
}

/// Repositories thawed for one requested time window, keyed by repository name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThawSet {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub retain_days: u32,
    pub repos: BTreeMap<String, ThawedRepo>,
}

impl ThawSet {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime, retain_days: u32) -> Self {
        Self {
            start,
            end,
            created_at: OffsetDateTime::now_utc(),
            retain_days,
            repos: BTreeMap::new(),
        }
    }

    /// Add a repository, replacing any entry with the same name.
    pub fn add(&mut self, repo: ThawedRepo) {
        self.repos.insert(repo.repo_name.clone(), repo);
    }

    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }

    pub fn repo_names(&self) -> impl Iterator<Item = &str> {
        self.repos.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_add_overwrites_existing_key() {
        let mut set = ThawSet::new(
            datetime!(2024-01-01 0:00 UTC),
            datetime!(2024-02-01 0:00 UTC),
            7,
        );
        let record = RepositoryRecord::mounted("df-000001", "df", "snapshots-000001");
        set.add(ThawedRepo::from_record(&record, Provider::Aws));

        let mut replacement = ThawedRepo::from_record(&record, Provider::Aws);
        replacement.add_index("logs-2024.01.01");
        set.add(replacement);

        assert_eq!(set.len(), 1);
        assert_eq!(set.repos["df-000001"].indices, vec!["logs-2024.01.01"]);
    }

    #[test]
    fn test_repo_names_are_sorted() {
        let mut set = ThawSet::new(
            datetime!(2024-01-01 0:00 UTC),
            datetime!(2024-02-01 0:00 UTC),
            7,
        );
        for name in ["df-000003", "df-000001", "df-000002"] {
            let record = RepositoryRecord::mounted(name, "df", "snapshots");
            set.add(ThawedRepo::from_record(&record, Provider::Aws));
        }
        let names: Vec<_> = set.repo_names().collect();
        assert_eq!(names, vec!["df-000001", "df-000002", "df-000003"]);
    }
}
