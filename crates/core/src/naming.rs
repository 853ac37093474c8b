//! Rotation suffixes and the repository/bucket/path names derived from them.
//!
//! Everything here is a pure function of its inputs (plus the current date
//! when a date-style suffix is requested without overrides), so setup, rotate
//! and dry-run all compute identical names.

use crate::error::{Error, Result};
use crate::settings::{RotateBy, Settings, SuffixStyle};
use time::OffsetDateTime;

/// Width of a zero-padded `oneup` suffix.
pub const ONEUP_WIDTH: usize = 6;

/// Compute the suffix that follows `last_suffix`.
///
/// `year` and `month` override the current date for the `date` style and are
/// ignored for `oneup`.
pub fn next_suffix(
    style: SuffixStyle,
    last_suffix: Option<&str>,
    year: Option<i32>,
    month: Option<u8>,
) -> Result<String> {
    match style {
        SuffixStyle::Oneup => {
            let last = last_suffix
                .ok_or_else(|| Error::InvalidState("no previous suffix recorded".to_string()))?;
            let value: u64 = last.parse().map_err(|_| {
                Error::InvalidState(format!("last suffix is not numeric: {last:?}"))
            })?;
            let next = value
                .checked_add(1)
                .ok_or_else(|| Error::InvalidState(format!("suffix overflow after {last}")))?;
            Ok(format!("{next:0width$}", width = ONEUP_WIDTH))
        }
        SuffixStyle::Date => date_suffix(year, month),
    }
}

/// Suffix for the very first repository created by setup.
pub fn initial_suffix(style: SuffixStyle, year: Option<i32>, month: Option<u8>) -> Result<String> {
    match style {
        SuffixStyle::Oneup => Ok(format!("{:0width$}", 1, width = ONEUP_WIDTH)),
        SuffixStyle::Date => date_suffix(year, month),
    }
}

fn date_suffix(year: Option<i32>, month: Option<u8>) -> Result<String> {
    let now = OffsetDateTime::now_utc();
    let year = year.unwrap_or_else(|| now.year());
    let month = month.unwrap_or_else(|| u8::from(now.month()));
    if !(1..=12).contains(&month) {
        return Err(Error::InvalidConfiguration(format!(
            "month must be between 1 and 12, got {month}"
        )));
    }
    if !(0..=9999).contains(&year) {
        return Err(Error::InvalidConfiguration(format!(
            "year must have four digits, got {year}"
        )));
    }
    Ok(format!("{year:04}.{month:02}"))
}

/// Repository name for a prefix and suffix.
pub fn repo_name(prefix: &str, suffix: &str) -> String {
    format!("{prefix}-{suffix}")
}

/// Whether a registered repository name belongs to the rotation with `prefix`.
///
/// Matching is case-sensitive and anchored: `deepfreeze-000001` matches the
/// prefix `deepfreeze`, `old-deepfreeze-000001` does not.
pub fn matches_prefix(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .is_some_and(|rest| rest.len() > 1 && rest.starts_with('-'))
}

/// Suffix part of a repository name, if it belongs to `prefix`.
pub fn suffix_of<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    if !matches_prefix(name, prefix) {
        return None;
    }
    name.get(prefix.len() + 1..)
}

/// Sort repository names of one rotation newest first.
///
/// Suffixes compare by length before their text, so `1000000` follows
/// `999999`. Names outside `prefix` compare by their full text.
pub fn sort_newest_first(names: &mut [String], prefix: &str) {
    names.sort_by(|a, b| suffix_key(b, prefix).cmp(&suffix_key(a, prefix)));
}

fn suffix_key<'a>(name: &'a str, prefix: &str) -> (usize, &'a str) {
    let suffix = suffix_of(name, prefix).unwrap_or(name);
    (suffix.len(), suffix)
}

/// Names for one rotation step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepoTarget {
    pub suffix: String,
    pub repo_name: String,
    pub bucket: String,
    pub base_path: String,
}

impl RepoTarget {
    /// Derive the repository, bucket and base path for `suffix`.
    pub fn derive(settings: &Settings, suffix: &str) -> Self {
        let (bucket, base_path) = match settings.rotate_by {
            RotateBy::Bucket => (
                format!("{}-{}", settings.bucket_name_prefix, suffix),
                settings.base_path_prefix.clone(),
            ),
            RotateBy::Path => (
                settings.bucket_name_prefix.clone(),
                format!("{}-{}", settings.base_path_prefix, suffix),
            ),
        };
        Self {
            suffix: suffix.to_string(),
            repo_name: repo_name(&settings.repo_name_prefix, suffix),
            bucket,
            base_path,
        }
    }
}
