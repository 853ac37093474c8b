//! Core domain types and shared logic for deepfreeze.
//!
//! This crate defines the data model used across all other crates:
//! - Rotation settings and the enums they are built from
//! - Suffix computation and repository/bucket/path naming
//! - Repository records and their time ranges
//! - Thaw sets produced by restore requests
//! - Tool configuration

pub mod config;
pub mod error;
pub mod naming;
pub mod repository;
pub mod settings;
pub mod thawset;
pub mod timestamp;

pub use config::{AppConfig, ClusterConfig, ObjectStoreConfig, StatusConfig};
pub use error::{Error, Result};
pub use naming::{RepoTarget, matches_prefix, next_suffix};
pub use repository::RepositoryRecord;
pub use settings::{Provider, RotateBy, Settings, SuffixStyle};
pub use thawset::{ThawSet, ThawedRepo};
pub use timestamp::parse_timestamp;
