//! Deepfreeze actions.
//!
//! Each action is split into `prepare`, which runs every precondition and
//! read-only lookup, and `run(dry_run)`, which performs the changes. A
//! dry-run reports the same decisions without issuing a single write.

pub mod context;
pub mod error;
pub mod refreeze;
pub mod rotate;
pub mod setup;
pub mod status;
pub mod thaw;

pub use context::Deepfreeze;
pub use error::{ActionError, ActionResult};
pub use refreeze::{Refreeze, RefreezeOptions, RefreezeReport};
pub use rotate::{Decommission, PolicyUpdate, Rotate, RotateOptions, RotationReport};
pub use setup::{Setup, SetupOptions, SetupReport};
pub use status::{PolicyRow, RepoRow, Status, StatusReport};
pub use thaw::{RepoBatch, Thaw, ThawOptions, ThawReport};
