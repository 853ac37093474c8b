//! Repository traits for metadata operations.

pub mod repositories;
pub mod settings;
pub mod thawsets;

pub use repositories::RepositoryRepo;
pub use settings::SettingsRepo;
pub use thawsets::ThawSetRepo;
