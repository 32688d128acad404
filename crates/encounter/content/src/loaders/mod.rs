//! Content loaders for reading combat data from files.
//!
//! Every loader offers `load(path)` for user-supplied files and
//! `load_embedded()` for the defaults compiled into the crate.

pub mod catalog;
pub mod enemies;
pub mod factory;
pub mod party;
pub mod rules;

pub use catalog::CatalogLoader;
pub use enemies::EnemyLoader;
pub use factory::{ContentBundle, ContentFactory};
pub use party::PartyLoader;
pub use rules::RulesLoader;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
