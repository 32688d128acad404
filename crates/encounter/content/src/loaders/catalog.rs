//! Ability and item catalog loader.

use std::path::Path;

use encounter_core::{AbilityCatalog, AbilityDefinition, ItemDefinition};
use serde::{Deserialize, Serialize};

use crate::loaders::{LoadResult, read_file};

const EMBEDDED_CATALOG: &str = include_str!("../../data/catalog.ron");

/// Catalog file structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub abilities: Vec<AbilityDefinition>,
    #[serde(default)]
    pub items: Vec<ItemDefinition>,
}

/// Loader for the ability catalog from RON files.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Load and validate a catalog from a RON file.
    pub fn load(path: &Path) -> LoadResult<AbilityCatalog> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Load the catalog bundled with the crate.
    pub fn load_embedded() -> LoadResult<AbilityCatalog> {
        Self::parse(EMBEDDED_CATALOG)
    }

    pub fn parse(content: &str) -> LoadResult<AbilityCatalog> {
        let file: CatalogFile = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse ability catalog RON: {}", e))?;

        AbilityCatalog::new(file.abilities, file.items)
            .map_err(|e| anyhow::anyhow!("Invalid ability catalog: {}", e))
    }
}
