//! Content factory for loading everything an encounter needs.

use std::path::PathBuf;
use std::sync::Arc;

use encounter_core::{AbilityCatalog, EngineConfig};

use crate::loaders::{CatalogLoader, EnemyLoader, LoadResult, PartyLoader, RulesLoader};
use crate::templates::{Bestiary, PlayerTemplate};

/// Validated content ready to seed encounters.
#[derive(Clone, Debug)]
pub struct ContentBundle {
    pub catalog: Arc<AbilityCatalog>,
    pub bestiary: Bestiary,
    pub party: Vec<PlayerTemplate>,
    pub config: EngineConfig,
}

impl ContentBundle {
    /// Loads the content compiled into this crate.
    pub fn embedded() -> LoadResult<Self> {
        Self::assemble(
            CatalogLoader::load_embedded()?,
            EnemyLoader::load_embedded()?,
            PartyLoader::load_embedded()?,
            RulesLoader::load_embedded()?,
        )
    }

    fn assemble(
        catalog: AbilityCatalog,
        bestiary: Bestiary,
        party: Vec<PlayerTemplate>,
        config: EngineConfig,
    ) -> LoadResult<Self> {
        bestiary
            .validate(&catalog)
            .map_err(|e| anyhow::anyhow!("Enemy templates do not match the catalog: {}", e))?;
        for member in &party {
            if let Some(missing) = member
                .abilities
                .iter()
                .find(|ability| catalog.get_ability_by_id(ability.as_str()).is_none())
            {
                anyhow::bail!(
                    "Party member '{}' references unknown ability '{}'",
                    member.id,
                    missing
                );
            }
        }

        Ok(Self {
            catalog: Arc::new(catalog),
            bestiary,
            party,
            config,
        })
    }
}

/// Content factory that loads all combat content from a data directory.
///
/// # Directory Structure
///
/// ```text
/// data_dir/
/// ├── catalog.ron
/// ├── enemies.ron
/// ├── party.ron
/// └── rules.toml   (optional)
/// ```
pub struct ContentFactory {
    data_dir: PathBuf,
}

impl ContentFactory {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn load_catalog(&self) -> LoadResult<AbilityCatalog> {
        CatalogLoader::load(&self.data_dir.join("catalog.ron"))
    }

    pub fn load_bestiary(&self) -> LoadResult<Bestiary> {
        EnemyLoader::load(&self.data_dir.join("enemies.ron"))
    }

    pub fn load_party(&self) -> LoadResult<Vec<PlayerTemplate>> {
        PartyLoader::load(&self.data_dir.join("party.ron"))
    }

    /// Falls back to the default config when `rules.toml` is absent.
    pub fn load_rules(&self) -> LoadResult<EngineConfig> {
        let path = self.data_dir.join("rules.toml");
        if path.exists() {
            RulesLoader::load(&path)
        } else {
            Ok(EngineConfig::default())
        }
    }

    pub fn load_bundle(&self) -> LoadResult<ContentBundle> {
        ContentBundle::assemble(
            self.load_catalog()?,
            self.load_bestiary()?,
            self.load_party()?,
            self.load_rules()?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_bundle_is_consistent() {
        let bundle = ContentBundle::embedded().unwrap();
        assert!(!bundle.party.is_empty());
        assert!(!bundle.bestiary.is_empty());
        bundle.bestiary.validate(&bundle.catalog).unwrap();
    }
}
