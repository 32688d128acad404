//! Enemy template loader.

use std::path::Path;

use crate::loaders::{LoadResult, read_file};
use crate::templates::{Bestiary, EnemyTemplate};

const EMBEDDED_ENEMIES: &str = include_str!("../../data/enemies.ron");

/// Loader for enemy templates from RON files.
///
/// RON format: `Vec<EnemyTemplate>`
pub struct EnemyLoader;

impl EnemyLoader {
    pub fn load(path: &Path) -> LoadResult<Bestiary> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn load_embedded() -> LoadResult<Bestiary> {
        Self::parse(EMBEDDED_ENEMIES)
    }

    pub fn parse(content: &str) -> LoadResult<Bestiary> {
        let templates: Vec<EnemyTemplate> = ron::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse enemy templates RON: {}", e))?;

        Bestiary::new(templates).map_err(|e| anyhow::anyhow!("Invalid enemy templates: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_templates_spawn() {
        let mut bestiary = EnemyLoader::load_embedded().unwrap();
        let goblin = bestiary.spawn("goblin").unwrap();
        assert_eq!(goblin.id().as_str(), "goblin#1");
        assert!(goblin.is_enemy());
        assert!(!goblin.abilities().is_empty());
    }
}
