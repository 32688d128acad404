//! Engine rules loader.

use std::path::Path;

use encounter_core::EngineConfig;

use crate::loaders::{LoadResult, read_file};

const EMBEDDED_RULES: &str = include_str!("../../data/rules.toml");

/// Loader for engine configuration from TOML files.
///
/// Missing keys fall back to [`EngineConfig::default`].
pub struct RulesLoader;

impl RulesLoader {
    pub fn load(path: &Path) -> LoadResult<EngineConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    pub fn load_embedded() -> LoadResult<EngineConfig> {
        Self::parse(EMBEDDED_RULES)
    }

    pub fn parse(content: &str) -> LoadResult<EngineConfig> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse rules TOML: {}", e))?;
        if config.rules.defense_divisor == 0 {
            anyhow::bail!("rules.defense_divisor must be greater than zero");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_rules_keep_defaults() {
        let config = RulesLoader::parse("ai_seed = 7\n").unwrap();
        assert_eq!(config.ai_seed, 7);
        assert_eq!(config.rules.defense_divisor, 10);
        assert_eq!(config.item_action_cost, EngineConfig::DEFAULT_ITEM_ACTION_COST);
    }

    #[test]
    fn zero_divisor_is_rejected() {
        let err = RulesLoader::parse("[rules]\ndefense_divisor = 0\nminimum_damage = 1\n")
            .unwrap_err();
        assert!(err.to_string().contains("defense_divisor"));
    }
}
