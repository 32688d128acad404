//! Environment-driven configuration for the demo client.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use encounter_core::EngineConfig;
use encounter_runtime::RuntimeConfig;

/// Client configuration.
///
/// Every field can be overridden from the environment (or a `.env` file);
/// unset or unparsable variables keep the defaults.
#[derive(Clone, Debug)]
pub struct CliConfig {
    /// Seed for the enemy policy. Falls back to the rules file.
    pub seed: Option<u64>,
    /// Turn timeout for disconnected players.
    pub turn_timeout: Option<Duration>,
    /// Rules TOML replacing the embedded defaults.
    pub rules_path: Option<PathBuf>,
    pub max_enemy_steps: Option<u32>,
    /// Enemy template keys to spawn, in turn order.
    pub enemies: Vec<String>,
    /// Print events as JSON lines instead of prose.
    pub json_events: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            seed: None,
            turn_timeout: None,
            rules_path: None,
            max_enemy_steps: None,
            enemies: vec!["goblin".into(), "goblin".into(), "shaman".into()],
            json_events: false,
        }
    }
}

impl CliConfig {
    /// Construct configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ENCOUNTER_SEED` - Enemy policy seed
    /// - `ENCOUNTER_TURN_TIMEOUT_MS` - Turn timeout for disconnected players
    /// - `ENCOUNTER_RULES_PATH` - Path to a rules TOML file
    /// - `ENCOUNTER_MAX_STEPS` - Enemy turn loop guard
    /// - `ENCOUNTER_ENEMIES` - Comma separated enemy template keys
    /// - `ENCOUNTER_JSON_EVENTS` - Print events as JSON (`true`/`false`)
    pub fn from_env() -> Self {
        let mut config = Self {
            seed: read_env("ENCOUNTER_SEED"),
            turn_timeout: read_env("ENCOUNTER_TURN_TIMEOUT_MS").map(Duration::from_millis),
            rules_path: read_env("ENCOUNTER_RULES_PATH"),
            max_enemy_steps: read_env::<u32>("ENCOUNTER_MAX_STEPS").map(|steps| steps.max(1)),
            ..Self::default()
        };

        if let Ok(enemies) = env::var("ENCOUNTER_ENEMIES") {
            let keys = parse_list(&enemies);
            if !keys.is_empty() {
                config.enemies = keys;
            }
        }
        if let Some(json) = read_env("ENCOUNTER_JSON_EVENTS") {
            config.json_events = json;
        }

        config
    }

    /// Applies the overrides on top of `base`.
    pub fn engine_config(&self, base: EngineConfig) -> EngineConfig {
        let mut engine = base;
        if let Some(seed) = self.seed {
            engine = engine.with_ai_seed(seed);
        }
        if let Some(steps) = self.max_enemy_steps {
            engine = engine.with_max_enemy_steps(steps);
        }
        engine
    }

    pub fn runtime_config(&self, engine: EngineConfig) -> RuntimeConfig {
        RuntimeConfig {
            engine: self.engine_config(engine),
            turn_timeout: self.turn_timeout,
            ..RuntimeConfig::default()
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_only_touch_what_is_set() {
        let config = CliConfig {
            seed: Some(42),
            ..CliConfig::default()
        };
        let engine = config.engine_config(EngineConfig::default());
        assert_eq!(engine.ai_seed, 42);
        assert_eq!(engine.max_enemy_steps, EngineConfig::DEFAULT_MAX_ENEMY_STEPS);
    }

    #[test]
    fn enemy_lists_skip_blanks() {
        assert_eq!(parse_list(" goblin, ,wolf ,"), vec!["goblin", "wolf"]);
    }
}
