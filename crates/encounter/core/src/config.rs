/// Engine configuration and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Damage mitigation parameters.
    pub rules: crate::pipeline::CombatRules,
    /// Action cost of an item without a linked ability.
    pub item_action_cost: u32,
    /// Upper bound on consecutive enemy turns driven by one request.
    /// Guards against policies that never exhaust their budget.
    pub max_enemy_steps: u32,
    /// Seed for the default enemy policy.
    pub ai_seed: u64,
}

impl EngineConfig {
    // ===== runtime-tunable defaults =====
    pub const DEFAULT_ITEM_ACTION_COST: u32 = 1;
    pub const DEFAULT_MAX_ENEMY_STEPS: u32 = 64;
    pub const DEFAULT_AI_SEED: u64 = 0x5EED;

    pub fn new() -> Self {
        Self {
            rules: crate::pipeline::CombatRules::default(),
            item_action_cost: Self::DEFAULT_ITEM_ACTION_COST,
            max_enemy_steps: Self::DEFAULT_MAX_ENEMY_STEPS,
            ai_seed: Self::DEFAULT_AI_SEED,
        }
    }

    #[must_use]
    pub fn with_ai_seed(mut self, seed: u64) -> Self {
        self.ai_seed = seed;
        self
    }

    #[must_use]
    pub fn with_max_enemy_steps(mut self, steps: u32) -> Self {
        self.max_enemy_steps = steps;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
