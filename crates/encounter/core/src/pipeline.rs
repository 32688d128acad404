//! Ability execution pipeline.
//!
//! Execution is split into a read-only planning pass and an apply pass. Every
//! gate (caster, context, target type, target membership) runs during
//! planning, so a failing invocation never touches the roster. Once planning
//! succeeds the apply pass cannot fail.
//!
//! # Effect formula
//!
//! ```text
//! raw = base_effect + scaling% * caster.<attack|magic> / 100
//! ```
//!
//! Healing abilities that grow with the caster use a negative `scaling`.
//!
//! A negative `raw` heals, a positive `raw` is mitigated by the target's
//! defense through [`Mitigation`] and then applied as damage. Health is
//! always clamped into `[0, max]`.

use tracing::debug;

use crate::catalog::{
    AbilityDefinition, AbilityId, DamageType, ScalingStat, TargetType, UseContext,
};
use crate::combatant::{CombatantId, CoreStats, Roster};
use crate::events::CombatantChange;
use crate::targeting::ResolvedTarget;

// ============================================================================
// Mitigation
// ============================================================================

/// Reduces raw damage according to the defender's stats.
pub trait Mitigation {
    fn mitigate(&self, raw: u32, damage_type: DamageType, defender: &CoreStats) -> u32;
}

/// Linear mitigation parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatRules {
    /// Physical damage is reduced by `floor(defense / defense_divisor)`.
    pub defense_divisor: u32,
    /// Floor for mitigated physical damage.
    pub minimum_damage: u32,
    /// When set, magic damage is mitigated like physical damage with this divisor.
    #[cfg_attr(feature = "serde", serde(default))]
    pub magic_defense_divisor: Option<u32>,
}

impl CombatRules {
    pub const DEFAULT_DEFENSE_DIVISOR: u32 = 10;
    pub const DEFAULT_MINIMUM_DAMAGE: u32 = 1;

    fn reduce(&self, raw: u32, defense: u32, divisor: u32) -> u32 {
        let reduction = defense.checked_div(divisor).unwrap_or(0);
        raw.saturating_sub(reduction).max(self.minimum_damage)
    }
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            defense_divisor: Self::DEFAULT_DEFENSE_DIVISOR,
            minimum_damage: Self::DEFAULT_MINIMUM_DAMAGE,
            magic_defense_divisor: None,
        }
    }
}

impl Mitigation for CombatRules {
    fn mitigate(&self, raw: u32, damage_type: DamageType, defender: &CoreStats) -> u32 {
        match damage_type {
            DamageType::Physical => self.reduce(raw, defender.defense, self.defense_divisor),
            DamageType::Magic => match self.magic_defense_divisor {
                Some(divisor) => self.reduce(raw, defender.defense, divisor),
                None => raw,
            },
            DamageType::Pure => raw,
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum EffectKind {
    Damage,
    Heal,
    /// The ability resolved with zero net magnitude.
    None,
}

/// Effect applied to a single target.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectApplication {
    pub target: CombatantId,
    pub kind: EffectKind,
    /// Health actually removed or restored after clamping.
    pub amount: u32,
    pub health_before: u32,
    pub health_after: u32,
    /// True if this application reduced the target to 0 health.
    pub defeated: bool,
}

/// Structured result of a successful execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbilityOutcome {
    pub caster: CombatantId,
    pub ability: AbilityId,
    pub target_kind: TargetType,
    pub effects: Vec<EffectApplication>,
    pub resource_spent: u32,
    /// One entry per affected combatant, caster included when it spent resources.
    pub changes: Vec<CombatantChange>,
    pub narrative: String,
}

impl AbilityOutcome {
    pub fn total_damage(&self) -> u32 {
        self.effects
            .iter()
            .filter(|effect| effect.kind == EffectKind::Damage)
            .map(|effect| effect.amount)
            .sum()
    }

    pub fn total_healing(&self) -> u32 {
        self.effects
            .iter()
            .filter(|effect| effect.kind == EffectKind::Heal)
            .map(|effect| effect.amount)
            .sum()
    }

    pub fn defeated(&self) -> impl Iterator<Item = &CombatantId> {
        self.effects
            .iter()
            .filter(|effect| effect.defeated)
            .map(|effect| &effect.target)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AbilityError {
    #[error("caster '{0}' is not a living member of the encounter")]
    CasterNotFound(CombatantId),

    #[error("ability '{ability}' cannot be used in context {context}")]
    ContextDenied { ability: AbilityId, context: UseContext },

    #[error("ability '{ability}' does not support target type {target}")]
    TargetTypeUnsupported { ability: AbilityId, target: TargetType },

    #[error("no living combatant matches target type {0}")]
    TargetNotFound(TargetType),
}

// ============================================================================
// Pipeline
// ============================================================================

/// Planned change for one target, computed before anything is mutated.
struct PlannedEffect {
    index: usize,
    kind: EffectKind,
    magnitude: u32,
}

/// Validates and applies abilities against a roster.
#[derive(Clone, Debug, Default)]
pub struct AbilityPipeline<M = CombatRules> {
    mitigation: M,
}

impl<M: Mitigation> AbilityPipeline<M> {
    pub fn new(mitigation: M) -> Self {
        Self { mitigation }
    }

    pub fn mitigation(&self) -> &M {
        &self.mitigation
    }

    /// Runs every gate, then applies the ability.
    ///
    /// # Errors
    ///
    /// Returns an [`AbilityError`] without mutating `roster` when the caster
    /// is missing or dead, the context is denied, the target type is not
    /// supported, or the target set is empty.
    pub fn execute(
        &self,
        caster: &CombatantId,
        target: &ResolvedTarget,
        ability: &AbilityDefinition,
        context: UseContext,
        roster: &mut Roster,
    ) -> Result<AbilityOutcome, AbilityError> {
        let plan = self.plan(caster, target, ability, context, roster)?;
        Ok(self.apply(caster, target.kind(), ability, plan, roster))
    }

    fn plan(
        &self,
        caster: &CombatantId,
        target: &ResolvedTarget,
        ability: &AbilityDefinition,
        context: UseContext,
        roster: &Roster,
    ) -> Result<Vec<PlannedEffect>, AbilityError> {
        let caster_stats = roster
            .get(caster.as_str())
            .filter(|combatant| combatant.is_alive())
            .map(|combatant| combatant.effective_stats())
            .ok_or_else(|| AbilityError::CasterNotFound(caster.clone()))?;

        if !ability.allows_context(context) {
            return Err(AbilityError::ContextDenied {
                ability: ability.id.clone(),
                context,
            });
        }

        let kind = target.kind();
        if !ability.supports_target(kind) {
            return Err(AbilityError::TargetTypeUnsupported {
                ability: ability.id.clone(),
                target: kind,
            });
        }

        let members = target.members(roster);
        if members.is_empty() {
            return Err(AbilityError::TargetNotFound(kind));
        }

        let raw = raw_effect(ability, &caster_stats);
        let magnitude = u32::try_from(raw.unsigned_abs()).unwrap_or(u32::MAX);

        Ok(members
            .into_iter()
            .filter_map(|index| {
                let defender = roster.at(index)?;
                let planned = match raw.signum() {
                    1 => PlannedEffect {
                        index,
                        kind: EffectKind::Damage,
                        magnitude: self.mitigation.mitigate(
                            magnitude,
                            ability.damage_type,
                            &defender.effective_stats(),
                        ),
                    },
                    -1 => PlannedEffect {
                        index,
                        kind: EffectKind::Heal,
                        magnitude,
                    },
                    _ => PlannedEffect {
                        index,
                        kind: EffectKind::None,
                        magnitude: 0,
                    },
                };
                Some(planned)
            })
            .collect())
    }

    fn apply(
        &self,
        caster: &CombatantId,
        target_kind: TargetType,
        ability: &AbilityDefinition,
        plan: Vec<PlannedEffect>,
        roster: &mut Roster,
    ) -> AbilityOutcome {
        let mut effects = Vec::with_capacity(plan.len());
        let mut changes: Vec<CombatantChange> = Vec::with_capacity(plan.len() + 1);

        for planned in plan {
            let Some(defender) = roster.at_mut(planned.index) else {
                continue;
            };
            let vitals = defender.vitals_mut();
            let health_before = vitals.current();
            let amount = match planned.kind {
                EffectKind::Damage => vitals.apply_damage(planned.magnitude),
                EffectKind::Heal => vitals.apply_heal(planned.magnitude),
                EffectKind::None => 0,
            };
            let health_after = vitals.current();
            let max_health = vitals.max();
            let target = defender.id().clone();

            changes.push(CombatantChange {
                combatant: target.clone(),
                health_delta: i64::from(health_after) - i64::from(health_before),
                resource_delta: 0,
                health: health_after,
                max_health,
            });
            effects.push(EffectApplication {
                target,
                kind: planned.kind,
                amount,
                health_before,
                health_after,
                defeated: health_before > 0 && health_after == 0,
            });
        }

        let mut resource_spent = 0;
        let mut caster_name = caster.to_string();
        if let Some(combatant) = roster.get_mut(caster.as_str()) {
            caster_name = combatant.name().to_string();
            resource_spent = combatant.resource_mut().spend(ability.resource_cost);
            if resource_spent > 0 {
                let delta = -i64::from(resource_spent);
                match changes.iter_mut().find(|change| &change.combatant == caster) {
                    Some(change) => change.resource_delta = delta,
                    None => changes.push(CombatantChange {
                        combatant: caster.clone(),
                        health_delta: 0,
                        resource_delta: delta,
                        health: combatant.vitals().current(),
                        max_health: combatant.vitals().max(),
                    }),
                }
            }
        }

        let narrative = narrate(&caster_name, ability, &effects, roster);

        debug!(
            target: "encounter::pipeline",
            caster = %caster,
            ability = %ability.id,
            target_kind = %target_kind,
            targets = effects.len(),
            resource_spent,
            "ability resolved"
        );

        AbilityOutcome {
            caster: caster.clone(),
            ability: ability.id.clone(),
            target_kind,
            effects,
            resource_spent,
            changes,
            narrative,
        }
    }
}

/// Raw signed effect before mitigation. Negative heals.
pub fn raw_effect(ability: &AbilityDefinition, caster: &CoreStats) -> i64 {
    let stat = match ability.damage_type.scaling_stat() {
        ScalingStat::Attack => caster.attack,
        ScalingStat::Magic => caster.magic,
    };
    i64::from(ability.base_effect) + i64::from(ability.scaling) * i64::from(stat) / 100
}

fn narrate(
    caster_name: &str,
    ability: &AbilityDefinition,
    effects: &[EffectApplication],
    roster: &Roster,
) -> String {
    let parts: Vec<String> = effects
        .iter()
        .map(|effect| {
            let name = roster
                .get(effect.target.as_str())
                .map_or(effect.target.as_str(), |combatant| combatant.name());
            match effect.kind {
                EffectKind::Damage if effect.defeated => {
                    format!("{name} takes {} damage and falls", effect.amount)
                }
                EffectKind::Damage => format!("{name} takes {} damage", effect.amount),
                EffectKind::Heal => format!("{name} recovers {} health", effect.amount),
                EffectKind::None => format!("{name} is unaffected"),
            }
        })
        .collect();

    format!("{caster_name} uses {}: {}", ability.name, parts.join(", "))
}
