//! Collaborator contracts consumed by the orchestrator.
//!
//! Services are constructed explicitly and handed to the
//! [`OrchestratorBuilder`](crate::orchestrator::OrchestratorBuilder). The engine
//! never reaches for a process-wide instance.

use std::collections::HashMap;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::catalog::{
    AbilityCatalog, AbilityDefinition, AbilityId, ItemId, TargetType, UseContext,
};
use crate::combatant::{Combatant, CombatantId, Roster};
use crate::encounter::EncounterId;
use crate::targeting::TargetSpecifier;

// ============================================================================
// Inventory
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InventoryError {
    #[error("{actor} does not own item '{item}'")]
    NotOwned { actor: CombatantId, item: ItemId },
}

/// Item ownership as seen by the combat engine.
pub trait InventoryService: Send {
    fn has_item(&self, actor: &CombatantId, item: &ItemId) -> bool;

    /// Removes one unit of `item` from `actor`.
    fn consume(&mut self, actor: &CombatantId, item: &ItemId) -> Result<(), InventoryError>;
}

impl<T: InventoryService + ?Sized> InventoryService for Box<T> {
    fn has_item(&self, actor: &CombatantId, item: &ItemId) -> bool {
        (**self).has_item(actor, item)
    }

    fn consume(&mut self, actor: &CombatantId, item: &ItemId) -> Result<(), InventoryError> {
        (**self).consume(actor, item)
    }
}

/// Counted item stacks keyed by owner.
#[derive(Clone, Debug, Default)]
pub struct InMemoryInventory {
    stacks: HashMap<CombatantId, HashMap<ItemId, u32>>,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&mut self, actor: impl Into<CombatantId>, item: impl Into<ItemId>, quantity: u32) {
        *self
            .stacks
            .entry(actor.into())
            .or_default()
            .entry(item.into())
            .or_default() += quantity;
    }

    #[must_use]
    pub fn with_item(
        mut self,
        actor: impl Into<CombatantId>,
        item: impl Into<ItemId>,
        quantity: u32,
    ) -> Self {
        self.grant(actor, item, quantity);
        self
    }

    pub fn quantity(&self, actor: &str, item: &str) -> u32 {
        self.stacks
            .get(actor)
            .and_then(|items| items.get(item))
            .copied()
            .unwrap_or(0)
    }
}

impl InventoryService for InMemoryInventory {
    fn has_item(&self, actor: &CombatantId, item: &ItemId) -> bool {
        self.quantity(actor.as_str(), item.as_str()) > 0
    }

    fn consume(&mut self, actor: &CombatantId, item: &ItemId) -> Result<(), InventoryError> {
        let count = self
            .stacks
            .get_mut(actor.as_str())
            .and_then(|items| items.get_mut(item.as_str()))
            .filter(|count| **count > 0)
            .ok_or_else(|| InventoryError::NotOwned {
                actor: actor.clone(),
                item: item.clone(),
            })?;
        *count -= 1;
        Ok(())
    }
}

// ============================================================================
// Rewards
// ============================================================================

/// Loot and experience distribution, invoked once per victory.
pub trait RewardService: Send {
    fn on_victory(&mut self, encounter: EncounterId, roster: &Roster, defeated: &[CombatantId]);
}

impl<T: RewardService + ?Sized> RewardService for Box<T> {
    fn on_victory(&mut self, encounter: EncounterId, roster: &Roster, defeated: &[CombatantId]) {
        (**self).on_victory(encounter, roster, defeated);
    }
}

/// Discards victories.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRewards;

impl RewardService for NoRewards {
    fn on_victory(&mut self, _: EncounterId, _: &Roster, _: &[CombatantId]) {}
}

// ============================================================================
// Enemy policy
// ============================================================================

/// What an autonomous combatant wants to do on its turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnemyIntent {
    pub ability: AbilityId,
    pub target: TargetSpecifier,
}

/// Decision making for autonomous combatants.
///
/// Returning `None` skips the turn with zero actions consumed.
pub trait EnemyPolicy: Send {
    fn choose(
        &mut self,
        enemy: &Combatant,
        roster: &Roster,
        catalog: &AbilityCatalog,
    ) -> Option<EnemyIntent>;
}

impl<T: EnemyPolicy + ?Sized> EnemyPolicy for Box<T> {
    fn choose(
        &mut self,
        enemy: &Combatant,
        roster: &Roster,
        catalog: &AbilityCatalog,
    ) -> Option<EnemyIntent> {
        (**self).choose(enemy, roster, catalog)
    }
}

/// Uses the first eligible offensive ability on a uniformly random opponent.
///
/// Eligible means known, present in the catalog, usable in combat, affordable
/// with the remaining actions and able to hit the opposing faction.
#[derive(Clone, Debug)]
pub struct RandomTargetPolicy {
    rng: ChaCha8Rng,
}

impl RandomTargetPolicy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn eligible<'a>(
        enemy: &Combatant,
        catalog: &'a AbilityCatalog,
    ) -> Option<&'a AbilityDefinition> {
        enemy
            .abilities()
            .iter()
            .filter_map(|id| catalog.get_ability_by_id(id.as_str()))
            .find(|ability| enemy.can_use(ability, UseContext::InCombat) && ability.is_offensive())
    }
}

impl EnemyPolicy for RandomTargetPolicy {
    fn choose(
        &mut self,
        enemy: &Combatant,
        roster: &Roster,
        catalog: &AbilityCatalog,
    ) -> Option<EnemyIntent> {
        let ability = Self::eligible(enemy, catalog)?;
        let opponents: Vec<&CombatantId> = roster
            .living(enemy.faction().opposing())
            .map(Combatant::id)
            .collect();
        if opponents.is_empty() {
            return None;
        }

        let target = if ability.supports_target(TargetType::SingleEnemy) {
            let pick = self.rng.gen_range(0..opponents.len());
            TargetSpecifier::Combatant(opponents[pick].clone())
        } else if ability.supports_target(TargetType::Area) {
            TargetSpecifier::Area
        } else {
            TargetSpecifier::AllEnemies
        };

        Some(EnemyIntent {
            ability: ability.id.clone(),
            target,
        })
    }
}
