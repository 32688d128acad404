//! Simple party AI used to play player turns in the demo.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use encounter_content::PlayerTemplate;
use encounter_core::{
    AbilityCatalog, AbilityDefinition, AbilityId, ActionRequest, CombatantId, CombatantSnapshot,
    Faction, TargetType, UseContext,
};
use encounter_runtime::{ActionProvider, EncounterStatus, Result};

/// Health percentage below which an ally gets healed.
const HEAL_THRESHOLD_PCT: u32 = 50;

fn is_wounded(ally: &CombatantSnapshot) -> bool {
    u64::from(ally.health) * 100 < u64::from(ally.max_health) * u64::from(HEAL_THRESHOLD_PCT)
}

/// Heals wounded allies, opens with area damage against groups and
/// otherwise focuses the weakest enemy.
pub struct PartyTactics {
    catalog: Arc<AbilityCatalog>,
    abilities: HashMap<CombatantId, Vec<AbilityId>>,
}

impl PartyTactics {
    pub fn new(catalog: Arc<AbilityCatalog>, party: &[PlayerTemplate]) -> Self {
        let abilities = party
            .iter()
            .map(|member| (CombatantId::new(member.id.as_str()), member.abilities.clone()))
            .collect();
        Self { catalog, abilities }
    }

    /// Abilities `me` could use right now.
    fn usable<'a>(
        &'a self,
        me: &'a CombatantSnapshot,
    ) -> impl Iterator<Item = &'a AbilityDefinition> + 'a {
        self.abilities
            .get(&me.id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.catalog.get_ability_by_id(id.as_str()))
            .filter(move |ability| {
                ability.allows_context(UseContext::InCombat)
                    && ability.action_cost <= me.actions_remaining
                    && ability.resource_cost <= me.resource
            })
    }

    pub fn choose(&self, actor: &CombatantId, status: &EncounterStatus) -> ActionRequest {
        let Some(me) = status.combatant(actor.as_str()) else {
            return ActionRequest::EndTurn;
        };

        let wounded = status
            .combatants
            .iter()
            .filter(|ally| ally.alive && ally.faction == Faction::Player)
            .filter(|ally| is_wounded(ally))
            .min_by_key(|ally| ally.health);
        if let Some(ally) = wounded {
            let heal = self
                .usable(me)
                .filter(|ability| ability.base_effect < 0)
                .find(|ability| ability.supports_target(TargetType::SingleAlly));
            if let Some(heal) = heal {
                return ActionRequest::use_ability(heal.id.clone(), ally.id.as_str());
            }
        }

        let enemies: Vec<&CombatantSnapshot> = status
            .combatants
            .iter()
            .filter(|enemy| enemy.alive && enemy.faction == Faction::Enemy)
            .collect();
        if enemies.len() >= 2 {
            if let Some(area) = self
                .usable(me)
                .filter(|ability| ability.is_offensive())
                .find(|ability| ability.supports_target(TargetType::Area))
            {
                return ActionRequest::use_ability(area.id.clone(), "area");
            }
        }

        let weakest = enemies.iter().min_by_key(|enemy| enemy.health);
        let strike = self
            .usable(me)
            .filter(|ability| ability.is_offensive())
            .filter(|ability| ability.supports_target(TargetType::SingleEnemy))
            .max_by_key(|ability| ability.base_effect);
        match (strike, weakest) {
            (Some(strike), Some(target)) => {
                ActionRequest::use_ability(strike.id.clone(), target.id.as_str())
            }
            _ => ActionRequest::EndTurn,
        }
    }
}

#[async_trait]
impl ActionProvider for PartyTactics {
    async fn provide_action(
        &self,
        actor: &CombatantId,
        status: &EncounterStatus,
    ) -> Result<ActionRequest> {
        Ok(self.choose(actor, status))
    }
}
