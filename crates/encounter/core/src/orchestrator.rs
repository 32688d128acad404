//! Encounter orchestrator: the single writer of an encounter.
//!
//! Inbound [`ActionRequest`]s are validated in a fixed order, each gate
//! failing without side effects:
//!
//! 1. encounter is Active
//! 2. caster exists in the roster
//! 3. caster owns the current turn
//! 4. ability/item exists, is learned/owned, and is affordable
//! 5. target resolves
//! 6. pipeline gates (context, target type, target membership)
//!
//! A request that passes every gate always consumes its action cost, even when
//! the effect is zero. Afterwards the orchestrator records casualties, checks
//! resolution, advances an exhausted turn and drives autonomous turns until a
//! player is up again or the encounter resolves.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::catalog::{AbilityCatalog, AbilityId, ItemId, UseContext};
use crate::combatant::{Combatant, CombatantId, CombatantSnapshot};
use crate::config::EngineConfig;
use crate::encounter::{Encounter, EncounterId, EncounterPhase, EncounterResult};
use crate::error::{CombatError, EngineError};
use crate::events::{EncounterEvent, ForfeitReason};
use crate::pipeline::{AbilityOutcome, AbilityPipeline, CombatRules};
use crate::services::{
    EnemyPolicy, InMemoryInventory, InventoryService, NoRewards, RandomTargetPolicy,
    RewardService,
};
use crate::targeting::{self, TargetSpecifier};

// ============================================================================
// Requests and receipts
// ============================================================================

/// Inbound action, tagged by `action_type` on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "action_type", rename_all = "snake_case")
)]
pub enum ActionRequest {
    UseAbility {
        ability: AbilityId,
        /// Target specifier string; empty means self.
        #[cfg_attr(feature = "serde", serde(default))]
        target: String,
    },
    UseItem {
        item: ItemId,
        #[cfg_attr(feature = "serde", serde(default))]
        target: Option<String>,
    },
    EndTurn,
}

impl ActionRequest {
    pub fn use_ability(ability: impl Into<AbilityId>, target: impl Into<String>) -> Self {
        Self::UseAbility {
            ability: ability.into(),
            target: target.into(),
        }
    }

    pub fn use_item(item: impl Into<ItemId>) -> Self {
        Self::UseItem {
            item: item.into(),
            target: None,
        }
    }

    pub fn action_type(&self) -> &'static str {
        match self {
            Self::UseAbility { .. } => "use_ability",
            Self::UseItem { .. } => "use_item",
            Self::EndTurn => "end_turn",
        }
    }
}

/// Result of an accepted request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionReceipt {
    pub actor: CombatantId,
    /// Ability outcome, absent for `end_turn` and items without a linked ability.
    pub outcome: Option<AbilityOutcome>,
    pub actions_spent: u32,
    /// Whether the actor's turn ended as a consequence of this request.
    pub turn_ended: bool,
    /// Set once the encounter resolved.
    pub result: Option<EncounterResult>,
}

// ============================================================================
// Builder
// ============================================================================

pub struct OrchestratorBuilder {
    id: EncounterId,
    catalog: Arc<AbilityCatalog>,
    config: EngineConfig,
    inventory: Option<Box<dyn InventoryService>>,
    rewards: Option<Box<dyn RewardService>>,
    policy: Option<Box<dyn EnemyPolicy>>,
}

impl OrchestratorBuilder {
    pub fn new(id: EncounterId, catalog: Arc<AbilityCatalog>) -> Self {
        Self {
            id,
            catalog,
            config: EngineConfig::default(),
            inventory: None,
            rewards: None,
            policy: None,
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn inventory(mut self, inventory: impl InventoryService + 'static) -> Self {
        self.inventory = Some(Box::new(inventory));
        self
    }

    pub fn rewards(mut self, rewards: impl RewardService + 'static) -> Self {
        self.rewards = Some(Box::new(rewards));
        self
    }

    pub fn policy(mut self, policy: impl EnemyPolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }

    /// Missing services default to an empty inventory, no rewards and a
    /// [`RandomTargetPolicy`] seeded from the config.
    pub fn build(self) -> Orchestrator {
        let policy = self
            .policy
            .unwrap_or_else(|| Box::new(RandomTargetPolicy::new(self.config.ai_seed)));
        Orchestrator {
            encounter: Encounter::new(self.id),
            catalog: self.catalog,
            pipeline: AbilityPipeline::new(self.config.rules),
            inventory: self
                .inventory
                .unwrap_or_else(|| Box::new(InMemoryInventory::new())),
            rewards: self.rewards.unwrap_or_else(|| Box::new(NoRewards)),
            policy,
            config: self.config,
            rewarded: false,
        }
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Accepted effect of a validated request, before bookkeeping.
struct Resolution {
    outcome: Option<AbilityOutcome>,
    cost: u32,
    narrative: Option<String>,
}

pub struct Orchestrator {
    encounter: Encounter,
    catalog: Arc<AbilityCatalog>,
    pipeline: AbilityPipeline<CombatRules>,
    config: EngineConfig,
    inventory: Box<dyn InventoryService>,
    rewards: Box<dyn RewardService>,
    policy: Box<dyn EnemyPolicy>,
    rewarded: bool,
}

impl Orchestrator {
    pub fn builder(id: EncounterId, catalog: Arc<AbilityCatalog>) -> OrchestratorBuilder {
        OrchestratorBuilder::new(id, catalog)
    }

    pub fn id(&self) -> EncounterId {
        self.encounter.id()
    }

    pub fn encounter(&self) -> &Encounter {
        &self.encounter
    }

    pub fn phase(&self) -> EncounterPhase {
        self.encounter.phase()
    }

    pub fn catalog(&self) -> &AbilityCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn current_turn(&self) -> Option<&Combatant> {
        self.encounter.current_turn_entity()
    }

    pub fn snapshot(&self) -> Vec<CombatantSnapshot> {
        self.encounter.snapshot()
    }

    /// Drains events produced since the last call.
    pub fn take_events(&mut self) -> Vec<EncounterEvent> {
        self.encounter.take_events()
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Starts the encounter and runs any leading autonomous turns.
    pub fn start(
        &mut self,
        players: Vec<Combatant>,
        enemies: Vec<Combatant>,
    ) -> Result<(), CombatError> {
        self.encounter.start(players, enemies)?;
        self.drive_enemy_turns();
        Ok(())
    }

    pub fn spawn_enemy(&mut self, enemy: Combatant) -> Result<(), CombatError> {
        self.encounter.spawn_enemy(enemy)?;
        Ok(())
    }

    pub fn set_connected(
        &mut self,
        player: &CombatantId,
        connected: bool,
    ) -> Result<bool, CombatError> {
        Ok(self.encounter.set_connected(player, connected)?)
    }

    /// Forces Cleanup. Returns false if the encounter was already cleaned up.
    pub fn abort(&mut self) -> bool {
        self.encounter.abort()
    }

    pub fn clean_up(&mut self) -> Result<(), CombatError> {
        Ok(self.encounter.clean_up()?)
    }

    // ------------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------------

    /// Validates and applies one inbound request.
    ///
    /// # Errors
    ///
    /// Any [`CombatError`]; a rejected request leaves the encounter untouched.
    pub fn submit_action(
        &mut self,
        actor: &CombatantId,
        request: ActionRequest,
    ) -> Result<ActionReceipt, CombatError> {
        let action_type = request.action_type();
        self.process(actor, request).inspect_err(|err| {
            warn!(
                target: "encounter::orchestrator",
                encounter = %self.encounter.id(),
                %actor,
                action_type,
                code = err.error_code(),
                "request rejected: {err}"
            );
        })
    }

    /// Ends `actor`'s turn early.
    pub fn forfeit_turn(&mut self, actor: &CombatantId) -> Result<ActionReceipt, CombatError> {
        self.submit_action(actor, ActionRequest::EndTurn)
    }

    /// Ends whichever turn is current, e.g. on a turn timeout.
    ///
    /// Returns the combatant whose turn was forfeited.
    pub fn forfeit_current_turn(
        &mut self,
        reason: ForfeitReason,
    ) -> Result<CombatantId, CombatError> {
        self.ensure_active()?;
        let current = self
            .encounter
            .current_turn_id()
            .cloned()
            .ok_or(CombatError::InvalidPhase {
                phase: self.encounter.phase(),
            })?;
        warn!(
            target: "encounter::orchestrator",
            encounter = %self.encounter.id(),
            entity = %current,
            %reason,
            "forfeiting current turn"
        );
        self.encounter.forfeit_turn(reason)?;
        self.settle_resolution();
        self.drive_enemy_turns();
        Ok(current)
    }

    fn ensure_active(&self) -> Result<(), CombatError> {
        if self.encounter.is_active() {
            Ok(())
        } else {
            Err(CombatError::EncounterNotActive {
                phase: self.encounter.phase(),
            })
        }
    }

    fn process(
        &mut self,
        actor: &CombatantId,
        request: ActionRequest,
    ) -> Result<ActionReceipt, CombatError> {
        self.ensure_active()?;
        self.stabilize();
        self.ensure_active()?;

        if !self.encounter.roster().contains(actor.as_str()) {
            return Err(CombatError::CasterNotFound(actor.clone()));
        }
        let current = self.encounter.current_turn_id();
        if current != Some(actor) {
            return Err(CombatError::NotYourTurn {
                actor: actor.clone(),
                current: current.cloned(),
            });
        }

        let resolution = match request {
            ActionRequest::UseAbility { ability, target } => {
                self.resolve_ability(actor, &ability, &TargetSpecifier::parse(&target))?
            }
            ActionRequest::UseItem { item, target } => {
                self.resolve_item(actor, &item, target.as_deref())?
            }
            ActionRequest::EndTurn => {
                self.encounter.forfeit_turn(ForfeitReason::Requested)?;
                self.settle_resolution();
                self.drive_enemy_turns();
                return Ok(ActionReceipt {
                    actor: actor.clone(),
                    outcome: None,
                    actions_spent: 0,
                    turn_ended: true,
                    result: self.encounter.result(),
                });
            }
        };

        let actions_spent = resolution.cost;
        let outcome = resolution.outcome.clone();
        let turn_ended = self.commit(actor, resolution);
        self.drive_enemy_turns();

        Ok(ActionReceipt {
            actor: actor.clone(),
            outcome,
            actions_spent,
            turn_ended,
            result: self.encounter.result(),
        })
    }

    /// Validates and executes an ability use without any bookkeeping.
    fn resolve_ability(
        &mut self,
        actor: &CombatantId,
        ability_id: &AbilityId,
        specifier: &TargetSpecifier,
    ) -> Result<Resolution, CombatError> {
        let catalog = Arc::clone(&self.catalog);
        let ability = catalog
            .get_ability_by_id(ability_id.as_str())
            .ok_or_else(|| CombatError::AbilityNotFound(ability_id.clone()))?;

        let caster = self
            .encounter
            .roster()
            .get(actor.as_str())
            .ok_or_else(|| CombatError::CasterNotFound(actor.clone()))?;
        if !caster.knows_ability(&ability.id) {
            return Err(CombatError::AbilityNotLearned {
                actor: actor.clone(),
                ability: ability.id.clone(),
            });
        }
        self.ensure_affordable(ability.action_cost)?;

        let target = targeting::resolve(specifier, actor, self.encounter.roster())?;
        let outcome = self.pipeline.execute(
            actor,
            &target,
            ability,
            UseContext::InCombat,
            self.encounter.roster_mut(),
        )?;

        Ok(Resolution {
            narrative: Some(outcome.narrative.clone()),
            outcome: Some(outcome),
            cost: ability.action_cost,
        })
    }

    /// Validates and executes an item use, consuming the item on success.
    fn resolve_item(
        &mut self,
        actor: &CombatantId,
        item_id: &ItemId,
        target: Option<&str>,
    ) -> Result<Resolution, CombatError> {
        let catalog = Arc::clone(&self.catalog);
        let item = catalog
            .item(item_id.as_str())
            .ok_or_else(|| CombatError::ItemNotFound(item_id.clone()))?;
        if !self.inventory.has_item(actor, &item.id) {
            return Err(CombatError::ItemNotOwned {
                actor: actor.clone(),
                item: item.id.clone(),
            });
        }

        let linked = match &item.ability {
            Some(id) => Some(
                catalog
                    .get_ability_by_id(id.as_str())
                    .ok_or_else(|| CombatError::AbilityNotFound(id.clone()))?,
            ),
            None => None,
        };

        let resolution = match linked {
            Some(ability) => {
                self.ensure_affordable(ability.action_cost)?;
                let specifier = TargetSpecifier::parse(target.unwrap_or_default());
                let resolved = targeting::resolve(&specifier, actor, self.encounter.roster())?;
                let outcome = self.pipeline.execute(
                    actor,
                    &resolved,
                    ability,
                    UseContext::InCombat,
                    self.encounter.roster_mut(),
                )?;
                Resolution {
                    narrative: Some(format!("{} ({})", outcome.narrative, item.name)),
                    outcome: Some(outcome),
                    cost: ability.action_cost,
                }
            }
            None => {
                self.ensure_affordable(self.config.item_action_cost)?;
                let name = self
                    .encounter
                    .roster()
                    .get(actor.as_str())
                    .map_or(actor.as_str(), Combatant::name)
                    .to_string();
                Resolution {
                    narrative: Some(format!("{name} uses {}", item.name)),
                    outcome: None,
                    cost: self.config.item_action_cost,
                }
            }
        };

        if let Err(err) = self.inventory.consume(actor, &item.id) {
            error!(
                target: "encounter::orchestrator",
                encounter = %self.encounter.id(),
                %actor,
                item = %item.id,
                %err,
                "item vanished between ownership check and consumption"
            );
        }
        Ok(resolution)
    }

    fn ensure_affordable(&self, cost: u32) -> Result<(), CombatError> {
        if self.encounter.is_action_available(cost) {
            return Ok(());
        }
        let remaining = self
            .encounter
            .current_turn_entity()
            .map_or(0, |combatant| combatant.actions().remaining());
        Err(CombatError::InsufficientActions {
            required: cost,
            remaining,
        })
    }

    /// Post-mutation bookkeeping. Returns whether the actor's turn ended.
    fn commit(&mut self, actor: &CombatantId, resolution: Resolution) -> bool {
        if let Some(outcome) = &resolution.outcome {
            for change in outcome.changes.iter().filter(|change| !change.is_noop()) {
                self.encounter.emit_event(EncounterEvent::CombatantChanged {
                    change: change.clone(),
                });
            }
        }
        if let Some(text) = resolution.narrative {
            self.encounter.emit_event(EncounterEvent::ActionNarrated {
                actor: actor.clone(),
                text,
            });
        }

        self.encounter.record_action_used(resolution.cost);
        self.encounter.note_casualties();
        self.encounter.emit_snapshot();
        self.settle_resolution();

        if !self.encounter.is_active() {
            return true;
        }

        let actor_down = self
            .encounter
            .current_turn_entity()
            .is_none_or(|combatant| !combatant.is_alive());
        if self.encounter.are_current_entity_actions_exhausted() || actor_down {
            if let Err(err) = self.encounter.advance_turn() {
                error!(target: "encounter::orchestrator", %err, "advance after action failed");
            }
            self.settle_resolution();
            return true;
        }
        false
    }

    /// Rewards a victory exactly once.
    fn settle_resolution(&mut self) {
        if self.encounter.check_resolution() == Some(EncounterResult::Victory) && !self.rewarded {
            self.rewarded = true;
            self.rewards.on_victory(
                self.encounter.id(),
                self.encounter.roster(),
                self.encounter.defeated(),
            );
        }
    }

    /// Repairs a dangling turn pointer and advances an exhausted turn.
    fn stabilize(&mut self) {
        if self.encounter.repair_turn_pointer() {
            self.settle_resolution();
            self.drive_enemy_turns();
        }
        if self.encounter.is_active() && self.encounter.are_current_entity_actions_exhausted() {
            if let Err(err) = self.encounter.advance_turn() {
                error!(target: "encounter::orchestrator", %err, "advance of exhausted turn failed");
            }
            self.settle_resolution();
            self.drive_enemy_turns();
        }
    }

    /// Plays autonomous turns until a player is up or the encounter resolves.
    fn drive_enemy_turns(&mut self) {
        let mut turn_owner: Option<CombatantId> = None;
        let mut steps = 0;

        while self.encounter.is_active() {
            let Some(enemy) = self.encounter.current_turn_entity() else {
                break;
            };
            if !enemy.is_enemy() {
                break;
            }
            let enemy_id = enemy.id().clone();

            if turn_owner.as_ref() != Some(&enemy_id) {
                turn_owner = Some(enemy_id.clone());
                steps = 0;
            }
            steps += 1;
            if steps > self.config.max_enemy_steps {
                warn!(
                    target: "encounter::orchestrator",
                    enemy = %enemy_id,
                    "enemy step limit reached"
                );
                self.skip_turn();
                continue;
            }

            let intent = self
                .policy
                .choose(enemy, self.encounter.roster(), &self.catalog);
            let Some(intent) = intent else {
                debug!(target: "encounter::orchestrator", enemy = %enemy_id, "no eligible action");
                self.skip_turn();
                continue;
            };

            match self.resolve_ability(&enemy_id, &intent.ability, &intent.target) {
                Ok(resolution) => {
                    self.commit(&enemy_id, resolution);
                }
                Err(err) => {
                    warn!(
                        target: "encounter::orchestrator",
                        enemy = %enemy_id,
                        code = err.error_code(),
                        "enemy intent rejected: {err}"
                    );
                    self.skip_turn();
                }
            }
        }
    }

    fn skip_turn(&mut self) {
        if let Err(err) = self.encounter.forfeit_turn(ForfeitReason::System) {
            error!(target: "encounter::orchestrator", %err, "skip turn failed");
        }
        self.settle_resolution();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{AbilityDefinition, DamageType, ItemDefinition, TargetTypes};
    use crate::combatant::CoreStats;

    fn ability(id: &str, cost: u32, effect: i32, targets: TargetTypes) -> AbilityDefinition {
        AbilityDefinition {
            id: id.into(),
            name: id.into(),
            action_cost: cost,
            resource_cost: 0,
            targets,
            usable_in_combat: true,
            usable_out_of_combat: false,
            base_effect: effect,
            scaling: 0,
            damage_type: DamageType::Pure,
        }
    }

    fn catalog() -> Arc<AbilityCatalog> {
        Arc::new(
            AbilityCatalog::new(
                [
                    ability("slash", 1, 5, TargetTypes::SINGLE_ENEMY),
                    ability("heavy", 2, 30, TargetTypes::SINGLE_ENEMY),
                    ability("claw", 1, 3, TargetTypes::SINGLE_ENEMY),
                    ability("mend", 1, -10, TargetTypes::SINGLE_ALLY),
                ],
                [
                    ItemDefinition {
                        id: "potion".into(),
                        name: "Potion".into(),
                        ability: Some("mend".into()),
                    },
                    ItemDefinition {
                        id: "flare".into(),
                        name: "Flare".into(),
                        ability: None,
                    },
                ],
            )
            .unwrap(),
        )
    }

    fn orchestrator() -> Orchestrator {
        let mut orchestrator = Orchestrator::builder(EncounterId(9), catalog())
            .inventory(InMemoryInventory::new().with_item("a", "potion", 1))
            .build();
        orchestrator
            .start(
                vec![
                    Combatant::player("a", "Aria", 30, CoreStats::default(), 1)
                        .with_abilities(["slash", "heavy", "mend"]),
                    Combatant::player("b", "Bram", 30, CoreStats::default(), 1)
                        .with_abilities(["slash"]),
                ],
                vec![
                    Combatant::enemy("g", "Goblin", "goblin", 12, CoreStats::default(), 1)
                        .with_abilities(["claw"]),
                ],
            )
            .unwrap();
        orchestrator.take_events();
        orchestrator
    }

    fn current(orchestrator: &Orchestrator) -> &str {
        orchestrator.current_turn().unwrap().id().as_str()
    }

    #[test]
    fn out_of_turn_request_is_rejected_without_side_effects() {
        let mut orchestrator = orchestrator();
        let before = orchestrator.snapshot();
        let err = orchestrator
            .submit_action(&"b".into(), ActionRequest::use_ability("slash", "g"))
            .unwrap_err();
        assert!(matches!(err, CombatError::NotYourTurn { .. }));
        assert_eq!(orchestrator.snapshot(), before);
        assert!(orchestrator.take_events().is_empty());
    }

    #[test]
    fn gates_reject_unknown_unlearned_and_unaffordable() {
        let mut orchestrator = orchestrator();
        let a = CombatantId::new("a");
        assert_eq!(
            orchestrator
                .submit_action(&a, ActionRequest::use_ability("fireball", "g"))
                .unwrap_err(),
            CombatError::AbilityNotFound("fireball".into())
        );
        assert!(matches!(
            orchestrator
                .submit_action(&a, ActionRequest::use_ability("claw", "g"))
                .unwrap_err(),
            CombatError::AbilityNotLearned { .. }
        ));
        assert_eq!(
            orchestrator
                .submit_action(&a, ActionRequest::use_ability("heavy", "g"))
                .unwrap_err(),
            CombatError::InsufficientActions {
                required: 2,
                remaining: 1
            }
        );
        assert!(matches!(
            orchestrator
                .submit_action(&a, ActionRequest::use_ability("slash", "ghost"))
                .unwrap_err(),
            CombatError::TargetNotFound(_)
        ));
        assert_eq!(current(&orchestrator), "a");
    }

    #[test]
    fn full_round_drives_the_enemy_and_wraps() {
        let mut orchestrator = orchestrator();
        let receipt = orchestrator
            .submit_action(&"a".into(), ActionRequest::use_ability("slash", "g"))
            .unwrap();
        assert!(receipt.turn_ended);
        assert_eq!(receipt.actions_spent, 1);
        assert_eq!(current(&orchestrator), "b");

        orchestrator
            .submit_action(&"b".into(), ActionRequest::use_ability("slash", "g"))
            .unwrap();
        // goblin acted automatically and the order wrapped
        assert_eq!(current(&orchestrator), "a");
        assert_eq!(orchestrator.encounter().round(), 2);

        let events = orchestrator.take_events();
        assert!(events.iter().any(|event| matches!(
            event,
            EncounterEvent::TurnStarted { entity, .. } if entity.as_str() == "g"
        )));
        let health: u32 = orchestrator
            .snapshot()
            .iter()
            .filter(|s| s.faction == crate::Faction::Player)
            .map(|s| s.health)
            .sum();
        assert_eq!(health, 57);
    }

    #[test]
    fn victory_ends_the_encounter_once() {
        let mut orchestrator = orchestrator();
        for _ in 0..2 {
            orchestrator
                .submit_action(&"a".into(), ActionRequest::use_ability("slash", "g"))
                .unwrap();
            if orchestrator.phase() != EncounterPhase::Active {
                break;
            }
            orchestrator
                .submit_action(&"b".into(), ActionRequest::use_ability("slash", "g"))
                .unwrap();
        }
        assert_eq!(orchestrator.phase(), EncounterPhase::Victory);

        let events = orchestrator.take_events();
        let ended = events
            .iter()
            .filter(|event| matches!(event, EncounterEvent::EncounterEnded { .. }))
            .count();
        assert_eq!(ended, 1);
        assert!(events
            .iter()
            .any(|event| matches!(event, EncounterEvent::EnemyDefeated { .. })));

        assert!(matches!(
            orchestrator.submit_action(&"a".into(), ActionRequest::EndTurn),
            Err(CombatError::EncounterNotActive { .. })
        ));
        orchestrator.clean_up().unwrap();
        assert_eq!(orchestrator.phase(), EncounterPhase::Cleanup);
    }

    #[test]
    fn linked_item_runs_its_ability_and_is_consumed() {
        let mut orchestrator = orchestrator();
        let a = CombatantId::new("a");
        orchestrator
            .submit_action(
                &a,
                ActionRequest::UseItem {
                    item: "potion".into(),
                    target: Some("b".into()),
                },
            )
            .unwrap();
        assert_eq!(current(&orchestrator), "b");

        // skip around to a again
        orchestrator.forfeit_turn(&"b".into()).unwrap();
        assert_eq!(current(&orchestrator), "a");
        assert_eq!(
            orchestrator
                .submit_action(&a, ActionRequest::use_item("potion"))
                .unwrap_err(),
            CombatError::ItemNotOwned {
                actor: a.clone(),
                item: "potion".into()
            }
        );
        assert_eq!(
            orchestrator
                .submit_action(&a, ActionRequest::use_item("elixir"))
                .unwrap_err(),
            CombatError::ItemNotFound("elixir".into())
        );
    }

    #[test]
    fn forfeit_by_timeout_moves_to_the_next_combatant() {
        let mut orchestrator = orchestrator();
        orchestrator.set_connected(&"a".into(), false).unwrap();
        let skipped = orchestrator
            .forfeit_current_turn(ForfeitReason::Timeout)
            .unwrap();
        assert_eq!(skipped.as_str(), "a");
        assert_eq!(current(&orchestrator), "b");
        assert!(orchestrator.take_events().iter().any(|event| matches!(
            event,
            EncounterEvent::TurnForfeited { reason: ForfeitReason::Timeout, .. }
        )));
    }

    #[test]
    fn abort_reaches_cleanup_from_active() {
        let mut orchestrator = orchestrator();
        assert!(matches!(
            orchestrator.clean_up(),
            Err(CombatError::InvalidPhase { .. })
        ));
        assert!(orchestrator.abort());
        assert_eq!(orchestrator.phase(), EncounterPhase::Cleanup);
    }
}
