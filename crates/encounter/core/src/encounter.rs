//! Encounter lifecycle state machine and turn scheduler.
//!
//! ```text
//! Setup ──start──▶ Active ──(no living enemies)──▶ Victory ──clean_up──▶ Cleanup
//!                    │    ──(no living players)──▶ Defeat  ──clean_up──▶ Cleanup
//!                    └─────────────────abort─────────────────────────────▶ Cleanup
//! ```
//!
//! The encounter owns the [`Roster`] arena. The turn order is a cyclic list of
//! arena indices built from the living combatants at start time (plus any
//! reinforcements). Defeated combatants stay in the order so indices remain
//! stable, but advancement always skips them.
//!
//! Every mutation buffers its [`EncounterEvent`]s in an outbox. Callers drain
//! it with [`Encounter::take_events`] once the mutation is complete.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, error, info, warn};

use crate::combatant::{Combatant, CombatantId, CombatantSnapshot, Faction, Roster};
use crate::error::{EngineError, ErrorSeverity};
use crate::events::{EncounterEvent, ForfeitReason};

// ============================================================================
// Types
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct EncounterId(pub u64);

impl fmt::Display for EncounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encounter-{}", self.0)
    }
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EncounterPhase {
    Setup,
    Active,
    Victory,
    Defeat,
    Cleanup,
}

impl EncounterPhase {
    /// Victory or Defeat: resolved but not yet cleaned up.
    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Victory | Self::Defeat)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
pub enum EncounterResult {
    Victory,
    Defeat,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EncounterError {
    #[error("encounter is not active (phase: {phase})")]
    NotActive { phase: EncounterPhase },

    #[error("cannot {operation} during phase {phase}")]
    InvalidPhase {
        phase: EncounterPhase,
        operation: &'static str,
    },

    #[error("encounter needs at least one living {0}")]
    EmptySide(Faction),

    #[error("combatant '{0}' is already part of the encounter")]
    DuplicateCombatant(CombatantId),

    #[error("combatant '{combatant}' is not on the {expected} side")]
    FactionMismatch {
        combatant: CombatantId,
        expected: Faction,
    },

    #[error("combatant '{0}' not found")]
    CombatantNotFound(CombatantId),

    #[error("combatant '{0}' is not player-controlled")]
    NotAPlayer(CombatantId),

    #[error("combatant '{0}' cannot join with zero health")]
    DefeatedOnArrival(CombatantId),
}

impl EngineError for EncounterError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotActive { .. } | Self::InvalidPhase { .. } => ErrorSeverity::Recoverable,
            _ => ErrorSeverity::Validation,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            Self::NotActive { .. } => "ENCOUNTER_NOT_ACTIVE",
            Self::InvalidPhase { .. } => "ENCOUNTER_INVALID_PHASE",
            Self::EmptySide(_) => "ENCOUNTER_EMPTY_SIDE",
            Self::DuplicateCombatant(_) => "ENCOUNTER_DUPLICATE_COMBATANT",
            Self::FactionMismatch { .. } => "ENCOUNTER_FACTION_MISMATCH",
            Self::CombatantNotFound(_) => "ENCOUNTER_COMBATANT_NOT_FOUND",
            Self::NotAPlayer(_) => "ENCOUNTER_NOT_A_PLAYER",
            Self::DefeatedOnArrival(_) => "ENCOUNTER_DEFEATED_ON_ARRIVAL",
        }
    }
}

// ============================================================================
// Encounter
// ============================================================================

/// One combat session from start to cleanup.
#[derive(Clone, Debug)]
pub struct Encounter {
    id: EncounterId,
    phase: EncounterPhase,
    roster: Roster,
    /// Arena indices, cyclic.
    turn_order: Vec<usize>,
    /// Position in `turn_order`.
    current_turn: usize,
    round: u32,
    defeated: Vec<CombatantId>,
    outbox: Vec<EncounterEvent>,
}

impl Encounter {
    pub fn new(id: EncounterId) -> Self {
        Self {
            id,
            phase: EncounterPhase::Setup,
            roster: Roster::new(),
            turn_order: Vec::new(),
            current_turn: 0,
            round: 0,
            defeated: Vec::new(),
            outbox: Vec::new(),
        }
    }

    pub fn id(&self) -> EncounterId {
        self.id
    }

    pub fn phase(&self) -> EncounterPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == EncounterPhase::Active
    }

    /// Rounds start at 1 and increment each time the turn order wraps.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub(crate) fn roster_mut(&mut self) -> &mut Roster {
        &mut self.roster
    }

    pub fn result(&self) -> Option<EncounterResult> {
        match self.phase {
            EncounterPhase::Victory => Some(EncounterResult::Victory),
            EncounterPhase::Defeat => Some(EncounterResult::Defeat),
            _ => None,
        }
    }

    /// Enemies defeated so far, in order of defeat.
    pub fn defeated(&self) -> &[CombatantId] {
        &self.defeated
    }

    pub fn turn_order(&self) -> Vec<CombatantId> {
        self.turn_order
            .iter()
            .filter_map(|&index| self.roster.at(index))
            .map(|combatant| combatant.id().clone())
            .collect()
    }

    pub fn snapshot(&self) -> Vec<CombatantSnapshot> {
        self.roster.snapshot()
    }

    /// Drains buffered events.
    pub fn take_events(&mut self) -> Vec<EncounterEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn emit(&mut self, event: EncounterEvent) {
        self.outbox.push(event);
    }

    fn require_active(&self) -> Result<(), EncounterError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(EncounterError::NotActive { phase: self.phase })
        }
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Builds the roster (players first, then enemies) and activates the encounter.
    ///
    /// Turn order follows roster insertion order. Every combatant starts with a
    /// full action budget.
    pub fn start(
        &mut self,
        players: Vec<Combatant>,
        enemies: Vec<Combatant>,
    ) -> Result<(), EncounterError> {
        if self.phase != EncounterPhase::Setup {
            return Err(EncounterError::InvalidPhase {
                phase: self.phase,
                operation: "start",
            });
        }

        let mut seen = HashSet::new();
        for (combatant, expected) in players
            .iter()
            .map(|c| (c, Faction::Player))
            .chain(enemies.iter().map(|c| (c, Faction::Enemy)))
        {
            if combatant.faction() != expected {
                return Err(EncounterError::FactionMismatch {
                    combatant: combatant.id().clone(),
                    expected,
                });
            }
            if !seen.insert(combatant.id().clone()) {
                return Err(EncounterError::DuplicateCombatant(combatant.id().clone()));
            }
        }
        if !players.iter().any(Combatant::is_alive) {
            return Err(EncounterError::EmptySide(Faction::Player));
        }
        if !enemies.iter().any(Combatant::is_alive) {
            return Err(EncounterError::EmptySide(Faction::Enemy));
        }

        self.roster = players.into_iter().chain(enemies).collect();
        self.turn_order = self
            .roster
            .iter()
            .enumerate()
            .filter(|(_, combatant)| combatant.is_alive())
            .map(|(index, _)| index)
            .collect();
        for index in 0..self.roster.len() {
            if let Some(combatant) = self.roster.at_mut(index) {
                combatant.actions_mut().reset();
            }
        }
        self.current_turn = 0;
        self.round = 1;
        self.defeated.clear();
        self.phase = EncounterPhase::Active;

        let (players, enemies): (Vec<_>, Vec<_>) = self
            .roster
            .snapshot()
            .into_iter()
            .partition(|snapshot| snapshot.faction == Faction::Player);

        info!(
            target: "encounter::scheduler",
            encounter = %self.id,
            players = players.len(),
            enemies = enemies.len(),
            "encounter started"
        );

        self.emit(EncounterEvent::EncounterStarted {
            players,
            enemies,
            turn_order: self.turn_order(),
        });
        self.emit_turn_started();
        Ok(())
    }

    /// Adds a reinforcement at the end of the turn order.
    pub fn spawn_enemy(&mut self, mut enemy: Combatant) -> Result<(), EncounterError> {
        self.require_active()?;
        if !enemy.is_enemy() {
            return Err(EncounterError::FactionMismatch {
                combatant: enemy.id().clone(),
                expected: Faction::Enemy,
            });
        }
        if self.roster.contains(enemy.id().as_str()) {
            return Err(EncounterError::DuplicateCombatant(enemy.id().clone()));
        }
        if !enemy.is_alive() {
            return Err(EncounterError::DefeatedOnArrival(enemy.id().clone()));
        }

        enemy.actions_mut().reset();
        let snapshot = enemy.snapshot();
        let index = self.roster.push(enemy);
        self.turn_order.push(index);

        debug!(
            target: "encounter::scheduler",
            encounter = %self.id,
            enemy = %snapshot.id,
            "enemy spawned"
        );
        self.emit(EncounterEvent::EnemySpawned { enemy: snapshot });
        Ok(())
    }

    /// Transitions to Victory or Defeat if one side has no living members.
    ///
    /// Victory is checked first. `EncounterEnded` is emitted only on the
    /// transition itself, so repeated calls are idempotent.
    pub fn check_resolution(&mut self) -> Option<EncounterResult> {
        if self.phase != EncounterPhase::Active {
            return self.result();
        }

        let result = if !self.roster.has_living(Faction::Enemy) {
            EncounterResult::Victory
        } else if !self.roster.has_living(Faction::Player) {
            EncounterResult::Defeat
        } else {
            return None;
        };

        self.phase = match result {
            EncounterResult::Victory => EncounterPhase::Victory,
            EncounterResult::Defeat => EncounterPhase::Defeat,
        };
        info!(
            target: "encounter::scheduler",
            encounter = %self.id,
            %result,
            round = self.round,
            "encounter ended"
        );
        self.emit(EncounterEvent::EncounterEnded { result });
        Some(result)
    }

    /// Releases the roster and turn state. Only valid once resolved.
    pub fn clean_up(&mut self) -> Result<(), EncounterError> {
        if !self.phase.is_resolved() {
            return Err(EncounterError::InvalidPhase {
                phase: self.phase,
                operation: "clean up",
            });
        }
        self.release();
        Ok(())
    }

    /// Forces Cleanup from any phase. Returns false if already cleaned up.
    pub fn abort(&mut self) -> bool {
        if self.phase == EncounterPhase::Cleanup {
            return false;
        }
        warn!(
            target: "encounter::scheduler",
            encounter = %self.id,
            phase = %self.phase,
            "encounter aborted"
        );
        self.release();
        true
    }

    fn release(&mut self) {
        self.roster.clear();
        self.turn_order.clear();
        self.current_turn = 0;
        self.phase = EncounterPhase::Cleanup;
        info!(target: "encounter::scheduler", encounter = %self.id, "encounter cleaned up");
        self.emit(EncounterEvent::EncounterCleanedUp);
    }

    // ------------------------------------------------------------------------
    // Turn scheduling
    // ------------------------------------------------------------------------

    fn current_index(&self) -> Option<usize> {
        if !self.is_active() {
            return None;
        }
        self.turn_order.get(self.current_turn).copied()
    }

    /// The combatant whose turn it is. `None` outside of Active.
    pub fn current_turn_entity(&self) -> Option<&Combatant> {
        self.current_index().and_then(|index| self.roster.at(index))
    }

    pub fn current_turn_id(&self) -> Option<&CombatantId> {
        self.current_turn_entity().map(Combatant::id)
    }

    pub fn is_action_available(&self, cost: u32) -> bool {
        self.current_turn_entity()
            .is_some_and(|combatant| combatant.actions().can_afford(cost))
    }

    /// Deducts `cost` from the current entity's budget, saturating at zero.
    pub fn record_action_used(&mut self, cost: u32) {
        let Some(index) = self.current_index() else {
            return;
        };
        if let Some(combatant) = self.roster.at_mut(index) {
            combatant.actions_mut().spend(cost);
        }
    }

    pub fn are_current_entity_actions_exhausted(&self) -> bool {
        self.current_turn_entity()
            .is_none_or(|combatant| combatant.actions().is_exhausted())
    }

    /// Moves to the next living entry in the turn order.
    ///
    /// Resolution is checked first: if either side has been wiped out the
    /// encounter transitions to Victory/Defeat and no turn is started.
    pub fn advance_turn(&mut self) -> Result<Option<EncounterResult>, EncounterError> {
        self.require_active()?;
        if let Some(result) = self.check_resolution() {
            return Ok(Some(result));
        }

        let len = self.turn_order.len();
        for step in 1..=len {
            let position = (self.current_turn + step) % len;
            let index = self.turn_order[position];
            let alive = self.roster.at(index).is_some_and(Combatant::is_alive);
            if !alive {
                continue;
            }
            if self.current_turn + step >= len {
                self.round += 1;
            }
            self.current_turn = position;
            if let Some(combatant) = self.roster.at_mut(index) {
                combatant.actions_mut().reset();
            }
            self.emit_turn_started();
            return Ok(None);
        }

        // Unreachable while both sides have living members.
        error!(
            target: "encounter::scheduler",
            encounter = %self.id,
            "no living combatant in turn order"
        );
        Ok(None)
    }

    /// Ends the current entity's turn without it acting.
    pub fn forfeit_turn(
        &mut self,
        reason: ForfeitReason,
    ) -> Result<Option<EncounterResult>, EncounterError> {
        self.require_active()?;
        if let Some(entity) = self.current_turn_id().cloned() {
            debug!(
                target: "encounter::scheduler",
                encounter = %self.id,
                %entity,
                %reason,
                "turn forfeited"
            );
            self.emit(EncounterEvent::TurnForfeited { entity, reason });
        }
        self.advance_turn()
    }

    /// Repairs a current-turn pointer that no longer names a living combatant.
    ///
    /// Returns true if a repair was needed. Never fails the encounter.
    pub fn repair_turn_pointer(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        let healthy = self
            .current_index()
            .and_then(|index| self.roster.at(index))
            .is_some_and(Combatant::is_alive);
        if healthy {
            return false;
        }

        error!(
            target: "encounter::scheduler",
            encounter = %self.id,
            position = self.current_turn,
            "current turn entity missing or defeated; forcing advance"
        );
        if self.current_turn >= self.turn_order.len() {
            self.current_turn = 0;
        }
        if let Err(err) = self.advance_turn() {
            warn!(target: "encounter::scheduler", encounter = %self.id, %err, "repair failed");
        }
        true
    }

    fn emit_turn_started(&mut self) {
        let Some(combatant) = self.current_turn_entity() else {
            return;
        };
        let entity = combatant.id().clone();
        let entity_type = combatant.faction();
        debug!(
            target: "encounter::scheduler",
            encounter = %self.id,
            %entity,
            round = self.round,
            "turn started"
        );
        self.emit(EncounterEvent::TurnStarted {
            entity,
            entity_type,
            round: self.round,
        });
    }

    // ------------------------------------------------------------------------
    // Roster notifications
    // ------------------------------------------------------------------------

    /// Records enemies that dropped to zero health since the last call.
    pub fn note_casualties(&mut self) -> Vec<CombatantId> {
        let fresh: Vec<CombatantId> = self
            .roster
            .iter()
            .filter(|combatant| combatant.is_enemy() && !combatant.is_alive())
            .map(|combatant| combatant.id().clone())
            .filter(|id| !self.defeated.contains(id))
            .collect();

        for enemy in &fresh {
            debug!(
                target: "encounter::scheduler",
                encounter = %self.id,
                %enemy,
                "enemy defeated"
            );
            self.defeated.push(enemy.clone());
            self.emit(EncounterEvent::EnemyDefeated {
                enemy: enemy.clone(),
            });
        }
        fresh
    }

    /// Updates a player's connection flag. The roster entry and turn slot are kept.
    ///
    /// Returns whether the flag changed.
    pub fn set_connected(
        &mut self,
        player: &CombatantId,
        connected: bool,
    ) -> Result<bool, EncounterError> {
        let combatant = self
            .roster
            .get_mut(player.as_str())
            .ok_or_else(|| EncounterError::CombatantNotFound(player.clone()))?;
        if combatant.is_connected() == Some(connected) {
            return Ok(false);
        }
        if !combatant.set_connected(connected) {
            return Err(EncounterError::NotAPlayer(player.clone()));
        }
        info!(
            target: "encounter::scheduler",
            encounter = %self.id,
            %player,
            connected,
            "connection state changed"
        );
        self.emit_snapshot();
        Ok(true)
    }

    pub fn emit_snapshot(&mut self) {
        let snapshot = self.roster.snapshot();
        self.emit(EncounterEvent::CombatantsUpdated { snapshot });
    }

    pub(crate) fn emit_event(&mut self, event: EncounterEvent) {
        self.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::CoreStats;

    fn player(id: &str) -> Combatant {
        Combatant::player(id, id.to_uppercase(), 20, CoreStats::default(), 1)
    }

    fn enemy(id: &str) -> Combatant {
        Combatant::enemy(id, id.to_uppercase(), "goblin", 10, CoreStats::default(), 1)
    }

    fn started() -> Encounter {
        let mut encounter = Encounter::new(EncounterId(1));
        encounter
            .start(vec![player("a"), player("b")], vec![enemy("g")])
            .unwrap();
        encounter
    }

    fn current(encounter: &Encounter) -> &str {
        encounter.current_turn_id().unwrap().as_str()
    }

    #[test]
    fn start_emits_started_then_first_turn() {
        let mut encounter = started();
        assert_eq!(encounter.phase(), EncounterPhase::Active);
        assert_eq!(current(&encounter), "a");

        let events = encounter.take_events();
        assert!(matches!(
            &events[0],
            EncounterEvent::EncounterStarted { players, enemies, turn_order }
                if players.len() == 2 && enemies.len() == 1 && turn_order.len() == 3
        ));
        assert!(matches!(
            &events[1],
            EncounterEvent::TurnStarted { entity, entity_type: Faction::Player, round: 1 }
                if entity.as_str() == "a"
        ));
    }

    #[test]
    fn turns_cycle_and_wrap_into_next_round() {
        let mut encounter = started();
        for expected in ["b", "g", "a"] {
            encounter.record_action_used(1);
            assert!(encounter.are_current_entity_actions_exhausted());
            encounter.advance_turn().unwrap();
            assert_eq!(current(&encounter), expected);
            assert!(!encounter.are_current_entity_actions_exhausted());
        }
        assert_eq!(encounter.round(), 2);
    }

    #[test]
    fn advance_skips_defeated_combatants() {
        let mut encounter = started();
        encounter
            .roster_mut()
            .get_mut("b")
            .unwrap()
            .vitals_mut()
            .apply_damage(100);
        encounter.advance_turn().unwrap();
        assert_eq!(current(&encounter), "g");
        assert_eq!(encounter.turn_order().len(), 3);
    }

    #[test]
    fn victory_is_emitted_exactly_once() {
        let mut encounter = started();
        encounter
            .roster_mut()
            .get_mut("g")
            .unwrap()
            .vitals_mut()
            .apply_damage(100);
        encounter.take_events();

        assert_eq!(encounter.advance_turn().unwrap(), Some(EncounterResult::Victory));
        assert_eq!(encounter.check_resolution(), Some(EncounterResult::Victory));
        assert!(encounter.advance_turn().is_err());

        let ended = encounter
            .take_events()
            .into_iter()
            .filter(|event| matches!(event, EncounterEvent::EncounterEnded { .. }))
            .count();
        assert_eq!(ended, 1);
        assert!(encounter.current_turn_entity().is_none());
    }

    #[test]
    fn defeat_when_all_players_fall() {
        let mut encounter = started();
        for id in ["a", "b"] {
            encounter
                .roster_mut()
                .get_mut(id)
                .unwrap()
                .vitals_mut()
                .apply_damage(100);
        }
        assert_eq!(encounter.check_resolution(), Some(EncounterResult::Defeat));
    }

    #[test]
    fn start_rejects_bad_rosters() {
        let mut encounter = Encounter::new(EncounterId(2));
        assert_eq!(
            encounter.start(vec![player("a")], vec![]),
            Err(EncounterError::EmptySide(Faction::Enemy))
        );
        assert_eq!(
            encounter.start(vec![enemy("x")], vec![enemy("g")]),
            Err(EncounterError::FactionMismatch {
                combatant: "x".into(),
                expected: Faction::Player,
            })
        );
        assert_eq!(
            encounter.start(vec![player("a")], vec![enemy("a")]),
            Err(EncounterError::DuplicateCombatant("a".into()))
        );
        assert_eq!(encounter.phase(), EncounterPhase::Setup);
    }

    #[test]
    fn clean_up_requires_resolution_but_abort_does_not() {
        let mut encounter = started();
        assert!(matches!(
            encounter.clean_up(),
            Err(EncounterError::InvalidPhase { phase: EncounterPhase::Active, .. })
        ));
        assert!(encounter.abort());
        assert_eq!(encounter.phase(), EncounterPhase::Cleanup);
        assert!(encounter.roster().is_empty());
        assert!(!encounter.abort());
    }

    #[test]
    fn spawned_enemies_join_the_end_of_the_order() {
        let mut encounter = started();
        encounter.spawn_enemy(enemy("h")).unwrap();
        let expected: Vec<CombatantId> = ["a", "b", "g", "h"].map(CombatantId::from).into();
        assert_eq!(encounter.turn_order(), expected);
        assert_eq!(
            encounter.spawn_enemy(enemy("h")),
            Err(EncounterError::DuplicateCombatant("h".into()))
        );
    }

    #[test]
    fn disconnect_keeps_turn_slot() {
        let mut encounter = started();
        assert!(encounter.set_connected(&"a".into(), false).unwrap());
        assert!(!encounter.set_connected(&"a".into(), false).unwrap());
        assert_eq!(current(&encounter), "a");
        assert_eq!(
            encounter.set_connected(&"g".into(), false),
            Err(EncounterError::NotAPlayer("g".into()))
        );
    }

    #[test]
    fn repair_moves_past_a_defeated_current_entity() {
        let mut encounter = started();
        encounter
            .roster_mut()
            .get_mut("a")
            .unwrap()
            .vitals_mut()
            .apply_damage(100);
        assert!(encounter.repair_turn_pointer());
        assert_eq!(current(&encounter), "b");
        assert!(!encounter.repair_turn_pointer());
    }
}
