//! Read-only view of an encounter handed out by its worker.

use serde::{Deserialize, Serialize};

use encounter_core::{
    CombatantId, CombatantSnapshot, EncounterId, EncounterPhase, EncounterResult, Faction,
    Orchestrator,
};

/// Point-in-time copy of an encounter's observable state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterStatus {
    pub id: EncounterId,
    pub phase: EncounterPhase,
    pub round: u32,
    pub current_turn: Option<CombatantId>,
    pub current_faction: Option<Faction>,
    pub result: Option<EncounterResult>,
    pub combatants: Vec<CombatantSnapshot>,
    pub defeated: Vec<CombatantId>,
}

impl EncounterStatus {
    pub(crate) fn capture(orchestrator: &Orchestrator) -> Self {
        let encounter = orchestrator.encounter();
        let current = orchestrator.current_turn();
        Self {
            id: encounter.id(),
            phase: encounter.phase(),
            round: encounter.round(),
            current_turn: current.map(|combatant| combatant.id().clone()),
            current_faction: current.map(|combatant| combatant.faction()),
            result: encounter.result(),
            combatants: encounter.snapshot(),
            defeated: encounter.defeated().to_vec(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.phase == EncounterPhase::Active
    }

    /// Whether a player is expected to submit the next request.
    pub fn awaiting_player(&self) -> Option<&CombatantId> {
        match self.current_faction {
            Some(Faction::Player) if self.is_active() => self.current_turn.as_ref(),
            _ => None,
        }
    }

    pub fn combatant(&self, id: &str) -> Option<&CombatantSnapshot> {
        self.combatants.iter().find(|snapshot| snapshot.id.as_str() == id)
    }

    /// Ids of living combatants on `faction`, in roster order.
    pub fn living(&self, faction: Faction) -> impl Iterator<Item = &CombatantId> {
        self.combatants
            .iter()
            .filter(move |snapshot| snapshot.alive && snapshot.faction == faction)
            .map(|snapshot| &snapshot.id)
    }
}
