//! Outbound notifications emitted by the encounter.
//!
//! Events are buffered inside the [`Encounter`](crate::encounter::Encounter)
//! while a mutation runs and drained by the caller afterwards, so any
//! broadcast happens strictly after the authoritative state change.

use crate::combatant::{CombatantId, CombatantSnapshot, Faction};
use crate::encounter::EncounterResult;

/// Why a turn ended without the combatant acting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
pub enum ForfeitReason {
    /// The combatant ended its own turn.
    Requested,
    /// The turn timer expired.
    Timeout,
    /// The engine skipped the turn (no eligible ability, invariant repair).
    System,
}

/// Health and resource delta for one combatant after an ability resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatantChange {
    pub combatant: CombatantId,
    /// Negative for damage taken, positive for healing received.
    pub health_delta: i64,
    /// Negative when resources were spent.
    pub resource_delta: i64,
    pub health: u32,
    pub max_health: u32,
}

impl CombatantChange {
    pub fn is_noop(&self) -> bool {
        self.health_delta == 0 && self.resource_delta == 0
    }
}

/// Every state change an observer may react to.
#[derive(Clone, Debug, PartialEq, Eq, strum::AsRefStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "event", rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
pub enum EncounterEvent {
    EncounterStarted {
        players: Vec<CombatantSnapshot>,
        enemies: Vec<CombatantSnapshot>,
        turn_order: Vec<CombatantId>,
    },
    TurnStarted {
        entity: CombatantId,
        entity_type: Faction,
        round: u32,
    },
    TurnForfeited {
        entity: CombatantId,
        reason: ForfeitReason,
    },
    EnemySpawned {
        enemy: CombatantSnapshot,
    },
    EnemyDefeated {
        enemy: CombatantId,
    },
    CombatantChanged {
        change: CombatantChange,
    },
    ActionNarrated {
        actor: CombatantId,
        text: String,
    },
    CombatantsUpdated {
        snapshot: Vec<CombatantSnapshot>,
    },
    EncounterEnded {
        result: EncounterResult,
    },
    EncounterCleanedUp,
}

impl EncounterEvent {
    /// Stable snake_case name, e.g. `"turn_started"`.
    pub fn name(&self) -> &str {
        self.as_ref()
    }

    /// Lifecycle events mark phase transitions of the encounter.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Self::EncounterStarted { .. } | Self::EncounterEnded { .. } | Self::EncounterCleanedUp
        )
    }

    pub fn is_turn(&self) -> bool {
        matches!(self, Self::TurnStarted { .. } | Self::TurnForfeited { .. })
    }
}
