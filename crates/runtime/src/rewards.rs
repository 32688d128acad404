//! In-memory reward bookkeeping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::info;

use encounter_core::{CombatantId, CombatantKind, EncounterId, Faction, RewardService, Roster};

/// One resolved victory as seen by [`ExperienceLedger`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VictoryRecord {
    pub encounter: EncounterId,
    /// Experience granted to each recipient.
    pub experience: u32,
    pub recipients: Vec<CombatantId>,
    pub defeated: Vec<CombatantId>,
}

#[derive(Debug, Default)]
struct Ledger {
    totals: HashMap<CombatantId, u32>,
    victories: Vec<VictoryRecord>,
}

/// Awards the summed experience of every defeated enemy to each surviving
/// player.
///
/// Clones share the same ledger, so one clone can be handed to an encounter
/// while another is kept for reading the totals.
#[derive(Clone, Debug, Default)]
pub struct ExperienceLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl ExperienceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn experience_of(&self, player: &str) -> u32 {
        self.lock().totals.get(player).copied().unwrap_or(0)
    }

    pub fn victories(&self) -> Vec<VictoryRecord> {
        self.lock().victories.clone()
    }
}

impl RewardService for ExperienceLedger {
    fn on_victory(&mut self, encounter: EncounterId, roster: &Roster, defeated: &[CombatantId]) {
        let experience = defeated
            .iter()
            .filter_map(|id| roster.get(id.as_str()))
            .map(|enemy| match enemy.kind() {
                CombatantKind::Enemy(enemy) => enemy.experience,
                CombatantKind::Player(_) => 0,
            })
            .fold(0u32, u32::saturating_add);
        let recipients: Vec<CombatantId> = roster
            .living(Faction::Player)
            .map(|player| player.id().clone())
            .collect();

        let mut ledger = self.lock();
        for player in &recipients {
            let total = ledger.totals.entry(player.clone()).or_default();
            *total = total.saturating_add(experience);
        }
        info!(
            target: "runtime::rewards",
            %encounter,
            experience,
            recipients = recipients.len(),
            "victory rewards granted"
        );
        ledger.victories.push(VictoryRecord {
            encounter,
            experience,
            recipients,
            defeated: defeated.to_vec(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encounter_core::{Combatant, CoreStats};

    #[test]
    fn survivors_share_the_full_pool() {
        let roster: Roster = [
            Combatant::player("aria", "Aria", 30, CoreStats::default(), 1),
            Combatant::player("bram", "Bram", 30, CoreStats::default(), 1).with_health(0),
            Combatant::enemy("goblin#1", "Goblin", "goblin", 10, CoreStats::default(), 1)
                .with_experience(10)
                .with_health(0),
            Combatant::enemy("wolf#1", "Wolf", "wolf", 10, CoreStats::default(), 1)
                .with_experience(12)
                .with_health(0),
        ]
        .into_iter()
        .collect();

        let ledger = ExperienceLedger::new();
        let mut service = ledger.clone();
        service.on_victory(
            EncounterId(1),
            &roster,
            &["goblin#1".into(), "wolf#1".into()],
        );

        assert_eq!(ledger.experience_of("aria"), 22);
        assert_eq!(ledger.experience_of("bram"), 0);
        let victories = ledger.victories();
        assert_eq!(victories.len(), 1);
        assert_eq!(victories[0].recipients, vec![CombatantId::new("aria")]);
    }
}
