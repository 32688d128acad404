//! Target specifier parsing and faction-aware resolution.
//!
//! Resolution answers two questions: *who* is targeted and *what kind* of
//! target it is from the caster's point of view. The kind is classified
//! strictly by faction. An id on the caster's side is an ally, an id on the
//! other side is an enemy, and the caster's own id is `SelfOnly`.
//!
//! Aggregate specifiers are not expanded here. [`ResolvedTarget::Group`]
//! records the faction and is expanded against the roster when the pipeline
//! executes, so the effect always sees current state.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::catalog::TargetType;
use crate::combatant::{CombatantId, Faction, Roster};

/// Caller-supplied description of an intended target.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetSpecifier {
    SelfOnly,
    Combatant(CombatantId),
    AllAllies,
    AllEnemies,
    Area,
}

impl TargetSpecifier {
    /// Parses a specifier string.
    ///
    /// `""` and `"self"` select the caster; `"all_allies"`, `"all_enemies"`
    /// and `"area"` select aggregates (case-insensitive). Anything else is a
    /// literal combatant id.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("self") {
            Self::SelfOnly
        } else if trimmed.eq_ignore_ascii_case("all_allies") {
            Self::AllAllies
        } else if trimmed.eq_ignore_ascii_case("all_enemies") {
            Self::AllEnemies
        } else if trimmed.eq_ignore_ascii_case("area") {
            Self::Area
        } else {
            Self::Combatant(CombatantId::new(trimmed))
        }
    }
}

impl FromStr for TargetSpecifier {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&CombatantId> for TargetSpecifier {
    fn from(value: &CombatantId) -> Self {
        Self::Combatant(value.clone())
    }
}

impl fmt::Display for TargetSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SelfOnly => f.write_str("self"),
            Self::Combatant(id) => write!(f, "{id}"),
            Self::AllAllies => f.write_str("all_allies"),
            Self::AllEnemies => f.write_str("all_enemies"),
            Self::Area => f.write_str("area"),
        }
    }
}

/// A target classified relative to its caster.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedTarget {
    /// One living combatant (`SelfOnly`, `SingleAlly` or `SingleEnemy`).
    Single {
        kind: TargetType,
        target: CombatantId,
    },
    /// Every living member of `faction` at execution time.
    Group { kind: TargetType, faction: Faction },
}

impl ResolvedTarget {
    pub fn kind(&self) -> TargetType {
        match self {
            Self::Single { kind, .. } | Self::Group { kind, .. } => *kind,
        }
    }

    /// Roster indices of the living combatants this target covers right now.
    pub fn members(&self, roster: &Roster) -> Vec<usize> {
        match self {
            Self::Single { target, .. } => roster
                .index_of(target.as_str())
                .filter(|&index| roster.at(index).is_some_and(|c| c.is_alive()))
                .into_iter()
                .collect(),
            Self::Group { faction, .. } => roster.living_indices(*faction),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("caster '{0}' is not a living member of the encounter")]
    CasterNotFound(CombatantId),

    #[error("target '{0}' is not a living member of the encounter")]
    TargetNotFound(String),
}

/// Resolves `specifier` from the point of view of `actor`.
///
/// Dead combatants are treated as absent for both caster and target.
pub fn resolve(
    specifier: &TargetSpecifier,
    actor: &CombatantId,
    roster: &Roster,
) -> Result<ResolvedTarget, ResolveError> {
    let caster = roster
        .get(actor.as_str())
        .filter(|caster| caster.is_alive())
        .ok_or_else(|| ResolveError::CasterNotFound(actor.clone()))?;
    let faction = caster.faction();

    let resolved = match specifier {
        TargetSpecifier::SelfOnly => ResolvedTarget::Single {
            kind: TargetType::SelfOnly,
            target: actor.clone(),
        },
        TargetSpecifier::Combatant(id) if id == actor => ResolvedTarget::Single {
            kind: TargetType::SelfOnly,
            target: actor.clone(),
        },
        TargetSpecifier::Combatant(id) => {
            let target = roster
                .get(id.as_str())
                .filter(|target| target.is_alive())
                .ok_or_else(|| ResolveError::TargetNotFound(id.to_string()))?;
            let kind = if target.faction() == faction {
                TargetType::SingleAlly
            } else {
                TargetType::SingleEnemy
            };
            ResolvedTarget::Single {
                kind,
                target: id.clone(),
            }
        }
        TargetSpecifier::AllAllies => ResolvedTarget::Group {
            kind: TargetType::AllAllies,
            faction,
        },
        TargetSpecifier::AllEnemies => ResolvedTarget::Group {
            kind: TargetType::AllEnemies,
            faction: faction.opposing(),
        },
        TargetSpecifier::Area => ResolvedTarget::Group {
            kind: TargetType::Area,
            faction: faction.opposing(),
        },
    };

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{Combatant, CoreStats};

    fn roster() -> Roster {
        [
            Combatant::player("p1", "Aria", 30, CoreStats::default(), 1),
            Combatant::player("p2", "Bram", 30, CoreStats::default(), 1),
            Combatant::enemy("e1", "Goblin", "goblin", 20, CoreStats::default(), 1),
            Combatant::enemy("e2", "Goblin", "goblin", 20, CoreStats::default(), 1).with_health(0),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn parse_recognizes_keywords_case_insensitively() {
        assert_eq!(TargetSpecifier::parse(""), TargetSpecifier::SelfOnly);
        assert_eq!(TargetSpecifier::parse("SELF"), TargetSpecifier::SelfOnly);
        assert_eq!(TargetSpecifier::parse("All_Enemies"), TargetSpecifier::AllEnemies);
        assert_eq!(
            TargetSpecifier::parse("e1"),
            TargetSpecifier::Combatant("e1".into())
        );
    }

    #[test]
    fn ids_are_classified_by_faction() {
        let roster = roster();
        let actor = CombatantId::new("p1");

        let ally = resolve(&TargetSpecifier::parse("p2"), &actor, &roster).unwrap();
        assert_eq!(ally.kind(), TargetType::SingleAlly);

        let enemy = resolve(&TargetSpecifier::parse("e1"), &actor, &roster).unwrap();
        assert_eq!(enemy.kind(), TargetType::SingleEnemy);

        let own = resolve(&TargetSpecifier::parse("p1"), &actor, &roster).unwrap();
        assert_eq!(own.kind(), TargetType::SelfOnly);

        let from_enemy = resolve(&TargetSpecifier::parse("p1"), &"e1".into(), &roster).unwrap();
        assert_eq!(from_enemy.kind(), TargetType::SingleEnemy);
    }

    #[test]
    fn dead_or_missing_targets_are_not_found() {
        let roster = roster();
        let actor = CombatantId::new("p1");
        assert_eq!(
            resolve(&TargetSpecifier::parse("e2"), &actor, &roster),
            Err(ResolveError::TargetNotFound("e2".into()))
        );
        assert_eq!(
            resolve(&TargetSpecifier::parse("ghost"), &actor, &roster),
            Err(ResolveError::TargetNotFound("ghost".into()))
        );
        assert_eq!(
            resolve(&TargetSpecifier::SelfOnly, &"nobody".into(), &roster),
            Err(ResolveError::CasterNotFound("nobody".into()))
        );
    }

    #[test]
    fn groups_expand_to_current_living_members() {
        let mut roster = roster();
        let actor = CombatantId::new("p1");
        let area = resolve(&TargetSpecifier::Area, &actor, &roster).unwrap();
        assert_eq!(area.members(&roster), vec![2]);

        roster.push(Combatant::enemy(
            "e3",
            "Goblin",
            "goblin",
            20,
            CoreStats::default(),
            1,
        ));
        assert_eq!(area.members(&roster), vec![2, 4]);

        let allies = resolve(&TargetSpecifier::AllAllies, &actor, &roster).unwrap();
        assert_eq!(allies.members(&roster), vec![0, 1]);
    }
}
