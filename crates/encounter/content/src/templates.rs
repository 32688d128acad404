//! Combatant templates.
//!
//! Templates are plain data. [`PlayerTemplate::instantiate`] and
//! [`Bestiary::spawn`] turn them into engine [`Combatant`]s.

use std::collections::{BTreeMap, HashMap};

use encounter_core::{AbilityCatalog, AbilityId, Combatant, CoreStats, ResourceMeter, StatBonus};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown enemy template '{0}'")]
    UnknownTemplate(String),

    #[error("duplicate enemy template '{0}'")]
    DuplicateTemplate(String),

    #[error("template '{template}' references unknown ability '{ability}'")]
    UnknownAbility { template: String, ability: AbilityId },
}

/// A member of the adventuring party.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerTemplate {
    pub id: String,
    pub name: String,
    pub max_health: u32,
    pub stats: CoreStats,
    pub actions: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub resource: u32,
    #[cfg_attr(feature = "serde", serde(default = "default_level"))]
    pub level: u32,
    pub abilities: Vec<AbilityId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub equipment: Vec<StatBonus>,
}

#[cfg(feature = "serde")]
fn default_level() -> u32 {
    1
}

impl PlayerTemplate {
    pub fn instantiate(&self) -> Combatant {
        self.equipment.iter().cloned().fold(
            Combatant::player(
                self.id.as_str(),
                self.name.as_str(),
                self.max_health,
                self.stats,
                self.actions,
            )
            .with_level(self.level)
            .with_resource(ResourceMeter::full(self.resource))
            .with_abilities(self.abilities.iter().cloned()),
            Combatant::with_bonus,
        )
    }
}

/// Blueprint for spawning enemies.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnemyTemplate {
    /// Template key, also the prefix of spawned ids (`goblin#1`).
    pub key: String,
    pub name: String,
    pub max_health: u32,
    pub stats: CoreStats,
    pub actions: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub resource: u32,
    pub abilities: Vec<AbilityId>,
    /// Experience awarded when defeated.
    #[cfg_attr(feature = "serde", serde(default))]
    pub experience: u32,
}

/// Enemy templates plus per-template spawn counters.
#[derive(Clone, Debug, Default)]
pub struct Bestiary {
    templates: BTreeMap<String, EnemyTemplate>,
    spawned: HashMap<String, u32>,
}

impl Bestiary {
    pub fn new(templates: impl IntoIterator<Item = EnemyTemplate>) -> Result<Self, TemplateError> {
        let mut bestiary = Self::default();
        for template in templates {
            if bestiary.templates.contains_key(&template.key) {
                return Err(TemplateError::DuplicateTemplate(template.key));
            }
            bestiary.templates.insert(template.key.clone(), template);
        }
        Ok(bestiary)
    }

    pub fn get(&self, key: &str) -> Option<&EnemyTemplate> {
        self.templates.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Checks that every template only references abilities in `catalog`.
    pub fn validate(&self, catalog: &AbilityCatalog) -> Result<(), TemplateError> {
        for template in self.templates.values() {
            if let Some(missing) = template
                .abilities
                .iter()
                .find(|ability| catalog.get_ability_by_id(ability.as_str()).is_none())
            {
                return Err(TemplateError::UnknownAbility {
                    template: template.key.clone(),
                    ability: missing.clone(),
                });
            }
        }
        Ok(())
    }

    /// Instantiates an enemy with a unique id of the form `key#n`.
    pub fn spawn(&mut self, key: &str) -> Result<Combatant, TemplateError> {
        let template = self
            .templates
            .get(key)
            .ok_or_else(|| TemplateError::UnknownTemplate(key.to_string()))?;
        let counter = self.spawned.entry(template.key.clone()).or_default();
        *counter += 1;

        Ok(Combatant::enemy(
            format!("{}#{}", template.key, counter),
            template.name.as_str(),
            template.key.as_str(),
            template.max_health,
            template.stats,
            template.actions,
        )
        .with_resource(ResourceMeter::full(template.resource))
        .with_abilities(template.abilities.iter().cloned())
        .with_experience(template.experience))
    }

    pub fn spawn_many<'a>(
        &mut self,
        keys: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<Combatant>, TemplateError> {
        keys.into_iter().map(|key| self.spawn(key)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encounter_core::CombatantKind;

    fn goblin() -> EnemyTemplate {
        EnemyTemplate {
            key: "goblin".into(),
            name: "Goblin".into(),
            max_health: 18,
            stats: CoreStats::new(6, 2, 0),
            actions: 1,
            resource: 0,
            abilities: vec!["stab".into()],
            experience: 10,
        }
    }

    #[test]
    fn spawned_enemies_get_unique_ids() {
        let mut bestiary = Bestiary::new([goblin()]).unwrap();
        let spawned = bestiary.spawn_many(["goblin", "goblin"]).unwrap();
        assert_eq!(spawned[0].id().as_str(), "goblin#1");
        assert_eq!(spawned[1].id().as_str(), "goblin#2");
        assert!(matches!(
            spawned[0].kind(),
            CombatantKind::Enemy(enemy) if enemy.experience == 10 && enemy.template == "goblin"
        ));
        assert_eq!(
            bestiary.spawn("dragon").unwrap_err(),
            TemplateError::UnknownTemplate("dragon".into())
        );
    }

    #[test]
    fn duplicate_templates_are_rejected() {
        assert_eq!(
            Bestiary::new([goblin(), goblin()]).unwrap_err(),
            TemplateError::DuplicateTemplate("goblin".into())
        );
    }

    #[test]
    fn player_equipment_feeds_effective_stats() {
        let template = PlayerTemplate {
            id: "aria".into(),
            name: "Aria".into(),
            max_health: 40,
            stats: CoreStats::new(10, 5, 2),
            actions: 2,
            resource: 6,
            level: 3,
            abilities: vec!["slash".into()],
            equipment: vec![StatBonus {
                source: "longsword".into(),
                attack: 4,
                ..StatBonus::default()
            }],
        };
        let aria = template.instantiate();
        assert_eq!(aria.effective_stats(), CoreStats::new(14, 5, 2));
        assert_eq!(aria.resource().current(), 6);
        assert_eq!(aria.actions().total(), 2);
        assert!(aria.knows_ability(&"slash".into()));
    }
}
