//! Immutable ability and item definitions.
//!
//! The catalog is built once (usually by `encounter-content`) and shared
//! read-only behind an `Arc` for the lifetime of every encounter that uses it.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

use bitflags::bitflags;

// ============================================================================
// Identifiers
// ============================================================================

/// Catalog key of an ability.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct AbilityId(String);

impl AbilityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for AbilityId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AbilityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AbilityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Catalog key of an item.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ItemId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// Targeting Types
// ============================================================================

/// Semantic type of a resolved target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum TargetType {
    /// The caster itself.
    SelfOnly,
    SingleAlly,
    SingleEnemy,
    /// Every living combatant of the caster's opposing faction.
    Area,
    AllAllies,
    AllEnemies,
}

bitflags! {
    /// Set of [`TargetType`]s an ability declares support for.
    ///
    /// Serialized in the bitflags text format, e.g. `"SINGLE_ENEMY | ALL_ENEMIES"`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(
        feature = "serde",
        derive(serde::Serialize, serde::Deserialize),
        serde(transparent)
    )]
    pub struct TargetTypes: u8 {
        const SELF_ONLY    = 1 << 0;
        const SINGLE_ALLY  = 1 << 1;
        const SINGLE_ENEMY = 1 << 2;
        const AREA         = 1 << 3;
        const ALL_ALLIES   = 1 << 4;
        const ALL_ENEMIES  = 1 << 5;
    }
}

impl From<TargetType> for TargetTypes {
    fn from(value: TargetType) -> Self {
        match value {
            TargetType::SelfOnly => Self::SELF_ONLY,
            TargetType::SingleAlly => Self::SINGLE_ALLY,
            TargetType::SingleEnemy => Self::SINGLE_ENEMY,
            TargetType::Area => Self::AREA,
            TargetType::AllAllies => Self::ALL_ALLIES,
            TargetType::AllEnemies => Self::ALL_ENEMIES,
        }
    }
}

impl FromIterator<TargetType> for TargetTypes {
    fn from_iter<T: IntoIterator<Item = TargetType>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::empty(), |set, target| set | Self::from(target))
    }
}

impl TargetTypes {
    /// Whether `target` is declared, either directly or through subsumption.
    ///
    /// Many abilities only declare their broadest applicable type:
    /// - `SelfOnly` is covered by `SingleAlly`, `Area` or `AllAllies`
    /// - `SingleAlly` is covered by `AllAllies`
    /// - `SingleEnemy` is covered by `AllEnemies`
    pub fn supports(self, target: TargetType) -> bool {
        if self.contains(Self::from(target)) {
            return true;
        }
        match target {
            TargetType::SelfOnly => {
                self.intersects(Self::SINGLE_ALLY | Self::AREA | Self::ALL_ALLIES)
            }
            TargetType::SingleAlly => self.contains(Self::ALL_ALLIES),
            TargetType::SingleEnemy => self.contains(Self::ALL_ENEMIES),
            TargetType::Area | TargetType::AllAllies | TargetType::AllEnemies => false,
        }
    }

    /// Whether any hostile target type is supported (directly or subsumed).
    pub fn is_offensive(self) -> bool {
        self.intersects(Self::SINGLE_ENEMY | Self::AREA | Self::ALL_ENEMIES)
    }
}

// ============================================================================
// Ability Definition
// ============================================================================

/// Mitigation class of an ability's damage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum DamageType {
    /// Reduced by the target's defense.
    #[default]
    Physical,
    /// Unmitigated unless a magic divisor is configured.
    Magic,
    /// Never mitigated.
    Pure,
}

/// Caster stat an ability scales with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalingStat {
    Attack,
    Magic,
}

impl DamageType {
    /// Physical scales with attack; magic and pure scale with magic.
    pub const fn scaling_stat(self) -> ScalingStat {
        match self {
            Self::Physical => ScalingStat::Attack,
            Self::Magic | Self::Pure => ScalingStat::Magic,
        }
    }
}

/// Where an ability is being used from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case")]
pub enum UseContext {
    InCombat,
    OutOfCombat,
    /// Bypasses the context gate.
    Always,
}

/// Immutable ability definition.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AbilityDefinition {
    pub id: AbilityId,
    pub name: String,
    /// Actions deducted from the caster's budget. Always at least 1.
    pub action_cost: u32,
    /// Magic points deducted from the caster's resource pool.
    #[cfg_attr(feature = "serde", serde(default))]
    pub resource_cost: u32,
    pub targets: TargetTypes,
    pub usable_in_combat: bool,
    pub usable_out_of_combat: bool,
    /// Negative heals, positive damages.
    pub base_effect: i32,
    /// Signed percentage of the caster's scaling stat added to `base_effect`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub scaling: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub damage_type: DamageType,
}

impl AbilityDefinition {
    /// Context gate: `Always` bypasses the usability flags.
    pub const fn allows_context(&self, context: UseContext) -> bool {
        match context {
            UseContext::InCombat => self.usable_in_combat,
            UseContext::OutOfCombat => self.usable_out_of_combat,
            UseContext::Always => true,
        }
    }

    pub fn supports_target(&self, target: TargetType) -> bool {
        self.targets.supports(target)
    }

    pub fn is_offensive(&self) -> bool {
        self.base_effect > 0 && self.targets.is_offensive()
    }
}

/// Item definition, optionally linked to the ability it triggers.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemDefinition {
    pub id: ItemId,
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub ability: Option<AbilityId>,
}

// ============================================================================
// Catalog
// ============================================================================

/// Errors raised while assembling a catalog.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    #[error("duplicate ability id '{0}'")]
    DuplicateAbility(AbilityId),

    #[error("duplicate item id '{0}'")]
    DuplicateItem(ItemId),

    #[error("ability '{0}' must cost at least one action")]
    ZeroActionCost(AbilityId),

    #[error("ability '{0}' declares no target types")]
    NoTargetTypes(AbilityId),

    #[error("item '{item}' links to unknown ability '{ability}'")]
    UnknownLinkedAbility { item: ItemId, ability: AbilityId },
}

/// Read-only lookup of abilities and items.
#[derive(Clone, Debug, Default)]
pub struct AbilityCatalog {
    abilities: HashMap<AbilityId, AbilityDefinition>,
    items: HashMap<ItemId, ItemDefinition>,
}

impl AbilityCatalog {
    /// Builds a catalog, rejecting malformed or dangling definitions.
    pub fn new(
        abilities: impl IntoIterator<Item = AbilityDefinition>,
        items: impl IntoIterator<Item = ItemDefinition>,
    ) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();

        for ability in abilities {
            if ability.action_cost == 0 {
                return Err(CatalogError::ZeroActionCost(ability.id));
            }
            if ability.targets.is_empty() {
                return Err(CatalogError::NoTargetTypes(ability.id));
            }
            if catalog.abilities.contains_key(&ability.id) {
                return Err(CatalogError::DuplicateAbility(ability.id));
            }
            catalog.abilities.insert(ability.id.clone(), ability);
        }

        for item in items {
            if let Some(ability) = &item.ability {
                if !catalog.abilities.contains_key(ability) {
                    return Err(CatalogError::UnknownLinkedAbility {
                        item: item.id.clone(),
                        ability: ability.clone(),
                    });
                }
            }
            if catalog.items.contains_key(&item.id) {
                return Err(CatalogError::DuplicateItem(item.id));
            }
            catalog.items.insert(item.id.clone(), item);
        }

        Ok(catalog)
    }

    pub fn get_ability_by_id(&self, id: &str) -> Option<&AbilityDefinition> {
        self.abilities.get(id)
    }

    pub fn item(&self, id: &str) -> Option<&ItemDefinition> {
        self.items.get(id)
    }

    pub fn abilities(&self) -> impl Iterator<Item = &AbilityDefinition> {
        self.abilities.values()
    }

    pub fn items(&self) -> impl Iterator<Item = &ItemDefinition> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.abilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.abilities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strike() -> AbilityDefinition {
        AbilityDefinition {
            id: "strike".into(),
            name: "Strike".into(),
            action_cost: 1,
            resource_cost: 0,
            targets: TargetTypes::SINGLE_ENEMY,
            usable_in_combat: true,
            usable_out_of_combat: false,
            base_effect: 15,
            scaling: 0,
            damage_type: DamageType::Physical,
        }
    }

    #[test]
    fn subsumption_rules() {
        let allies = TargetTypes::ALL_ALLIES;
        assert!(allies.supports(TargetType::SelfOnly));
        assert!(allies.supports(TargetType::SingleAlly));
        assert!(!allies.supports(TargetType::SingleEnemy));

        assert!(TargetTypes::AREA.supports(TargetType::SelfOnly));
        assert!(TargetTypes::SINGLE_ALLY.supports(TargetType::SelfOnly));
        assert!(TargetTypes::ALL_ENEMIES.supports(TargetType::SingleEnemy));
        assert!(!TargetTypes::SINGLE_ENEMY.supports(TargetType::SelfOnly));
        assert!(!TargetTypes::SINGLE_ENEMY.supports(TargetType::AllEnemies));
    }

    #[test]
    fn context_gate() {
        let ability = strike();
        assert!(ability.allows_context(UseContext::InCombat));
        assert!(!ability.allows_context(UseContext::OutOfCombat));
        assert!(ability.allows_context(UseContext::Always));
    }

    #[test]
    fn catalog_rejects_zero_cost_and_dangling_items() {
        let mut free = strike();
        free.action_cost = 0;
        assert_eq!(
            AbilityCatalog::new([free], []).unwrap_err(),
            CatalogError::ZeroActionCost("strike".into())
        );

        let potion = ItemDefinition {
            id: "potion".into(),
            name: "Potion".into(),
            ability: Some("mend".into()),
        };
        assert!(matches!(
            AbilityCatalog::new([strike()], [potion]),
            Err(CatalogError::UnknownLinkedAbility { .. })
        ));
    }

    #[test]
    fn catalog_lookup_by_str() {
        let catalog = AbilityCatalog::new([strike()], []).unwrap();
        assert_eq!(catalog.get_ability_by_id("strike").unwrap().base_effect, 15);
        assert!(catalog.get_ability_by_id("fireball").is_none());
    }
}
