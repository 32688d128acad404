//! Combatant model shared by player-controlled and autonomous participants.
//!
//! A [`Combatant`] is a plain value owned by the encounter's [`Roster`]. There
//! are no back-pointers: "my party" or "my encounter" is always answered by a
//! lookup through the owning roster, keyed by [`CombatantId`].
//!
//! # Invariants
//!
//! - `0 <= vitals.current <= vitals.max`
//! - `actions.remaining <= actions.total`
//! - `resource.current <= resource.maximum`
//!
//! All three are enforced by keeping the fields private and mutating them only
//! through the clamping helpers below.

use std::borrow::Borrow;
use std::fmt;

use crate::catalog::{AbilityDefinition, AbilityId, UseContext};

// ============================================================================
// Identity
// ============================================================================

/// Stable identifier of a combatant within an encounter.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct CombatantId(String);

impl CombatantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CombatantId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CombatantId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CombatantId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Side of the encounter a combatant fights for.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Faction {
    Player,
    Enemy,
}

impl Faction {
    /// Returns the faction this one fights against.
    pub const fn opposing(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }
}

// ============================================================================
// Vitals, Stats, Budgets
// ============================================================================

/// Current and maximum health.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vitals {
    current: u32,
    max: u32,
}

impl Vitals {
    /// Creates vitals at full health.
    pub const fn full(max: u32) -> Self {
        Self { current: max, max }
    }

    /// Creates vitals with `current` clamped into `[0, max]`.
    pub fn new(current: u32, max: u32) -> Self {
        Self {
            current: current.min(max),
            max,
        }
    }

    pub const fn current(&self) -> u32 {
        self.current
    }

    pub const fn max(&self) -> u32 {
        self.max
    }

    pub const fn is_alive(&self) -> bool {
        self.current > 0
    }

    /// Removes up to `amount` health and returns how much was actually removed.
    pub fn apply_damage(&mut self, amount: u32) -> u32 {
        let applied = amount.min(self.current);
        self.current -= applied;
        applied
    }

    /// Restores up to `amount` health and returns how much was actually restored.
    pub fn apply_heal(&mut self, amount: u32) -> u32 {
        let applied = amount.min(self.max - self.current);
        self.current += applied;
        applied
    }
}

/// Core combat stats. Non-negative by construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoreStats {
    pub attack: u32,
    pub defense: u32,
    pub magic: u32,
}

impl CoreStats {
    pub const fn new(attack: u32, defense: u32, magic: u32) -> Self {
        Self {
            attack,
            defense,
            magic,
        }
    }

    /// Applies signed bonuses, flooring every stat at 0.
    pub fn with_bonuses<'a>(self, bonuses: impl IntoIterator<Item = &'a StatBonus>) -> Self {
        let (mut attack, mut defense, mut magic) =
            (self.attack as i64, self.defense as i64, self.magic as i64);
        for bonus in bonuses {
            attack += bonus.attack as i64;
            defense += bonus.defense as i64;
            magic += bonus.magic as i64;
        }
        Self {
            attack: clamp_stat(attack),
            defense: clamp_stat(defense),
            magic: clamp_stat(magic),
        }
    }
}

fn clamp_stat(value: i64) -> u32 {
    value.clamp(0, u32::MAX as i64) as u32
}

/// Flat stat modifier granted by a piece of equipment.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatBonus {
    pub source: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attack: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub defense: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub magic: i32,
}

/// Per-turn action allotment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionBudget {
    total: u32,
    remaining: u32,
}

impl ActionBudget {
    pub const fn new(total: u32) -> Self {
        Self {
            total,
            remaining: total,
        }
    }

    pub const fn total(&self) -> u32 {
        self.total
    }

    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    pub const fn can_afford(&self, cost: u32) -> bool {
        self.remaining >= cost
    }

    pub const fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Spends `cost` actions, saturating at zero.
    pub fn spend(&mut self, cost: u32) {
        self.remaining = self.remaining.saturating_sub(cost);
    }

    pub fn reset(&mut self) {
        self.remaining = self.total;
    }
}

/// Spendable resource pool (magic points).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceMeter {
    current: u32,
    maximum: u32,
}

impl ResourceMeter {
    pub fn new(current: u32, maximum: u32) -> Self {
        Self {
            current: current.min(maximum),
            maximum,
        }
    }

    pub const fn full(maximum: u32) -> Self {
        Self {
            current: maximum,
            maximum,
        }
    }

    pub const fn current(&self) -> u32 {
        self.current
    }

    pub const fn maximum(&self) -> u32 {
        self.maximum
    }

    /// Deducts `cost`, flooring at zero. Returns the amount actually deducted.
    pub fn spend(&mut self, cost: u32) -> u32 {
        let spent = cost.min(self.current);
        self.current -= spent;
        spent
    }
}

// ============================================================================
// Combatant
// ============================================================================

/// Player-controlled participant data.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerCombatant {
    /// Whether the owning connection is currently attached.
    ///
    /// A disconnected player keeps its roster entry and turn slot.
    pub connected: bool,
    pub level: u32,
}

/// Autonomous participant data.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnemyCombatant {
    /// Template the enemy was spawned from.
    pub template: String,
    /// Experience granted to the party when defeated.
    pub experience: u32,
}

/// Variant-specific combatant data.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CombatantKind {
    Player(PlayerCombatant),
    Enemy(EnemyCombatant),
}

impl CombatantKind {
    pub const fn faction(&self) -> Faction {
        match self {
            Self::Player(_) => Faction::Player,
            Self::Enemy(_) => Faction::Enemy,
        }
    }
}

/// A participant in an encounter.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Combatant {
    id: CombatantId,
    name: String,
    kind: CombatantKind,
    vitals: Vitals,
    stats: CoreStats,
    bonuses: Vec<StatBonus>,
    actions: ActionBudget,
    resource: ResourceMeter,
    abilities: Vec<AbilityId>,
}

impl Combatant {
    fn new(
        id: impl Into<CombatantId>,
        name: impl Into<String>,
        kind: CombatantKind,
        max_health: u32,
        stats: CoreStats,
        total_actions: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            vitals: Vitals::full(max_health),
            stats,
            bonuses: Vec::new(),
            actions: ActionBudget::new(total_actions),
            resource: ResourceMeter::default(),
            abilities: Vec::new(),
        }
    }

    /// Creates a connected player at full health.
    pub fn player(
        id: impl Into<CombatantId>,
        name: impl Into<String>,
        max_health: u32,
        stats: CoreStats,
        total_actions: u32,
    ) -> Self {
        Self::new(
            id,
            name,
            CombatantKind::Player(PlayerCombatant {
                connected: true,
                level: 1,
            }),
            max_health,
            stats,
            total_actions,
        )
    }

    /// Creates an enemy at full health.
    pub fn enemy(
        id: impl Into<CombatantId>,
        name: impl Into<String>,
        template: impl Into<String>,
        max_health: u32,
        stats: CoreStats,
        total_actions: u32,
    ) -> Self {
        Self::new(
            id,
            name,
            CombatantKind::Enemy(EnemyCombatant {
                template: template.into(),
                experience: 0,
            }),
            max_health,
            stats,
            total_actions,
        )
    }

    #[must_use]
    pub fn with_abilities<I, A>(mut self, abilities: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<AbilityId>,
    {
        self.abilities = abilities.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_resource(mut self, resource: ResourceMeter) -> Self {
        self.resource = resource;
        self
    }

    #[must_use]
    pub fn with_health(mut self, current: u32) -> Self {
        self.vitals = Vitals::new(current, self.vitals.max());
        self
    }

    #[must_use]
    pub fn with_bonus(mut self, bonus: StatBonus) -> Self {
        self.bonuses.push(bonus);
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: u32) -> Self {
        if let CombatantKind::Player(player) = &mut self.kind {
            player.level = level;
        }
        self
    }

    #[must_use]
    pub fn with_experience(mut self, experience: u32) -> Self {
        if let CombatantKind::Enemy(enemy) = &mut self.kind {
            enemy.experience = experience;
        }
        self
    }

    pub fn id(&self) -> &CombatantId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &CombatantKind {
        &self.kind
    }

    pub fn faction(&self) -> Faction {
        self.kind.faction()
    }

    pub fn is_player(&self) -> bool {
        matches!(self.kind, CombatantKind::Player(_))
    }

    pub fn is_enemy(&self) -> bool {
        matches!(self.kind, CombatantKind::Enemy(_))
    }

    pub fn is_alive(&self) -> bool {
        self.vitals.is_alive()
    }

    /// `None` for enemies, connection state for players.
    pub fn is_connected(&self) -> Option<bool> {
        match &self.kind {
            CombatantKind::Player(player) => Some(player.connected),
            CombatantKind::Enemy(_) => None,
        }
    }

    pub fn vitals(&self) -> &Vitals {
        &self.vitals
    }

    pub fn base_stats(&self) -> CoreStats {
        self.stats
    }

    /// Base stats plus every equipment bonus.
    pub fn effective_stats(&self) -> CoreStats {
        self.stats.with_bonuses(&self.bonuses)
    }

    pub fn bonuses(&self) -> &[StatBonus] {
        &self.bonuses
    }

    pub fn actions(&self) -> &ActionBudget {
        &self.actions
    }

    pub fn resource(&self) -> &ResourceMeter {
        &self.resource
    }

    pub fn abilities(&self) -> &[AbilityId] {
        &self.abilities
    }

    pub fn knows_ability(&self, ability: &AbilityId) -> bool {
        self.abilities.contains(ability)
    }

    /// Whether this combatant may use `ability` right now in `context`.
    ///
    /// Checks membership in the usable set, the context gate and the action
    /// budget. Target legality is decided later by the pipeline.
    pub fn can_use(&self, ability: &AbilityDefinition, context: UseContext) -> bool {
        self.is_alive()
            && self.knows_ability(&ability.id)
            && ability.allows_context(context)
            && self.actions.can_afford(ability.action_cost)
    }

    pub(crate) fn vitals_mut(&mut self) -> &mut Vitals {
        &mut self.vitals
    }

    pub(crate) fn actions_mut(&mut self) -> &mut ActionBudget {
        &mut self.actions
    }

    pub(crate) fn resource_mut(&mut self) -> &mut ResourceMeter {
        &mut self.resource
    }

    pub(crate) fn set_connected(&mut self, connected: bool) -> bool {
        match &mut self.kind {
            CombatantKind::Player(player) => {
                player.connected = connected;
                true
            }
            CombatantKind::Enemy(_) => false,
        }
    }

    /// Read-only view forwarded to observers.
    pub fn snapshot(&self) -> CombatantSnapshot {
        CombatantSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            faction: self.faction(),
            health: self.vitals.current(),
            max_health: self.vitals.max(),
            resource: self.resource.current(),
            max_resource: self.resource.maximum(),
            actions_remaining: self.actions.remaining(),
            total_actions: self.actions.total(),
            alive: self.is_alive(),
            connected: self.is_connected(),
        }
    }
}

/// Serializable, observer-facing view of a combatant.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CombatantSnapshot {
    pub id: CombatantId,
    pub name: String,
    pub faction: Faction,
    pub health: u32,
    pub max_health: u32,
    pub resource: u32,
    pub max_resource: u32,
    pub actions_remaining: u32,
    pub total_actions: u32,
    pub alive: bool,
    pub connected: Option<bool>,
}

// ============================================================================
// Roster
// ============================================================================

/// Arena of combatants owned by an encounter.
///
/// Append-only while the encounter runs, so indices handed out by
/// [`Roster::index_of`] stay valid until the roster is cleared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Roster {
    combatants: Vec<Combatant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.combatants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combatants.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    /// Appends a combatant and returns its arena index.
    pub fn push(&mut self, combatant: Combatant) -> usize {
        self.combatants.push(combatant);
        self.combatants.len() - 1
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.combatants
            .iter()
            .position(|combatant| combatant.id.as_str() == id)
    }

    pub fn get(&self, id: &str) -> Option<&Combatant> {
        self.combatants
            .iter()
            .find(|combatant| combatant.id.as_str() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Combatant> {
        self.combatants
            .iter_mut()
            .find(|combatant| combatant.id.as_str() == id)
    }

    pub fn at(&self, index: usize) -> Option<&Combatant> {
        self.combatants.get(index)
    }

    pub fn at_mut(&mut self, index: usize) -> Option<&mut Combatant> {
        self.combatants.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Combatant> {
        self.combatants.iter()
    }

    /// Arena indices of living members of `faction`, in roster order.
    pub fn living_indices(&self, faction: Faction) -> Vec<usize> {
        self.combatants
            .iter()
            .enumerate()
            .filter(|(_, combatant)| combatant.faction() == faction && combatant.is_alive())
            .map(|(index, _)| index)
            .collect()
    }

    /// Living members of `faction`, in roster order.
    pub fn living(&self, faction: Faction) -> impl Iterator<Item = &Combatant> {
        self.combatants
            .iter()
            .filter(move |combatant| combatant.faction() == faction && combatant.is_alive())
    }

    pub fn has_living(&self, faction: Faction) -> bool {
        self.living(faction).next().is_some()
    }

    pub fn snapshot(&self) -> Vec<CombatantSnapshot> {
        self.combatants.iter().map(Combatant::snapshot).collect()
    }

    pub(crate) fn clear(&mut self) {
        self.combatants.clear();
    }
}

impl FromIterator<Combatant> for Roster {
    fn from_iter<T: IntoIterator<Item = Combatant>>(iter: T) -> Self {
        Self {
            combatants: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vitals_clamp_damage_and_healing() {
        let mut vitals = Vitals::new(90, 100);
        assert_eq!(vitals.apply_heal(30), 10);
        assert_eq!(vitals.current(), 100);

        assert_eq!(vitals.apply_damage(250), 100);
        assert_eq!(vitals.current(), 0);
        assert!(!vitals.is_alive());
    }

    #[test]
    fn action_budget_never_goes_negative() {
        let mut budget = ActionBudget::new(2);
        budget.spend(1);
        assert_eq!(budget.remaining(), 1);
        budget.spend(5);
        assert_eq!(budget.remaining(), 0);
        assert!(budget.is_exhausted());
        budget.reset();
        assert_eq!(budget.remaining(), 2);
    }

    #[test]
    fn equipment_bonuses_floor_at_zero() {
        let fighter = Combatant::player("p1", "Aria", 50, CoreStats::new(10, 4, 0), 1)
            .with_bonus(StatBonus {
                source: "cursed ring".into(),
                attack: 5,
                defense: -10,
                magic: 0,
            });
        assert_eq!(fighter.effective_stats(), CoreStats::new(15, 0, 0));
    }

    #[test]
    fn bonuses_from_every_source_stack() {
        let fighter = Combatant::player("p1", "Aria", 50, CoreStats::new(10, 4, 0), 1)
            .with_bonus(StatBonus {
                source: "sword".into(),
                attack: 3,
                ..StatBonus::default()
            })
            .with_bonus(StatBonus {
                source: "shield".into(),
                defense: 2,
                ..StatBonus::default()
            });
        assert_eq!(fighter.bonuses().len(), 2);
        assert_eq!(fighter.effective_stats(), CoreStats::new(13, 6, 0));
    }

    #[test]
    fn roster_filters_living_by_faction() {
        let roster: Roster = [
            Combatant::player("p1", "Aria", 10, CoreStats::default(), 1),
            Combatant::enemy("e1", "Goblin", "goblin", 10, CoreStats::default(), 1).with_health(0),
            Combatant::enemy("e2", "Goblin", "goblin", 10, CoreStats::default(), 1),
        ]
        .into_iter()
        .collect();

        assert_eq!(roster.living_indices(Faction::Enemy), vec![2]);
        assert!(roster.has_living(Faction::Player));
        assert_eq!(roster.index_of("e2"), Some(2));
        assert!(roster.get("missing").is_none());
    }
}
