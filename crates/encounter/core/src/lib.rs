//! Deterministic turn-based combat rules shared by the runtime and tooling.
//!
//! `encounter-core` defines the canonical combat model (combatants, ability
//! catalog, targeting, ability execution, turn scheduling) and exposes pure,
//! synchronous APIs. Every authoritative mutation of an encounter flows through
//! [`orchestrator::Orchestrator`]; the async shell in `encounter-runtime` only
//! serializes calls into it and forwards the [`EncounterEvent`]s it emits.
//!
//! Modules are organized leaves first:
//! - [`combatant`] uniform participant model and the roster arena
//! - [`catalog`] immutable ability and item definitions
//! - [`targeting`] target specifier parsing and faction-aware resolution
//! - [`pipeline`] gated ability execution and effect math
//! - [`encounter`] lifecycle state machine and turn scheduler
//! - [`orchestrator`] inbound request handling and enemy turn driver
pub mod catalog;
pub mod combatant;
pub mod config;
pub mod encounter;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod pipeline;
pub mod services;
pub mod targeting;

pub use catalog::{
    AbilityCatalog, AbilityDefinition, AbilityId, CatalogError, DamageType, ItemDefinition,
    ItemId, ScalingStat, TargetType, TargetTypes, UseContext,
};
pub use combatant::{
    ActionBudget, Combatant, CombatantId, CombatantKind, CombatantSnapshot, CoreStats,
    EnemyCombatant, Faction, PlayerCombatant, ResourceMeter, Roster, StatBonus, Vitals,
};
pub use config::EngineConfig;
pub use encounter::{Encounter, EncounterError, EncounterId, EncounterPhase, EncounterResult};
pub use error::{CombatError, EngineError, ErrorSeverity};
pub use events::{CombatantChange, EncounterEvent, ForfeitReason};
pub use orchestrator::{ActionReceipt, ActionRequest, Orchestrator, OrchestratorBuilder};
pub use pipeline::{
    AbilityError, AbilityOutcome, AbilityPipeline, CombatRules, EffectApplication, EffectKind,
    Mitigation,
};
pub use services::{
    EnemyIntent, EnemyPolicy, InMemoryInventory, InventoryError, InventoryService, NoRewards,
    RandomTargetPolicy, RewardService,
};
pub use targeting::{ResolveError, ResolvedTarget, TargetSpecifier};
