//! Async shell around the synchronous combat engine.
//!
//! Each active encounter is owned by one worker task, so every mutation of an
//! encounter is serialized through that worker's command queue. Consumers
//! create encounters through [`EncounterRuntime`], talk to them with the
//! cloneable [`EncounterHandle`], and observe them through the topic-based
//! [`EventBus`].
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the runtime and its builder
//! - [`api`] exposes the types downstream clients interact with, including
//!   the encounter directory
//! - [`events`] provides the topic-based event bus
//! - [`rewards`] holds in-memory collaborators for the engine
//! - `workers` keeps the encounter actor internal to the crate
pub mod api;
pub mod events;
pub mod rewards;
pub mod runtime;

mod workers;

pub use api::{
    ActionProvider, EncounterDirectory, EncounterHandle, EncounterStatus, EndTurnProvider,
    Result, RuntimeError,
};
pub use events::{Event, EventBus, Topic};
pub use rewards::{ExperienceLedger, VictoryRecord};
pub use runtime::{EncounterRuntime, EncounterSetup, RuntimeBuilder, RuntimeConfig};
