//! Demo client for the encounter runtime.
//!
//! The `encounter` binary is the composition root: it loads content, builds an
//! [`EncounterRuntime`](encounter_runtime::EncounterRuntime), spawns one
//! encounter and feeds the party's turns from [`PartyTactics`] while printing
//! every published event.

pub mod config;
pub mod tactics;

pub use config::CliConfig;
pub use tactics::PartyTactics;
