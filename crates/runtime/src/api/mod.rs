//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate so
//! other layers can stay focused on orchestration and workers.

pub mod directory;
pub mod errors;
pub mod handle;
pub mod providers;
pub mod status;

pub use directory::EncounterDirectory;
pub use errors::{Result, RuntimeError};
pub use handle::EncounterHandle;
pub use providers::{ActionProvider, EndTurnProvider};
pub use status::EncounterStatus;
