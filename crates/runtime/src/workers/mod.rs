//! Worker tasks that back the runtime.
//!
//! One encounter worker runs per active encounter and is the only code that
//! touches that encounter's orchestrator.

mod encounter;

pub use encounter::{Command, EncounterWorker};
