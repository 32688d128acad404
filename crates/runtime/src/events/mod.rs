//! Topic-based event bus for encounter events.
//!
//! Workers publish every [`EncounterEvent`](encounter_core::EncounterEvent)
//! after the mutation that produced it has completed; consumers subscribe
//! only to the topics they need.

mod bus;

pub use bus::{Event, EventBus, Topic};
