//! Topic-based event bus implementation.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::broadcast;

use encounter_core::{EncounterEvent, EncounterId};

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Encounter started, ended, cleaned up
    Lifecycle,
    /// Turn started or forfeited
    Turn,
    /// Everything else: damage, narration, spawns, roster snapshots
    Combat,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Lifecycle, Topic::Turn, Topic::Combat];

    pub fn of(event: &EncounterEvent) -> Self {
        if event.is_lifecycle() {
            Topic::Lifecycle
        } else if event.is_turn() {
            Topic::Turn
        } else {
            Topic::Combat
        }
    }
}

/// An engine event stamped with the encounter it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub encounter: EncounterId,
    /// Position in the encounter's event stream, starting at 0.
    pub sequence: u64,
    #[serde(flatten)]
    pub payload: EncounterEvent,
}

impl Event {
    pub fn topic(&self) -> Topic {
        Topic::of(&self.payload)
    }

    /// Encodes the event for a transport layer.
    ///
    /// The payload is flattened, so the JSON carries `encounter`, `sequence`
    /// and the engine's `event` tag side by side.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Topic-based event bus
///
/// Allows consumers to subscribe to specific topics and only receive
/// events they care about. Shared by every encounter of a runtime.
///
/// Every topic owns its channel from construction on, so publishing and
/// subscribing never contend on a lock.
#[derive(Clone, Debug)]
pub struct EventBus {
    lifecycle: broadcast::Sender<Event>,
    turn: broadcast::Sender<Event>,
    combat: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lifecycle: broadcast::channel(capacity).0,
            turn: broadcast::channel(capacity).0,
            combat: broadcast::channel(capacity).0,
        }
    }

    fn channel(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Lifecycle => &self.lifecycle,
            Topic::Turn => &self.turn,
            Topic::Combat => &self.combat,
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.channel(topic).send(event).is_err() {
            // No subscribers for this topic
            tracing::trace!(target: "runtime::events", ?topic, "no subscribers");
        }
    }

    /// Subscribe to a specific topic
    ///
    /// Returns a receiver that will only receive events for that topic.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channel(topic).subscribe()
    }

    /// Subscribe to multiple topics
    ///
    /// Returns receivers for each requested topic.
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encounter_core::{CombatantId, EncounterResult, ForfeitReason};

    fn stamped(payload: EncounterEvent) -> Event {
        Event {
            encounter: EncounterId(7),
            sequence: 3,
            payload,
        }
    }

    #[test]
    fn events_route_by_kind() {
        let ended = stamped(EncounterEvent::EncounterEnded {
            result: EncounterResult::Victory,
        });
        let forfeited = stamped(EncounterEvent::TurnForfeited {
            entity: CombatantId::new("aria"),
            reason: ForfeitReason::Timeout,
        });
        let defeated = stamped(EncounterEvent::EnemyDefeated {
            enemy: CombatantId::new("goblin#1"),
        });
        assert_eq!(ended.topic(), Topic::Lifecycle);
        assert_eq!(forfeited.topic(), Topic::Turn);
        assert_eq!(defeated.topic(), Topic::Combat);
    }

    #[test]
    fn json_carries_encounter_and_tag() {
        let json = stamped(EncounterEvent::EncounterCleanedUp).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["encounter"], 7);
        assert_eq!(value["sequence"], 3);
        assert_eq!(value["event"], "encounter_cleaned_up");
    }

    #[tokio::test]
    async fn subscribers_only_see_their_topic() {
        let bus = EventBus::new();
        let mut turns = bus.subscribe(Topic::Turn);
        let mut lifecycle = bus.subscribe(Topic::Lifecycle);

        bus.publish(stamped(EncounterEvent::EncounterCleanedUp));

        assert_eq!(
            lifecycle.recv().await.unwrap().payload,
            EncounterEvent::EncounterCleanedUp
        );
        assert!(turns.try_recv().is_err());
    }

    #[tokio::test]
    async fn publishing_during_subscriptions_loses_nothing() {
        let bus = EventBus::new();
        let mut lifecycle = bus.subscribe(Topic::Lifecycle);

        let subscriber = {
            let bus = bus.clone();
            tokio::spawn(async move {
                for _ in 0..50 {
                    drop(bus.subscribe_multiple(&Topic::ALL));
                    tokio::task::yield_now().await;
                }
            })
        };
        for sequence in 0..50 {
            bus.publish(Event {
                sequence,
                ..stamped(EncounterEvent::EncounterEnded {
                    result: EncounterResult::Victory,
                })
            });
            tokio::task::yield_now().await;
        }
        subscriber.await.unwrap();

        for expected in 0..50 {
            assert_eq!(lifecycle.try_recv().unwrap().sequence, expected);
        }
        assert!(lifecycle.try_recv().is_err());
    }
}
