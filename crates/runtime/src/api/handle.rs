//! Cloneable façade for issuing commands to one encounter.
//!
//! [`EncounterHandle`] hides channel plumbing and offers async helpers for
//! submitting requests, managing the encounter lifecycle, or streaming events
//! from specific topics.
use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::warn;

use encounter_core::{
    ActionReceipt, ActionRequest, Combatant, CombatantId, EncounterId, EngineError,
};

use super::errors::{Result, RuntimeError};
use super::providers::ActionProvider;
use super::status::EncounterStatus;
use crate::events::{Event, EventBus, Topic};
use crate::workers::Command;

/// Client-facing handle to interact with an encounter worker
///
/// The worker stops once every handle has been dropped.
#[derive(Clone, Debug)]
pub struct EncounterHandle {
    id: EncounterId,
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl EncounterHandle {
    pub(crate) fn new(
        id: EncounterId,
        command_tx: mpsc::Sender<Command>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            id,
            command_tx,
            event_bus,
        }
    }

    pub fn id(&self) -> EncounterId {
        self.id
    }

    /// A reference that does not keep the worker alive.
    pub(crate) fn downgrade(&self) -> WeakEncounterHandle {
        WeakEncounterHandle {
            id: self.id,
            command_tx: self.command_tx.downgrade(),
            event_bus: self.event_bus.clone(),
        }
    }

    /// Whether the worker has shut down, e.g. after Cleanup.
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    pub(crate) async fn start(
        &self,
        players: Vec<Combatant>,
        enemies: Vec<Combatant>,
    ) -> Result<()> {
        self.request(|reply| Command::Start {
            players,
            enemies,
            reply,
        })
        .await?
    }

    /// Submit a request on behalf of `actor`.
    ///
    /// Requests are processed one at a time in arrival order. A request for a
    /// combatant whose turn it is not fails with `NotYourTurn`.
    pub async fn submit_action(
        &self,
        actor: CombatantId,
        request: ActionRequest,
    ) -> Result<ActionReceipt> {
        self.request(|reply| Command::SubmitAction {
            actor,
            request,
            reply,
        })
        .await?
    }

    /// End `actor`'s turn early.
    pub async fn forfeit_turn(&self, actor: CombatantId) -> Result<ActionReceipt> {
        self.submit_action(actor, ActionRequest::EndTurn).await
    }

    /// End whichever turn is current on behalf of the system.
    ///
    /// Returns the combatant whose turn was forfeited.
    pub async fn forfeit_current_turn(&self) -> Result<CombatantId> {
        self.request(|reply| Command::ForfeitCurrentTurn { reply }).await?
    }

    /// Add a reinforcement to the enemy side of an active encounter.
    pub async fn spawn_enemy(&self, enemy: Combatant) -> Result<()> {
        self.request(|reply| Command::SpawnEnemy { enemy, reply }).await?
    }

    /// Update a player's connection flag. Returns whether it changed.
    pub async fn set_connected(&self, player: CombatantId, connected: bool) -> Result<bool> {
        self.request(|reply| Command::SetConnected {
            player,
            connected,
            reply,
        })
        .await?
    }

    /// Query the current encounter state (read-only snapshot)
    pub async fn status(&self) -> Result<EncounterStatus> {
        self.request(|reply| Command::QueryStatus { reply }).await
    }

    /// Force the encounter into Cleanup from any phase.
    ///
    /// Returns false if it was already cleaned up.
    pub async fn abort(&self) -> Result<bool> {
        self.request(|reply| Command::Abort { reply }).await
    }

    /// Clean up a resolved encounter. The worker exits afterwards.
    pub async fn clean_up(&self) -> Result<()> {
        self.request(|reply| Command::CleanUp { reply }).await?
    }

    /// Feed player turns from `provider` until the encounter resolves.
    ///
    /// Enemy turns are driven by the engine itself. A rejected request ends
    /// the player's turn so a misbehaving provider cannot stall the encounter.
    pub async fn drive(&self, provider: &dyn ActionProvider) -> Result<EncounterStatus> {
        loop {
            let status = self.status().await?;
            if !status.is_active() {
                return Ok(status);
            }
            let Some(actor) = status.awaiting_player().cloned() else {
                // Only reachable if the engine's own turn driver gave up;
                // skip the stuck turn.
                self.forfeit_current_turn().await?;
                continue;
            };

            let request = provider.provide_action(&actor, &status).await?;
            match self.submit_action(actor.clone(), request).await {
                Ok(_) => {}
                Err(RuntimeError::Combat(err)) => {
                    warn!(
                        target: "runtime::worker",
                        encounter = %self.id,
                        %actor,
                        code = err.error_code(),
                        "provider request rejected, ending turn: {err}"
                    );
                    self.forfeit_turn(actor).await?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Lifecycle` - Encounter started, ended and cleaned up
    /// - `Topic::Turn` - Turn started and forfeited
    /// - `Topic::Combat` - Damage, healing, narration, spawns and snapshots
    ///
    /// The bus is shared by every encounter of a runtime; filter on
    /// [`Event::encounter`] when several encounters run at once.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Subscribe to multiple topics at once
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    /// Get a reference to the event bus for advanced usage
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}

/// Non-owning counterpart of [`EncounterHandle`].
#[derive(Clone, Debug)]
pub(crate) struct WeakEncounterHandle {
    id: EncounterId,
    command_tx: mpsc::WeakSender<Command>,
    event_bus: EventBus,
}

impl WeakEncounterHandle {
    pub(crate) fn id(&self) -> EncounterId {
        self.id
    }

    /// Returns `None` once the worker has no owning handle left.
    pub(crate) fn upgrade(&self) -> Option<EncounterHandle> {
        self.command_tx
            .upgrade()
            .map(|command_tx| EncounterHandle::new(self.id, command_tx, self.event_bus.clone()))
    }
}
