//! Encounter worker that owns the authoritative [`Orchestrator`].
//!
//! Receives commands from [`EncounterHandle`](crate::EncounterHandle), applies
//! them to the orchestrator one at a time and publishes the resulting events
//! to the [`EventBus`] before replying.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use encounter_core::{
    ActionReceipt, ActionRequest, Combatant, CombatantId, EncounterPhase, EngineError,
    ForfeitReason, Orchestrator,
};

use crate::api::{EncounterDirectory, EncounterStatus, Result};
use crate::events::{Event, EventBus};

/// Commands that can be sent to an encounter worker
pub enum Command {
    /// Start the encounter with the initial rosters.
    Start {
        players: Vec<Combatant>,
        enemies: Vec<Combatant>,
        reply: oneshot::Sender<Result<()>>,
    },
    SubmitAction {
        actor: CombatantId,
        request: ActionRequest,
        reply: oneshot::Sender<Result<ActionReceipt>>,
    },
    /// System forfeit of the current turn.
    ForfeitCurrentTurn {
        reply: oneshot::Sender<Result<CombatantId>>,
    },
    SpawnEnemy {
        enemy: Combatant,
        reply: oneshot::Sender<Result<()>>,
    },
    SetConnected {
        player: CombatantId,
        connected: bool,
        reply: oneshot::Sender<Result<bool>>,
    },
    /// Query the current encounter state (read-only).
    QueryStatus {
        reply: oneshot::Sender<EncounterStatus>,
    },
    Abort {
        reply: oneshot::Sender<bool>,
    },
    CleanUp {
        reply: oneshot::Sender<Result<()>>,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Start { .. } => "Start",
            Command::SubmitAction { .. } => "SubmitAction",
            Command::ForfeitCurrentTurn { .. } => "ForfeitCurrentTurn",
            Command::SpawnEnemy { .. } => "SpawnEnemy",
            Command::SetConnected { .. } => "SetConnected",
            Command::QueryStatus { .. } => "QueryStatus",
            Command::Abort { .. } => "Abort",
            Command::CleanUp { .. } => "CleanUp",
        }
    }
}

/// Deadline for a disconnected player's turn.
struct TurnTimer {
    entity: CombatantId,
    round: u32,
    deadline: Instant,
}

/// Background task that serializes every mutation of one encounter.
///
/// Runs until the encounter reaches Cleanup or every handle is dropped, then
/// removes itself from the [`EncounterDirectory`].
pub struct EncounterWorker {
    orchestrator: Orchestrator,
    command_rx: mpsc::Receiver<Command>,
    event_bus: EventBus,
    directory: EncounterDirectory,
    turn_timeout: Option<Duration>,
    timer: Option<TurnTimer>,
    sequence: u64,
}

impl EncounterWorker {
    pub fn new(
        orchestrator: Orchestrator,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
        directory: EncounterDirectory,
        turn_timeout: Option<Duration>,
    ) -> Self {
        debug!(
            target: "runtime::worker",
            encounter = %orchestrator.id(),
            ?turn_timeout,
            "encounter worker initialized"
        );

        Self {
            orchestrator,
            command_rx,
            event_bus,
            directory,
            turn_timeout,
            timer: None,
            sequence: 0,
        }
    }

    /// Main worker loop.
    pub async fn run(mut self) {
        let id = self.orchestrator.id();
        loop {
            let deadline = self.timer.as_ref().map(|timer| timer.deadline);
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                _ = wait_for(deadline) => self.on_turn_timeout(),
            }

            if self.orchestrator.phase() == EncounterPhase::Cleanup {
                break;
            }
            self.rearm_timer();
        }

        // Flush anything left, e.g. when the last handle was dropped.
        self.publish_events();
        self.directory.remove(id).await;
        info!(target: "runtime::worker", encounter = %id, "encounter worker stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        let name = cmd.name();
        match cmd {
            Command::Start {
                players,
                enemies,
                reply,
            } => {
                let result = self.orchestrator.start(players, enemies).map_err(Into::into);
                self.respond(name, reply, result);
            }
            Command::SubmitAction {
                actor,
                request,
                reply,
            } => {
                let result = self
                    .orchestrator
                    .submit_action(&actor, request)
                    .map_err(Into::into);
                self.respond(name, reply, result);
            }
            Command::ForfeitCurrentTurn { reply } => {
                let result = self
                    .orchestrator
                    .forfeit_current_turn(ForfeitReason::System)
                    .map_err(Into::into);
                self.respond(name, reply, result);
            }
            Command::SpawnEnemy { enemy, reply } => {
                let result = self.orchestrator.spawn_enemy(enemy).map_err(Into::into);
                self.respond(name, reply, result);
            }
            Command::SetConnected {
                player,
                connected,
                reply,
            } => {
                let result = self
                    .orchestrator
                    .set_connected(&player, connected)
                    .map_err(Into::into);
                self.respond(name, reply, result);
            }
            Command::QueryStatus { reply } => {
                let status = EncounterStatus::capture(&self.orchestrator);
                self.respond(name, reply, status);
            }
            Command::Abort { reply } => {
                let aborted = self.orchestrator.abort();
                if aborted {
                    warn!(
                        target: "runtime::worker",
                        encounter = %self.orchestrator.id(),
                        "encounter aborted"
                    );
                }
                self.respond(name, reply, aborted);
            }
            Command::CleanUp { reply } => {
                let result = self.orchestrator.clean_up().map_err(Into::into);
                self.respond(name, reply, result);
            }
        }
    }

    /// Publishes pending events, then replies. Subscribers therefore see the
    /// events of a request before its caller sees the result.
    fn respond<T>(&mut self, command: &'static str, reply: oneshot::Sender<T>, value: T) {
        self.publish_events();
        if reply.send(value).is_err() {
            debug!(target: "runtime::worker", command, "reply channel closed (caller dropped)");
        }
    }

    fn publish_events(&mut self) {
        let encounter = self.orchestrator.id();
        for payload in self.orchestrator.take_events() {
            debug!(
                target: "runtime::events",
                %encounter,
                sequence = self.sequence,
                event = payload.name(),
                "publishing event"
            );
            self.event_bus.publish(Event {
                encounter,
                sequence: self.sequence,
                payload,
            });
            self.sequence += 1;
        }
    }

    /// Arms the turn timer while the current turn belongs to a disconnected
    /// player, and disarms it otherwise. A running timer is kept as long as
    /// the same turn is pending.
    fn rearm_timer(&mut self) {
        let Some(timeout) = self.turn_timeout else {
            return;
        };
        let round = self.orchestrator.encounter().round();
        let waiting_on = self
            .orchestrator
            .current_turn()
            .filter(|combatant| combatant.is_connected() == Some(false))
            .map(|combatant| combatant.id().clone());

        let Some(entity) = waiting_on else {
            self.timer = None;
            return;
        };
        if self
            .timer
            .as_ref()
            .is_some_and(|timer| timer.entity == entity && timer.round == round)
        {
            return;
        }

        debug!(
            target: "runtime::worker",
            encounter = %self.orchestrator.id(),
            %entity,
            ?timeout,
            "turn timer armed"
        );
        self.timer = Some(TurnTimer {
            entity,
            round,
            deadline: Instant::now() + timeout,
        });
    }

    fn on_turn_timeout(&mut self) {
        let Some(timer) = self.timer.take() else {
            return;
        };
        let encounter = self.orchestrator.id();
        warn!(
            target: "runtime::worker",
            %encounter,
            entity = %timer.entity,
            round = timer.round,
            "turn timed out"
        );
        if let Err(err) = self.orchestrator.forfeit_current_turn(ForfeitReason::Timeout) {
            warn!(
                target: "runtime::worker",
                %encounter,
                code = err.error_code(),
                "timeout forfeit rejected: {err}"
            );
        }
        self.publish_events();
    }
}

/// Resolves at `deadline`, or never when there is none.
async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
