//! High-level runtime that owns encounter workers.
//!
//! The runtime wires up command and event channels for every encounter it
//! spawns and exposes a builder-based API for clients.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use encounter_core::{
    AbilityCatalog, Combatant, EncounterId, EnemyPolicy, EngineConfig, InventoryService,
    Orchestrator, RewardService,
};

use crate::api::{EncounterDirectory, EncounterHandle, Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::workers::EncounterWorker;

/// Runtime configuration shared across the runtime and its workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub engine: EngineConfig,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
    /// How long a disconnected player's turn may stay pending before it is
    /// forfeited. `None` waits forever.
    pub turn_timeout: Option<Duration>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            event_buffer_size: 100,
            command_buffer_size: 32,
            turn_timeout: None,
        }
    }
}

/// Everything needed to open one encounter.
///
/// Collaborators left unset fall back to the engine defaults.
pub struct EncounterSetup {
    players: Vec<Combatant>,
    enemies: Vec<Combatant>,
    inventory: Option<Box<dyn InventoryService>>,
    rewards: Option<Box<dyn RewardService>>,
    policy: Option<Box<dyn EnemyPolicy>>,
}

impl EncounterSetup {
    pub fn new(players: Vec<Combatant>, enemies: Vec<Combatant>) -> Self {
        Self {
            players,
            enemies,
            inventory: None,
            rewards: None,
            policy: None,
        }
    }

    pub fn inventory(mut self, inventory: impl InventoryService + 'static) -> Self {
        self.inventory = Some(Box::new(inventory));
        self
    }

    pub fn rewards(mut self, rewards: impl RewardService + 'static) -> Self {
        self.rewards = Some(Box::new(rewards));
        self
    }

    pub fn policy(mut self, policy: impl EnemyPolicy + 'static) -> Self {
        self.policy = Some(Box::new(policy));
        self
    }
}

/// Hosts any number of concurrent encounters.
///
/// Design: every encounter gets its own worker task that exclusively owns
/// the encounter; [`EncounterHandle`] provides a cloneable façade for it.
pub struct EncounterRuntime {
    config: RuntimeConfig,
    catalog: Arc<AbilityCatalog>,
    event_bus: EventBus,
    directory: EncounterDirectory,
    next_id: u64,
    workers: Vec<JoinHandle<()>>,
}

impl EncounterRuntime {
    /// Create a new runtime builder
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<AbilityCatalog> {
        &self.catalog
    }

    pub fn directory(&self) -> &EncounterDirectory {
        &self.directory
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to events of every encounter on `topic`.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    /// Spawns a worker for a new encounter and starts it.
    ///
    /// Leading enemy turns have already been played when this returns. If
    /// the rosters are rejected the worker is aborted and the start error is
    /// returned.
    pub async fn spawn_encounter(&mut self, setup: EncounterSetup) -> Result<EncounterHandle> {
        self.next_id += 1;
        let id = EncounterId(self.next_id);

        let EncounterSetup {
            players,
            enemies,
            inventory,
            rewards,
            policy,
        } = setup;

        let mut builder =
            Orchestrator::builder(id, Arc::clone(&self.catalog)).config(self.config.engine.clone());
        if let Some(inventory) = inventory {
            builder = builder.inventory(inventory);
        }
        if let Some(rewards) = rewards {
            builder = builder.rewards(rewards);
        }
        if let Some(policy) = policy {
            builder = builder.policy(policy);
        }

        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer_size);
        let handle = EncounterHandle::new(id, command_tx, self.event_bus.clone());
        self.directory.insert(&handle).await;

        let worker = EncounterWorker::new(
            builder.build(),
            command_rx,
            self.event_bus.clone(),
            self.directory.clone(),
            self.config.turn_timeout,
        );
        self.workers.push(tokio::spawn(worker.run()));

        if let Err(err) = handle.start(players, enemies).await {
            handle.abort().await?;
            return Err(err);
        }
        info!(target: "runtime::worker", encounter = %id, "encounter spawned");
        Ok(handle)
    }

    /// Looks up a live encounter.
    pub async fn encounter(&self, id: EncounterId) -> Result<EncounterHandle> {
        self.directory.require(id).await
    }

    /// Aborts every live encounter and waits for the workers to exit.
    pub async fn shutdown(self) -> Result<()> {
        for id in self.directory.ids().await {
            let Some(handle) = self.directory.get(id).await else {
                continue;
            };
            // The worker may be exiting on its own already.
            if let Err(err) = handle.abort().await {
                debug!(
                    target: "runtime::worker",
                    encounter = %id,
                    "abort on shutdown failed: {err}"
                );
            }
        }

        for worker in self.workers {
            worker.await.map_err(RuntimeError::WorkerJoin)?;
        }

        Ok(())
    }
}

/// Builder for [`EncounterRuntime`] with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    catalog: Option<Arc<AbilityCatalog>>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            catalog: None,
        }
    }

    /// Override runtime configuration
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Override only the engine configuration
    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.config.engine = engine;
        self
    }

    /// Set the required ability catalog
    pub fn catalog(mut self, catalog: Arc<AbilityCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Forfeit disconnected players' turns after `timeout`
    pub fn turn_timeout(mut self, timeout: Duration) -> Self {
        self.config.turn_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<EncounterRuntime> {
        let catalog = self.catalog.ok_or(RuntimeError::MissingCatalog)?;
        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);

        Ok(EncounterRuntime {
            config: self.config,
            catalog,
            event_bus,
            directory: EncounterDirectory::new(),
            next_id: 0,
            workers: Vec::new(),
        })
    }
}
