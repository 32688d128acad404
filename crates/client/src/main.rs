//! Encounter demo binary.
//!
//! Loads the embedded content (optionally with a rules file from
//! `ENCOUNTER_RULES_PATH`), spawns the default party against the configured
//! enemies and plays the encounter to completion, printing every event.
//!
//! ```bash
//! ENCOUNTER_ENEMIES=ogre,wolf ENCOUNTER_SEED=7 cargo run -p encounter-cli
//! ```

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;

use encounter_content::{ContentBundle, RulesLoader};
use encounter_core::{EncounterEvent, InMemoryInventory};
use encounter_runtime::{EncounterRuntime, EncounterSetup, Event, ExperienceLedger, Topic};
use encounter_cli::{CliConfig, PartyTactics};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = CliConfig::from_env();

    // 1. Content
    let mut bundle = ContentBundle::embedded()?;
    if let Some(path) = &config.rules_path {
        tracing::info!("Loading rules from {}", path.display());
        bundle.config = RulesLoader::load(path)?;
    }

    // 2. Runtime
    let mut runtime = EncounterRuntime::builder()
        .catalog(bundle.catalog.clone())
        .config(config.runtime_config(bundle.config.clone()))
        .build()?;

    let json = config.json_events;
    let printers: Vec<_> = runtime
        .event_bus()
        .subscribe_multiple(&Topic::ALL)
        .into_values()
        .map(|mut rx| {
            tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(event) => print_event(&event, json),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!("event printer lagged, skipped {skipped} events");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            })
        })
        .collect();

    // 3. Encounter
    let party = bundle
        .party
        .iter()
        .map(|member| member.instantiate())
        .collect();
    let enemies = bundle
        .bestiary
        .spawn_many(config.enemies.iter().map(String::as_str))?;
    let mut inventory = InMemoryInventory::new();
    for member in &bundle.party {
        inventory.grant(member.id.as_str(), "healing_potion", 1);
    }
    let ledger = ExperienceLedger::new();

    let handle = runtime
        .spawn_encounter(
            EncounterSetup::new(party, enemies)
                .inventory(inventory)
                .rewards(ledger.clone()),
        )
        .await?;
    tracing::info!("Encounter {} started", handle.id());

    let tactics = PartyTactics::new(bundle.catalog.clone(), &bundle.party);
    let status = handle.drive(&tactics).await?;

    match status.result {
        Some(result) => tracing::info!("Encounter finished in round {}: {result}", status.round),
        None => tracing::warn!("Encounter stopped in phase {}", status.phase),
    }
    for member in &bundle.party {
        tracing::info!(
            "{} earned {} experience",
            member.name,
            ledger.experience_of(&member.id)
        );
    }

    if status.result.is_some() {
        handle.clean_up().await?;
    }
    drop(handle);
    runtime.shutdown().await?;

    // Every bus sender is gone now; printers exit once drained.
    for printer in printers {
        printer.await?;
    }
    Ok(())
}

fn print_event(event: &Event, json: bool) {
    if json {
        match event.to_json() {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::warn!("failed to encode event: {err}"),
        }
        return;
    }

    match &event.payload {
        EncounterEvent::EncounterStarted { turn_order, .. } => {
            let order: Vec<_> = turn_order.iter().map(|id| id.as_str()).collect();
            println!("== encounter started, turn order: {}", order.join(" -> "));
        }
        EncounterEvent::TurnStarted {
            entity,
            entity_type,
            round,
        } => println!("-- round {round}: {entity} ({entity_type}) is up"),
        EncounterEvent::TurnForfeited { entity, reason } => {
            println!("   {entity} forfeits the turn ({reason})")
        }
        EncounterEvent::ActionNarrated { text, .. } => println!("   {text}"),
        EncounterEvent::EnemySpawned { enemy } => println!("   {} joins the fight", enemy.name),
        EncounterEvent::EnemyDefeated { enemy } => println!("   {enemy} is defeated"),
        EncounterEvent::EncounterEnded { result } => println!("== encounter ended: {result}"),
        EncounterEvent::EncounterCleanedUp => println!("== encounter cleaned up"),
        EncounterEvent::CombatantChanged { .. } | EncounterEvent::CombatantsUpdated { .. } => {}
    }
}
