use encounter_cli::PartyTactics;
use encounter_content::ContentBundle;
use encounter_core::{
    ActionRequest, CombatantId, CombatantSnapshot, EncounterId, EncounterPhase, EncounterResult,
    Faction,
};
use encounter_runtime::{EncounterRuntime, EncounterSetup, EncounterStatus};

fn snapshot(id: &str, faction: Faction, health: u32, max_health: u32) -> CombatantSnapshot {
    CombatantSnapshot {
        id: CombatantId::new(id),
        name: id.to_string(),
        faction,
        health,
        max_health,
        resource: 24,
        max_resource: 24,
        actions_remaining: 1,
        total_actions: 1,
        alive: health > 0,
        connected: (faction == Faction::Player).then_some(true),
    }
}

fn status(combatants: Vec<CombatantSnapshot>) -> EncounterStatus {
    EncounterStatus {
        id: EncounterId(1),
        phase: EncounterPhase::Active,
        round: 1,
        current_turn: Some(CombatantId::new("bram")),
        current_faction: Some(Faction::Player),
        result: None,
        combatants,
        defeated: Vec::new(),
    }
}

#[test]
fn tactics_heal_the_most_wounded_ally_first() {
    let bundle = ContentBundle::embedded().unwrap();
    let tactics = PartyTactics::new(bundle.catalog.clone(), &bundle.party);
    let status = status(vec![
        snapshot("aria", Faction::Player, 12, 60),
        snapshot("bram", Faction::Player, 30, 38),
        snapshot("goblin#1", Faction::Enemy, 18, 18),
    ]);

    assert_eq!(
        tactics.choose(&"bram".into(), &status),
        ActionRequest::use_ability("heal", "aria")
    );
}

#[test]
fn tactics_handle_very_large_health_pools() {
    let bundle = ContentBundle::embedded().unwrap();
    let tactics = PartyTactics::new(bundle.catalog.clone(), &bundle.party);
    let status = status(vec![
        snapshot("aria", Faction::Player, 1_000_000_000, 4_000_000_000),
        snapshot("bram", Faction::Player, 30, 38),
        snapshot("goblin#1", Faction::Enemy, 18, 18),
    ]);

    assert_eq!(
        tactics.choose(&"bram".into(), &status),
        ActionRequest::use_ability("heal", "aria")
    );
}

#[test]
fn tactics_focus_the_weakest_enemy() {
    let bundle = ContentBundle::embedded().unwrap();
    let tactics = PartyTactics::new(bundle.catalog.clone(), &bundle.party);
    let status = status(vec![
        snapshot("aria", Faction::Player, 60, 60),
        snapshot("bram", Faction::Player, 38, 38),
        snapshot("goblin#1", Faction::Enemy, 18, 18),
        snapshot("goblin#2", Faction::Enemy, 0, 18),
    ]);

    assert_eq!(
        tactics.choose(&"bram".into(), &status),
        ActionRequest::use_ability("arcane_bolt", "goblin#1")
    );
}

#[tokio::test]
async fn default_party_clears_the_default_encounter() {
    let mut bundle = ContentBundle::embedded().unwrap();
    let mut runtime = EncounterRuntime::builder()
        .catalog(bundle.catalog.clone())
        .engine(bundle.config.clone())
        .build()
        .unwrap();

    let party = bundle.party.iter().map(|member| member.instantiate()).collect();
    let enemies = bundle
        .bestiary
        .spawn_many(["goblin", "goblin", "shaman"])
        .unwrap();
    let handle = runtime
        .spawn_encounter(EncounterSetup::new(party, enemies))
        .await
        .unwrap();

    let tactics = PartyTactics::new(bundle.catalog.clone(), &bundle.party);
    let status = handle.drive(&tactics).await.unwrap();
    assert_eq!(status.result, Some(EncounterResult::Victory));
    assert_eq!(status.defeated.len(), 3);

    handle.clean_up().await.unwrap();
    runtime.shutdown().await.unwrap();
}
