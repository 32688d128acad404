use std::time::Duration;

use async_trait::async_trait;
use encounter_content::ContentBundle;
use encounter_core::{
    ActionRequest, Combatant, CombatError, CombatantId, EncounterError, EncounterEvent,
    EncounterId, EncounterPhase, EncounterResult, Faction, ForfeitReason,
};
use encounter_runtime::{
    ActionProvider, EncounterRuntime, EncounterSetup, EncounterStatus, ExperienceLedger, Result,
    RuntimeError, Topic,
};

/// Hits the first living enemy with the actor's bread-and-butter ability.
struct FirstEnemyProvider;

#[async_trait]
impl ActionProvider for FirstEnemyProvider {
    async fn provide_action(
        &self,
        actor: &CombatantId,
        status: &EncounterStatus,
    ) -> Result<ActionRequest> {
        let target = status
            .living(Faction::Enemy)
            .next()
            .ok_or_else(|| RuntimeError::Provider("no enemy left".into()))?;
        let ability = if actor.as_str() == "bram" {
            "arcane_bolt"
        } else {
            "slash"
        };
        Ok(ActionRequest::use_ability(ability, target.as_str()))
    }
}

fn bundle() -> ContentBundle {
    ContentBundle::embedded().expect("embedded content should load")
}

fn party(bundle: &ContentBundle) -> Vec<Combatant> {
    bundle.party.iter().map(|member| member.instantiate()).collect()
}

fn runtime(bundle: &ContentBundle) -> EncounterRuntime {
    EncounterRuntime::builder()
        .catalog(bundle.catalog.clone())
        .engine(bundle.config.clone())
        .build()
        .expect("runtime should build")
}

#[tokio::test]
async fn scripted_party_defeats_a_goblin() {
    let mut bundle = bundle();
    let mut runtime = runtime(&bundle);
    let mut lifecycle = runtime.subscribe(Topic::Lifecycle);
    let ledger = ExperienceLedger::new();

    let enemies = vec![bundle.bestiary.spawn("goblin").unwrap()];
    let handle = runtime
        .spawn_encounter(EncounterSetup::new(party(&bundle), enemies).rewards(ledger.clone()))
        .await
        .unwrap();

    let status = handle.drive(&FirstEnemyProvider).await.unwrap();
    assert_eq!(status.phase, EncounterPhase::Victory);
    assert_eq!(status.result, Some(EncounterResult::Victory));
    assert_eq!(status.defeated, vec![CombatantId::new("goblin#1")]);

    let started = lifecycle.recv().await.unwrap();
    assert!(matches!(
        started.payload,
        EncounterEvent::EncounterStarted { .. }
    ));
    assert_eq!(started.sequence, 0);
    assert!(started.to_json().unwrap().contains("\"event\":\"encounter_started\""));
    assert_eq!(
        lifecycle.recv().await.unwrap().payload,
        EncounterEvent::EncounterEnded {
            result: EncounterResult::Victory
        }
    );

    assert_eq!(ledger.experience_of("aria"), 10);
    assert_eq!(ledger.victories().len(), 1);

    handle.clean_up().await.unwrap();
    assert_eq!(
        lifecycle.recv().await.unwrap().payload,
        EncounterEvent::EncounterCleanedUp
    );

    let directory = runtime.directory().clone();
    runtime.shutdown().await.unwrap();
    assert!(directory.is_empty().await);
}

#[tokio::test]
async fn requests_out_of_turn_are_rejected() {
    let mut bundle = bundle();
    let mut runtime = runtime(&bundle);
    let enemies = vec![bundle.bestiary.spawn("ogre").unwrap()];
    let handle = runtime
        .spawn_encounter(EncounterSetup::new(party(&bundle), enemies))
        .await
        .unwrap();

    let status = handle.status().await.unwrap();
    assert_eq!(status.awaiting_player(), Some(&CombatantId::new("aria")));

    let err = handle
        .submit_action("bram".into(), ActionRequest::use_ability("arcane_bolt", "ogre#1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_combat(),
        Some(CombatError::NotYourTurn { .. })
    ));

    // Nothing changed.
    assert_eq!(handle.status().await.unwrap(), status);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn concurrent_requests_are_serialized() {
    let mut bundle = bundle();
    let mut runtime = runtime(&bundle);
    let enemies = vec![bundle.bestiary.spawn("ogre").unwrap()];
    let handle = runtime
        .spawn_encounter(EncounterSetup::new(party(&bundle), enemies))
        .await
        .unwrap();

    // Aria has two actions; exactly two slashes fit in her turn.
    let attempts = (0..3).map(|_| {
        let handle = handle.clone();
        tokio::spawn(async move {
            handle
                .submit_action("aria".into(), ActionRequest::use_ability("slash", "ogre#1"))
                .await
        })
    });
    let mut accepted = 0;
    for attempt in attempts.collect::<Vec<_>>() {
        match attempt.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(err) => assert!(matches!(
                err.as_combat(),
                Some(CombatError::NotYourTurn { .. })
            )),
        }
    }
    assert_eq!(accepted, 2);

    let status = handle.status().await.unwrap();
    assert_eq!(status.current_turn, Some(CombatantId::new("bram")));
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn disconnected_player_turn_times_out() {
    let mut bundle = bundle();
    let mut runtime = EncounterRuntime::builder()
        .catalog(bundle.catalog.clone())
        .turn_timeout(Duration::from_millis(20))
        .build()
        .unwrap();
    let mut turns = runtime.subscribe(Topic::Turn);
    let enemies = vec![bundle.bestiary.spawn("ogre").unwrap()];
    let handle = runtime
        .spawn_encounter(EncounterSetup::new(party(&bundle), enemies))
        .await
        .unwrap();

    assert!(handle.set_connected("aria".into(), false).await.unwrap());

    let forfeited = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = turns.recv().await.unwrap();
            if let EncounterEvent::TurnForfeited { entity, reason } = event.payload {
                return (entity, reason);
            }
        }
    })
    .await
    .expect("turn should time out");
    assert_eq!(forfeited, (CombatantId::new("aria"), ForfeitReason::Timeout));

    // Aria keeps her roster entry and her slot.
    let status = handle.status().await.unwrap();
    assert_eq!(status.current_turn, Some(CombatantId::new("bram")));
    assert_eq!(status.combatant("aria").unwrap().connected, Some(false));
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn rejected_rosters_do_not_leave_a_worker_behind() {
    let bundle = bundle();
    let mut runtime = runtime(&bundle);

    let err = runtime
        .spawn_encounter(EncounterSetup::new(party(&bundle), Vec::new()))
        .await
        .unwrap_err();
    assert!(matches!(
        err.as_combat(),
        Some(CombatError::Encounter(EncounterError::EmptySide(Faction::Enemy)))
    ));

    let directory = runtime.directory().clone();
    runtime.shutdown().await.unwrap();
    assert!(directory.is_empty().await);
}

#[tokio::test]
async fn aborted_encounters_leave_the_directory() {
    let mut bundle = bundle();
    let mut runtime = runtime(&bundle);
    let enemies = bundle.bestiary.spawn_many(["goblin", "wolf"]).unwrap();
    let handle = runtime
        .spawn_encounter(EncounterSetup::new(party(&bundle), enemies))
        .await
        .unwrap();
    let id = handle.id();

    assert_eq!(runtime.encounter(id).await.unwrap().id(), id);
    assert!(matches!(
        runtime.encounter(EncounterId(99)).await,
        Err(RuntimeError::EncounterNotFound(EncounterId(99)))
    ));

    assert!(handle.abort().await.unwrap());
    assert!(handle.status().await.is_err());

    let directory = runtime.directory().clone();
    runtime.shutdown().await.unwrap();
    assert!(directory.is_empty().await);
}

#[tokio::test]
async fn dropping_every_handle_stops_the_worker() {
    let mut bundle = bundle();
    let mut runtime = runtime(&bundle);
    let enemies = vec![bundle.bestiary.spawn("goblin").unwrap()];
    let handle = runtime
        .spawn_encounter(EncounterSetup::new(party(&bundle), enemies))
        .await
        .unwrap();
    let id = handle.id();
    let directory = runtime.directory().clone();
    assert_eq!(directory.ids().await, vec![id]);

    drop(handle);
    tokio::time::timeout(Duration::from_secs(2), async {
        while !directory.is_empty().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("worker should leave the directory");

    assert!(runtime.encounter(id).await.is_err());
    runtime.shutdown().await.unwrap();
}
