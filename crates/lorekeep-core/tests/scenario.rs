//! End-to-end command scenarios against the in-memory stores.
//!
//! Every scenario drives [`Game`] the way a request layer would and then
//! checks the event log and the projections it produced.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::too_many_lines
)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use lorekeep_campaign::{CreateCampaignInput, CreateCharacterInput, CreateParticipantInput};
use lorekeep_core::{
    CampaignPatch, CommandContext, DamageRequest, Game, GameError, ManualClock,
};
use lorekeep_daggerheart::events::{AttackResolved, GmFearChanged, event_types};
use lorekeep_daggerheart::state::CONDITION_VULNERABLE;
use lorekeep_daggerheart::{Adjust, DaggerheartAdapter, DeathMove, LifeState, PatchRequest};
use lorekeep_ledger::{EventStore, MemoryEventStore};
use lorekeep_projection::{Applier, MemoryProjectionStore, ProjectionStore};
use lorekeep_types::{
    CampaignId, CampaignStatus, CharacterId, CharacterKind, ErrorKind, GateStatus, GmMode,
    NewEvent, ParticipantRole, SessionStatus,
};

fn game() -> Game {
    let events: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());
    let projections: Arc<dyn ProjectionStore> = Arc::new(MemoryProjectionStore::new());
    let start = Utc.with_ymd_and_hms(2026, 3, 14, 18, 30, 0).unwrap();
    Game::new(events, projections).with_clock(Arc::new(ManualClock::new(start)))
}

fn gm() -> CommandContext {
    CommandContext::gm("gm-1").with_correlation("req-1", "inv-1")
}

async fn campaign(game: &Game) -> CampaignId {
    game.create_campaign(
        &gm(),
        CreateCampaignInput {
            name: " Ashen Vale ".to_owned(),
            game_system: "Daggerheart".to_owned(),
            gm_mode: Some(GmMode::Hybrid),
            theme_prompt: "ash and embers".to_owned(),
        },
    )
    .await
    .unwrap()
    .id
}

async fn pc(game: &Game, campaign_id: CampaignId, name: &str) -> CharacterId {
    game.create_character(
        &gm(),
        campaign_id,
        CreateCharacterInput {
            name: name.to_owned(),
            kind: Some(CharacterKind::Pc),
            ..CreateCharacterInput::default()
        },
    )
    .await
    .unwrap()
    .id
}

async fn last_seq(game: &Game, campaign_id: CampaignId) -> u64 {
    game.events().last_seq(campaign_id).await.unwrap()
}

fn set_stress(value: i32) -> PatchRequest {
    PatchRequest {
        stress: Some(Adjust::Set(value)),
        ..PatchRequest::default()
    }
}

#[tokio::test]
async fn full_session_then_replay_matches_live_projection() {
    let game = game();
    let ctx = gm();

    let created = game
        .create_campaign(
            &ctx,
            CreateCampaignInput {
                name: " Ashen Vale ".to_owned(),
                game_system: "Daggerheart".to_owned(),
                gm_mode: Some(GmMode::Hybrid),
                theme_prompt: String::new(),
            },
        )
        .await
        .unwrap();
    assert_eq!(created.name, "Ashen Vale");
    assert_eq!(created.game_system, "daggerheart");
    assert_eq!(created.status, CampaignStatus::Draft);
    let campaign_id = created.id;

    game.join_campaign(
        &ctx,
        campaign_id,
        CreateParticipantInput {
            display_name: "Mara".to_owned(),
            role: Some(ParticipantRole::Gm),
            controller: None,
        },
    )
    .await
    .unwrap();
    let player = game
        .join_campaign(
            &ctx,
            campaign_id,
            CreateParticipantInput {
                display_name: " Rowan ".to_owned(),
                role: Some(ParticipantRole::Player),
                controller: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(player.display_name, "Rowan");

    let character = game
        .create_character(
            &ctx,
            campaign_id,
            CreateCharacterInput {
                name: "Aria".to_owned(),
                kind: Some(CharacterKind::Pc),
                notes: String::new(),
                participant_id: Some(player.id),
            },
        )
        .await
        .unwrap();
    let character_id = character.id;
    assert_eq!(last_seq(&game, campaign_id).await, 6);

    let state = game.character_state(campaign_id, character_id).await.unwrap();
    assert_eq!((state.hp, state.hp_max), (6, 6));
    assert_eq!((state.hope, state.stress, state.stress_max), (2, 0, 6));
    assert_eq!(state.life_state, LifeState::Alive);

    let counted = game.campaign(campaign_id).await.unwrap();
    assert_eq!(counted.participant_count, 2);
    assert_eq!(counted.character_count, 1);

    // The first session activates the draft campaign.
    let session = game.start_session(&ctx, campaign_id, " Session 1 ").await.unwrap();
    assert_eq!(session.name, "Session 1");
    assert_eq!(
        game.campaign(campaign_id).await.unwrap().status,
        CampaignStatus::Active
    );
    assert!(matches!(
        game.start_session(&ctx, campaign_id, "again").await,
        Err(GameError::InvalidState(_))
    ));

    let gate = game
        .open_gate(&ctx, campaign_id, " Rest ", "  short rest ")
        .await
        .unwrap();
    assert_eq!(gate.gate_type, "rest");
    assert_eq!(gate.reason, "short rest");
    let gate = game
        .resolve_gate(&ctx, campaign_id, gate.id, "everyone rested")
        .await
        .unwrap();
    assert_eq!(gate.status, GateStatus::Resolved);
    assert!(game.resolve_gate(&ctx, campaign_id, gate.id, "twice").await.is_err());

    let spotlight = game
        .set_spotlight(&ctx, campaign_id, "Character", Some(character_id))
        .await
        .unwrap();
    assert_eq!(spotlight.character_id, Some(character_id));

    // Stress at max brackets vulnerable in; an identical patch is a no-op.
    let state = game
        .patch_character_state(&ctx, campaign_id, character_id, &set_stress(6))
        .await
        .unwrap();
    assert!(state.has_condition(CONDITION_VULNERABLE));
    let before = last_seq(&game, campaign_id).await;
    game.patch_character_state(&ctx, campaign_id, character_id, &set_stress(6))
        .await
        .unwrap();
    assert_eq!(last_seq(&game, campaign_id).await, before);

    let state = game
        .patch_character_state(
            &ctx,
            campaign_id,
            character_id,
            &PatchRequest {
                stress: Some(Adjust::Delta(-1)),
                ..PatchRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(state.stress, 5);
    assert!(!state.has_condition(CONDITION_VULNERABLE));

    let state = game
        .apply_damage(
            &ctx,
            campaign_id,
            character_id,
            DamageRequest {
                amount: 4,
                use_armor: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(state.hp, 4);

    assert_eq!(game.gain_gm_fear(&ctx, campaign_id, 3, "tension").await.unwrap(), 3);
    assert_eq!(game.spend_gm_fear(&ctx, campaign_id, 1, "ambush").await.unwrap(), 2);

    let ended = game.end_session(&ctx, campaign_id).await.unwrap();
    assert_eq!(ended.status, SessionStatus::Ended);
    assert!(game.active_session(campaign_id).await.unwrap().is_none());
    assert!(
        game.projections()
            .get_spotlight(campaign_id, session.id)
            .await
            .unwrap()
            .is_none()
    );

    let completed = game.end_campaign(&ctx, campaign_id).await.unwrap();
    assert_eq!(completed.status, CampaignStatus::Completed);
    assert!(completed.completed_at.is_some());
    let err = game
        .update_campaign(
            &ctx,
            campaign_id,
            CampaignPatch {
                name: Some("Renamed".to_owned()),
                ..CampaignPatch::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // Every event carries the command's actor and correlation ids, and the
    // log is gap-free.
    let log = game.events().list(campaign_id, 0, 1000).await.unwrap();
    let seqs: Vec<u64> = log.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, (1..=21).collect::<Vec<u64>>());
    assert!(log.iter().all(|e| e.request_id == "req-1" && e.actor_id.as_deref() == Some("gm-1")));

    // Replaying the log into empty storage reproduces the live views.
    let fresh = Arc::new(MemoryProjectionStore::new());
    let applier = Applier::new(fresh.clone()).with_system(Arc::new(DaggerheartAdapter::new()));
    applier.apply_all(&log).await.unwrap();

    let live = game.projections();
    assert_eq!(
        fresh.get_campaign(campaign_id).await.unwrap(),
        live.get_campaign(campaign_id).await.unwrap()
    );
    assert_eq!(
        fresh.list_participants(campaign_id).await.unwrap(),
        live.list_participants(campaign_id).await.unwrap()
    );
    assert_eq!(
        fresh.list_characters(campaign_id).await.unwrap(),
        live.list_characters(campaign_id).await.unwrap()
    );
    assert_eq!(
        fresh.list_system_states(campaign_id, "daggerheart").await.unwrap(),
        live.list_system_states(campaign_id, "daggerheart").await.unwrap()
    );
    assert_eq!(fresh.get_gm_fear(campaign_id).await.unwrap(), Some(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_commands_serialize_per_campaign() {
    let game = game();
    let campaign_id = campaign(&game).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let game = game.clone();
        handles.push(tokio::spawn(async move {
            game.gain_gm_fear(&gm(), campaign_id, 1, "rising dread").await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(game.campaign(campaign_id).await.unwrap().gm_fear, 10);
    assert_eq!(last_seq(&game, campaign_id).await, 11);

    let err = game
        .gain_gm_fear(&gm(), campaign_id, 1, "one too many")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(last_seq(&game, campaign_id).await, 11);
}

#[tokio::test]
async fn gm_fear_rejections_append_nothing() {
    let game = game();
    let campaign_id = campaign(&game).await;

    let err = game.gain_gm_fear(&gm(), campaign_id, 0, "").await.unwrap_err();
    assert!(matches!(&err, GameError::Validation(v) if v.field.as_deref() == Some("amount")));
    let err = game.spend_gm_fear(&gm(), campaign_id, 1, "").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    let err = game.gain_gm_fear(&gm(), campaign_id, 11, "").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    assert_eq!(last_seq(&game, campaign_id).await, 1);
    assert_eq!(game.campaign(campaign_id).await.unwrap().gm_fear, 0);
}

#[tokio::test]
async fn lifecycle_rejects_illegal_transitions() {
    let game = game();
    let ctx = gm();
    let campaign_id = campaign(&game).await;

    assert!(game.end_campaign(&ctx, campaign_id).await.is_err());
    assert!(game.restore_campaign(&ctx, campaign_id).await.is_err());

    game.start_session(&ctx, campaign_id, "one").await.unwrap();
    let err = game.archive_campaign(&ctx, campaign_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    game.end_session(&ctx, campaign_id).await.unwrap();
    let archived = game.archive_campaign(&ctx, campaign_id).await.unwrap();
    assert_eq!(archived.status, CampaignStatus::Archived);
    assert!(archived.archived_at.is_some());
    assert!(game.start_session(&ctx, campaign_id, "two").await.is_err());

    let restored = game.restore_campaign(&ctx, campaign_id).await.unwrap();
    assert_eq!(restored.status, CampaignStatus::Draft);
    assert!(restored.archived_at.is_none());
}

#[tokio::test]
async fn unsupported_game_system_is_rejected() {
    let game = game();
    let err = game
        .create_campaign(
            &gm(),
            CreateCampaignInput {
                name: "Elsewhere".to_owned(),
                game_system: "cosmere".to_owned(),
                gm_mode: Some(GmMode::Human),
                theme_prompt: String::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(&err, GameError::Validation(v) if v.field.as_deref() == Some("game_system")));
    assert!(game.list_campaigns().await.unwrap().is_empty());
}

#[tokio::test]
async fn death_moves_follow_the_dice() {
    let game = game();
    let ctx = gm();
    let campaign_id = campaign(&game).await;
    game.start_session(&ctx, campaign_id, "finale").await.unwrap();
    let doomed = pc(&game, campaign_id, "Doomed").await;
    let hero = pc(&game, campaign_id, "Hero").await;

    let err = game
        .resolve_death_move(&ctx, campaign_id, doomed, DeathMove::RiskItAll, Some(1), Some(2))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let severe = DamageRequest {
        amount: 10,
        use_armor: false,
    };
    for character_id in [doomed, hero] {
        game.apply_damage(&ctx, campaign_id, character_id, severe).await.unwrap();
        let state = game.apply_damage(&ctx, campaign_id, character_id, severe).await.unwrap();
        assert_eq!(state.hp, 0);
    }

    let state = game
        .resolve_death_move(&ctx, campaign_id, doomed, DeathMove::RiskItAll, Some(2), Some(9))
        .await
        .unwrap();
    assert_eq!(state.life_state, LifeState::Dead);
    assert!(game.apply_damage(&ctx, campaign_id, doomed, severe).await.is_err());

    let state = game
        .resolve_death_move(&ctx, campaign_id, hero, DeathMove::BlazeOfGlory, None, None)
        .await
        .unwrap();
    assert_eq!(state.life_state, LifeState::BlazeOfGlory);
    let state = game
        .resolve_blaze_of_glory(&ctx, campaign_id, hero)
        .await
        .unwrap();
    assert_eq!(state.life_state, LifeState::Dead);
    assert!(game.resolve_blaze_of_glory(&ctx, campaign_id, hero).await.is_err());
}

#[tokio::test]
async fn roll_outcomes_need_a_session_and_a_logged_roll() {
    let game = game();
    let ctx = gm();
    let campaign_id = campaign(&game).await;
    let character_id = pc(&game, campaign_id, "Aria").await;

    let attack = |roll_seq: u64, targets: Vec<String>| AttackResolved {
        character_id,
        roll_seq,
        targets,
        outcome: "roll_with_hope".to_owned(),
        success: true,
        crit: false,
    };
    let goblin = || vec!["goblin".to_owned()];

    let err = game
        .record_attack(&ctx, campaign_id, attack(1, goblin()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let session = game.start_session(&ctx, campaign_id, "skirmish").await.unwrap();
    let before = last_seq(&game, campaign_id).await;

    let err = game
        .record_attack(&ctx, campaign_id, attack(before + 50, goblin()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    let err = game
        .record_attack(&ctx, campaign_id, attack(before, Vec::new()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(last_seq(&game, campaign_id).await, before);

    let recorded = game
        .record_attack(&ctx, campaign_id, attack(before, goblin()))
        .await
        .unwrap();
    assert_eq!(recorded.seq, before + 1);
    assert_eq!(recorded.system_id, "daggerheart");
    assert_eq!(recorded.session_id, Some(session.id));
}

#[tokio::test]
async fn record_checks_system_events_before_append() {
    let game = game();
    let campaign_id = campaign(&game).await;
    let at = Utc.with_ymd_and_hms(2026, 3, 14, 20, 0, 0).unwrap();

    let overflow = NewEvent::from_payload(
        campaign_id,
        &GmFearChanged {
            before: 0,
            after: 11,
            reason: "too much".to_owned(),
        },
        at,
    )
    .unwrap()
    .with_system("daggerheart", "1.0.0");
    let err = game.record(overflow).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let unknown = NewEvent::new(campaign_id, "cosmere.stormlight_spent", at).with_system("cosmere", "0.1");
    let err = game.record(unknown).await.unwrap_err();
    assert!(matches!(&err, GameError::Validation(v) if v.field.as_deref() == Some("system_id")));
    assert_eq!(last_seq(&game, campaign_id).await, 1);

    let fear = NewEvent::from_payload(
        campaign_id,
        &GmFearChanged {
            before: 0,
            after: 4,
            reason: "storm".to_owned(),
        },
        at,
    )
    .unwrap()
    .with_system("daggerheart", "1.0.0");
    let stored = game.record(fear).await.unwrap();
    assert_eq!(stored.seq, 2);
    assert_eq!(game.campaign(campaign_id).await.unwrap().gm_fear, 4);
}

#[tokio::test]
async fn deleting_a_spotlit_character_clears_the_spotlight() {
    let game = game();
    let ctx = gm();
    let campaign_id = campaign(&game).await;
    let character_id = pc(&game, campaign_id, "Aria").await;
    let session = game.start_session(&ctx, campaign_id, "one").await.unwrap();
    game.set_spotlight(&ctx, campaign_id, "character", Some(character_id))
        .await
        .unwrap();

    let deleted = game
        .delete_character(&ctx, campaign_id, character_id, "retired")
        .await
        .unwrap();
    assert!(!deleted.is_active());
    assert!(
        game.projections()
            .get_spotlight(campaign_id, session.id)
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(game.campaign(campaign_id).await.unwrap().character_count, 0);

    let err = game
        .set_spotlight(&ctx, campaign_id, "character", Some(character_id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    let err = game
        .set_spotlight(&ctx, campaign_id, "gm", Some(character_id))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn conditions_are_normalized_and_unchanged_sets_append_nothing() {
    let game = game();
    let ctx = gm();
    let campaign_id = campaign(&game).await;
    let character_id = pc(&game, campaign_id, "Aria").await;

    let state = game
        .set_conditions(&ctx, campaign_id, character_id, [" Hidden ", "hidden", "RESTRAINED"])
        .await
        .unwrap();
    let names: Vec<&str> = state.conditions.iter().map(String::as_str).collect();
    assert_eq!(names, vec!["hidden", "restrained"]);

    let before = last_seq(&game, campaign_id).await;
    game.set_conditions(&ctx, campaign_id, character_id, ["restrained", "hidden"])
        .await
        .unwrap();
    assert_eq!(last_seq(&game, campaign_id).await, before);
}

async fn condition_events(game: &Game, campaign_id: CampaignId) -> usize {
    game.events()
        .list(campaign_id, 0, 1000)
        .await
        .unwrap()
        .iter()
        .filter(|e| e.event_type == event_types::CONDITION_CHANGED)
        .count()
}

#[tokio::test]
async fn stress_bracket_emits_one_condition_event_per_transition() {
    let game = game();
    let ctx = gm();
    let campaign_id = campaign(&game).await;
    let character_id = pc(&game, campaign_id, "Aria").await;

    // Draft campaign: vitals may change before play starts.
    let mut counts = Vec::new();
    for stress in [2, 6, 6, 5, 6, 3, 3] {
        let state = game
            .patch_character_state(&ctx, campaign_id, character_id, &set_stress(stress))
            .await
            .unwrap();
        assert_eq!(state.stress, stress);
        assert_eq!(state.has_condition(CONDITION_VULNERABLE), stress == state.stress_max);
        counts.push(condition_events(&game, campaign_id).await);
    }
    assert_eq!(counts, vec![0, 1, 1, 2, 3, 4, 4]);

    let state = game
        .patch_character_state(
            &ctx,
            campaign_id,
            character_id,
            &PatchRequest {
                hp: Some(Adjust::Delta(i32::MIN)),
                hope: Some(Adjust::Delta(i32::MAX)),
                ..PatchRequest::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(state.hp, 0);
    assert_eq!(state.hope, state.hope_max);
    assert_eq!(condition_events(&game, campaign_id).await, 4);

    let active = game
        .transition_campaign(&ctx, campaign_id, CampaignStatus::Active)
        .await
        .unwrap();
    assert_eq!(active.status, CampaignStatus::Active);
    game.start_session(&ctx, campaign_id, "Session 1").await.unwrap();

    let before = last_seq(&game, campaign_id).await;
    let err = game.archive_campaign(&ctx, campaign_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(last_seq(&game, campaign_id).await, before);

    game.end_session(&ctx, campaign_id).await.unwrap();
    let archived = game.archive_campaign(&ctx, campaign_id).await.unwrap();
    assert_eq!(archived.status, CampaignStatus::Archived);
}
