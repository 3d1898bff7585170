//! Maintenance passes over logs written through the command facade.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::missing_panics_doc
)]

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use lorekeep_campaign::{CreateCampaignInput, CreateCharacterInput};
use lorekeep_core::{CommandContext, Game};
use lorekeep_daggerheart::events::GmFearChanged;
use lorekeep_daggerheart::{SYSTEM_ID, SYSTEM_VERSION};
use lorekeep_ledger::{EventStore, MemoryEventStore};
use lorekeep_maintenance::{
    CampaignSelection, Flags, Maintenance, Mode, Options, Report, ScanReport,
};
use lorekeep_projection::{MemoryProjectionStore, ProjectionStore, ProjectionWrite, SystemRow};
use lorekeep_types::{CampaignId, CharacterId, CharacterKind, GmMode, NewEvent};

struct Fixture {
    game: Game,
    campaign_id: CampaignId,
    character_id: CharacterId,
}

/// A campaign with one PC and 3 GM Fear: five events, three of them
/// snapshot events.
async fn fixture() -> Fixture {
    let events: Arc<dyn EventStore> = Arc::new(MemoryEventStore::new());
    let projections: Arc<dyn ProjectionStore> = Arc::new(MemoryProjectionStore::new());
    let game = Game::new(events, projections);
    let ctx = CommandContext::gm("gm-1");

    let campaign_id = game
        .create_campaign(
            &ctx,
            CreateCampaignInput {
                name: "Ashen Vale".to_owned(),
                game_system: "daggerheart".to_owned(),
                gm_mode: Some(GmMode::Human),
                theme_prompt: String::new(),
            },
        )
        .await
        .unwrap()
        .id;
    let character_id = game
        .create_character(
            &ctx,
            campaign_id,
            CreateCharacterInput {
                name: "Aria".to_owned(),
                kind: Some(CharacterKind::Pc),
                ..CreateCharacterInput::default()
            },
        )
        .await
        .unwrap()
        .id;
    game.gain_gm_fear(&ctx, campaign_id, 3, "omens").await.unwrap();

    Fixture {
        game,
        campaign_id,
        character_id,
    }
}

fn runner(fixture: &Fixture, flags: &Flags) -> Maintenance {
    Maintenance::new(
        Arc::clone(fixture.game.events()),
        Arc::clone(fixture.game.projections()),
        Options::from_flags(flags).unwrap().with_page_size(2),
    )
}

fn scan_report(report: Option<&Report>) -> &ScanReport {
    match report {
        Some(Report::Scan(scan)) => scan,
        other => panic!("expected a scan report, got {other:?}"),
    }
}

/// Write drift straight into the live projections.
async fn tamper(fixture: &Fixture) {
    let projections = fixture.game.projections();
    let mut state = projections
        .get_system_state(fixture.campaign_id, SYSTEM_ID, fixture.character_id)
        .await
        .unwrap()
        .unwrap();
    state["hp"] = json!(1);
    projections
        .commit(
            ProjectionWrite::SystemState(SystemRow {
                campaign_id: fixture.campaign_id,
                system_id: SYSTEM_ID.to_owned(),
                character_id: fixture.character_id,
                data: state,
            })
            .into(),
        )
        .await
        .unwrap();
    projections
        .commit(
            ProjectionWrite::GmFear {
                campaign_id: fixture.campaign_id,
                value: 7,
            }
            .into(),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn scan_counts_snapshot_events() {
    let fixture = fixture().await;
    let result = runner(
        &fixture,
        &Flags {
            dry_run: true,
            ..Flags::default()
        },
    )
    .run_campaign(fixture.campaign_id)
    .await;

    assert_eq!(result.mode, Mode::Scan);
    assert!(!result.is_error());
    let scan = scan_report(result.report.as_ref());
    assert_eq!(scan.last_seq, 5);
    assert_eq!(scan.total_events, 5);
    assert_eq!(scan.snapshot_events, 3);
    assert_eq!(scan.applied_events, 0);
}

#[tokio::test]
async fn scan_honors_after_seq() {
    let fixture = fixture().await;
    let result = runner(
        &fixture,
        &Flags {
            dry_run: true,
            after_seq: 3,
            ..Flags::default()
        },
    )
    .run_campaign(fixture.campaign_id)
    .await;

    let scan = scan_report(result.report.as_ref());
    assert_eq!(scan.total_events, 2);
    assert_eq!(scan.snapshot_events, 2);
    assert_eq!(scan.last_seq, 5);
}

#[tokio::test]
async fn validate_reports_invalid_events_as_warnings() {
    let fixture = fixture().await;
    // Bypass the facade: the log accepts any well-formed envelope.
    let bad = NewEvent::from_payload(
        fixture.campaign_id,
        &GmFearChanged {
            before: 3,
            after: 42,
            reason: "corrupted".to_owned(),
        },
        Utc::now(),
    )
    .unwrap()
    .with_system(SYSTEM_ID, SYSTEM_VERSION);
    fixture.game.events().append(bad).await.unwrap();

    let flags = Flags {
        validate: true,
        ..Flags::default()
    };
    let result = runner(&fixture, &flags).run_campaign(fixture.campaign_id).await;
    assert!(!result.is_error());
    let scan = scan_report(result.report.as_ref());
    assert_eq!(scan.snapshot_events, 4);
    assert_eq!(scan.invalid_events, 1);
    assert_eq!(result.warnings_total, 1);
    assert!(result.warnings.iter().any(|w| w.starts_with("seq 6 ")));

    let strict = Flags {
        max_invalid: Some(0),
        ..flags
    };
    let result = runner(&fixture, &strict).run_campaign(fixture.campaign_id).await;
    assert!(result.is_error());
    assert!(result.report.is_some());
}

#[tokio::test]
async fn integrity_is_clean_for_an_untouched_campaign() {
    let fixture = fixture().await;
    let result = runner(
        &fixture,
        &Flags {
            integrity: true,
            ..Flags::default()
        },
    )
    .run_campaign(fixture.campaign_id)
    .await;

    let Some(Report::Integrity(report)) = &result.report else {
        panic!("expected an integrity report, got {:?}", result.report);
    };
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.characters_checked, 1);
    assert_eq!((report.gm_fear_live, report.gm_fear_replay), (3, 3));
    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn integrity_finds_drift_and_replay_repairs_it() {
    let fixture = fixture().await;
    tamper(&fixture).await;

    let integrity = Flags {
        integrity: true,
        ..Flags::default()
    };
    let result = runner(&fixture, &integrity).run_campaign(fixture.campaign_id).await;
    let Some(Report::Integrity(report)) = &result.report else {
        panic!("expected an integrity report, got {:?}", result.report);
    };
    assert_eq!(report.character_mismatches, 1);
    assert_eq!(report.missing_states, 0);
    assert_eq!(report.mismatched_character_ids, vec![fixture.character_id]);
    assert!(!report.gm_fear_match);
    assert_eq!((report.gm_fear_live, report.gm_fear_replay), (7, 3));
    assert_eq!(result.warnings_total, 2);

    let result = runner(&fixture, &Flags::default())
        .run_campaign(fixture.campaign_id)
        .await;
    assert_eq!(result.mode, Mode::Replay);
    assert_eq!(scan_report(result.report.as_ref()).applied_events, 3);

    let result = runner(&fixture, &integrity).run_campaign(fixture.campaign_id).await;
    let Some(Report::Integrity(report)) = &result.report else {
        panic!("expected an integrity report, got {:?}", result.report);
    };
    assert!(report.is_clean(), "{report:?}");
    let state = fixture
        .game
        .character_state(fixture.campaign_id, fixture.character_id)
        .await
        .unwrap();
    assert_eq!(state.hp, state.hp_max);
}

#[tokio::test]
async fn replay_after_seq_keeps_earlier_state() {
    let fixture = fixture().await;
    tamper(&fixture).await;

    let result = runner(
        &fixture,
        &Flags {
            after_seq: 4,
            ..Flags::default()
        },
    )
    .run_campaign(fixture.campaign_id)
    .await;
    assert_eq!(scan_report(result.report.as_ref()).applied_events, 1);

    // The GM Fear event came after the resume point; the character's
    // vitals did not, so the tampered hp survives.
    let projections = fixture.game.projections();
    assert_eq!(projections.get_gm_fear(fixture.campaign_id).await.unwrap(), Some(3));
    let state = fixture
        .game
        .character_state(fixture.campaign_id, fixture.character_id)
        .await
        .unwrap();
    assert_eq!(state.hp, 1);
}

#[tokio::test]
async fn all_campaigns_lists_every_log() {
    let fixture = fixture().await;
    let maintenance = runner(&fixture, &Flags::default());
    let ids = maintenance.campaign_ids(&CampaignSelection::All).await.unwrap();
    assert_eq!(ids, vec![fixture.campaign_id]);

    let empty = maintenance.run_campaign(CampaignId::new()).await;
    assert!(!empty.is_error());
    assert_eq!(scan_report(empty.report.as_ref()).total_events, 0);
}
