//! Board publication and end-to-end tracker scenarios

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use chrono::Utc;

use capt_ledger::bulk::BulkLineError;
use capt_ledger::ledger::{AggregateIndex, LedgerStore, NewMatch, NewParticipant, Outcome, Window};
use capt_ledger::publish::{BoardKey, BoardKind, PublishOutcome};
use capt_ledger::ranking::Metric;

use common::{board_settings, harness, MemoryChannel};

fn new_match(opponent: &str, outcome: Outcome) -> NewMatch {
    NewMatch {
        opponent: opponent.into(),
        outcome,
        timestamp: None,
    }
}

// =============================================================================
// Idempotent publication
// =============================================================================

#[tokio::test]
async fn test_sequential_refreshes_keep_one_artifact() {
    let h = harness(MemoryChannel::default(), board_settings());

    h.publisher.publish(BoardKind::AverageDamage).await;
    h.publisher.publish(BoardKind::AverageDamage).await;

    assert_eq!(h.channel.count("avg"), 1);
    assert_eq!(h.channel.sends.load(Ordering::SeqCst), 1);
    assert_eq!(h.channel.edits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrent_refreshes_keep_one_artifact() {
    let h = harness(MemoryChannel::with_delay(Duration::from_millis(20)), board_settings());

    let (a, b, c) = tokio::join!(
        h.publisher.publish(BoardKind::Kills),
        h.publisher.publish(BoardKind::Kills),
        h.publisher.publish(BoardKind::Kills),
    );

    let created = [&a, &b, &c]
        .iter()
        .filter(|o| matches!(o, PublishOutcome::Created(_)))
        .count();
    assert_eq!(created, 1);
    assert_eq!(h.channel.count("kills"), 1);
}

#[tokio::test]
async fn test_concurrent_different_boards() {
    let h = harness(MemoryChannel::with_delay(Duration::from_millis(10)), board_settings());

    let handles: Vec<_> = BoardKind::ALL
        .iter()
        .map(|&board| {
            let publisher = h.publisher.clone();
            tokio::spawn(async move { publisher.publish(board).await })
        })
        .collect();
    for handle in handles {
        assert!(matches!(handle.await.unwrap(), PublishOutcome::Created(_)));
    }
    assert_eq!(h.channel.artifacts().len(), 3);
}

#[tokio::test]
async fn test_artifact_deleted_externally_is_replaced() {
    let h = harness(MemoryChannel::default(), board_settings());

    let PublishOutcome::Created(first) = h.publisher.publish(BoardKind::History).await else {
        panic!("expected the first publish to create");
    };
    h.channel.delete(&first);

    let PublishOutcome::Created(second) = h.publisher.publish(BoardKind::History).await else {
        panic!("expected a replacement artifact");
    };
    assert_ne!(first, second);
    assert_eq!(
        h.publisher.registry().get(&BoardKey::new(BoardKind::History, "history")),
        Some(second)
    );
}

#[tokio::test]
async fn test_unavailable_destination_is_skipped() {
    let mut settings = board_settings();
    settings.kills_destination = Some("gone".into());
    settings.history_destination = None;
    let h = harness(MemoryChannel::default(), settings);

    let outcomes = h.publisher.refresh_all().await;
    assert!(matches!(outcomes[0].1, PublishOutcome::Created(_)));
    assert!(matches!(outcomes[1].1, PublishOutcome::Skipped(_)));
    assert!(matches!(outcomes[2].1, PublishOutcome::Skipped(_)));
    assert_eq!(h.publisher.registry().len(), 1);
}

#[tokio::test]
async fn test_registry_survives_restart() {
    let h = harness(MemoryChannel::default(), board_settings());
    let PublishOutcome::Created(first) = h.publisher.publish(BoardKind::Kills).await else {
        panic!("expected create");
    };

    let reopened = capt_ledger::publish::ArtifactRegistry::open(&h.dir.path().join("artifacts.json"));
    assert_eq!(reopened.get(&BoardKey::new(BoardKind::Kills, "kills")), Some(first));
}

// =============================================================================
// Tracker scenarios
// =============================================================================

#[tokio::test]
async fn test_match_without_participants_does_not_count() {
    let h = harness(MemoryChannel::default(), board_settings());

    h.tracker.add_match(new_match("Vipers", Outcome::Win)).await.unwrap();
    h.tracker
        .add_participant(NewParticipant { ordinal: 1, id: 1, damage: 1000, kills: 2 })
        .await
        .unwrap();
    h.tracker.add_match(new_match("Wolves", Outcome::Loss)).await.unwrap();

    let board = h.tracker.leaderboard(Metric::AverageDamage, Window::All).await;
    assert_eq!(board.entries.len(), 1);
    assert_eq!(board.entries[0].id, 1);
    assert_eq!(board.entries[0].value, 1000);
    assert_eq!(board.entries[0].totals.games, 1);

    let PublishOutcome::Created(artifact) = h.publisher.publish(BoardKind::AverageDamage).await else {
        panic!("expected create");
    };
    let body = h.channel.content(&artifact).unwrap();
    assert!(body.contains("Nika"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_participant_adds_all_land() {
    let h = harness(MemoryChannel::default(), board_settings());
    h.tracker.add_match(new_match("Vipers", Outcome::Win)).await.unwrap();

    let handles: Vec<_> = (1..=50u64)
        .map(|id| {
            let tracker = h.tracker.clone();
            tokio::spawn(async move {
                tracker
                    .add_participant(NewParticipant { ordinal: 1, id, damage: id * 100, kills: id % 4 })
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let snapshot = h.tracker.snapshot().await;
    let mut ids: Vec<u64> = snapshot.records()[0].participants.iter().map(|p| p.id).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=50).collect::<Vec<u64>>());
    assert_eq!(&AggregateIndex::rebuild(snapshot.records()), snapshot.aggregate());

    let reopened = LedgerStore::open(&h.dir.path().join("capts.json"), &h.dir.path().join("stats.json"));
    let on_disk = reopened.snapshot().await;
    assert_eq!(on_disk.records()[0].participants.len(), 50);
    assert_eq!(on_disk.aggregate(), snapshot.aggregate());
}

#[tokio::test]
async fn test_bulk_upload_partial_success() {
    let h = harness(MemoryChannel::default(), board_settings());
    h.tracker.add_match(new_match("Vipers", Outcome::Win)).await.unwrap();

    let text = "1 1000 2\n2 15k\n3 2500 1\n4 9x9 0\n5 700 3\n";
    let report = h.tracker.upload_participants(1, text).await.unwrap();

    assert_eq!(report.added, 3);
    assert_eq!(report.failures.len(), 2);
    assert_eq!(report.failures[0].line, 2);
    assert_eq!(report.failures[0].error, BulkLineError::WrongFieldCount { found: 2 });
    assert_eq!(report.failures[1].line, 4);
    assert!(matches!(report.failures[1].error, BulkLineError::InvalidNumber { field: "damage", .. }));

    let snapshot = h.tracker.snapshot().await;
    assert_eq!(snapshot.records()[0].participants.len(), 3);
    assert_eq!(snapshot.aggregate().len(), 3);
}

#[tokio::test]
async fn test_history_pages_through_ledger() {
    let h = harness(MemoryChannel::default(), board_settings());
    for i in 0..25 {
        h.tracker
            .add_match(new_match(&format!("team-{}", i), Outcome::Win))
            .await
            .unwrap();
    }

    let mut view = h.tracker.history_view(Window::All).await;
    assert_eq!(view.total_pages(), 3);
    view.next();
    view.next();
    view.prev();
    assert_eq!(view.current_page(), 1);
    view.next();
    assert!(!view.next());
    assert_eq!(view.render().rows.len(), 5);

    // The view keeps its own copy until refreshed.
    h.tracker.reset().await.unwrap();
    assert_eq!(view.total_pages(), 3);
    view.refresh(&*h.tracker.snapshot().await, Utc::now());
    assert_eq!(view.total_pages(), 1);
    assert_eq!(view.current_page(), 0);
}

#[tokio::test]
async fn test_ledger_survives_restart() {
    let h = harness(MemoryChannel::default(), board_settings());
    h.tracker.add_match(new_match("Vipers", Outcome::Win)).await.unwrap();
    h.tracker
        .add_participant(NewParticipant { ordinal: 1, id: 2, damage: 300, kills: 1 })
        .await
        .unwrap();

    let reopened = LedgerStore::open(
        &h.dir.path().join("capts.json"),
        &h.dir.path().join("stats.json"),
    );
    let snapshot = reopened.snapshot().await;
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot.aggregate().get(2).unwrap().damage, 300);
    assert_eq!(snapshot.latest_label(2), Some("Lev"));
}
