//! Integration tests for the event lifecycle.
//!
//! These tests drive events through join, cancel, start, pairing and
//! settlement against the in-memory store and check the stored documents.

use mparty::{
    EventBus, EventLifecycleManager, EventMode, EventStatus, MPartyConfig, MPartyError, Role,
    User,
    catalog::{EventCatalog, NewEvent},
    store::{DocumentStore, InMemoryBlobStore, InMemoryStore, paths},
    tournament::Placements,
};
use chrono::{Duration, Utc};
use std::sync::Arc;

struct World {
    store: Arc<InMemoryStore>,
    catalog: EventCatalog,
    lifecycle: EventLifecycleManager,
    host: User,
}

fn world_with(config: MPartyConfig) -> World {
    let store = Arc::new(InMemoryStore::new());
    let bus = EventBus::default();
    let catalog = EventCatalog::new(
        store.clone(),
        Arc::new(InMemoryBlobStore::new()),
        bus.clone(),
        &config,
    );
    let lifecycle = EventLifecycleManager::new(store.clone(), bus, &config);
    let host = User::new("host", "host@example.com", "Carla", Role::Organizer, None);

    World {
        store,
        catalog,
        lifecycle,
        host,
    }
}

fn world() -> World {
    world_with(MPartyConfig::default())
}

impl World {
    async fn event(&self, max_players: u32) -> String {
        let new = NewEvent {
            title: "Friday Smash".to_string(),
            description: String::new(),
            game_type: "Smash Bros".to_string(),
            mode: EventMode::Competitive,
            location: "Online".to_string(),
            event_date: Utc::now() + Duration::days(2),
            max_players,
            entry_fee: None,
        };
        self.catalog.create_event(&self.host, new).await.unwrap().id
    }

    async fn player(&self, id: &str) -> User {
        let user = User::new(id, format!("{id}@example.com"), id.to_uppercase(), Role::Player, None);
        self.store
            .set_document(&paths::user(id), user.to_document())
            .await
            .unwrap();
        user
    }

    async fn players(&self, n: usize) -> Vec<User> {
        let mut users = Vec::with_capacity(n);
        for i in 0..n {
            users.push(self.player(&format!("p{i}")).await);
        }
        users
    }

    async fn stored_user(&self, id: &str) -> serde_json::Map<String, serde_json::Value> {
        self.store
            .get_document(&paths::user(id))
            .await
            .unwrap()
            .unwrap()
            .data
    }
}

#[tokio::test]
async fn test_third_join_on_two_seat_event_is_full() {
    let w = world();
    let event_id = w.event(2).await;
    let players = w.players(3).await;

    w.lifecycle.join(&event_id, &players[0]).await.unwrap();
    w.lifecycle.join(&event_id, &players[1]).await.unwrap();
    let err = w.lifecycle.join(&event_id, &players[2]).await.unwrap_err();

    assert!(matches!(err, MPartyError::AlreadyFull { capacity: 2 }));
    assert_eq!(w.lifecycle.roster(&event_id).await.unwrap().len(), 2);
    assert_eq!(w.lifecycle.get_event(&event_id).await.unwrap().current_players, 2);
}

#[tokio::test]
async fn test_join_and_cancel_require_available() {
    let w = world();
    let event_id = w.event(4).await;
    let players = w.players(3).await;
    w.lifecycle.join(&event_id, &players[0]).await.unwrap();
    w.lifecycle.join(&event_id, &players[1]).await.unwrap();

    w.lifecycle.start_tournament(&event_id, "host").await.unwrap();

    let join = w.lifecycle.join(&event_id, &players[2]).await.unwrap_err();
    assert!(matches!(
        join,
        MPartyError::WrongState {
            expected: EventStatus::Available,
            actual: EventStatus::InProgress
        }
    ));

    let cancel = w.lifecycle.cancel(&event_id, "p0").await.unwrap_err();
    assert!(matches!(cancel, MPartyError::WrongState { .. }));
    assert_eq!(w.lifecycle.roster(&event_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_cancel_removes_exactly_one_entry() {
    let w = world();
    let event_id = w.event(4).await;
    for player in w.players(3).await {
        w.lifecycle.join(&event_id, &player).await.unwrap();
    }

    let event = w.lifecycle.cancel(&event_id, "p1").await.unwrap();
    assert_eq!(event.current_players, 2);

    let roster = w.lifecycle.roster(&event_id).await.unwrap();
    let ids: Vec<&str> = roster.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p0", "p2"]);
    assert_eq!(w.lifecycle.get_event(&event_id).await.unwrap().current_players, 2);

    // tournamentsPlayed is not refunded
    assert_eq!(w.stored_user("p1").await["tournamentsPlayed"], 1);
}

#[tokio::test]
async fn test_pairing_counts_odd_and_even() {
    for (n, pairs, byes) in [(2, 1, 0), (5, 2, 1), (6, 3, 0), (9, 4, 1)] {
        let w = world();
        let event_id = w.event(10).await;
        for player in w.players(n).await {
            w.lifecycle.join(&event_id, &player).await.unwrap();
        }
        w.lifecycle.start_tournament(&event_id, "host").await.unwrap();

        let pairings: Vec<_> = w
            .lifecycle
            .generate_pairings(&event_id, "host")
            .await
            .unwrap()
            .collect();

        let bye_count = pairings.iter().filter(|p| p.is_bye()).count();
        assert_eq!(pairings.len() - bye_count, pairs, "roster of {n}");
        assert_eq!(bye_count, byes, "roster of {n}");
    }
}

#[tokio::test]
async fn test_pairing_needs_two_players_and_a_running_event() {
    let w = world();
    let event_id = w.event(4).await;
    let players = w.players(1).await;
    w.lifecycle.join(&event_id, &players[0]).await.unwrap();

    let err = w.lifecycle.generate_pairings(&event_id, "host").await.unwrap_err();
    assert!(matches!(err, MPartyError::WrongState { .. }));

    w.lifecycle.start_tournament(&event_id, "host").await.unwrap();
    let err = w.lifecycle.generate_pairings(&event_id, "host").await.unwrap_err();
    assert!(matches!(
        err,
        MPartyError::InsufficientPlayers {
            needed: 2,
            current: 1
        }
    ));

    let err = w.lifecycle.generate_pairings(&event_id, "p0").await.unwrap_err();
    assert!(matches!(err, MPartyError::NotAuthorized(_)));
}

#[tokio::test]
async fn test_finalize_four_player_roster() {
    let w = world();
    let event_id = w.event(4).await;
    for player in w.players(4).await {
        w.lifecycle.join(&event_id, &player).await.unwrap();
    }
    w.lifecycle.start_tournament(&event_id, "host").await.unwrap();

    let before_event = w
        .store
        .get_document(&paths::event(&event_id))
        .await
        .unwrap()
        .unwrap()
        .data;
    let mut before_users = Vec::new();
    for id in ["p0", "p1", "p2", "p3"] {
        before_users.push(w.stored_user(id).await);
    }

    let placements = Placements::new("p2").with_second("p0").with_third("p3");
    let settlement = w
        .lifecycle
        .finalize(&event_id, "host", &placements)
        .await
        .unwrap();
    assert_eq!(settlement.event.status, EventStatus::Finished);

    let expected = [("p0", 75, 0), ("p1", 25, 0), ("p2", 100, 1), ("p3", 50, 0)];
    for ((id, xp, won), before) in expected.into_iter().zip(before_users) {
        let after = w.stored_user(id).await;
        assert_eq!(after["xp"], xp, "{id} xp");
        assert_eq!(after["tournamentsWon"], won, "{id} wins");

        let mut untouched_after = after.clone();
        let mut untouched_before = before.clone();
        for key in ["xp", "tournamentsWon"] {
            untouched_after.remove(key);
            untouched_before.remove(key);
        }
        assert_eq!(untouched_after, untouched_before, "{id} other fields");
    }

    let mut after_event = w
        .store
        .get_document(&paths::event(&event_id))
        .await
        .unwrap()
        .unwrap()
        .data;
    assert_eq!(after_event["status"], "Finished");
    let mut before_event = before_event;
    after_event.remove("status");
    before_event.remove("status");
    assert_eq!(after_event, before_event);
}

#[tokio::test]
async fn test_finished_event_rejects_everything() {
    let w = world();
    let event_id = w.event(2).await;
    let players = w.players(3).await;
    w.lifecycle.join(&event_id, &players[0]).await.unwrap();
    w.lifecycle.join(&event_id, &players[1]).await.unwrap();
    w.lifecycle.start_tournament(&event_id, "host").await.unwrap();
    w.lifecycle
        .finalize(&event_id, "host", &Placements::new("p0"))
        .await
        .unwrap();

    let finished = |err: MPartyError| {
        matches!(
            err,
            MPartyError::WrongState {
                actual: EventStatus::Finished,
                ..
            }
        )
    };
    assert!(finished(w.lifecycle.join(&event_id, &players[2]).await.unwrap_err()));
    assert!(finished(w.lifecycle.cancel(&event_id, "p0").await.unwrap_err()));
    assert!(finished(w.lifecycle.start_tournament(&event_id, "host").await.unwrap_err()));
    assert!(finished(
        w.lifecycle
            .finalize(&event_id, "host", &Placements::new("p1"))
            .await
            .unwrap_err()
    ));

    // second finalize must not double-award
    assert_eq!(w.stored_user("p0").await["xp"], 100);
}

#[tokio::test]
async fn test_finalize_rejects_bad_placements_without_writing() {
    let w = world();
    let event_id = w.event(4).await;
    for player in w.players(3).await {
        w.lifecycle.join(&event_id, &player).await.unwrap();
    }
    w.lifecycle.start_tournament(&event_id, "host").await.unwrap();

    for placements in [
        Placements::new("p0").with_second("p0"),
        Placements::new("p0").with_second("stranger"),
    ] {
        let err = w
            .lifecycle
            .finalize(&event_id, "host", &placements)
            .await
            .unwrap_err();
        assert!(matches!(err, MPartyError::InvalidInput(_)));
    }

    let err = w
        .lifecycle
        .finalize(&event_id, "p0", &Placements::new("p0"))
        .await
        .unwrap_err();
    assert!(matches!(err, MPartyError::NotAuthorized(_)));

    assert_eq!(
        w.lifecycle.get_event(&event_id).await.unwrap().status,
        EventStatus::InProgress
    );
    assert_eq!(w.stored_user("p0").await["xp"], 0);
}

#[tokio::test]
async fn test_failed_settlement_changes_nothing() {
    let w = world();
    let event_id = w.event(2).await;
    for player in w.players(2).await {
        w.lifecycle.join(&event_id, &player).await.unwrap();
    }
    w.lifecycle.start_tournament(&event_id, "host").await.unwrap();

    w.store.fail_writes_to("users/p1");
    let err = w
        .lifecycle
        .finalize(&event_id, "host", &Placements::new("p0"))
        .await
        .unwrap_err();
    assert!(matches!(err, MPartyError::RemoteFailure(_)));

    assert_eq!(w.stored_user("p0").await["xp"], 0);
    assert_eq!(
        w.lifecycle.get_event(&event_id).await.unwrap().status,
        EventStatus::InProgress
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_never_overfill() {
    let w = world_with(MPartyConfig {
        join_retry_attempts: 50,
        ..MPartyConfig::default()
    });
    let event_id = w.event(3).await;
    let players = w.players(8).await;

    let mut handles = Vec::new();
    for player in players {
        let lifecycle = w.lifecycle.clone();
        let event_id = event_id.clone();
        handles.push(tokio::spawn(async move {
            lifecycle.join(&event_id, &player).await
        }));
    }

    let mut joined = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => joined += 1,
            Err(MPartyError::AlreadyFull { .. } | MPartyError::Contention { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(joined, 3);
    assert_eq!(w.lifecycle.roster(&event_id).await.unwrap().len(), 3);
    assert_eq!(w.lifecycle.get_event(&event_id).await.unwrap().current_players, 3);
}
