//! Event lifecycle: roster changes, start, pairing and settlement.

use super::{
    pairing::{PairingGenerator, Pairings},
    settlement::{Award, Placements, SettlementEngine},
};
use crate::{
    config::MPartyConfig,
    errors::{MPartyError, MPartyResult},
    models::{Event, EventStatus, Participant, User},
    notify::{DomainEvent, EventBus},
    store::{
        DocumentStore, FieldUpdate, FieldUpdates, Query, StoreError, Version, WriteBatch, paths,
    },
};
use log::{debug, info, warn};
use rand::Rng;
use serde_json::Value;
use std::{future::Future, sync::Arc};

/// Minimum roster size for pairing
pub const MIN_PAIRING_PLAYERS: usize = 2;

/// Everything the event detail screen shows
#[derive(Debug, Clone)]
pub struct EventDetail {
    pub event: Event,
    pub participants: Vec<Participant>,
    /// Whether the viewer is on the roster
    pub has_joined: bool,
}

/// Result of closing an event
#[derive(Debug, Clone)]
pub struct Settlement {
    pub event: Event,
    pub awards: Vec<Award>,
}

/// Drives events through `Available -> InProgress -> Finished`
#[derive(Clone)]
pub struct EventLifecycleManager {
    store: Arc<dyn DocumentStore>,
    bus: EventBus,
    settlement: SettlementEngine,
    retry_attempts: u32,
}

impl EventLifecycleManager {
    /// Create a new lifecycle manager
    ///
    /// # Arguments
    ///
    /// * `store` - Document store holding events and users
    /// * `bus` - Bus that receives change notifications
    /// * `config` - Retry budget and XP rewards
    pub fn new(store: Arc<dyn DocumentStore>, bus: EventBus, config: &MPartyConfig) -> Self {
        Self {
            store,
            bus,
            settlement: SettlementEngine::new(config.rewards),
            retry_attempts: config.join_retry_attempts.max(1),
        }
    }

    async fn load_event(&self, event_id: &str) -> MPartyResult<(Event, Version)> {
        let stored = self
            .store
            .get_document(&paths::event(event_id))
            .await?
            .ok_or_else(|| MPartyError::NotFound(format!("event {event_id}")))?;
        let event = Event::from_document(&stored.id, &stored.data)?;
        Ok((event, stored.version))
    }

    /// Fetch a single event
    pub async fn get_event(&self, event_id: &str) -> MPartyResult<Event> {
        Ok(self.load_event(event_id).await?.0)
    }

    /// Current roster of an event
    pub async fn roster(&self, event_id: &str) -> MPartyResult<Vec<Participant>> {
        let docs = self
            .store
            .query(&Query::collection(paths::participants(event_id)))
            .await?;

        docs.iter()
            .map(|doc| Participant::from_document(&doc.id, &doc.data).map_err(Into::into))
            .collect()
    }

    /// Event, roster and whether `viewer` has joined
    pub async fn event_detail(
        &self,
        event_id: &str,
        viewer: Option<&str>,
    ) -> MPartyResult<EventDetail> {
        let event = self.get_event(event_id).await?;
        let participants = self.roster(event_id).await?;
        let has_joined =
            viewer.is_some_and(|viewer| participants.iter().any(|p| p.id == viewer));

        Ok(EventDetail {
            event,
            participants,
            has_joined,
        })
    }

    /// Run `attempt` until it stops hitting version conflicts
    async fn retry_on_conflict<T, F, Fut>(&self, operation: &str, mut attempt: F) -> MPartyResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = MPartyResult<T>>,
    {
        for n in 1..=self.retry_attempts {
            match attempt().await {
                Err(MPartyError::RemoteFailure(StoreError::Conflict(path))) => {
                    debug!("{operation}: conflict on {path} (attempt {n}/{})", self.retry_attempts);
                }
                other => return other,
            }
        }

        warn!("{operation}: giving up after {} attempts", self.retry_attempts);
        Err(MPartyError::Contention {
            attempts: self.retry_attempts,
        })
    }

    /// Add `user` to the roster of an open event.
    ///
    /// Writes the participant entry, bumps `currentPlayers` and the user's
    /// `tournamentsPlayed` in one batch guarded by the event version.
    ///
    /// # Errors
    ///
    /// * `MPartyError::NotAuthorized` - organizers cannot join
    /// * `MPartyError::NotFound` - event or user document missing
    /// * `MPartyError::WrongState` - event is not `Available`
    /// * `MPartyError::AlreadyJoined` - user already on the roster
    /// * `MPartyError::AlreadyFull` - roster at capacity
    /// * `MPartyError::Contention` - retries exhausted
    pub async fn join(&self, event_id: &str, user: &User) -> MPartyResult<Event> {
        if user.is_organizer() {
            return Err(MPartyError::NotAuthorized(
                "organizers cannot join events".to_string(),
            ));
        }

        let event = self
            .retry_on_conflict("join", || self.try_join(event_id, user))
            .await?;

        info!("{} joined event {event_id}", user.id);
        self.bus.publish(DomainEvent::PlayerJoined {
            event_id: event_id.to_string(),
            user_id: user.id.clone(),
        });
        Ok(event)
    }

    async fn try_join(&self, event_id: &str, user: &User) -> MPartyResult<Event> {
        let (mut event, version) = self.load_event(event_id).await?;
        ensure_status(&event, EventStatus::Available)?;

        let roster = self.roster(event_id).await?;
        if roster.iter().any(|p| p.id == user.id) {
            return Err(MPartyError::AlreadyJoined);
        }
        if roster.len() >= event.max_players as usize {
            return Err(MPartyError::AlreadyFull {
                capacity: event.max_players,
            });
        }

        let event_path = paths::event(event_id);
        let batch = WriteBatch::new()
            .require_version(event_path.clone(), version)
            .set(
                paths::participant(event_id, &user.id),
                Participant::from_user(user).to_document(),
            )
            .update(event_path, increment("currentPlayers", 1))
            .update(paths::user(&user.id), increment("tournamentsPlayed", 1));
        self.store.batch_write(batch).await?;

        event.current_players = event.current_players.saturating_add(1);
        Ok(event)
    }

    /// Remove `user_id` from the roster of an open event.
    ///
    /// `tournamentsPlayed` is left untouched.
    ///
    /// # Errors
    ///
    /// * `MPartyError::WrongState` - event is not `Available`
    /// * `MPartyError::NotFound` - user is not on the roster
    /// * `MPartyError::Contention` - retries exhausted
    pub async fn cancel(&self, event_id: &str, user_id: &str) -> MPartyResult<Event> {
        let event = self
            .retry_on_conflict("cancel", || self.try_cancel(event_id, user_id))
            .await?;

        info!("{user_id} left event {event_id}");
        self.bus.publish(DomainEvent::PlayerLeft {
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
        });
        Ok(event)
    }

    async fn try_cancel(&self, event_id: &str, user_id: &str) -> MPartyResult<Event> {
        let (mut event, version) = self.load_event(event_id).await?;
        ensure_status(&event, EventStatus::Available)?;

        let entry = paths::participant(event_id, user_id);
        if self.store.get_document(&entry).await?.is_none() {
            return Err(MPartyError::NotFound(format!(
                "{user_id} is not registered for event {event_id}"
            )));
        }

        let event_path = paths::event(event_id);
        let batch = WriteBatch::new()
            .require_version(event_path.clone(), version)
            .delete(entry)
            .update(event_path, increment("currentPlayers", -1));
        self.store.batch_write(batch).await?;

        event.current_players = event.current_players.saturating_sub(1);
        Ok(event)
    }

    /// Move an event from `Available` to `InProgress`.
    ///
    /// # Errors
    ///
    /// * `MPartyError::NotAuthorized` - `actor` is not the host
    /// * `MPartyError::WrongState` - event is not `Available`
    pub async fn start_tournament(&self, event_id: &str, actor: &str) -> MPartyResult<Event> {
        let event = self
            .retry_on_conflict("start", || self.try_start(event_id, actor))
            .await?;

        info!(
            "Event {event_id} started with {} players",
            event.current_players
        );
        self.bus.publish(DomainEvent::TournamentStarted {
            event_id: event_id.to_string(),
        });
        Ok(event)
    }

    async fn try_start(&self, event_id: &str, actor: &str) -> MPartyResult<Event> {
        let (mut event, version) = self.load_event(event_id).await?;
        ensure_host(&event, actor)?;
        ensure_transition(&event, EventStatus::InProgress)?;

        let event_path = paths::event(event_id);
        let mut fields = FieldUpdates::new();
        fields.insert(
            "status".to_string(),
            FieldUpdate::Set(Value::from(EventStatus::InProgress.as_str())),
        );
        let batch = WriteBatch::new()
            .require_version(event_path.clone(), version)
            .update(event_path, fields);
        self.store.batch_write(batch).await?;

        event.status = EventStatus::InProgress;
        Ok(event)
    }

    async fn pairing_roster(&self, event_id: &str, actor: &str) -> MPartyResult<Vec<Participant>> {
        let event = self.get_event(event_id).await?;
        ensure_host(&event, actor)?;
        ensure_status(&event, EventStatus::InProgress)?;

        let roster = self.roster(event_id).await?;
        if roster.len() < MIN_PAIRING_PLAYERS {
            return Err(MPartyError::InsufficientPlayers {
                needed: MIN_PAIRING_PLAYERS,
                current: roster.len(),
            });
        }
        Ok(roster)
    }

    /// Shuffle the roster of a running event into 1v1 pairings.
    ///
    /// Nothing is persisted; every call reshuffles.
    ///
    /// # Errors
    ///
    /// * `MPartyError::NotAuthorized` - `actor` is not the host
    /// * `MPartyError::WrongState` - event is not `InProgress`
    /// * `MPartyError::InsufficientPlayers` - fewer than two participants
    pub async fn generate_pairings(&self, event_id: &str, actor: &str) -> MPartyResult<Pairings> {
        let roster = self.pairing_roster(event_id, actor).await?;
        debug!("Pairing {} players for event {event_id}", roster.len());
        Ok(PairingGenerator::new().generate(&roster))
    }

    /// Like [`generate_pairings`](Self::generate_pairings) with a caller-supplied generator
    pub async fn generate_pairings_with<R: Rng + Send>(
        &self,
        event_id: &str,
        actor: &str,
        generator: &mut PairingGenerator<R>,
    ) -> MPartyResult<Pairings> {
        let roster = self.pairing_roster(event_id, actor).await?;
        Ok(generator.generate(&roster))
    }

    /// Close a running event and award XP to its roster.
    ///
    /// # Errors
    ///
    /// * `MPartyError::NotAuthorized` - `actor` is not the host
    /// * `MPartyError::WrongState` - event is not `InProgress`
    /// * `MPartyError::InvalidInput` - placements are duplicated or off-roster
    /// * `MPartyError::RemoteFailure` - batch rejected; nothing was written
    pub async fn finalize(
        &self,
        event_id: &str,
        actor: &str,
        placements: &Placements,
    ) -> MPartyResult<Settlement> {
        let settlement = self
            .retry_on_conflict("finalize", || self.try_finalize(event_id, actor, placements))
            .await?;

        info!(
            "Event {event_id} finished; {} wins, {} players awarded",
            placements.first,
            settlement.awards.len()
        );
        self.bus.publish(DomainEvent::TournamentFinished {
            event_id: event_id.to_string(),
        });
        Ok(settlement)
    }

    async fn try_finalize(
        &self,
        event_id: &str,
        actor: &str,
        placements: &Placements,
    ) -> MPartyResult<Settlement> {
        let (mut event, version) = self.load_event(event_id).await?;
        ensure_host(&event, actor)?;
        ensure_transition(&event, EventStatus::Finished)?;

        let roster = self.roster(event_id).await?;
        let plan = self.settlement.plan(&event, version, &roster, placements)?;
        self.store.batch_write(plan.batch).await?;

        event.status = EventStatus::Finished;
        Ok(Settlement {
            event,
            awards: plan.awards,
        })
    }
}

fn ensure_status(event: &Event, expected: EventStatus) -> MPartyResult<()> {
    if event.status != expected {
        return Err(MPartyError::WrongState {
            expected,
            actual: event.status,
        });
    }
    Ok(())
}

/// Status may only move one step forward
fn ensure_transition(event: &Event, target: EventStatus) -> MPartyResult<()> {
    if event.status.can_transition_to(target) {
        return Ok(());
    }
    Err(MPartyError::WrongState {
        expected: target.previous().unwrap_or(target),
        actual: event.status,
    })
}

fn ensure_host(event: &Event, actor: &str) -> MPartyResult<()> {
    if !event.is_host(actor) {
        return Err(MPartyError::NotAuthorized(format!(
            "only the host can manage event {}",
            event.id
        )));
    }
    Ok(())
}

fn increment(field: &str, delta: i64) -> FieldUpdates {
    let mut fields = FieldUpdates::new();
    fields.insert(field.to_string(), FieldUpdate::Increment(delta));
    fields
}
