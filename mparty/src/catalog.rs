//! Event catalog: publishing, listing and banner management.

use crate::{
    config::MPartyConfig,
    errors::{MPartyError, MPartyResult},
    models::{Event, EventMode, EventStatus, User},
    notify::{DomainEvent, EventBus},
    prize::{PAID_EVENT_CAPACITY, PrizeDistribution, parse_entry_fee},
    store::{BlobStore, DocumentStore, FieldUpdate, FieldUpdates, Query, paths},
};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Smallest roster a free event may be created with
pub const MIN_EVENT_PLAYERS: u32 = 2;

/// Event creation form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub game_type: String,
    pub mode: EventMode,
    pub location: String,
    pub event_date: DateTime<Utc>,
    /// Ignored for paid events, which always seat [`PAID_EVENT_CAPACITY`]
    pub max_players: u32,
    /// Raw entry fee as typed; `Some` makes the event paid
    pub entry_fee: Option<String>,
}

/// Organizer dashboard totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostStats {
    pub events_created: usize,
    /// Sum of `currentPlayers` across the host's events
    pub total_participants: u64,
}

/// Event catalog
#[derive(Clone)]
pub struct EventCatalog {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    bus: EventBus,
    list_limit: usize,
}

impl EventCatalog {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        bus: EventBus,
        config: &MPartyConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            bus,
            list_limit: config.event_list_limit,
        }
    }

    /// Publish a new event hosted by `host`.
    ///
    /// # Errors
    ///
    /// * `MPartyError::NotAuthorized` - `host` is not an Organizer
    /// * `MPartyError::InvalidInput` - blank title, past date, fewer than two
    ///   seats or a malformed entry fee
    pub async fn create_event(&self, host: &User, new: NewEvent) -> MPartyResult<Event> {
        if !host.is_organizer() {
            return Err(MPartyError::NotAuthorized(
                "only organizers can create events".to_string(),
            ));
        }

        let title = new.title.trim();
        if title.is_empty() {
            return Err(MPartyError::InvalidInput("title must not be empty".to_string()));
        }
        if new.event_date < Utc::now() {
            return Err(MPartyError::InvalidInput(
                "event date must not be in the past".to_string(),
            ));
        }

        let (max_players, entry_fee) = match new.entry_fee.as_deref() {
            Some(raw) => (PAID_EVENT_CAPACITY, Some(parse_entry_fee(raw)?)),
            None if new.max_players < MIN_EVENT_PLAYERS => {
                return Err(MPartyError::InvalidInput(format!(
                    "an event needs at least {MIN_EVENT_PLAYERS} players"
                )));
            }
            None => (new.max_players, None),
        };

        let draft = Event {
            id: String::new(),
            title: title.to_string(),
            description: new.description.trim().to_string(),
            game_type: new.game_type.trim().to_string(),
            mode: new.mode,
            location: new.location.trim().to_string(),
            event_date: new.event_date,
            max_players,
            current_players: 0,
            status: EventStatus::Available,
            is_paid_event: entry_fee.is_some(),
            entry_fee,
            banner_url: None,
            host_id: host.id.clone(),
            host_name: host.display_name.clone(),
        };

        let doc = draft.to_document();
        let event_id = self.store.add_document(paths::EVENTS, doc.clone()).await?;
        let event = Event::from_document(&event_id, &doc)?;

        info!(
            "{} created event {event_id} ({} seats, paid: {})",
            host.id, event.max_players, event.is_paid_event
        );
        self.bus.publish(DomainEvent::EventCreated {
            event_id: event_id.clone(),
        });
        Ok(event)
    }

    /// Newest events first by date; unreadable documents are skipped
    pub async fn list_events(&self) -> MPartyResult<Vec<Event>> {
        let query = Query::collection(paths::EVENTS)
            .order_by("eventDate", true)
            .limit(self.list_limit);
        let docs = self.store.query(&query).await?;

        Ok(docs
            .iter()
            .filter_map(|doc| match Event::from_document(&doc.id, &doc.data) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!("Skipping unreadable event {}: {e}", doc.id);
                    None
                }
            })
            .collect())
    }

    /// Events created by `host_id` and the players they have drawn
    pub async fn host_stats(&self, host_id: &str) -> MPartyResult<HostStats> {
        let query = Query::collection(paths::EVENTS).filter_eq("hostId", host_id);
        let docs = self.store.query(&query).await?;

        let stats = docs
            .iter()
            .filter_map(|doc| match Event::from_document(&doc.id, &doc.data) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!("Skipping unreadable event {}: {e}", doc.id);
                    None
                }
            })
            .fold(HostStats::default(), |mut stats, event| {
                stats.events_created += 1;
                stats.total_participants += u64::from(event.current_players);
                stats
            });

        debug!(
            "Host {host_id}: {} events, {} participants",
            stats.events_created, stats.total_participants
        );
        Ok(stats)
    }

    /// Upload a banner image and attach it to the event
    ///
    /// # Returns
    ///
    /// * `MPartyResult<String>` - URL of the stored banner
    pub async fn upload_banner(
        &self,
        event_id: &str,
        actor: &str,
        bytes: Vec<u8>,
    ) -> MPartyResult<String> {
        let path = paths::event(event_id);
        let stored = self
            .store
            .get_document(&path)
            .await?
            .ok_or_else(|| MPartyError::NotFound(format!("event {event_id}")))?;
        let event = Event::from_document(&stored.id, &stored.data)?;
        if !event.is_host(actor) {
            return Err(MPartyError::NotAuthorized(format!(
                "only the host can change the banner of event {event_id}"
            )));
        }

        let url = self
            .blobs
            .upload(&format!("event_banners/{event_id}.jpg"), bytes)
            .await?;

        let mut fields = FieldUpdates::new();
        fields.insert(
            "eventBannerURL".to_string(),
            FieldUpdate::Set(Value::from(url.clone())),
        );
        self.store.update_fields(&path, fields).await?;

        self.bus.publish(DomainEvent::EventUpdated {
            event_id: event_id.to_string(),
        });
        Ok(url)
    }

    /// Prize split shown on a paid event
    pub fn prize_preview(event: &Event) -> Option<PrizeDistribution> {
        event.prize_distribution()
    }

    /// Prize split for a fee still being typed into the creation form
    pub fn preview_fee(raw: &str) -> MPartyResult<PrizeDistribution> {
        parse_entry_fee(raw).map(PrizeDistribution::new)
    }
}
