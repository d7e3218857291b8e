//! Event (tournament) records.

use super::{
    UserId,
    document::{DecodeError, DecodeResult, Fields, nullable, timestamp},
};
use crate::{prize::PrizeDistribution, store::Document};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Event ID type
pub type EventId = String;

/// Event status; moves only forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventStatus {
    /// Accepting registrations
    Available,
    /// Tournament running
    InProgress,
    /// Tournament settled
    Finished,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Available => "Available",
            EventStatus::InProgress => "InProgress",
            EventStatus::Finished => "Finished",
        }
    }

    pub fn parse(value: &str) -> DecodeResult<Self> {
        match value {
            "Available" | "Disponible" => Ok(EventStatus::Available),
            "InProgress" | "En Curso" => Ok(EventStatus::InProgress),
            "Finished" | "Finalizado" => Ok(EventStatus::Finished),
            other => Err(DecodeError::UnknownVariant {
                field: "status",
                value: other.to_string(),
            }),
        }
    }

    /// The only status reachable from this one
    pub fn next(&self) -> Option<EventStatus> {
        match self {
            EventStatus::Available => Some(EventStatus::InProgress),
            EventStatus::InProgress => Some(EventStatus::Finished),
            EventStatus::Finished => None,
        }
    }

    /// The only status this one is reachable from
    pub fn previous(&self) -> Option<EventStatus> {
        match self {
            EventStatus::Available => None,
            EventStatus::InProgress => Some(EventStatus::Available),
            EventStatus::Finished => Some(EventStatus::InProgress),
        }
    }

    pub fn can_transition_to(&self, target: EventStatus) -> bool {
        self.next() == Some(target)
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Competitive or casual play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventMode {
    Friendly,
    Competitive,
}

impl EventMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventMode::Friendly => "Friendly",
            EventMode::Competitive => "Competitive",
        }
    }

    pub fn parse(value: &str) -> DecodeResult<Self> {
        match value {
            "Friendly" | "Amistoso" => Ok(EventMode::Friendly),
            "Competitive" | "Competitivo" => Ok(EventMode::Competitive),
            other => Err(DecodeError::UnknownVariant {
                field: "mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Event model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub description: String,
    pub game_type: String,
    pub mode: EventMode,
    pub location: String,
    pub event_date: DateTime<Utc>,
    pub max_players: u32,
    /// Cached roster size
    pub current_players: u32,
    pub status: EventStatus,
    pub is_paid_event: bool,
    pub entry_fee: Option<f64>,
    pub banner_url: Option<String>,
    pub host_id: UserId,
    /// Host display name at creation time
    pub host_name: String,
}

impl Event {
    pub fn is_host(&self, user_id: &str) -> bool {
        self.host_id == user_id
    }

    /// Prize split for paid events with a recorded fee
    pub fn prize_distribution(&self) -> Option<PrizeDistribution> {
        if !self.is_paid_event {
            return None;
        }
        self.entry_fee.map(PrizeDistribution::new)
    }

    pub fn from_document(id: &str, doc: &Document) -> DecodeResult<Self> {
        let f = Fields::new(doc);
        Ok(Self {
            id: id.to_string(),
            title: f.required_str("title")?,
            description: f.optional_str("description")?.unwrap_or_default(),
            game_type: f.optional_str("gameType")?.unwrap_or_default(),
            mode: EventMode::parse(&f.required_str("mode")?)?,
            location: f.optional_str("location")?.unwrap_or_default(),
            event_date: f.required_datetime("eventDate")?,
            max_players: f.required_count("maxPlayers")?,
            current_players: f.count_or("currentPlayers", 0)?,
            status: EventStatus::parse(&f.required_str("status")?)?,
            is_paid_event: f.bool_or("isPaidEvent", false)?,
            entry_fee: f.optional_f64("entryFee")?,
            banner_url: f.optional_str("eventBannerURL")?,
            host_id: f.required_str("hostId")?,
            host_name: f.optional_str("hostName")?.unwrap_or_default(),
        })
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("title".into(), Value::from(self.title.clone()));
        doc.insert("description".into(), Value::from(self.description.clone()));
        doc.insert("gameType".into(), Value::from(self.game_type.clone()));
        doc.insert("mode".into(), Value::from(self.mode.as_str()));
        doc.insert("location".into(), Value::from(self.location.clone()));
        doc.insert("eventDate".into(), timestamp(&self.event_date));
        doc.insert("maxPlayers".into(), Value::from(self.max_players));
        doc.insert("currentPlayers".into(), Value::from(self.current_players));
        doc.insert("status".into(), Value::from(self.status.as_str()));
        doc.insert("isPaidEvent".into(), Value::from(self.is_paid_event));
        doc.insert("entryFee".into(), nullable(self.entry_fee));
        doc.insert("eventBannerURL".into(), nullable(self.banner_url.clone()));
        doc.insert("hostId".into(), Value::from(self.host_id.clone()));
        doc.insert("hostName".into(), Value::from(self.host_name.clone()));
        doc
    }
}
