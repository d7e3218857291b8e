//! # MParty
//!
//! Core of a casual tournament organizer: players register, organizers
//! publish events, players join, the host starts the tournament, pairs the
//! roster at random and records the podium, and everyone climbs a ranking by
//! XP.
//!
//! ## Architecture
//!
//! Services hold an `Arc<dyn DocumentStore>` and publish a
//! [`DomainEvent`](notify::DomainEvent) after every successful mutation.
//! Events move strictly forward through three states:
//!
//! - **Available**: open for joining and leaving
//! - **InProgress**: roster frozen; pairings can be drawn
//! - **Finished**: placements recorded, XP awarded
//!
//! Roster changes and settlement are single atomic batches guarded by the
//! event document's version, retried on conflict.
//!
//! ## Core Modules
//!
//! - [`tournament`]: lifecycle, pairing and settlement
//! - [`store`]: document store seam with in-memory and Postgres backends
//! - [`account`], [`catalog`], [`leaderboard`]: user-facing services
//! - [`ranking`], [`prize`]: pure calculators
//!
//! ## Example
//!
//! ```
//! use mparty::prize::PrizeDistribution;
//! use mparty::ranking;
//!
//! assert_eq!(ranking::level(250), 3);
//! assert_eq!(PrizeDistribution::new(10.0).first_prize(), 24.0);
//! ```

/// Registration, sign-in and profile edits.
pub mod account;

/// Event publishing and listing.
pub mod catalog;

pub mod config;
pub mod errors;

/// Player rankings by XP.
pub mod leaderboard;

/// Domain records and their document encoding.
pub mod models;

pub mod notify;
pub mod prize;
pub mod ranking;

/// Persistence seams.
pub mod store;

/// Event lifecycle, pairing and settlement.
pub mod tournament;

pub use account::{AccountManager, ProfileUpdate, Registration};
pub use catalog::{EventCatalog, HostStats, NewEvent};
pub use config::MPartyConfig;
pub use errors::{MPartyError, MPartyResult};
pub use leaderboard::{RankedPlayer, RankingBoard, RankingFilter};
pub use models::{Event, EventMode, EventStatus, Participant, Role, User};
pub use notify::{DomainEvent, EventBus};
pub use prize::{PrizeDistribution, parse_entry_fee};
pub use ranking::PlayerStats;
pub use tournament::{EventLifecycleManager, Pairing, PairingGenerator, Placements};
