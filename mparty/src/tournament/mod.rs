//! Tournament module covering the life of an event once it is published.
//!
//! This module provides:
//! - Roster management (join / cancel) with optimistic concurrency
//! - Host-only start and settlement
//! - Random 1v1 pairing with byes for odd rosters
//! - XP awards by placement
//!
//! ## Example
//!
//! ```no_run
//! use mparty::config::MPartyConfig;
//! use mparty::notify::EventBus;
//! use mparty::store::InMemoryStore;
//! use mparty::tournament::{EventLifecycleManager, Placements};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(InMemoryStore::new());
//!     let lifecycle =
//!         EventLifecycleManager::new(store, EventBus::default(), &MPartyConfig::default());
//!
//!     lifecycle.start_tournament("event-1", "host-1").await?;
//!     for pairing in lifecycle.generate_pairings("event-1", "host-1").await? {
//!         println!("{pairing}");
//!     }
//!
//!     let placements = Placements::new("p1").with_second("p2").with_third("p3");
//!     lifecycle.finalize("event-1", "host-1", &placements).await?;
//!     Ok(())
//! }
//! ```

pub mod lifecycle;
pub mod pairing;
pub mod settlement;

pub use lifecycle::{EventDetail, EventLifecycleManager, MIN_PAIRING_PLAYERS, Settlement};
pub use pairing::{Pairing, PairingGenerator, Pairings};
pub use settlement::{
    Award, Placement, Placements, SettlementEngine, SettlementPlan, XpRewards,
};
