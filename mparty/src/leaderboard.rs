//! Global and national rankings by XP.

use crate::{
    config::MPartyConfig,
    errors::MPartyResult,
    models::{Role, User},
    notify::{DomainEvent, EventBus},
    ranking::PlayerStats,
    store::{DocumentStore, FieldUpdate, FieldUpdates, Query, WriteBatch, paths},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashSet, sync::Arc};

/// Current and legacy keys holding a user's country
const COUNTRY_KEYS: [&str; 2] = ["country", "pais"];

/// Which players a ranking covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RankingFilter {
    Global,
    National(String),
}

/// One row of a ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPlayer {
    /// 1-based position
    pub position: u32,
    pub user: User,
    pub stats: PlayerStats,
}

/// Ranking queries
#[derive(Clone)]
pub struct RankingBoard {
    store: Arc<dyn DocumentStore>,
    bus: EventBus,
    limit: usize,
}

impl RankingBoard {
    pub fn new(store: Arc<dyn DocumentStore>, bus: EventBus, config: &MPartyConfig) -> Self {
        Self {
            store,
            bus,
            limit: config.ranking_limit,
        }
    }

    /// One query per stored spelling of the player role, and per country key
    /// for national rankings
    fn ranking_queries(&self, filter: &RankingFilter) -> Vec<Query> {
        let mut queries = Vec::new();
        for role in Role::Player.spellings() {
            let base = Query::collection(paths::USERS).filter_eq("role", *role);
            match filter {
                RankingFilter::Global => queries.push(base),
                RankingFilter::National(country) => {
                    for key in COUNTRY_KEYS {
                        queries.push(base.clone().filter_eq(key, country.as_str()));
                    }
                }
            }
        }

        queries
            .into_iter()
            .map(|query| query.order_by("xp", true).limit(self.limit))
            .collect()
    }

    /// Top players by XP, highest first
    pub async fn fetch_rankings(&self, filter: &RankingFilter) -> MPartyResult<Vec<RankedPlayer>> {
        let mut seen = HashSet::new();
        let mut users = Vec::new();
        for query in self.ranking_queries(filter) {
            for doc in self.store.query(&query).await? {
                if !seen.insert(doc.id.clone()) {
                    continue;
                }
                match User::from_document(&doc.id, &doc.data) {
                    Ok(user) => users.push(user),
                    Err(e) => warn!("Skipping unreadable user {}: {e}", doc.id),
                }
            }
        }
        users.sort_by(|a, b| b.xp.cmp(&a.xp));
        users.truncate(self.limit);

        Ok(users
            .into_iter()
            .zip(1u32..)
            .map(|(user, position)| RankedPlayer {
                position,
                stats: PlayerStats::from_user(&user),
                user,
            })
            .collect())
    }

    /// Write the global position into each ranked player's `globalRank`.
    ///
    /// Only players whose cached rank differs are written, all in one batch.
    ///
    /// # Returns
    ///
    /// * `MPartyResult<usize>` - Number of users updated
    pub async fn refresh_global_ranks(&self) -> MPartyResult<usize> {
        let rankings = self.fetch_rankings(&RankingFilter::Global).await?;

        let mut batch = WriteBatch::new();
        for row in rankings
            .iter()
            .filter(|row| row.user.global_rank != Some(row.position))
        {
            let mut fields = FieldUpdates::new();
            fields.insert(
                "globalRank".to_string(),
                FieldUpdate::Set(Value::from(row.position)),
            );
            batch = batch.update(paths::user(&row.user.id), fields);
        }

        let updated = batch.len();
        if updated > 0 {
            self.store.batch_write(batch).await?;
            info!("Refreshed global rank of {updated} players");
        }

        self.bus.publish(DomainEvent::RankingsRefreshed { updated });
        Ok(updated)
    }
}
