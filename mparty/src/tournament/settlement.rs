//! Tournament settlement: placements, XP awards and the atomic write that
//! closes an event.

use crate::{
    errors::{MPartyError, MPartyResult},
    models::{Event, EventStatus, Participant, UserId},
    store::{FieldUpdate, FieldUpdates, Version, WriteBatch, paths},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

/// XP granted per placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct XpRewards {
    pub first: u32,
    pub second: u32,
    pub third: u32,
    pub participation: u32,
}

impl Default for XpRewards {
    fn default() -> Self {
        Self {
            first: 100,
            second: 75,
            third: 50,
            participation: 25,
        }
    }
}

impl XpRewards {
    pub fn for_placement(&self, placement: Option<Placement>) -> u32 {
        match placement {
            Some(Placement::First) => self.first,
            Some(Placement::Second) => self.second,
            Some(Placement::Third) => self.third,
            None => self.participation,
        }
    }
}

/// Podium position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placement {
    First,
    Second,
    Third,
}

/// Podium chosen by the host when closing an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placements {
    pub first: UserId,
    pub second: Option<UserId>,
    pub third: Option<UserId>,
}

impl Placements {
    pub fn new(first: impl Into<UserId>) -> Self {
        Self {
            first: first.into(),
            second: None,
            third: None,
        }
    }

    pub fn with_second(mut self, user_id: impl Into<UserId>) -> Self {
        self.second = Some(user_id.into());
        self
    }

    pub fn with_third(mut self, user_id: impl Into<UserId>) -> Self {
        self.third = Some(user_id.into());
        self
    }

    /// Podium position of `user_id`, if any
    pub fn placement_of(&self, user_id: &str) -> Option<Placement> {
        if self.first == user_id {
            Some(Placement::First)
        } else if self.second.as_deref() == Some(user_id) {
            Some(Placement::Second)
        } else if self.third.as_deref() == Some(user_id) {
            Some(Placement::Third)
        } else {
            None
        }
    }

    fn iter(&self) -> impl Iterator<Item = &UserId> {
        std::iter::once(&self.first)
            .chain(self.second.as_ref())
            .chain(self.third.as_ref())
    }

    /// Placed users must be distinct and all on the roster
    ///
    /// # Errors
    ///
    /// * `MPartyError::InvalidInput` - duplicate or unknown placement
    pub fn validate(&self, roster: &[Participant]) -> MPartyResult<()> {
        let on_roster: HashSet<&str> = roster.iter().map(|p| p.id.as_str()).collect();
        let mut seen = HashSet::new();

        for user_id in self.iter() {
            if !seen.insert(user_id.as_str()) {
                return Err(MPartyError::InvalidInput(format!(
                    "{user_id} is placed more than once"
                )));
            }
            if !on_roster.contains(user_id.as_str()) {
                return Err(MPartyError::InvalidInput(format!(
                    "{user_id} is not on the roster"
                )));
            }
        }

        Ok(())
    }
}

/// What one participant receives at settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Award {
    pub user_id: UserId,
    pub placement: Option<Placement>,
    pub xp: u32,
}

impl Award {
    pub fn is_win(&self) -> bool {
        self.placement == Some(Placement::First)
    }
}

/// Awards plus the batch that applies them
#[derive(Debug, Clone)]
pub struct SettlementPlan {
    pub awards: Vec<Award>,
    pub batch: WriteBatch,
}

/// Turns placements into a single atomic write
#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementEngine {
    rewards: XpRewards,
}

impl SettlementEngine {
    pub fn new(rewards: XpRewards) -> Self {
        Self { rewards }
    }

    pub fn rewards(&self) -> &XpRewards {
        &self.rewards
    }

    /// Award XP to the whole roster in one pass.
    ///
    /// The batch is guarded by `event_version` so a concurrent settlement or
    /// roster change causes a conflict instead of a double award. Only `xp`,
    /// `tournamentsWon` and the event `status` are written.
    ///
    /// # Errors
    ///
    /// * `MPartyError::WrongState` - event is not in progress
    /// * `MPartyError::InvalidInput` - placements fail [`Placements::validate`]
    pub fn plan(
        &self,
        event: &Event,
        event_version: Version,
        roster: &[Participant],
        placements: &Placements,
    ) -> MPartyResult<SettlementPlan> {
        if !event.status.can_transition_to(EventStatus::Finished) {
            return Err(MPartyError::WrongState {
                expected: EventStatus::InProgress,
                actual: event.status,
            });
        }
        placements.validate(roster)?;

        let event_path = paths::event(&event.id);
        let mut status = FieldUpdates::new();
        status.insert(
            "status".to_string(),
            FieldUpdate::Set(Value::from(EventStatus::Finished.as_str())),
        );

        let mut batch = WriteBatch::new()
            .require_version(event_path.clone(), event_version)
            .update(event_path, status);

        let mut awards = Vec::with_capacity(roster.len());
        for participant in roster {
            let placement = placements.placement_of(&participant.id);
            let award = Award {
                user_id: participant.id.clone(),
                placement,
                xp: self.rewards.for_placement(placement),
            };

            let mut fields = FieldUpdates::new();
            fields.insert("xp".to_string(), FieldUpdate::Increment(i64::from(award.xp)));
            if award.is_win() {
                fields.insert("tournamentsWon".to_string(), FieldUpdate::Increment(1));
            }
            batch = batch.update(paths::user(&award.user_id), fields);
            awards.push(award);
        }

        Ok(SettlementPlan { awards, batch })
    }
}
