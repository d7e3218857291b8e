//! Application error types.

use crate::{
    account::IdentityError,
    models::{DecodeError, EventStatus},
    store::StoreError,
};
use thiserror::Error;

/// Errors surfaced by every service operation
#[derive(Debug, Error)]
pub enum MPartyError {
    /// Document or user missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not valid for the event's current status
    #[error("Event not in correct state: expected {expected}, got {actual}")]
    WrongState {
        expected: EventStatus,
        actual: EventStatus,
    },

    /// Roster at capacity
    #[error("Event is full: capacity {capacity}")]
    AlreadyFull { capacity: u32 },

    /// User already on the roster
    #[error("Player already joined")]
    AlreadyJoined,

    /// Pairing needs at least two players
    #[error("Insufficient players: need {needed}, have {current}")]
    InsufficientPlayers { needed: usize, current: usize },

    /// Malformed numeric or string input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Caller lacks the role or ownership required
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Optimistic retries exhausted
    #[error("Too much contention: gave up after {attempts} attempts")]
    Contention { attempts: u32 },

    /// Underlying store call failed
    #[error("Remote failure: {0}")]
    RemoteFailure(#[source] StoreError),

    /// Stored document could not be decoded
    #[error("Corrupt document: {0}")]
    Decode(#[from] DecodeError),

    /// Auth provider rejected the call
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),
}

impl MPartyError {
    /// Get a user-facing message that doesn't leak internal details
    pub fn client_message(&self) -> String {
        match self {
            MPartyError::NotFound(_) => "We couldn't find what you were looking for.".to_string(),
            MPartyError::WrongState { actual, .. } => match actual {
                EventStatus::Available => "The tournament hasn't started yet.".to_string(),
                EventStatus::InProgress => "The tournament is already in progress.".to_string(),
                EventStatus::Finished => "The tournament has already finished.".to_string(),
            },
            MPartyError::AlreadyFull { .. } => "The tournament is already full.".to_string(),
            MPartyError::AlreadyJoined => "You have already joined this tournament.".to_string(),
            MPartyError::InsufficientPlayers { needed, .. } => {
                format!("At least {needed} players are needed.")
            }
            MPartyError::InvalidInput(reason) => format!("Please check your input: {reason}."),
            MPartyError::NotAuthorized(_) => "You are not allowed to do that.".to_string(),
            MPartyError::Contention { .. } => {
                "The tournament is busy right now, please try again.".to_string()
            }
            // Sanitize backend errors - don't expose store details
            MPartyError::RemoteFailure(_) | MPartyError::Decode(_) => {
                "Something went wrong. Check your connection and try again.".to_string()
            }
            MPartyError::Identity(err) => err.client_message(),
        }
    }
}

impl From<StoreError> for MPartyError {
    fn from(err: StoreError) -> Self {
        match err {
            // A batch touching a missing document means the user or event is gone
            StoreError::NotFound(path) => MPartyError::NotFound(path.to_string()),
            other => MPartyError::RemoteFailure(other),
        }
    }
}

/// Result type for service operations
pub type MPartyResult<T> = Result<T, MPartyError>;
