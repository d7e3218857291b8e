//! Domain records and their document codecs.
//!
//! Every record decodes fallibly from a stored [`Document`](crate::store::Document)
//! and encodes back with camelCase keys. Decoding also accepts the legacy
//! localized enum spellings written by earlier clients.

pub mod document;
pub mod event;
pub mod participant;
pub mod user;

pub use document::{DecodeError, DecodeResult};
pub use event::{Event, EventId, EventMode, EventStatus};
pub use participant::Participant;
pub use user::{HostCategory, Role, User, UserId};
