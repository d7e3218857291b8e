//! Roster entries.

use super::{
    UserId,
    document::{DecodeResult, Fields, nullable},
    user::User,
};
use crate::store::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot of a user taken when they join an event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    /// Same as the user's ID
    pub id: UserId,
    pub display_name: String,
    pub profile_photo_url: Option<String>,
    pub level: u32,
    /// Global rank at join time (0 if never ranked)
    pub rank: u32,
}

impl Participant {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
            profile_photo_url: user.profile_photo_url.clone(),
            level: user.level(),
            rank: user.global_rank.unwrap_or(0),
        }
    }

    pub fn from_document(id: &str, doc: &Document) -> DecodeResult<Self> {
        let f = Fields::new(doc);
        Ok(Self {
            id: id.to_string(),
            display_name: f.required_str("displayName")?,
            profile_photo_url: f.optional_str("profilePhotoURL")?,
            level: f.count_or("level", 1)?,
            rank: f.count_or("rank", 0)?,
        })
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("displayName".into(), Value::from(self.display_name.clone()));
        doc.insert(
            "profilePhotoURL".into(),
            nullable(self.profile_photo_url.clone()),
        );
        doc.insert("level".into(), Value::from(self.level));
        doc.insert("rank".into(), Value::from(self.rank));
        doc
    }
}
