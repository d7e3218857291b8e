//! User records.

use super::document::{DecodeError, DecodeResult, Fields, nullable};
use crate::{ranking, store::Document};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// User ID type (the auth provider's subject id)
pub type UserId = String;

/// Account role chosen at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Player,
    Organizer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Player => "Player",
            Role::Organizer => "Organizer",
        }
    }

    /// Every stored spelling that decodes to this role, canonical first
    pub fn spellings(&self) -> &'static [&'static str] {
        match self {
            Role::Player => &["Player", "player", "Jugador"],
            Role::Organizer => &["Organizer", "organizer", "host", "Organizador"],
        }
    }

    /// Parse a stored role, accepting the legacy localized spellings
    pub fn parse(value: &str) -> DecodeResult<Self> {
        [Role::Player, Role::Organizer]
            .into_iter()
            .find(|role| role.spellings().iter().any(|s| *s == value))
            .ok_or_else(|| DecodeError::UnknownVariant {
                field: "role",
                value: value.to_string(),
            })
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Organizer tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HostCategory {
    #[default]
    Bronze,
    Silver,
    Gold,
}

impl HostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostCategory::Bronze => "Bronze",
            HostCategory::Silver => "Silver",
            HostCategory::Gold => "Gold",
        }
    }

    pub fn parse(value: &str) -> DecodeResult<Self> {
        match value {
            "Bronze" | "Bronce" => Ok(HostCategory::Bronze),
            "Silver" | "Plata" => Ok(HostCategory::Silver),
            "Gold" | "Oro" => Ok(HostCategory::Gold),
            other => Err(DecodeError::UnknownVariant {
                field: "hostCategory",
                value: other.to_string(),
            }),
        }
    }
}

/// User model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub country: Option<String>,
    pub profile_photo_url: Option<String>,
    pub xp: u32,
    pub host_category: Option<HostCategory>,
    pub is_premium_subscriber: bool,
    pub tournaments_played: u32,
    pub tournaments_won: u32,
    /// Position in the last computed global ranking
    pub global_rank: Option<u32>,
}

impl User {
    /// Fresh account as written at registration
    pub fn new(
        id: impl Into<UserId>,
        email: impl Into<String>,
        display_name: impl Into<String>,
        role: Role,
        country: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: display_name.into(),
            role,
            country,
            profile_photo_url: None,
            xp: 0,
            host_category: (role == Role::Organizer).then_some(HostCategory::Bronze),
            is_premium_subscriber: false,
            tournaments_played: 0,
            tournaments_won: 0,
            global_rank: None,
        }
    }

    pub fn is_organizer(&self) -> bool {
        self.role == Role::Organizer
    }

    /// Level derived from XP; the stored `level` field is only a cache
    pub fn level(&self) -> u32 {
        ranking::level(self.xp)
    }

    pub fn from_document(id: &str, doc: &Document) -> DecodeResult<Self> {
        let f = Fields::new(doc);
        let role = Role::parse(&f.required_str("role")?)?;
        let host_category = f
            .optional_str("hostCategory")?
            .map(|c| HostCategory::parse(&c))
            .transpose()?;

        Ok(Self {
            id: id.to_string(),
            email: f.optional_str("email")?.unwrap_or_default(),
            display_name: f.required_str("displayName")?,
            role,
            country: f
                .optional_str_any(&["country", "pais"])?
                .filter(|c| !c.is_empty()),
            profile_photo_url: f.optional_str("profilePhotoURL")?,
            xp: f.count_or("xp", 0)?,
            host_category,
            is_premium_subscriber: f.bool_or("isPremiumSubscriber", false)?,
            tournaments_played: f.count_or("tournamentsPlayed", 0)?,
            tournaments_won: f.count_or("tournamentsWon", 0)?,
            global_rank: f.optional_count("globalRank")?,
        })
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert("email".into(), Value::from(self.email.clone()));
        doc.insert("displayName".into(), Value::from(self.display_name.clone()));
        doc.insert("role".into(), Value::from(self.role.as_str()));
        doc.insert("country".into(), nullable(self.country.clone()));
        doc.insert("profilePhotoURL".into(), nullable(self.profile_photo_url.clone()));
        doc.insert("xp".into(), Value::from(self.xp));
        doc.insert("level".into(), Value::from(self.level()));
        doc.insert(
            "hostCategory".into(),
            nullable(self.host_category.map(|c| c.as_str())),
        );
        doc.insert(
            "isPremiumSubscriber".into(),
            Value::from(self.is_premium_subscriber),
        );
        doc.insert("tournamentsPlayed".into(), Value::from(self.tournaments_played));
        doc.insert("tournamentsWon".into(), Value::from(self.tournaments_won));
        doc.insert("globalRank".into(), nullable(self.global_rank));
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_organizer_starts_bronze() {
        let host = User::new("h1", "h@x.io", "Host", Role::Organizer, None);
        assert_eq!(host.host_category, Some(HostCategory::Bronze));
        assert_eq!(host.level(), 1);

        let player = User::new("p1", "p@x.io", "Player", Role::Player, Some("MX".into()));
        assert_eq!(player.host_category, None);
    }

    #[test]
    fn test_document_roundtrip_writes_derived_level() {
        let mut user = User::new("u1", "a@b.c", "Ana", Role::Player, Some("MX".into()));
        user.xp = 150;
        user.tournaments_played = 4;
        user.tournaments_won = 1;
        user.global_rank = Some(12);

        let doc = user.to_document();
        assert_eq!(doc["level"], json!(2));
        assert_eq!(User::from_document("u1", &doc).unwrap(), user);
    }

    #[test]
    fn test_decodes_legacy_document() {
        let doc = json!({
            "email": "luis@mail.com",
            "displayName": "Luis",
            "role": "Jugador",
            "pais": "El Salvador",
            "xp": 40,
            "level": 1,
            "hostCategory": null,
            "isPremiumSubscriber": false,
            "profilePhotoURL": null
        });
        let user = User::from_document("abc", doc.as_object().unwrap()).unwrap();

        assert_eq!(user.role, Role::Player);
        assert_eq!(user.country.as_deref(), Some("El Salvador"));
        assert_eq!(user.tournaments_played, 0);
        assert_eq!(user.global_rank, None);
    }

    #[test]
    fn test_unknown_role_rejected() {
        let doc = json!({"displayName": "X", "role": "Admin"});
        let err = User::from_document("x", doc.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownVariant { field: "role", .. }));
    }

    #[test]
    fn test_every_spelling_parses_back() {
        for role in [Role::Player, Role::Organizer] {
            assert_eq!(role.spellings()[0], role.as_str());
            for spelling in role.spellings() {
                assert_eq!(Role::parse(spelling).unwrap(), role);
            }
        }
    }

    #[test]
    fn test_missing_display_name_rejected() {
        let doc = json!({"role": "Player"});
        let err = User::from_document("x", doc.as_object().unwrap()).unwrap_err();
        assert_eq!(err, DecodeError::MissingField("displayName"));
    }
}
