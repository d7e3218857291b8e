//! Account manager implementation.

use super::identity::IdentityProvider;
use crate::{
    config::MPartyConfig,
    errors::{MPartyError, MPartyResult},
    models::{Role, User},
    notify::{DomainEvent, EventBus},
    store::{BlobStore, DocumentStore, FieldUpdate, FieldUpdates, paths},
};
use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;

/// Registration form
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub country: Option<String>,
    pub role: Role,
}

/// Profile edit; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    /// An empty string clears the country
    pub country: Option<String>,
    /// JPEG bytes of a new profile photo
    pub photo: Option<Vec<u8>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.country.is_none() && self.photo.is_none()
    }
}

/// Account manager
#[derive(Clone)]
pub struct AccountManager {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    identity: Arc<dyn IdentityProvider>,
    bus: EventBus,
    min_password_len: usize,
}

impl AccountManager {
    /// Create a new account manager
    ///
    /// # Arguments
    ///
    /// * `store` - Document store holding `users/{uid}`
    /// * `blobs` - Blob store for profile photos
    /// * `identity` - Authentication collaborator
    /// * `bus` - Bus that receives change notifications
    /// * `config` - Password policy
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        identity: Arc<dyn IdentityProvider>,
        bus: EventBus,
        config: &MPartyConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            identity,
            bus,
            min_password_len: config.min_password_len,
        }
    }

    /// Register a new user
    ///
    /// # Errors
    ///
    /// * `MPartyError::InvalidInput` - Malformed email, blank name or short password
    /// * `MPartyError::Identity` - Email already registered
    pub async fn register(&self, request: Registration) -> MPartyResult<User> {
        let email = request.email.trim();
        if !email.contains('@') {
            return Err(MPartyError::InvalidInput(format!(
                "'{email}' is not an email address"
            )));
        }

        let display_name = request.display_name.trim();
        if display_name.is_empty() {
            return Err(MPartyError::InvalidInput(
                "display name must not be empty".to_string(),
            ));
        }

        if request.password.chars().count() < self.min_password_len {
            return Err(MPartyError::InvalidInput(format!(
                "password must be at least {} characters",
                self.min_password_len
            )));
        }

        let user_id = self
            .identity
            .create_account(email, &request.password)
            .await?;

        let country = request
            .country
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let user = User::new(user_id, email, display_name, request.role, country);

        if let Err(e) = self
            .store
            .set_document(&paths::user(&user.id), user.to_document())
            .await
        {
            warn!("Identity {} created but profile write failed: {e}", user.id);
            return Err(e.into());
        }

        info!("Registered {} as {}", user.id, user.role);
        self.bus.publish(DomainEvent::UserRegistered {
            user_id: user.id.clone(),
        });
        Ok(user)
    }

    /// Sign in and load the user's profile
    ///
    /// # Errors
    ///
    /// * `MPartyError::Identity` - Bad credentials
    /// * `MPartyError::NotFound` - Credentials valid but no profile document
    pub async fn sign_in(&self, email: &str, password: &str) -> MPartyResult<User> {
        let user_id = self.identity.sign_in(email, password).await?;
        self.fetch_user(&user_id).await
    }

    pub async fn fetch_user(&self, user_id: &str) -> MPartyResult<User> {
        let stored = self
            .store
            .get_document(&paths::user(user_id))
            .await?
            .ok_or_else(|| MPartyError::NotFound(format!("user {user_id}")))?;

        Ok(User::from_document(&stored.id, &stored.data)?)
    }

    /// Apply a profile edit.
    ///
    /// A new photo is uploaded to `profile_images/{uid}.jpg` before anything
    /// else is written. Only fields that actually change are sent; an edit
    /// that changes nothing performs no write.
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> MPartyResult<User> {
        let mut user = self.fetch_user(user_id).await?;
        let mut fields = FieldUpdates::new();

        if let Some(name) = update.display_name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(MPartyError::InvalidInput(
                    "display name must not be empty".to_string(),
                ));
            }
            if name != user.display_name {
                fields.insert("displayName".into(), FieldUpdate::Set(Value::from(name.clone())));
                user.display_name = name;
            }
        }

        if let Some(country) = update.country {
            let country = Some(country.trim().to_string()).filter(|c| !c.is_empty());
            if country != user.country {
                let value = country.clone().map_or(Value::Null, Value::from);
                fields.insert("country".into(), FieldUpdate::Set(value));
                user.country = country;
            }
        }

        if let Some(photo) = update.photo {
            let url = self
                .blobs
                .upload(&format!("profile_images/{user_id}.jpg"), photo)
                .await?;
            if user.profile_photo_url.as_deref() != Some(url.as_str()) {
                fields.insert(
                    "profilePhotoURL".into(),
                    FieldUpdate::Set(Value::from(url.clone())),
                );
                user.profile_photo_url = Some(url);
            }
        }

        if fields.is_empty() {
            return Ok(user);
        }

        self.store
            .update_fields(&paths::user(user_id), fields)
            .await?;

        info!("Updated profile of {user_id}");
        self.bus.publish(DomainEvent::ProfileUpdated {
            user_id: user_id.to_string(),
        });
        Ok(user)
    }
}
