//! Identity provider seam and an in-process implementation.

use crate::models::UserId;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Identity errors
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Email already registered
    #[error("Email already exists")]
    EmailTaken,

    /// Provider could not be reached
    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

impl IdentityError {
    /// Get a client-safe error message that doesn't leak provider details
    pub fn client_message(&self) -> String {
        match self {
            IdentityError::Unavailable(_) | IdentityError::HashingFailed => {
                "Authentication is unavailable right now".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for identity operations
pub type IdentityResult<T> = Result<T, IdentityError>;

/// External authentication collaborator
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create credentials and return the new subject id
    async fn create_account(&self, email: &str, password: &str) -> IdentityResult<UserId>;

    /// Check credentials and return the subject id
    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<UserId>;
}

#[derive(Debug, Clone)]
struct Credential {
    user_id: UserId,
    password_hash: String,
}

/// Argon2id-backed provider that keeps credentials in memory
#[derive(Debug)]
pub struct InMemoryIdentityProvider {
    accounts: RwLock<HashMap<String, Credential>>,
    pepper: String,
}

impl InMemoryIdentityProvider {
    /// Create a provider
    ///
    /// # Arguments
    ///
    /// * `pepper` - Server-side pepper appended to every password before hashing
    pub fn new(pepper: impl Into<String>) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            pepper: pepper.into(),
        }
    }

    /// Hash password using Argon2id with pepper
    fn hash_password(&self, password: &str) -> IdentityResult<String> {
        let peppered = format!("{}{}", password, self.pepper);
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        Ok(argon2
            .hash_password(peppered.as_bytes(), &salt)
            .map_err(|_| IdentityError::HashingFailed)?
            .to_string())
    }

    /// Verify password against hash
    fn verify_password(&self, password: &str, hash: &str) -> IdentityResult<()> {
        let peppered = format!("{}{}", password, self.pepper);
        let parsed_hash =
            PasswordHash::new(hash).map_err(|_| IdentityError::InvalidCredentials)?;

        Argon2::default()
            .verify_password(peppered.as_bytes(), &parsed_hash)
            .map_err(|_| IdentityError::InvalidCredentials)
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new(String::new())
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn create_account(&self, email: &str, password: &str) -> IdentityResult<UserId> {
        let key = normalize_email(email);
        let password_hash = self.hash_password(password)?;

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&key) {
            return Err(IdentityError::EmailTaken);
        }

        let user_id = Uuid::new_v4().to_string();
        accounts.insert(
            key,
            Credential {
                user_id: user_id.clone(),
                password_hash,
            },
        );
        Ok(user_id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> IdentityResult<UserId> {
        let credential = self
            .accounts
            .read()
            .await
            .get(&normalize_email(email))
            .cloned()
            .ok_or(IdentityError::InvalidCredentials)?;

        self.verify_password(password, &credential.password_hash)?;
        Ok(credential.user_id)
    }
}
