//! Account module providing registration, sign-in and profile management.
//!
//! Credentials live behind the [`IdentityProvider`] seam; profiles are
//! `users/{uid}` documents in the [`DocumentStore`](crate::store::DocumentStore).
//! The bundled [`InMemoryIdentityProvider`] hashes passwords with Argon2id
//! plus a server-side pepper.
//!
//! ## Example
//!
//! ```no_run
//! use mparty::account::{AccountManager, InMemoryIdentityProvider, Registration};
//! use mparty::config::MPartyConfig;
//! use mparty::models::Role;
//! use mparty::notify::EventBus;
//! use mparty::store::{InMemoryBlobStore, InMemoryStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let accounts = AccountManager::new(
//!         Arc::new(InMemoryStore::new()),
//!         Arc::new(InMemoryBlobStore::new()),
//!         Arc::new(InMemoryIdentityProvider::new("pepper")),
//!         EventBus::default(),
//!         &MPartyConfig::default(),
//!     );
//!
//!     let user = accounts
//!         .register(Registration {
//!             email: "ana@example.com".to_string(),
//!             password: "secret1".to_string(),
//!             display_name: "Ana".to_string(),
//!             country: Some("Chile".to_string()),
//!             role: Role::Player,
//!         })
//!         .await?;
//!     println!("Registered user: {}", user.display_name);
//!     Ok(())
//! }
//! ```

pub mod identity;
pub mod manager;

pub use identity::{IdentityError, IdentityProvider, IdentityResult, InMemoryIdentityProvider};
pub use manager::{AccountManager, ProfileUpdate, Registration};
