//! Blob storage seam for profile photos and event banners.

use super::{StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Trait for blob storage operations
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `path` and return a download URL
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> StoreResult<String>;
}

/// In-memory blob store handing out `memory://` URLs
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a previously uploaded blob
    pub async fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs.read().await.get(path).cloned()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> StoreResult<String> {
        if bytes.is_empty() {
            return Err(StoreError::Unavailable(format!("refusing empty upload to {path}")));
        }
        self.blobs.write().await.insert(path.to_string(), bytes);
        Ok(format!("memory://{path}"))
    }
}
