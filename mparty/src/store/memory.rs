//! In-process document store.
//!
//! Keeps every document in a single ordered map behind a `tokio` lock, so a
//! batch is trivially atomic. Supports failure injection for exercising error
//! paths of the services.

use super::{
    DocPath, Document, DocumentStore, FieldUpdates, Query, StoreError, StoreResult,
    StoredDocument, Version, WriteBatch, WriteOp, apply_updates, compare_values,
};
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    data: Document,
    version: Version,
}

/// In-memory implementation of [`DocumentStore`]
#[derive(Debug, Default)]
pub struct InMemoryStore {
    docs: RwLock<BTreeMap<DocPath, Entry>>,
    offline: AtomicBool,
    failing_prefixes: Mutex<Vec<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make writes to any path starting with `prefix` fail
    pub fn fail_writes_to(&self, prefix: impl Into<String>) {
        if let Ok(mut prefixes) = self.failing_prefixes.lock() {
            prefixes.push(prefix.into());
        }
    }

    /// Remove all injected write failures
    pub fn clear_failures(&self) {
        if let Ok(mut prefixes) = self.failing_prefixes.lock() {
            prefixes.clear();
        }
        self.set_offline(false);
    }

    /// Number of documents directly inside `collection`
    pub async fn count(&self, collection: &str) -> usize {
        self.docs
            .read()
            .await
            .keys()
            .filter(|path| path.collection == collection)
            .count()
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }

    fn check_writable(&self, path: &DocPath) -> StoreResult<()> {
        self.check_online()?;
        let full = path.to_string();
        let blocked = self
            .failing_prefixes
            .lock()
            .map(|prefixes| prefixes.iter().any(|p| full.starts_with(p.as_str())))
            .unwrap_or(false);
        if blocked {
            return Err(StoreError::Unavailable(format!("write to {full} rejected")));
        }
        Ok(())
    }
}

fn next_version(current: Option<&Entry>) -> Version {
    current.map_or(1, |entry| entry.version + 1)
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get_document(&self, path: &DocPath) -> StoreResult<Option<StoredDocument>> {
        self.check_online()?;
        Ok(self.docs.read().await.get(path).map(|entry| StoredDocument {
            id: path.id.clone(),
            data: entry.data.clone(),
            version: entry.version,
        }))
    }

    async fn set_document(&self, path: &DocPath, data: Document) -> StoreResult<()> {
        self.check_writable(path)?;
        let mut docs = self.docs.write().await;
        let version = next_version(docs.get(path));
        docs.insert(path.clone(), Entry { data, version });
        Ok(())
    }

    async fn update_fields(&self, path: &DocPath, fields: FieldUpdates) -> StoreResult<()> {
        self.check_writable(path)?;
        let mut docs = self.docs.write().await;
        let entry = docs
            .get_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.clone()))?;

        let mut data = entry.data.clone();
        apply_updates(path, &mut data, &fields)?;
        entry.data = data;
        entry.version += 1;
        Ok(())
    }

    async fn delete_document(&self, path: &DocPath) -> StoreResult<()> {
        self.check_writable(path)?;
        self.docs.write().await.remove(path);
        Ok(())
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<StoredDocument>> {
        self.check_online()?;
        let docs = self.docs.read().await;
        let mut results: Vec<StoredDocument> = docs
            .iter()
            .filter(|(path, entry)| path.collection == query.collection && query.matches(&entry.data))
            .map(|(path, entry)| StoredDocument {
                id: path.id.clone(),
                data: entry.data.clone(),
                version: entry.version,
            })
            .collect();

        if let Some(order) = &query.order_by {
            results.sort_by(|a, b| {
                let ord = compare_values(a.data.get(&order.field), b.data.get(&order.field));
                if order.descending { ord.reverse() } else { ord }
            });
        }

        if let Some(limit) = query.limit {
            results.truncate(limit);
        }

        Ok(results)
    }

    async fn batch_write(&self, batch: WriteBatch) -> StoreResult<()> {
        for op in &batch.ops {
            self.check_writable(op.path())?;
        }

        let mut docs = self.docs.write().await;

        for pre in &batch.preconditions {
            match docs.get(&pre.path) {
                Some(entry) if entry.version == pre.version => {}
                _ => return Err(StoreError::Conflict(pre.path.clone())),
            }
        }

        // Stage every op first so a failing update leaves the map untouched
        let mut staged: HashMap<DocPath, Option<Entry>> = HashMap::new();
        for op in batch.ops {
            let current = match staged.get(op.path()) {
                Some(staged_entry) => staged_entry.clone(),
                None => docs.get(op.path()).cloned(),
            };

            match op {
                WriteOp::Set { path, data } => {
                    let version = next_version(current.as_ref());
                    staged.insert(path, Some(Entry { data, version }));
                }
                WriteOp::Update { path, fields } => {
                    let mut entry = current.ok_or_else(|| StoreError::NotFound(path.clone()))?;
                    apply_updates(&path, &mut entry.data, &fields)?;
                    entry.version += 1;
                    staged.insert(path, Some(entry));
                }
                WriteOp::Delete { path } => {
                    staged.insert(path, None);
                }
            }
        }

        for (path, entry) in staged {
            match entry {
                Some(entry) => {
                    docs.insert(path, entry);
                }
                None => {
                    docs.remove(&path);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FieldUpdate, paths};
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_set_get_bumps_version() {
        let store = InMemoryStore::new();
        let path = paths::event("e1");

        store.set_document(&path, doc(json!({"title": "A"}))).await.unwrap();
        store.set_document(&path, doc(json!({"title": "B"}))).await.unwrap();

        let stored = store.get_document(&path).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.data["title"], json!("B"));
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = InMemoryStore::new();
        let mut fields = FieldUpdates::new();
        fields.insert("xp".to_string(), FieldUpdate::Increment(1));

        let err = store
            .update_fields(&paths::user("ghost"), fields)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let store = InMemoryStore::new();
        store
            .set_document(&paths::user("u1"), doc(json!({"xp": 0})))
            .await
            .unwrap();

        let mut inc = FieldUpdates::new();
        inc.insert("xp".to_string(), FieldUpdate::Increment(100));

        // Second update targets a missing user, so nothing may be applied
        let batch = WriteBatch::new()
            .update(paths::user("u1"), inc.clone())
            .update(paths::user("missing"), inc);
        assert!(store.batch_write(batch).await.is_err());

        let u1 = store.get_document(&paths::user("u1")).await.unwrap().unwrap();
        assert_eq!(u1.data["xp"], json!(0));
        assert_eq!(u1.version, 1);
    }

    #[tokio::test]
    async fn test_batch_precondition_conflict() {
        let store = InMemoryStore::new();
        let path = paths::event("e1");
        store.set_document(&path, doc(json!({"currentPlayers": 0}))).await.unwrap();

        let mut inc = FieldUpdates::new();
        inc.insert("currentPlayers".to_string(), FieldUpdate::Increment(1));

        let stale = WriteBatch::new()
            .require_version(path.clone(), 7)
            .update(path.clone(), inc.clone());
        let err = store.batch_write(stale).await.unwrap_err();
        assert!(err.is_conflict());

        let fresh = WriteBatch::new().require_version(path.clone(), 1).update(path.clone(), inc);
        store.batch_write(fresh).await.unwrap();
        let stored = store.get_document(&path).await.unwrap().unwrap();
        assert_eq!(stored.data["currentPlayers"], json!(1));
    }

    #[tokio::test]
    async fn test_query_filters_orders_and_limits() {
        let store = InMemoryStore::new();
        for (id, xp, role) in [("a", 10, "Player"), ("b", 300, "Player"), ("c", 999, "Organizer"), ("d", 150, "Player")] {
            store
                .set_document(&paths::user(id), doc(json!({"xp": xp, "role": role})))
                .await
                .unwrap();
        }

        let query = Query::collection(paths::USERS)
            .filter_eq("role", "Player")
            .order_by("xp", true)
            .limit(2);
        let ids: Vec<String> = store.query(&query).await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["b".to_string(), "d".to_string()]);
    }

    #[tokio::test]
    async fn test_subcollection_is_separate_from_parent() {
        let store = InMemoryStore::new();
        store.set_document(&paths::event("e1"), Document::new()).await.unwrap();
        store
            .set_document(&paths::participant("e1", "u1"), Document::new())
            .await
            .unwrap();

        assert_eq!(store.count(paths::EVENTS).await, 1);
        assert_eq!(store.count(&paths::participants("e1")).await, 1);
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = InMemoryStore::new();
        store.fail_writes_to("users/");
        let err = store
            .set_document(&paths::user("u1"), Document::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        store.set_document(&paths::event("e1"), Document::new()).await.unwrap();

        store.set_offline(true);
        assert!(store.get_document(&paths::event("e1")).await.is_err());

        store.clear_failures();
        assert!(store.get_document(&paths::event("e1")).await.unwrap().is_some());
    }
}
