//! Document store seam.
//!
//! All persistence is delegated to a managed document database. This module
//! describes the logical contract the rest of the crate consumes:
//!
//! - single document reads and writes addressed by `collection/id`
//! - partial updates with an atomic increment instruction
//! - equality-filtered, ordered, limited queries over one collection
//! - all-or-nothing batches guarded by optimistic version preconditions
//!
//! Subcollections are plain collection paths such as
//! `events/{event_id}/participants`.
//!
//! Two implementations ship with the crate: [`memory::InMemoryStore`] and
//! [`postgres::PgDocumentStore`].

use async_trait::async_trait;
use serde_json::Value;
use std::{cmp::Ordering, collections::BTreeMap, fmt};
use uuid::Uuid;

pub mod blob;
pub mod errors;
pub mod memory;
pub mod postgres;

pub use blob::{BlobStore, InMemoryBlobStore};
pub use errors::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use postgres::{DatabaseConfig, PgDocumentStore};

/// Generic key-value document as stored by the backend
pub type Document = serde_json::Map<String, Value>;

/// Version counter maintained by the store for every document
pub type Version = u64;

/// Address of a single document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath {
    /// Collection path (may address a subcollection)
    pub collection: String,
    /// Document ID within the collection
    pub id: String,
}

impl DocPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Collection layout used by the application
pub mod paths {
    use super::DocPath;

    pub const USERS: &str = "users";
    pub const EVENTS: &str = "events";

    pub fn user(user_id: &str) -> DocPath {
        DocPath::new(USERS, user_id)
    }

    pub fn event(event_id: &str) -> DocPath {
        DocPath::new(EVENTS, event_id)
    }

    /// Roster subcollection of an event
    pub fn participants(event_id: &str) -> String {
        format!("{EVENTS}/{event_id}/participants")
    }

    pub fn participant(event_id: &str, user_id: &str) -> DocPath {
        DocPath::new(participants(event_id), user_id)
    }
}

/// Instruction applied to a single field by an update
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Overwrite the field
    Set(Value),
    /// Add a delta to a numeric field (missing fields count as zero)
    Increment(i64),
    /// Drop the field
    Remove,
}

/// Field updates keyed by field name
pub type FieldUpdates = BTreeMap<String, FieldUpdate>;

/// Apply `updates` to `doc` in place
pub fn apply_updates(path: &DocPath, doc: &mut Document, updates: &FieldUpdates) -> StoreResult<()> {
    for (field, update) in updates {
        match update {
            FieldUpdate::Set(value) => {
                doc.insert(field.clone(), value.clone());
            }
            FieldUpdate::Remove => {
                doc.remove(field);
            }
            FieldUpdate::Increment(delta) => {
                let next = match doc.get(field) {
                    None | Some(Value::Null) => Value::from(*delta),
                    Some(Value::Number(n)) if n.is_i64() || n.is_u64() => {
                        let current = n.as_i64().ok_or_else(|| StoreError::InvalidUpdate {
                            path: path.clone(),
                            reason: format!("{field} exceeds the integer range"),
                        })?;
                        let sum = current.checked_add(*delta).ok_or_else(|| {
                            StoreError::InvalidUpdate {
                                path: path.clone(),
                                reason: format!("increment of {field} overflows"),
                            }
                        })?;
                        Value::from(sum)
                    }
                    Some(Value::Number(n)) => {
                        let current = n.as_f64().unwrap_or_default();
                        Value::from(current + *delta as f64)
                    }
                    Some(_) => {
                        return Err(StoreError::InvalidUpdate {
                            path: path.clone(),
                            reason: format!("{field} is not numeric"),
                        });
                    }
                };
                doc.insert(field.clone(), next);
            }
        }
    }
    Ok(())
}

/// A single write inside a batch
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or overwrite a document
    Set { path: DocPath, data: Document },
    /// Partially update an existing document
    Update { path: DocPath, fields: FieldUpdates },
    /// Delete a document (no-op when absent)
    Delete { path: DocPath },
}

impl WriteOp {
    pub fn path(&self) -> &DocPath {
        match self {
            WriteOp::Set { path, .. } | WriteOp::Update { path, .. } | WriteOp::Delete { path } => {
                path
            }
        }
    }
}

/// The document must exist with exactly this version when the batch commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precondition {
    pub path: DocPath,
    pub version: Version,
}

/// All-or-nothing group of writes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    pub preconditions: Vec<Precondition>,
    pub ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the whole batch with [`StoreError::Conflict`] unless `path` is still at `version`
    pub fn require_version(mut self, path: DocPath, version: Version) -> Self {
        self.preconditions.push(Precondition { path, version });
        self
    }

    pub fn set(mut self, path: DocPath, data: Document) -> Self {
        self.ops.push(WriteOp::Set { path, data });
        self
    }

    pub fn update(mut self, path: DocPath, fields: FieldUpdates) -> Self {
        self.ops.push(WriteOp::Update { path, fields });
        self
    }

    pub fn delete(mut self, path: DocPath) -> Self {
        self.ops.push(WriteOp::Delete { path });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

/// Document returned by reads
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
    pub version: Version,
}

/// Equality filter on a top-level field
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

/// Sort key for a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

/// Query over a single collection
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn filter_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: impl Into<String>, descending: bool) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            descending,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a document satisfies every filter
    pub fn matches(&self, doc: &Document) -> bool {
        self.filters
            .iter()
            .all(|filter| doc.get(&filter.field) == Some(&filter.value))
    }
}

/// Total order over stored values used for sorting query results.
///
/// Missing and null sort first, then booleans, numbers and strings.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Trait for document store operations
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document
    async fn get_document(&self, path: &DocPath) -> StoreResult<Option<StoredDocument>>;

    /// Create or overwrite a document
    async fn set_document(&self, path: &DocPath, data: Document) -> StoreResult<()>;

    /// Partially update an existing document
    async fn update_fields(&self, path: &DocPath, fields: FieldUpdates) -> StoreResult<()>;

    /// Delete a document (no-op when absent)
    async fn delete_document(&self, path: &DocPath) -> StoreResult<()>;

    /// Run a query over one collection
    async fn query(&self, query: &Query) -> StoreResult<Vec<StoredDocument>>;

    /// Commit a batch atomically
    async fn batch_write(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Create a document under a generated ID and return the ID
    async fn add_document(&self, collection: &str, data: Document) -> StoreResult<String> {
        let id = Uuid::new_v4().to_string();
        self.set_document(&DocPath::new(collection, id.clone()), data)
            .await?;
        Ok(id)
    }
}
