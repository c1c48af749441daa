pub mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use margin_core::{Collection, Record, RecordChange, Snapshot};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors from the time-series store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt document {collection}/{id}: {reason}")]
    Corrupt {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("Document {collection}/{id} must be a JSON object")]
    NotAnObject { collection: String, id: String },
}

/// A first-seen change queued in the same transaction as its write, kept
/// until acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChange {
    pub seq: i64,
    pub change: RecordChange,
}

/// Durable storage for snapshots and raw exchange records.
///
/// Snapshots are keyed by their minute timestamp and fully replaced on
/// rewrite. Record documents are merged: fields absent from a new payload keep
/// their stored value. Every document write is published on the change feed.
///
/// A write that makes a trade or interest record first carry its identifier
/// is also queued as a [`PendingChange`]. The queue survives lagging
/// subscribers and restarts; the feed only signals that it may have grown.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Insert or fully replace the snapshot at `snapshot.timestamp`.
    async fn put_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// All snapshots with `timestamp >= from`, oldest first.
    async fn snapshots_since(&self, from: i64) -> Result<Vec<Snapshot>, StoreError>;

    /// Merge `document` into `collection/id`, returning the before/after pair.
    async fn merge_document(
        &self,
        collection: Collection,
        id: &str,
        document: Value,
    ) -> Result<RecordChange, StoreError>;

    /// Current version of a document, if stored.
    async fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Value>, StoreError>;

    /// Up to `limit` unacknowledged first-seen changes, oldest first.
    async fn pending_changes(&self, limit: u32) -> Result<Vec<PendingChange>, StoreError>;

    /// Drop a pending change once it was handled.
    async fn acknowledge(&self, seq: i64) -> Result<(), StoreError>;

    /// Subscribe to document writes made after this call.
    fn subscribe(&self) -> broadcast::Receiver<RecordChange>;
}

/// Merge a typed record into its collection, keyed by its natural identifier.
pub async fn merge_record<S, R>(store: &S, record: &R) -> Result<RecordChange, StoreError>
where
    S: TimeSeriesStore + ?Sized,
    R: Record,
{
    let document = serde_json::to_value(record)?;
    store
        .merge_document(R::COLLECTION, &record.record_id(), document)
        .await
}

/// Recursively merge `patch` into `target`. Objects merge key by key; any
/// other value in `patch` replaces the stored one.
pub fn merge_json(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                let nested = value.is_object() && target.get(&key).is_some_and(Value::is_object);
                match target.get_mut(&key) {
                    Some(existing) if nested => merge_json(existing, value),
                    _ => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}
