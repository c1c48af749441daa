use async_trait::async_trait;
use margin_core::{Collection, RecordChange, Snapshot};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tokio::sync::broadcast;

use crate::{merge_json, PendingChange, StoreError, TimeSeriesStore};

const CHANGE_FEED_CAPACITY: usize = 1024;

/// SQLite-backed store. Snapshots live in `margin_isolated`, exchange records
/// in `documents` as JSON text keyed by `(collection, id)`.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    changes: broadcast::Sender<RecordChange>,
}

impl SqliteStore {
    /// Open (creating if missing) the database and apply the schema.
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

        // Every connection to `:memory:` is a separate database, so keep exactly one alive.
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;

        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        let store = Self { pool, changes };
        store.init_schema().await?;

        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        let schema = include_str!("../schema.sql");

        // sqlx executes one statement per query
        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await?;
            }
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn decode_document(collection: &str, id: &str, raw: &str) -> Result<Value, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Corrupt {
        collection: collection.to_string(),
        id: id.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl TimeSeriesStore for SqliteStore {
    async fn put_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let document = serde_json::to_string(snapshot)?;

        sqlx::query(
            r#"
            INSERT INTO margin_isolated (timestamp, total_net_asset_of_usdt, document)
            VALUES (?, ?, ?)
            ON CONFLICT(timestamp) DO UPDATE SET
                total_net_asset_of_usdt = excluded.total_net_asset_of_usdt,
                document = excluded.document
            "#,
        )
        .bind(snapshot.timestamp)
        .bind(snapshot.total_net_asset_of_usdt)
        .bind(&document)
        .execute(&self.pool)
        .await?;

        tracing::debug!("Stored snapshot {}", snapshot.timestamp);
        Ok(())
    }

    async fn snapshots_since(&self, from: i64) -> Result<Vec<Snapshot>, StoreError> {
        let rows: Vec<(i64, String)> = sqlx::query_as(
            "SELECT timestamp, document FROM margin_isolated WHERE timestamp >= ? ORDER BY timestamp ASC",
        )
        .bind(from)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(timestamp, document)| {
                serde_json::from_str::<Snapshot>(&document).map_err(|e| StoreError::Corrupt {
                    collection: "margin_isolated".to_string(),
                    id: timestamp.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    async fn merge_document(
        &self,
        collection: Collection,
        id: &str,
        document: Value,
    ) -> Result<RecordChange, StoreError> {
        if !document.is_object() {
            return Err(StoreError::NotAnObject {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        let mut tx = self.pool.begin().await?;

        let stored: Option<String> =
            sqlx::query_scalar("SELECT document FROM documents WHERE collection = ? AND id = ?")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let before = stored
            .as_deref()
            .map(|raw| decode_document(collection.as_str(), id, raw))
            .transpose()?;

        let mut after = before.clone().unwrap_or_else(|| Value::Object(Default::default()));
        merge_json(&mut after, document);

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, document, updated_at)
            VALUES (?, ?, ?, datetime('now'))
            ON CONFLICT(collection, id) DO UPDATE SET
                document = excluded.document,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection.as_str())
        .bind(id)
        .bind(serde_json::to_string(&after)?)
        .execute(&mut *tx)
        .await?;

        let change = RecordChange {
            collection,
            record_id: id.to_string(),
            before,
            after: Some(after),
        };

        if collection.announces_first_seen() && change.is_first_seen() {
            sqlx::query(
                "INSERT INTO pending_changes (collection, id, before, after) VALUES (?, ?, ?, ?)",
            )
            .bind(collection.as_str())
            .bind(id)
            .bind(change.before.as_ref().map(serde_json::to_string).transpose()?)
            .bind(serde_json::to_string(&change.after)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        // Fails only when nobody is subscribed.
        let _ = self.changes.send(change.clone());
        tracing::debug!("Merged {}/{}", collection, id);

        Ok(change)
    }

    async fn get_document(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<Value>, StoreError> {
        let stored: Option<String> =
            sqlx::query_scalar("SELECT document FROM documents WHERE collection = ? AND id = ?")
                .bind(collection.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        stored
            .as_deref()
            .map(|raw| decode_document(collection.as_str(), id, raw))
            .transpose()
    }

    async fn pending_changes(&self, limit: u32) -> Result<Vec<PendingChange>, StoreError> {
        let rows: Vec<(i64, String, String, Option<String>, String)> = sqlx::query_as(
            "SELECT seq, collection, id, before, after FROM pending_changes ORDER BY seq ASC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(seq, collection, id, before, after)| {
                let kind = collection
                    .parse::<Collection>()
                    .map_err(|e| StoreError::Corrupt {
                        collection: "pending_changes".to_string(),
                        id: seq.to_string(),
                        reason: e.to_string(),
                    })?;
                let before = before
                    .as_deref()
                    .map(|raw| decode_document(&collection, &id, raw))
                    .transpose()?;
                let after = decode_document(&collection, &id, &after)?;

                Ok(PendingChange {
                    seq,
                    change: RecordChange {
                        collection: kind,
                        record_id: id,
                        before,
                        after: Some(after),
                    },
                })
            })
            .collect()
    }

    async fn acknowledge(&self, seq: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM pending_changes WHERE seq = ?")
            .bind(seq)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<RecordChange> {
        self.changes.subscribe()
    }
}
