//! PostgreSQL document store.
//!
//! Documents live in one JSONB table keyed by `(collection, id)`. A trigger
//! announces every write on [`CHANGES_CHANNEL`]; a `LISTEN` task fans those
//! notifications out to local subscriptions, so writes from other processes
//! reach them as well.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgListener, PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::{new_document_id, Direction, Document, DocumentStore, Query, StoreError, StoreResult, Subscription};

pub const CHANGES_CHANNEL: &str = "storefront_documents";

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self { Self::Backend(e.to_string()) }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self { Self::Backend(e.to_string()) }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    changes: broadcast::Sender<String>,
}

impl PgStore {
    /// Connects, applies migrations and starts the change listener.
    pub async fn connect(database_url: &str) -> StoreResult<(Self, JoinHandle<()>)> {
        let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        let store = Self::from_pool(pool);
        let listener = store.listen().await?;
        tracing::info!("postgres document store ready");
        Ok((store, listener))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        let (changes, _) = broadcast::channel(256);
        Self { pool, changes }
    }

    pub fn pool(&self) -> &PgPool { &self.pool }

    async fn listen(&self) -> StoreResult<JoinHandle<()>> {
        let mut listener = PgListener::connect_with(&self.pool).await?;
        listener.listen(CHANGES_CHANNEL).await?;
        let changes = self.changes.clone();
        Ok(tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => {
                        let _ = changes.send(notification.payload().to_string());
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "document change listener failed, retrying");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }))
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    fn backend_tag(&self) -> &'static str { "postgres" }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let row: Option<(Value,)> = sqlx::query_as("SELECT data FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection).bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(|(data,)| Document { id: id.to_string(), data }))
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT id, data FROM documents WHERE collection = ");
        qb.push_bind(query.collection.clone());
        if let Some(id) = &query.id {
            qb.push(" AND id = ").push_bind(id.clone());
        }
        for filter in &query.filters {
            let mut containment = Map::new();
            containment.insert(filter.field.clone(), filter.value.clone());
            qb.push(" AND data @> ").push_bind(Value::Object(containment));
        }
        match &query.order_by {
            Some((field, direction)) => {
                qb.push(" ORDER BY data -> ").push_bind(field.clone());
                qb.push(match direction { Direction::Asc => " ASC NULLS FIRST", Direction::Desc => " DESC NULLS LAST" });
            }
            None => { qb.push(" ORDER BY id"); }
        }
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ").push_bind(limit as i64);
        }
        let rows: Vec<(String, Value)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|(id, data)| Document { id, data }).collect())
    }

    async fn create(&self, collection: &str, data: Value) -> StoreResult<String> {
        let id = new_document_id();
        self.insert(collection, &id, data).await?;
        Ok(id)
    }

    async fn insert(&self, collection: &str, id: &str, data: Value) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO documents (collection, id, data, created_at, updated_at) VALUES ($1, $2, $3, NOW(), NOW()) \
             ON CONFLICT (collection, id) DO NOTHING",
        )
        .bind(collection).bind(id).bind(data).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists { collection: collection.to_string(), id: id.to_string() });
        }
        Ok(())
    }

    async fn set(&self, collection: &str, id: &str, data: Value, merge: bool) -> StoreResult<()> {
        let on_conflict = if merge { "documents.data || EXCLUDED.data" } else { "EXCLUDED.data" };
        let sql = format!(
            "INSERT INTO documents (collection, id, data, created_at, updated_at) VALUES ($1, $2, $3, NOW(), NOW()) \
             ON CONFLICT (collection, id) DO UPDATE SET data = {on_conflict}, updated_at = NOW()"
        );
        sqlx::query(&sql).bind(collection).bind(id).bind(data).execute(&self.pool).await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> StoreResult<()> {
        let result = sqlx::query("UPDATE documents SET data = data || $3, updated_at = NOW() WHERE collection = $1 AND id = $2")
            .bind(collection).bind(id).bind(partial).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    fn subscribe(&self, query: Query) -> Subscription {
        Subscription::spawn(self.clone(), query, self.changes.subscribe())
    }
}
