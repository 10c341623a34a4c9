//! In-memory document store.
//!
//! Uses DashMap for concurrent access with per-key sharding and a broadcast
//! channel announcing the collection touched by each write.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::{merge_fields, new_document_id, Document, DocumentStore, Query, StoreError, StoreResult, Subscription};

type Key = (String, String);

#[derive(Clone)]
pub struct MemoryStore {
    docs: Arc<DashMap<Key, Value>>,
    changes: broadcast::Sender<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self { docs: Arc::new(DashMap::new()), changes }
    }

    pub fn len(&self) -> usize { self.docs.len() }
    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    fn key(collection: &str, id: &str) -> Key { (collection.to_string(), id.to_string()) }

    fn notify(&self, collection: &str) {
        // No receivers is fine: nobody is subscribed.
        let _ = self.changes.send(collection.to_string());
    }
}

impl Default for MemoryStore {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_tag(&self) -> &'static str { "memory" }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let found = self.docs.get(&Self::key(collection, id)).map(|v| Document { id: id.to_string(), data: v.clone() });
        tracing::debug!(collection, id, hit = found.is_some(), "memory get");
        Ok(found)
    }

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>> {
        let matching: Vec<Document> = self
            .docs
            .iter()
            .filter_map(|entry| {
                let (collection, id) = entry.key();
                let doc = Document { id: id.clone(), data: entry.value().clone() };
                query.matches(collection, &doc).then_some(doc)
            })
            .collect();
        Ok(query.arrange(matching))
    }

    async fn create(&self, collection: &str, data: Value) -> StoreResult<String> {
        let id = new_document_id();
        self.insert(collection, &id, data).await?;
        Ok(id)
    }

    async fn insert(&self, collection: &str, id: &str, data: Value) -> StoreResult<()> {
        match self.docs.entry(Self::key(collection, id)) {
            Entry::Occupied(_) => return Err(StoreError::AlreadyExists { collection: collection.to_string(), id: id.to_string() }),
            Entry::Vacant(slot) => { slot.insert(data); }
        }
        self.notify(collection);
        Ok(())
    }

    async fn set(&self, collection: &str, id: &str, data: Value, merge: bool) -> StoreResult<()> {
        match self.docs.entry(Self::key(collection, id)) {
            Entry::Occupied(mut existing) if merge => merge_fields(existing.get_mut(), &data),
            Entry::Occupied(mut existing) => { existing.insert(data); }
            Entry::Vacant(slot) => { slot.insert(data); }
        }
        self.notify(collection);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, partial: Value) -> StoreResult<()> {
        match self.docs.get_mut(&Self::key(collection, id)) {
            Some(mut existing) => merge_fields(existing.value_mut(), &partial),
            None => return Err(StoreError::not_found(collection, id)),
        }
        self.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        if self.docs.remove(&Self::key(collection, id)).is_some() {
            self.notify(collection);
        }
        Ok(())
    }

    fn subscribe(&self, query: Query) -> Subscription {
        Subscription::spawn(self.clone(), query, self.changes.subscribe())
    }
}
