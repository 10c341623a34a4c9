//! Client-local key/value cache.
//!
//! Holds warm-start copies of shopper state (cart contents, last-seen
//! orders). Entries never expire and are always superseded by the durable
//! store once it answers.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub mod file;

pub use file::FileCache;

/// Guest cart key; signed-in carts use [`cart_key`].
pub const GUEST_CART_KEY: &str = "cart";
pub const USER_ORDERS_KEY: &str = "userOrders";

pub fn cart_key(uid: &str) -> String { format!("cart:{uid}") }

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> CacheResult<()>;
    async fn remove(&self, key: &str) -> CacheResult<()>;
}

/// Typed read that treats every failure as a miss.
pub async fn load<T: DeserializeOwned>(cache: &dyn LocalCache, key: &str) -> Option<T> {
    match cache.get(key).await {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding unreadable cache entry");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(key, error = %e, "cache read failed");
            None
        }
    }
}

/// Typed write; failures are logged and swallowed.
pub async fn store<T: Serialize>(cache: &dyn LocalCache, key: &str, value: &T) {
    let result = match serde_json::to_value(value) {
        Ok(v) => cache.set(key, v).await,
        Err(e) => Err(e.into()),
    };
    if let Err(e) = result {
        tracing::warn!(key, error = %e, "cache write failed");
    }
}

pub async fn evict(cache: &dyn LocalCache, key: &str) {
    if let Err(e) = cache.remove(key).await {
        tracing::warn!(key, error = %e, "cache remove failed");
    }
}

#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<DashMap<String, Value>>,
}

impl MemoryCache {
    pub fn new() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Value>> {
        Ok(self.entries.get(key).map(|v| v.clone()))
    }

    async fn set(&self, key: &str, value: Value) -> CacheResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_typed_roundtrip_and_miss() {
        let cache = MemoryCache::new();
        store(&cache, "k", &vec![1, 2, 3]).await;
        assert_eq!(load::<Vec<i32>>(&cache, "k").await, Some(vec![1, 2, 3]));
        assert_eq!(load::<Vec<i32>>(&cache, "missing").await, None);
        cache.set("bad", json!("not a list")).await.unwrap();
        assert_eq!(load::<Vec<i32>>(&cache, "bad").await, None);
        evict(&cache, "k").await;
        assert!(cache.get("k").await.unwrap().is_none());
    }
}
