//! Document store collaborator.
//!
//! Every piece of storefront state lives as a JSON document in a named
//! collection. The store is the single source of truth; writes are last
//! writer wins and there is no transaction spanning documents.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use thiserror::Error;

pub mod memory;
pub mod postgres;
pub mod subscription;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use subscription::{Snapshot, Subscription};

pub const PRODUCTS: &str = "products";
pub const ORDERS: &str = "orders";
pub const USERS: &str = "users";
pub const USER_CARTS: &str = "userCarts";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("document {collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("document encoding error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound { collection: collection.to_string(), id: id.to_string() }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self { Self::Serialization(e.to_string()) }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Deserializes the document with its id merged in under `"id"`.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        let mut data = match &self.data {
            Value::Object(map) => map.clone(),
            other => return Err(StoreError::Serialization(format!("document {} is not an object: {other}", self.id))),
        };
        data.insert("id".to_string(), Value::String(self.id.clone()));
        Ok(serde_json::from_value(Value::Object(data))?)
    }
}

/// Serializes an entity into document data. The id is carried by the
/// document key, never inside the data.
pub fn encode<T: Serialize>(value: &T) -> StoreResult<Value> {
    match serde_json::to_value(value)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(Value::Object(map))
        }
        other => Err(StoreError::Serialization(format!("expected an object, got {other}"))),
    }
}

/// Top-level field merge, as done by `set(.., merge = true)` and `update`.
pub fn merge_fields(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (k, v) in patch {
                target.insert(k.clone(), v.clone());
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction { Asc, Desc }

/// Equality filter on a top-level field.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    pub collection: String,
    pub id: Option<String>,
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn collection(name: &str) -> Self {
        Self { collection: name.to_string(), id: None, filters: vec![], order_by: None, limit: None }
    }

    /// Query matching a single document, used to subscribe to it.
    pub fn document(collection: &str, id: &str) -> Self {
        Self { id: Some(id.to_string()), ..Self::collection(collection) }
    }

    pub fn filter_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter { field: field.to_string(), value: value.into() });
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, collection: &str, doc: &Document) -> bool {
        collection == self.collection
            && self.id.as_ref().map_or(true, |id| id == &doc.id)
            && self.filters.iter().all(|f| doc.data.get(&f.field) == Some(&f.value))
    }

    /// Orders and truncates documents already known to match. Documents
    /// missing the order field sort as the lowest value.
    pub fn arrange(&self, mut docs: Vec<Document>) -> Vec<Document> {
        match &self.order_by {
            Some((field, direction)) => docs.sort_by(|a, b| {
                let ord = compare_values(a.data.get(field), b.data.get(field));
                if *direction == Direction::Desc { ord.reverse() } else { ord }
            }),
            None => docs.sort_by(|a, b| a.id.cmp(&b.id)),
        }
        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }
        docs
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            x.as_f64().partial_cmp(&y.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Client contract of the external document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;

    async fn query(&self, query: &Query) -> StoreResult<Vec<Document>>;

    /// Creates a document under a generated id.
    async fn create(&self, collection: &str, data: Value) -> StoreResult<String>;

    /// Creates a document under `id`; fails with `AlreadyExists` if present.
    async fn insert(&self, collection: &str, id: &str, data: Value) -> StoreResult<()>;

    /// Writes a whole document, or merges its top-level fields when `merge`.
    async fn set(&self, collection: &str, id: &str, data: Value, merge: bool) -> StoreResult<()>;

    /// Merges top-level fields into an existing document.
    async fn update(&self, collection: &str, id: &str, partial: Value) -> StoreResult<()>;

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;

    /// Push stream of snapshots for `query`; the first snapshot is delivered
    /// immediately. Dropping the handle stops delivery.
    fn subscribe(&self, query: Query) -> Subscription;
}

pub(crate) fn new_document_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}

pub(crate) fn object(fields: impl IntoIterator<Item = (&'static str, Value)>) -> Value {
    Value::Object(fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect::<Map<String, Value>>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, data: Value) -> Document { Document { id: id.into(), data } }

    #[test]
    fn test_decode_merges_id() {
        #[derive(serde::Deserialize)]
        struct Row { id: String, name: String }
        let row: Row = doc("d1", json!({"name": "n"})).decode().unwrap();
        assert_eq!((row.id.as_str(), row.name.as_str()), ("d1", "n"));
    }

    #[test]
    fn test_encode_strips_id() {
        let data = encode(&json!({"id": "x", "a": 1})).unwrap();
        assert_eq!(data, json!({"a": 1}));
        assert!(encode(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_query_arrange() {
        let q = Query::collection("orders").filter_eq("userId", "u1").order_by("total", Direction::Desc).limit(2);
        let docs = vec![
            doc("a", json!({"userId": "u1", "total": 5})),
            doc("b", json!({"userId": "u1", "total": 50})),
            doc("c", json!({"userId": "u2", "total": 500})),
            doc("d", json!({"userId": "u1"})),
        ];
        let matching: Vec<_> = docs.into_iter().filter(|d| q.matches("orders", d)).collect();
        let ids: Vec<_> = q.arrange(matching).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_merge_fields_is_shallow() {
        let mut target = json!({"a": {"x": 1}, "b": 2});
        merge_fields(&mut target, &json!({"a": {"y": 2}}));
        assert_eq!(target, json!({"a": {"y": 2}, "b": 2}));
    }
}
