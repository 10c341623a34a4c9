//! Application services over the store, auth and cache collaborators.

use serde::de::DeserializeOwned;
use std::marker::PhantomData;

use crate::store::{Document, Subscription};
use crate::Result;

pub mod accounts;
pub mod admin;
pub mod cart;
pub mod catalog;
pub mod orders;

pub use accounts::{Accounts, Registration, SignedIn};
pub use admin::{Admin, DailyRevenue, Dashboard};
pub use cart::CartEngine;
pub use catalog::Catalog;
pub use orders::{OrderHistory, Orders};

/// Decodes a result set, skipping documents that no longer fit the model.
pub(crate) fn decode_all<T: DeserializeOwned>(docs: &[Document]) -> Vec<T> {
    docs.iter()
        .filter_map(|doc| match doc.decode() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(id = %doc.id, error = %e, "skipping malformed document");
                None
            }
        })
        .collect()
}

/// Typed view over a [`Subscription`].
pub struct Feed<T> {
    sub: Subscription,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> Feed<T> {
    pub(crate) fn new(sub: Subscription) -> Self { Self { sub, _marker: PhantomData } }

    pub async fn next(&mut self) -> Option<Result<Vec<T>>> {
        let snapshot = self.sub.next().await?;
        Some(snapshot.map(|docs| decode_all(&docs)).map_err(Into::into))
    }
}
