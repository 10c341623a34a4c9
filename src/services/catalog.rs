//! Shopper-facing catalog.

use super::{decode_all, Feed};
use crate::domain::aggregates::Product;
use crate::store::{Query, PRODUCTS};
use crate::{Result, Storefront, StorefrontError};

pub struct Catalog {
    app: Storefront,
}

impl Catalog {
    pub fn new(app: Storefront) -> Self { Self { app } }

    pub async fn list(&self) -> Result<Vec<Product>> {
        let docs = self.app.store().query(&Query::collection(PRODUCTS)).await?;
        Ok(decode_all(&docs))
    }

    /// Case-insensitive substring match on the product name; a blank term
    /// returns everything.
    pub async fn search(&self, term: &str) -> Result<Vec<Product>> {
        let products = self.list().await?;
        if term.trim().is_empty() {
            return Ok(products);
        }
        Ok(products.into_iter().filter(|p| p.matches(term)).collect())
    }

    pub async fn get(&self, id: &str) -> Result<Product> {
        let doc = self
            .app
            .store()
            .get(PRODUCTS, id)
            .await?
            .ok_or_else(|| StorefrontError::NotFound(format!("{PRODUCTS}/{id}")))?;
        Ok(doc.decode()?)
    }

    pub fn subscribe(&self) -> Feed<Product> {
        Feed::new(self.app.store().subscribe(Query::collection(PRODUCTS)))
    }
}
