//! Back-office operations: product CRUD, user roles and the dashboard.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::decode_all;
use crate::domain::aggregates::{Order, Product, ProductDraft, Role, User};
use crate::domain::events::{DomainEvent, ProductEvent, UserEvent};
use crate::domain::pricing;
use crate::store::{encode, object, Direction, Query, ORDERS, PRODUCTS, USERS};
use crate::{Result, Storefront, StorefrontError};

const PRODUCT_PAGE: usize = 50;

pub struct Admin {
    app: Storefront,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub revenue: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub products: usize,
    pub orders: usize,
    pub users: usize,
    pub revenue_by_day: Vec<DailyRevenue>,
}

impl Admin {
    pub fn new(app: Storefront) -> Self { Self { app } }

    /// Cheapest first, at most one page.
    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let query = Query::collection(PRODUCTS).order_by("Amount", Direction::Asc).limit(PRODUCT_PAGE);
        Ok(decode_all(&self.app.store().query(&query).await?))
    }

    pub async fn create_product(&self, draft: ProductDraft) -> Result<Product> {
        let mut product = draft.into_product("", None, Utc::now())?;
        product.id = self.app.store().create(PRODUCTS, encode(&product)?).await?;
        tracing::info!(product_id = %product.id, name = %product.name, "product created");
        let event = ProductEvent::Created { product_id: product.id.clone(), name: product.name.clone() };
        self.app.bus().publish(&DomainEvent::Product(event)).await;
        Ok(product)
    }

    /// Replaces the editable fields; `CreatedAt` is kept.
    pub async fn update_product(&self, id: &str, draft: ProductDraft) -> Result<Product> {
        let existing: Product = self
            .app
            .store()
            .get(PRODUCTS, id)
            .await?
            .ok_or_else(|| StorefrontError::NotFound(format!("{PRODUCTS}/{id}")))?
            .decode()?;
        let product = draft.into_product(id, existing.created_at, Utc::now())?;
        self.app.store().update(PRODUCTS, id, encode(&product)?).await?;
        tracing::info!(product_id = id, "product updated");
        self.app.bus().publish(&DomainEvent::Product(ProductEvent::Updated { product_id: id.to_string() })).await;
        Ok(product)
    }

    /// Deleting an absent product succeeds.
    pub async fn delete_product(&self, id: &str) -> Result<()> {
        self.app.store().delete(PRODUCTS, id).await?;
        tracing::info!(product_id = id, "product deleted");
        self.app.bus().publish(&DomainEvent::Product(ProductEvent::Deleted { product_id: id.to_string() })).await;
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        Ok(decode_all(&self.app.store().query(&Query::collection(USERS)).await?))
    }

    /// Writes only the `role` field.
    pub async fn set_role(&self, uid: &str, role: Role) -> Result<()> {
        self.app.store().update(USERS, uid, object([("role", Value::from(role.as_str()))])).await?;
        tracing::info!(uid, %role, "role changed");
        self.app.bus().publish(&DomainEvent::User(UserEvent::RoleChanged { user_id: uid.to_string(), role })).await;
        Ok(())
    }

    pub async fn dashboard(&self) -> Result<Dashboard> {
        let store = self.app.store();
        let (all_products, all_users, all_orders) = (Query::collection(PRODUCTS), Query::collection(USERS), Query::collection(ORDERS));
        let (products, users, orders) = futures::try_join!(store.query(&all_products), store.query(&all_users), store.query(&all_orders))?;
        let orders: Vec<Order> = decode_all(&orders);
        Ok(Dashboard { products: products.len(), orders: orders.len(), users: users.len(), revenue_by_day: revenue_by_day(&orders) })
    }
}

/// Sum of order totals per creation date, oldest day first. Orders without
/// a creation time are left out.
pub fn revenue_by_day(orders: &[Order]) -> Vec<DailyRevenue> {
    let mut days: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for order in orders {
        if let Some(created_at) = order.created_at {
            *days.entry(created_at.date_naive()).or_default() += order.total_amount;
        }
    }
    days.into_iter().map(|(date, revenue)| DailyRevenue { date, revenue: pricing::round_money(revenue) }).collect()
}
