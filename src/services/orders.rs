//! Order queries and administrator status changes.

use serde_json::Value;

use super::{decode_all, Feed};
use crate::cache::{self, USER_ORDERS_KEY};
use crate::domain::aggregates::{Order, OrderStatus};
use crate::store::{object, Direction, Query, ORDERS};
use crate::{Result, Storefront, StorefrontError};

pub struct Orders {
    app: Storefront,
}

fn customer_query(uid: &str) -> Query {
    Query::collection(ORDERS).filter_eq("userId", uid).order_by("createdAt", Direction::Desc)
}

fn all_query() -> Query {
    Query::collection(ORDERS).order_by("createdAt", Direction::Desc)
}

impl Orders {
    pub fn new(app: Storefront) -> Self { Self { app } }

    /// The shopper's orders, newest first.
    pub async fn for_customer(&self, uid: &str) -> Result<Vec<Order>> {
        let docs = self.app.store().query(&customer_query(uid)).await?;
        Ok(decode_all(&docs))
    }

    /// Live order history for one shopper, warm-started from the cache.
    pub fn watch_customer(&self, uid: &str) -> OrderHistory {
        OrderHistory { app: self.app.clone(), feed: Feed::new(self.app.store().subscribe(customer_query(uid))) }
    }

    /// Fails with `NotFound` unless the order belongs to `uid`.
    pub async fn get_for_customer(&self, uid: &str, order_id: &str) -> Result<Order> {
        let order = self.get(order_id).await?;
        if order.user_id != uid {
            return Err(StorefrontError::NotFound(format!("{ORDERS}/{order_id}")));
        }
        Ok(order)
    }

    pub async fn get(&self, order_id: &str) -> Result<Order> {
        let doc = self
            .app
            .store()
            .get(ORDERS, order_id)
            .await?
            .ok_or_else(|| StorefrontError::NotFound(format!("{ORDERS}/{order_id}")))?;
        Ok(doc.decode()?)
    }

    /// Every order, newest first.
    pub async fn all(&self) -> Result<Vec<Order>> {
        let docs = self.app.store().query(&all_query()).await?;
        Ok(decode_all(&docs))
    }

    /// Every order as a live feed for the back office.
    pub fn watch_all(&self) -> Feed<Order> {
        Feed::new(self.app.store().subscribe(all_query()))
    }

    /// Writes only the `status` field; line items and totals stay as placed.
    pub async fn set_status(&self, order_id: &str, to: OrderStatus) -> Result<Order> {
        let mut order = self.get(order_id).await?;
        let event = order.set_status(to, self.app.status_policy())?;
        let patch = object([("status", Value::from(to.as_str()))]);
        self.app.store().update(ORDERS, order_id, patch).await?;
        tracing::info!(order_id, status = %to, "order status updated");
        self.app.bus().publish(&event).await;
        Ok(order)
    }
}

pub struct OrderHistory {
    app: Storefront,
    feed: Feed<Order>,
}

impl OrderHistory {
    /// Last history seen on this client, if any.
    pub async fn cached(&self) -> Vec<Order> {
        cache::load::<Vec<Order>>(self.app.cache(), USER_ORDERS_KEY).await.unwrap_or_default()
    }

    pub async fn next(&mut self) -> Option<Result<Vec<Order>>> {
        let snapshot = self.feed.next().await?;
        if let Ok(orders) = &snapshot {
            cache::store(self.app.cache(), USER_ORDERS_KEY, orders).await;
        }
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{Cart, ContactInfo, StatusPolicy};
    use crate::store::encode;
    use crate::StorefrontConfig;
    use chrono::{Duration, Utc};

    async fn seed(app: &Storefront, uid: &str, minutes_ago: i64) -> Order {
        let mut cart = Cart::new();
        let product = crate::domain::aggregates::Product {
            id: "p1".into(), name: "Mug".into(), amount: 8.into(), discount: 0.into(), image: String::new(),
            final_price: 8.into(), created_at: None, updated_at: None,
        };
        cart.add_line(crate::domain::aggregates::CartLine::capture(&product, Default::default(), Default::default()).unwrap()).unwrap();
        let order = Order::place(uid, ContactInfo::default(), &cart, Utc::now() - Duration::minutes(minutes_ago)).unwrap();
        app.store().insert(ORDERS, &order.id, encode(&order).unwrap()).await.unwrap();
        order
    }

    #[tokio::test]
    async fn test_customer_orders_newest_first() {
        let app = Storefront::in_memory(StorefrontConfig::with_secret("k".repeat(32)));
        let old = seed(&app, "u1", 30).await;
        let new = seed(&app, "u1", 1).await;
        seed(&app, "u2", 5).await;

        let ids: Vec<String> = app.orders().for_customer("u1").await.unwrap().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![new.id.clone(), old.id.clone()]);
        assert!(app.orders().get_for_customer("u2", &old.id).await.is_err());
        assert_eq!(app.orders().all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_status_update_touches_status_only() {
        let app = Storefront::in_memory(StorefrontConfig::with_secret("k".repeat(32)));
        let order = seed(&app, "u1", 0).await;
        let updated = app.orders().set_status(&order.id, OrderStatus::Delivered).await.unwrap();
        assert!(updated.timeline().iter().all(|s| s.active));

        let stored = app.orders().get(&order.id).await.unwrap();
        assert_eq!(stored.status(), OrderStatus::Delivered);
        assert_eq!(stored.items, order.items);
        assert_eq!(stored.total_amount, order.total_amount);
    }

    #[tokio::test]
    async fn test_forward_only_policy() {
        let mut config = StorefrontConfig::with_secret("k".repeat(32));
        config.status_policy = StatusPolicy::ForwardOnly;
        let app = Storefront::in_memory(config);
        let order = seed(&app, "u1", 0).await;
        app.orders().set_status(&order.id, OrderStatus::Shipped).await.unwrap();
        assert!(app.orders().set_status(&order.id, OrderStatus::Processing).await.is_err());
        assert_eq!(app.orders().get(&order.id).await.unwrap().status(), OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_all_orders_feed_follows_status_changes() {
        let app = Storefront::in_memory(StorefrontConfig::with_secret("k".repeat(32)));
        let old = seed(&app, "u1", 30).await;
        let mut feed = app.orders().watch_all();
        assert_eq!(feed.next().await.unwrap().unwrap().len(), 1);

        let new = seed(&app, "u2", 1).await;
        let ids: Vec<String> = feed.next().await.unwrap().unwrap().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![new.id, old.id.clone()]);

        app.orders().set_status(&old.id, OrderStatus::Shipped).await.unwrap();
        let latest = feed.next().await.unwrap().unwrap();
        assert_eq!(latest[1].status(), OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn test_history_is_cached() {
        let app = Storefront::in_memory(StorefrontConfig::with_secret("k".repeat(32)));
        seed(&app, "u1", 0).await;
        let mut history = app.orders().watch_customer("u1");
        assert!(history.cached().await.is_empty());
        assert_eq!(history.next().await.unwrap().unwrap().len(), 1);
        assert_eq!(history.cached().await.len(), 1);
    }
}
