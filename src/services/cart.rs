//! Cart engine.
//!
//! The single writer of a shopper's cart. Every mutation is applied to a
//! copy, written through to `userCarts/<uid>` and the local cache, and only
//! then becomes the in-process state. While a signed-in engine is open the
//! durable document is subscribed to, and any snapshot that differs from the
//! local state replaces it.

use chrono::Utc;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::auth::Identity;
use crate::cache::{self, GUEST_CART_KEY};
use crate::domain::aggregates::{Cart, CartLine, ContactInfo, Order, Product, User};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Quantity, Size};
use crate::store::{encode, Query, StoreError, ORDERS, USERS, USER_CARTS};
use crate::{Result, Storefront, StorefrontError};

#[derive(Clone)]
pub struct CartEngine {
    inner: Arc<CartInner>,
}

struct CartInner {
    app: Storefront,
    shopper: Option<Identity>,
    cart: RwLock<Cart>,
    live: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for CartInner {
    fn drop(&mut self) {
        if let Some(task) = self.live.get_mut().ok().and_then(Option::take) {
            task.abort();
        }
    }
}

impl CartEngine {
    /// Restores the cart once, without a live subscription.
    pub async fn load(app: Storefront, shopper: Option<Identity>) -> Result<Self> {
        let cart = match &shopper {
            Some(identity) => restore(&app, identity).await?,
            None => cache::load::<Cart>(app.cache(), GUEST_CART_KEY).await.unwrap_or_default(),
        };
        Ok(Self { inner: Arc::new(CartInner { app, shopper, cart: RwLock::new(cart), live: Mutex::new(None) }) })
    }

    /// Restores the cart and keeps it in sync with the durable record.
    pub async fn open(app: Storefront, shopper: Option<Identity>) -> Result<Self> {
        let engine = Self::load(app, shopper).await?;
        engine.attach_live();
        Ok(engine)
    }

    pub fn shopper(&self) -> Option<&Identity> { self.inner.shopper.as_ref() }

    pub async fn cart(&self) -> Cart { self.inner.cart.read().await.clone() }
    pub async fn lines(&self) -> Vec<CartLine> { self.inner.cart.read().await.lines().to_vec() }
    pub async fn item_count(&self) -> u32 { self.inner.cart.read().await.item_count() }
    pub async fn total(&self) -> Result<rust_decimal::Decimal> { self.inner.cart.read().await.total() }

    /// Adds `quantity` of `product` in `size`, merging with an existing line.
    /// Prices are captured now and never follow later product edits.
    pub async fn add(&self, product: &Product, size: Size, quantity: Quantity) -> Result<()> {
        let line = CartLine::capture(product, size, quantity)?;
        tracing::info!(product_id = %line.product_id, size = %line.size, quantity = line.quantity, "add to cart");
        self.mutate(|cart| cart.add_line(line)).await
    }

    pub async fn add_by_id(&self, product_id: &str, size: Size, quantity: Quantity) -> Result<()> {
        let product = self.inner.app.catalog().get(product_id).await?;
        self.add(&product, size, quantity).await
    }

    /// Returns whether a line was removed.
    pub async fn remove(&self, product_id: &str, size: &Size) -> Result<bool> {
        self.mutate(|cart| Ok(cart.remove_line(product_id, size))).await
    }

    /// Quantities below one leave the cart untouched and return false.
    pub async fn update_quantity(&self, product_id: &str, size: &Size, quantity: u32) -> Result<bool> {
        self.mutate(|cart| cart.update_quantity(product_id, size, quantity)).await
    }

    pub async fn clear(&self) -> Result<()> {
        self.mutate(|cart| {
            cart.clear();
            Ok(())
        })
        .await
    }

    /// Turns the cart into a `Pending` order and empties it.
    ///
    /// The order id is the cart's checkout token and is created only if
    /// absent, so repeating a checkout whose cart clear never landed finishes
    /// the clear without a second order.
    pub async fn checkout(&self) -> Result<Order> {
        let identity = self.inner.shopper.as_ref().ok_or(StorefrontError::NotAuthenticated)?;
        let app = &self.inner.app;
        let mut current = self.inner.cart.write().await;
        if current.is_empty() {
            return Err(StorefrontError::EmptyCart);
        }

        let mobile = match app.store().get(USERS, &identity.uid).await? {
            Some(doc) => doc.decode::<User>().ok().and_then(|u| u.mobile),
            None => None,
        };
        let contact = ContactInfo { email: identity.email.clone(), mobile };
        let order = Order::place(&identity.uid, contact, &current, Utc::now())?;

        let placed = match app.store().insert(ORDERS, &order.id, encode(&order)?).await {
            Ok(()) => true,
            Err(StoreError::AlreadyExists { .. }) => {
                tracing::info!(order_id = %order.id, "order already placed for this cart, finishing checkout");
                false
            }
            Err(e) => return Err(e.into()),
        };
        let order = if placed { order } else { app.orders().get(&order.id).await? };

        let mut cleared = current.clone();
        cleared.clear();
        self.persist(&cleared).await?;
        *current = cleared;
        drop(current);

        if placed {
            tracing::info!(order_id = %order.id, uid = %identity.uid, total = %order.total_amount, "order placed");
            let event = OrderEvent::Placed { order_id: order.id.clone(), user_id: order.user_id.clone(), total: order.total_amount };
            app.bus().publish(&DomainEvent::Order(event)).await;
        }
        Ok(order)
    }

    async fn mutate<R>(&self, f: impl FnOnce(&mut Cart) -> Result<R>) -> Result<R> {
        let mut current = self.inner.cart.write().await;
        let mut next = current.clone();
        let out = f(&mut next)?;
        if next != *current {
            self.persist(&next).await?;
            *current = next;
        }
        Ok(out)
    }

    async fn persist(&self, cart: &Cart) -> Result<()> {
        let app = &self.inner.app;
        match &self.inner.shopper {
            Some(identity) => {
                app.store().set(USER_CARTS, &identity.uid, encode(cart)?, false).await?;
                cache::store(app.cache(), &cache::cart_key(&identity.uid), cart).await;
            }
            None => cache::store(app.cache(), GUEST_CART_KEY, cart).await,
        }
        Ok(())
    }

    fn attach_live(&self) {
        let Some(identity) = &self.inner.shopper else { return };
        let uid = identity.uid.clone();
        let mut sub = self.inner.app.store().subscribe(Query::document(USER_CARTS, &uid));
        let weak: Weak<CartInner> = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while let Some(snapshot) = sub.next().await {
                let Some(inner) = weak.upgrade() else { return };
                let docs = match snapshot {
                    Ok(docs) => docs,
                    Err(e) => {
                        tracing::warn!(uid = %uid, error = %e, "cart subscription error");
                        continue;
                    }
                };
                // A missing document keeps the local cart.
                let Some(doc) = docs.first() else { continue };
                match doc.decode::<Cart>() {
                    Ok(cart) => {
                        let mut current = inner.cart.write().await;
                        if *current != cart {
                            tracing::debug!(uid = %uid, "durable cart changed, replacing local state");
                            cache::store(inner.app.cache(), &cache::cart_key(&uid), &cart).await;
                            *current = cart;
                        }
                    }
                    Err(e) => tracing::warn!(uid = %uid, error = %e, "unreadable durable cart"),
                }
            }
        });
        if let Ok(mut live) = self.inner.live.lock() {
            if let Some(previous) = live.replace(task) {
                previous.abort();
            }
        }
    }
}

/// Durable record first; a missing record adopts a non-empty guest cart; an
/// unreachable store falls back to the cached copy.
async fn restore(app: &Storefront, identity: &Identity) -> Result<Cart> {
    let key = cache::cart_key(&identity.uid);
    match app.store().get(USER_CARTS, &identity.uid).await {
        Ok(Some(doc)) => {
            let cart: Cart = doc.decode()?;
            cache::store(app.cache(), &key, &cart).await;
            Ok(cart)
        }
        Ok(None) => {
            let guest: Option<Cart> = cache::load(app.cache(), GUEST_CART_KEY).await;
            match guest.filter(|cart| !cart.is_empty()) {
                Some(cart) => {
                    tracing::info!(uid = %identity.uid, lines = cart.lines().len(), "adopting guest cart");
                    app.store().set(USER_CARTS, &identity.uid, encode(&cart)?, false).await?;
                    cache::store(app.cache(), &key, &cart).await;
                    cache::evict(app.cache(), GUEST_CART_KEY).await;
                    Ok(cart)
                }
                None => Ok(Cart::new()),
            }
        }
        Err(e) => {
            tracing::warn!(uid = %identity.uid, error = %e, "durable cart unavailable, using cached copy");
            Ok(cache::load::<Cart>(app.cache(), &key).await.unwrap_or_default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{OrderStatus, ProductDraft};
    use crate::StorefrontConfig;
    use rust_decimal::Decimal;

    fn app() -> Storefront { Storefront::in_memory(StorefrontConfig::with_secret("k".repeat(32))) }

    fn shopper(uid: &str) -> Identity { Identity { uid: uid.into(), email: format!("{uid}@shop.test") } }

    async fn product(app: &Storefront, name: &str, amount: i64, discount: i64) -> Product {
        let draft = ProductDraft { name: name.into(), amount: Decimal::from(amount), discount: Decimal::from(discount), image: "i.png".into() };
        app.admin().create_product(draft).await.unwrap()
    }

    #[tokio::test]
    async fn test_add_merges_and_writes_through() {
        let app = app();
        let tee = product(&app, "Tee", 100, 10).await;
        let engine = CartEngine::load(app.clone(), Some(shopper("u1"))).await.unwrap();
        engine.add(&tee, Size::new("M"), Quantity::new(1).unwrap()).await.unwrap();
        engine.add(&tee, Size::new("M"), Quantity::new(2).unwrap()).await.unwrap();
        engine.add(&tee, Size::new("L"), Quantity::one()).await.unwrap();

        let lines = engine.lines().await;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(engine.item_count().await, 4);
        assert_eq!(engine.total().await.unwrap(), Decimal::from(360));

        let durable: Cart = app.store().get(USER_CARTS, "u1").await.unwrap().unwrap().decode().unwrap();
        assert_eq!(durable, engine.cart().await);
        let cached: Option<Cart> = cache::load(app.cache(), &cache::cart_key("u1")).await;
        assert_eq!(cached, Some(engine.cart().await));
    }

    #[tokio::test]
    async fn test_remove_and_quantity() {
        let app = app();
        let tee = product(&app, "Tee", 10, 0).await;
        let engine = CartEngine::load(app, Some(shopper("u1"))).await.unwrap();
        engine.add(&tee, Size::new("S"), Quantity::one()).await.unwrap();
        engine.add(&tee, Size::new("M"), Quantity::one()).await.unwrap();

        assert!(!engine.update_quantity(&tee.id, &Size::new("S"), 0).await.unwrap());
        assert!(engine.update_quantity(&tee.id, &Size::new("S"), 5).await.unwrap());
        assert!(engine.remove(&tee.id, &Size::new("M")).await.unwrap());
        assert!(!engine.remove(&tee.id, &Size::new("M")).await.unwrap());

        let lines = engine.lines().await;
        assert_eq!(lines.len(), 1);
        assert_eq!((lines[0].size.as_str(), lines[0].quantity), ("S", 5));
    }

    #[tokio::test]
    async fn test_checkout_requires_identity_then_lines() {
        let app = app();
        let guest = CartEngine::load(app.clone(), None).await.unwrap();
        assert_eq!(guest.checkout().await, Err(StorefrontError::NotAuthenticated));

        let engine = CartEngine::load(app.clone(), Some(shopper("u1"))).await.unwrap();
        assert_eq!(engine.checkout().await, Err(StorefrontError::EmptyCart));
        assert!(app.orders().all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_snapshots_and_clears() {
        let app = app();
        let tee = product(&app, "Tee", 100, 10).await;
        let engine = CartEngine::load(app.clone(), Some(shopper("u1"))).await.unwrap();
        engine.add(&tee, Size::new("S"), Quantity::one()).await.unwrap();
        let token = engine.cart().await.checkout_token().to_string();

        let order = engine.checkout().await.unwrap();
        assert_eq!(order.id, token);
        assert_eq!(order.total_amount, Decimal::from(90));
        assert_eq!(order.items[0].final_price, Decimal::from(90));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.user_mobile, "Not Provided");
        assert!(engine.cart().await.is_empty());
        assert_ne!(engine.cart().await.checkout_token(), token);
    }

    #[tokio::test]
    async fn test_edit_after_landed_order_places_a_new_one() {
        let app = app();
        let mug = product(&app, "Mug", 12, 0).await;
        let hat = product(&app, "Hat", 30, 0).await;
        let engine = CartEngine::load(app.clone(), Some(shopper("u1"))).await.unwrap();
        engine.add(&mug, Size::default(), Quantity::one()).await.unwrap();

        // Order written, cart clear lost.
        let landed = Order::place("u1", ContactInfo::default(), &engine.cart().await, Utc::now()).unwrap();
        app.store().insert(ORDERS, &landed.id, encode(&landed).unwrap()).await.unwrap();

        engine.add(&hat, Size::default(), Quantity::one()).await.unwrap();
        let order = engine.checkout().await.unwrap();
        assert_ne!(order.id, landed.id);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.total_amount, Decimal::from(42));
        assert!(engine.cart().await.is_empty());
        assert_eq!(app.orders().all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_overflowing_add_leaves_cart_unchanged() {
        let app = app();
        let draft = ProductDraft {
            name: "Yacht".into(), amount: Decimal::from_i128_with_scale(20_000_000_000_000_000_000, 0),
            discount: Decimal::ZERO, image: "i.png".into(),
        };
        let yacht = app.admin().create_product(draft).await.unwrap();
        let engine = CartEngine::load(app.clone(), Some(shopper("u1"))).await.unwrap();
        engine.add(&yacht, Size::default(), Quantity::one()).await.unwrap();

        let flood = engine.add(&yacht, Size::default(), Quantity::new(u32::MAX).unwrap()).await;
        assert!(matches!(flood, Err(StorefrontError::Validation(_))));
        assert_eq!(engine.item_count().await, 1);
        let durable: Cart = app.store().get(USER_CARTS, "u1").await.unwrap().unwrap().decode().unwrap();
        assert_eq!(durable.lines()[0].quantity, 1);
        assert!(engine.total().await.is_ok());
    }

    #[tokio::test]
    async fn test_guest_cart_adopted_on_sign_in() {
        let app = app();
        let tee = product(&app, "Tee", 10, 0).await;
        let guest = CartEngine::load(app.clone(), None).await.unwrap();
        guest.add(&tee, Size::default(), Quantity::one()).await.unwrap();

        let engine = CartEngine::load(app.clone(), Some(shopper("u9"))).await.unwrap();
        assert_eq!(engine.item_count().await, 1);
        assert!(app.store().get(USER_CARTS, "u9").await.unwrap().is_some());
        assert!(app.cache().get(GUEST_CART_KEY).await.unwrap().is_none());
    }
}
