//! Client session: follows the auth identity and keeps the matching cart
//! engine and role loaded.
//!
//! The session is pull driven. Callers await [`Session::next_change`] to
//! react to sign-in and sign-out; every other accessor reflects the last
//! observed identity.

use tokio::sync::watch;

use crate::access::{self, Access};
use crate::auth::Identity;
use crate::cache::{self, USER_ORDERS_KEY};
use crate::domain::aggregates::{Order, Role};
use crate::services::{CartEngine, OrderHistory, SignedIn};
use crate::{Result, Storefront, StorefrontError};

pub struct Session {
    app: Storefront,
    identity_rx: watch::Receiver<Option<Identity>>,
    identity: Option<Identity>,
    role: Option<Role>,
    cart: CartEngine,
}

impl Session {
    pub async fn start(app: Storefront) -> Result<Self> {
        let mut identity_rx = app.auth().on_identity_change();
        let identity = identity_rx.borrow_and_update().clone();
        let role = load_role(&app, identity.as_ref()).await?;
        let cart = CartEngine::open(app.clone(), identity.clone()).await?;
        tracing::debug!(signed_in = identity.is_some(), "session started");
        Ok(Self { app, identity_rx, identity, role, cart })
    }

    /// Waits for the next identity change and reloads the shopper state.
    /// Returns `false` once the auth service has gone away.
    pub async fn next_change(&mut self) -> Result<bool> {
        if self.identity_rx.changed().await.is_err() {
            return Ok(false);
        }
        self.sync().await?;
        Ok(true)
    }

    pub fn identity(&self) -> Option<&Identity> { self.identity.as_ref() }
    pub fn role(&self) -> Option<Role> { self.role }
    pub fn cart(&self) -> &CartEngine { &self.cart }

    pub fn guard(&self, required: Option<Role>) -> Access {
        access::guard(self.role, required)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<&'static str> {
        let SignedIn { landing, .. } = self.app.accounts().login(email, password).await?;
        self.sync().await?;
        Ok(landing)
    }

    pub async fn logout(&mut self) -> Result<()> {
        self.app.accounts().logout().await?;
        cache::evict(self.app.cache(), USER_ORDERS_KEY).await;
        self.sync().await
    }

    pub async fn checkout(&self) -> Result<Order> {
        self.cart.checkout().await
    }

    pub fn orders(&self) -> Result<OrderHistory> {
        let identity = self.identity.as_ref().ok_or(StorefrontError::NotAuthenticated)?;
        Ok(self.app.orders().watch_customer(&identity.uid))
    }

    /// Rebuilds shopper state if the identity differs from the one loaded.
    async fn sync(&mut self) -> Result<()> {
        let identity = self.identity_rx.borrow_and_update().clone();
        if identity == self.identity {
            return Ok(());
        }
        tracing::info!(uid = identity.as_ref().map(|i| i.uid.as_str()), "identity changed");
        self.role = load_role(&self.app, identity.as_ref()).await?;
        self.cart = CartEngine::open(self.app.clone(), identity.clone()).await?;
        self.identity = identity;
        Ok(())
    }
}

async fn load_role(app: &Storefront, identity: Option<&Identity>) -> Result<Option<Role>> {
    match identity {
        Some(identity) => app.accounts().role_of(&identity.uid).await,
        None => Ok(None),
    }
}
