//! Application container shared by sessions and HTTP handlers.

use std::sync::Arc;

use chrono::Duration;

use crate::auth::{AuthProvider, LocalAuth};
use crate::bus::EventBus;
use crate::cache::{LocalCache, MemoryCache};
use crate::config::StorefrontConfig;
use crate::domain::aggregates::StatusPolicy;
use crate::services::{Accounts, Admin, Catalog, Orders};
use crate::store::{DocumentStore, MemoryStore};

/// Cheaply cloneable handle to every collaborator.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    config: StorefrontConfig,
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
    cache: Arc<dyn LocalCache>,
    bus: EventBus,
}

impl Storefront {
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthProvider>,
        cache: Arc<dyn LocalCache>,
        bus: EventBus,
    ) -> Self {
        tracing::info!(store = store.backend_tag(), events = bus.is_connected(), "storefront assembled");
        Self { inner: Arc::new(StorefrontInner { config, store, auth, cache, bus }) }
    }

    /// Fully in-process storefront: memory store and cache, local auth, no
    /// event transport.
    pub fn in_memory(config: StorefrontConfig) -> Self {
        let auth = Arc::new(LocalAuth::new(config.jwt_secret.clone(), Duration::hours(config.session_ttl_hours)));
        Self::new(config, Arc::new(MemoryStore::new()), auth, Arc::new(MemoryCache::new()), EventBus::disconnected())
    }

    pub fn config(&self) -> &StorefrontConfig { &self.inner.config }
    pub fn store(&self) -> &dyn DocumentStore { self.inner.store.as_ref() }
    pub fn auth(&self) -> &dyn AuthProvider { self.inner.auth.as_ref() }
    pub fn cache(&self) -> &dyn LocalCache { self.inner.cache.as_ref() }
    pub fn bus(&self) -> &EventBus { &self.inner.bus }
    pub fn status_policy(&self) -> StatusPolicy { self.inner.config.status_policy }

    pub fn catalog(&self) -> Catalog { Catalog::new(self.clone()) }
    pub fn orders(&self) -> Orders { Orders::new(self.clone()) }
    pub fn admin(&self) -> Admin { Admin::new(self.clone()) }
    pub fn accounts(&self) -> Accounts { Accounts::new(self.clone()) }
    pub fn request_accounts(&self) -> Accounts { Accounts::detached(self.clone()) }
}
