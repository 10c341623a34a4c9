//! Storefront - catalog, cart, checkout and back-office API

use anyhow::Result;
use chrono::Duration;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront::auth::LocalAuth;
use storefront::bus::EventBus;
use storefront::cache::{FileCache, LocalCache, MemoryCache};
use storefront::store::{DocumentStore, MemoryStore, PgStore};
use storefront::{http, Storefront, StorefrontConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = StorefrontConfig::from_env()?;

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => {
            let (store, _listener) = PgStore::connect(url).await?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, documents are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };
    let cache: Arc<dyn LocalCache> = match &config.cache_dir {
        Some(dir) => Arc::new(FileCache::open(dir).await?),
        None => Arc::new(MemoryCache::new()),
    };
    let bus = match &config.nats_url {
        Some(url) => EventBus::connect(url).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "NATS unavailable, events are only logged");
            EventBus::disconnected()
        }),
        None => EventBus::disconnected(),
    };
    let auth = Arc::new(LocalAuth::new(config.jwt_secret.clone(), Duration::hours(config.session_ttl_hours)));

    let addr = config.socket_addr();
    let app = http::router(Storefront::new(config, store, auth, cache, bus));
    tracing::info!("🚀 Storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
