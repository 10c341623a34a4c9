//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_JWT_SECRET` - Session token signing secret (min 32 chars)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8083)
//! - `DATABASE_URL` - `PostgreSQL` connection string; in-memory store when unset
//! - `NATS_URL` - NATS server for domain events
//! - `STOREFRONT_SESSION_TTL_HOURS` - Session token lifetime (default: 1)
//! - `STOREFRONT_CACHE_DIR` - Directory for the local cache; in-memory when unset
//! - `STOREFRONT_STATUS_POLICY` - `permissive` (default) or `forward-only`
//! - `STOREFRONT_ADMIN_EMAIL` - Email registered with the admin role

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::aggregates::StatusPolicy;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: Option<String>,
    pub nats_url: Option<String>,
    pub jwt_secret: String,
    pub session_ttl_hours: i64,
    pub cache_dir: Option<PathBuf>,
    pub status_policy: StatusPolicy,
    pub admin_email: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the JWT secret is missing or too short, or if a
    /// variable has an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = parse_var("STOREFRONT_HOST", &env_or("STOREFRONT_HOST", "0.0.0.0"))?;
        let port = parse_var("PORT", &env_or("PORT", "8083"))?;
        let session_ttl_hours: i64 = parse_var("STOREFRONT_SESSION_TTL_HOURS", &env_or("STOREFRONT_SESSION_TTL_HOURS", "1"))?;
        if session_ttl_hours < 1 {
            return Err(ConfigError::InvalidEnvVar("STOREFRONT_SESSION_TTL_HOURS".into(), "must be at least 1".into()));
        }
        let status_policy = parse_var("STOREFRONT_STATUS_POLICY", &env_or("STOREFRONT_STATUS_POLICY", "permissive"))?;

        let jwt_secret = lookup("STOREFRONT_JWT_SECRET").ok_or_else(|| ConfigError::MissingEnvVar("STOREFRONT_JWT_SECRET".into()))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_JWT_SECRET".into(),
                format!("must be at least {MIN_JWT_SECRET_LENGTH} characters (got {})", jwt_secret.len()),
            ));
        }

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Ok(Self {
            host,
            port,
            database_url: non_empty("DATABASE_URL"),
            nats_url: non_empty("NATS_URL"),
            jwt_secret,
            session_ttl_hours,
            cache_dir: non_empty("STOREFRONT_CACHE_DIR").map(PathBuf::from),
            status_policy,
            admin_email: non_empty("STOREFRONT_ADMIN_EMAIL").map(|e| e.trim().to_lowercase()),
        })
    }

    /// In-memory configuration with defaults, used by tests and embedding.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            host: IpAddr::from([127, 0, 0, 1]),
            port: 8083,
            database_url: None,
            nats_url: None,
            jwt_secret: jwt_secret.into(),
            session_ttl_hours: 1,
            cache_dir: None,
            status_policy: StatusPolicy::default(),
            admin_email: None,
        }
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }

    pub fn is_bootstrap_admin(&self, email: &str) -> bool {
        self.admin_email.as_deref().is_some_and(|admin| admin == email.trim().to_lowercase())
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}
