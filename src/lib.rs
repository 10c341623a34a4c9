//! Storefront
//!
//! Product catalog, shopping cart, checkout and an admin back-office layered
//! over an external document store and authentication service.
//!
//! ## Features
//! - Catalog browsing and search with discounted prices
//! - Cart with (product, size) merge, write-through persistence and live sync
//! - Idempotent checkout into immutable orders
//! - Order status tracking for customers and administrators
//! - Product CRUD, role management and a revenue dashboard for admins

pub mod access;
pub mod app;
pub mod auth;
pub mod bus;
pub mod cache;
pub mod config;
pub mod domain;
pub mod http;
pub mod services;
pub mod session;
pub mod store;

pub use app::Storefront;
pub use config::StorefrontConfig;
pub use session::Session;

use thiserror::Error;

use crate::store::StoreError;

// =============================================================================
// Error Types
// =============================================================================

/// Every failure is terminal for the user action that triggered it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorefrontError {
    #[error("{0}")]
    Auth(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("Your cart is empty!")]
    EmptyCart,

    #[error("Please login first!")]
    NotAuthenticated,

    #[error("{0}")]
    Store(String),
}

impl StorefrontError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<StoreError> for StorefrontError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { collection, id } => Self::NotFound(format!("{collection}/{id}")),
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for StorefrontError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
