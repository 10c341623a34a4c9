//! JSON API over the storefront services.

use axum::{routing::{get, post, put}, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::Storefront;

pub mod admin;
pub mod error;
pub mod extract;
pub mod shop;

pub fn router(app: Storefront) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }))
        .route("/api/v1/auth/register", post(shop::register))
        .route("/api/v1/auth/login", post(shop::login))
        .route("/api/v1/auth/logout", post(shop::logout))
        .route("/api/v1/auth/password-reset", post(shop::password_reset))
        .route("/api/v1/products", get(shop::list_products))
        .route("/api/v1/products/:id", get(shop::get_product))
        .route("/api/v1/cart", get(shop::get_cart).delete(shop::clear_cart))
        .route("/api/v1/cart/items", post(shop::add_item).put(shop::set_quantity).delete(shop::remove_item))
        .route("/api/v1/checkout", post(shop::checkout))
        .route("/api/v1/orders", get(shop::list_orders))
        .route("/api/v1/orders/:id", get(shop::get_order))
        .route("/api/v1/profile", get(shop::get_profile))
        .route("/api/v1/profile/address", put(shop::update_address))
        .route("/api/v1/admin/products", get(admin::list_products).post(admin::create_product))
        .route("/api/v1/admin/products/:id", put(admin::update_product).delete(admin::delete_product))
        .route("/api/v1/admin/orders", get(admin::list_orders))
        .route("/api/v1/admin/orders/:id/status", put(admin::set_order_status))
        .route("/api/v1/admin/users", get(admin::list_users))
        .route("/api/v1/admin/users/:id/role", put(admin::set_role))
        .route("/api/v1/admin/dashboard", get(admin::dashboard))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(app)
}
