//! Back-office routes. Every handler takes [`AdminUser`], so non-admins are
//! redirected before any work is done.

use axum::{extract::{Path, State}, http::StatusCode, Json};
use serde::Deserialize;

use super::error::ApiResult;
use super::extract::AdminUser;
use super::shop::OrderView;
use crate::domain::aggregates::{Order, OrderStatus, Product, ProductDraft, Role, User};
use crate::services::Dashboard;
use crate::Storefront;

#[derive(Debug, Deserialize)] pub struct StatusRequest { pub status: String }
#[derive(Debug, Deserialize)] pub struct RoleRequest { pub role: String }

pub async fn list_products(State(app): State<Storefront>, _: AdminUser) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(app.admin().list_products().await?))
}

pub async fn create_product(State(app): State<Storefront>, _: AdminUser, Json(draft): Json<ProductDraft>) -> ApiResult<(StatusCode, Json<Product>)> {
    Ok((StatusCode::CREATED, Json(app.admin().create_product(draft).await?)))
}

pub async fn update_product(State(app): State<Storefront>, _: AdminUser, Path(id): Path<String>, Json(draft): Json<ProductDraft>) -> ApiResult<Json<Product>> {
    Ok(Json(app.admin().update_product(&id, draft).await?))
}

pub async fn delete_product(State(app): State<Storefront>, _: AdminUser, Path(id): Path<String>) -> ApiResult<StatusCode> {
    app.admin().delete_product(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_orders(State(app): State<Storefront>, _: AdminUser) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(app.orders().all().await?))
}

pub async fn set_order_status(State(app): State<Storefront>, _: AdminUser, Path(id): Path<String>, Json(r): Json<StatusRequest>) -> ApiResult<Json<OrderView>> {
    let status: OrderStatus = r.status.parse()?;
    Ok(Json(app.orders().set_status(&id, status).await?.into()))
}

pub async fn list_users(State(app): State<Storefront>, _: AdminUser) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(app.admin().list_users().await?))
}

pub async fn set_role(State(app): State<Storefront>, _: AdminUser, Path(uid): Path<String>, Json(r): Json<RoleRequest>) -> ApiResult<Json<User>> {
    let role: Role = r.role.parse()?;
    app.admin().set_role(&uid, role).await?;
    Ok(Json(app.request_accounts().profile(&uid).await?))
}

pub async fn dashboard(State(app): State<Storefront>, _: AdminUser) -> ApiResult<Json<Dashboard>> {
    Ok(Json(app.admin().dashboard().await?))
}
