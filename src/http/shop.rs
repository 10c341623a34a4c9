//! Shopper routes: accounts, catalog, cart, checkout, orders and profile.

use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::ApiResult;
use super::extract::Shopper;
use crate::domain::aggregates::{Address, Cart, CartLine, Order, Product, Role, TimelineStep, User};
use crate::domain::value_objects::{Quantity, Size};
use crate::services::{CartEngine, Registration, SignedIn};
use crate::{Storefront, StorefrontError};

#[derive(Debug, Deserialize)] pub struct LoginRequest { pub email: String, pub password: String }
#[derive(Debug, Deserialize)] pub struct PasswordResetRequest { pub email: String }
#[derive(Debug, Deserialize)] pub struct SearchParams { pub search: Option<String> }

#[derive(Debug, Serialize)]
pub struct AuthResponse { pub token: String, pub uid: String, pub email: String, pub role: Role, pub landing: &'static str }

impl From<SignedIn> for AuthResponse {
    fn from(s: SignedIn) -> Self {
        Self { token: s.credentials.token, uid: s.credentials.identity.uid, email: s.credentials.identity.email, role: s.user.role, landing: s.landing }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub item_count: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    pub checkout_token: String,
}

impl TryFrom<Cart> for CartView {
    type Error = StorefrontError;

    fn try_from(cart: Cart) -> Result<Self, Self::Error> {
        Ok(Self { item_count: cart.item_count(), total: cart.total()?, checkout_token: cart.checkout_token().to_string(), items: cart.lines().to_vec() })
    }
}

#[derive(Debug, Serialize)]
pub struct OrderView { #[serde(flatten)] pub order: Order, pub timeline: Vec<TimelineStep> }

impl From<Order> for OrderView {
    fn from(order: Order) -> Self { Self { timeline: order.timeline(), order } }
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddItemRequest {
    #[serde(rename = "productId")]
    #[validate(length(min = 1, message = "productId is required"))]
    pub product_id: String,
    pub size: Option<String>,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest { #[serde(rename = "productId")] pub product_id: String, pub size: Option<String>, pub quantity: u32 }

#[derive(Debug, Deserialize)]
pub struct LineKey { #[serde(rename = "productId")] pub product_id: String, pub size: Option<String> }

pub async fn register(State(app): State<Storefront>, Json(r): Json<Registration>) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    Ok((StatusCode::CREATED, Json(app.request_accounts().register(r).await?.into())))
}

pub async fn login(State(app): State<Storefront>, Json(r): Json<LoginRequest>) -> ApiResult<Json<AuthResponse>> {
    Ok(Json(app.request_accounts().login(&r.email, &r.password).await?.into()))
}

pub async fn logout(State(app): State<Storefront>, Shopper(_): Shopper) -> ApiResult<StatusCode> {
    app.request_accounts().logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn password_reset(State(app): State<Storefront>, Json(r): Json<PasswordResetRequest>) -> ApiResult<StatusCode> {
    app.request_accounts().request_password_reset(&r.email).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn list_products(State(app): State<Storefront>, Query(p): Query<SearchParams>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(app.catalog().search(p.search.as_deref().unwrap_or_default()).await?))
}

pub async fn get_product(State(app): State<Storefront>, Path(id): Path<String>) -> ApiResult<Json<Product>> {
    Ok(Json(app.catalog().get(&id).await?))
}

pub async fn get_cart(State(app): State<Storefront>, Shopper(who): Shopper) -> ApiResult<Json<CartView>> {
    let engine = CartEngine::load(app, Some(who)).await?;
    Ok(Json(CartView::try_from(engine.cart().await)?))
}

pub async fn clear_cart(State(app): State<Storefront>, Shopper(who): Shopper) -> ApiResult<Json<CartView>> {
    let engine = CartEngine::load(app, Some(who)).await?;
    engine.clear().await?;
    Ok(Json(CartView::try_from(engine.cart().await)?))
}

pub async fn add_item(State(app): State<Storefront>, Shopper(who): Shopper, Json(r): Json<AddItemRequest>) -> ApiResult<(StatusCode, Json<CartView>)> {
    r.validate()?;
    let engine = CartEngine::load(app, Some(who)).await?;
    engine.add_by_id(&r.product_id, Size::from(r.size), Quantity::new(r.quantity.unwrap_or(1))?).await?;
    Ok((StatusCode::CREATED, Json(CartView::try_from(engine.cart().await)?)))
}

pub async fn set_quantity(State(app): State<Storefront>, Shopper(who): Shopper, Json(r): Json<SetQuantityRequest>) -> ApiResult<Json<CartView>> {
    let engine = CartEngine::load(app, Some(who)).await?;
    engine.update_quantity(&r.product_id, &Size::from(r.size), r.quantity).await?;
    Ok(Json(CartView::try_from(engine.cart().await)?))
}

pub async fn remove_item(State(app): State<Storefront>, Shopper(who): Shopper, Query(k): Query<LineKey>) -> ApiResult<Json<CartView>> {
    let engine = CartEngine::load(app, Some(who)).await?;
    engine.remove(&k.product_id, &Size::from(k.size)).await?;
    Ok(Json(CartView::try_from(engine.cart().await)?))
}

pub async fn checkout(State(app): State<Storefront>, Shopper(who): Shopper) -> ApiResult<(StatusCode, Json<OrderView>)> {
    let order = CartEngine::load(app, Some(who)).await?.checkout().await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

pub async fn list_orders(State(app): State<Storefront>, Shopper(who): Shopper) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(app.orders().for_customer(&who.uid).await?))
}

pub async fn get_order(State(app): State<Storefront>, Shopper(who): Shopper, Path(id): Path<String>) -> ApiResult<Json<OrderView>> {
    Ok(Json(app.orders().get_for_customer(&who.uid, &id).await?.into()))
}

pub async fn get_profile(State(app): State<Storefront>, Shopper(who): Shopper) -> ApiResult<Json<User>> {
    Ok(Json(app.request_accounts().profile(&who.uid).await?))
}

pub async fn update_address(State(app): State<Storefront>, Shopper(who): Shopper, Json(address): Json<Address>) -> ApiResult<Json<User>> {
    Ok(Json(app.request_accounts().update_address(&who.uid, address).await?))
}
