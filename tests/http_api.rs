//! HTTP API driven through the router without a listener.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use storefront::services::Registration;
use storefront::{http, Session, Storefront, StorefrontConfig};

fn router() -> Router {
    let mut config = StorefrontConfig::with_secret("http-api-secret-http-api-secret-xx");
    config.admin_email = Some("admin@shop.test".into());
    http::router(Storefront::in_memory(config))
}

async fn call(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value, Option<String>) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(json) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let location = response.headers().get(header::LOCATION).map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value, location)
}

async fn register(app: &Router, name: &str, email: &str) -> String {
    let (status, body, _) = call(app, "POST", "/api/v1/auth/register", None, Some(json!({"name": name, "email": email, "password": "pass-word-1"}))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health() {
    let (status, body, _) = call(&router(), "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn shopper_checkout_and_admin_fulfilment() {
    let app = router();
    let admin = register(&app, "Admin", "admin@shop.test").await;
    let shopper = register(&app, "Ann", "ann@shop.test").await;

    let (status, product, _) = call(&app, "POST", "/api/v1/admin/products", Some(&admin),
        Some(json!({"productName": "Linen Shirt", "Amount": 100, "Discount": 10, "Image": "shirt.png"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["FinalPrice"], 90.0);
    let product_id = product["id"].as_str().unwrap().to_string();

    let (_, found, _) = call(&app, "GET", "/api/v1/products?search=linen", None, None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (status, cart, _) = call(&app, "POST", "/api/v1/cart/items", Some(&shopper), Some(json!({"productId": product_id, "size": "S"}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(cart["itemCount"], 1);
    let (_, cart, _) = call(&app, "PUT", "/api/v1/cart/items", Some(&shopper), Some(json!({"productId": product_id, "size": "S", "quantity": 2}))).await;
    assert_eq!(cart["total"], 180.0);

    let (status, order, _) = call(&app, "POST", "/api/v1/checkout", Some(&shopper), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["totalAmount"], 180.0);
    assert_eq!(order["status"], "Pending");
    let order_id = order["id"].as_str().unwrap().to_string();

    let (status, _, _) = call(&app, "POST", "/api/v1/checkout", Some(&shopper), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _, location) = call(&app, "GET", "/api/v1/admin/orders", Some(&shopper), None).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(location.as_deref(), Some("/products"));

    let uri = format!("/api/v1/admin/orders/{order_id}/status");
    let (status, updated, _) = call(&app, "PUT", &uri, Some(&admin), Some(json!({"status": "Delivered"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated["timeline"].as_array().unwrap().iter().all(|s| s["active"] == true));
    let (status, _, _) = call(&app, "PUT", &uri, Some(&admin), Some(json!({"status": "Teleported"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, mine, _) = call(&app, "GET", &format!("/api/v1/orders/{order_id}"), Some(&shopper), None).await;
    assert_eq!(mine["status"], "Delivered");

    let (_, dashboard, _) = call(&app, "GET", "/api/v1/admin/dashboard", Some(&admin), None).await;
    assert_eq!(dashboard["orders"], 1);
    assert_eq!(dashboard["users"], 2);
    assert_eq!(dashboard["revenueByDay"][0]["revenue"], 180.0);
}

#[tokio::test]
async fn auth_errors() {
    let app = router();
    let (status, _, _) = call(&app, "GET", "/api/v1/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _, _) = call(&app, "GET", "/api/v1/cart", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    register(&app, "Ann", "ann@shop.test").await;
    let (status, body, _) = call(&app, "POST", "/api/v1/auth/login", None, Some(json!({"email": "ann@shop.test", "password": "nope-nope"}))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, body, _) = call(&app, "POST", "/api/v1/auth/login", None, Some(json!({"email": "ann@shop.test", "password": "pass-word-1"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["landing"], "/products");
    assert_eq!(body["role"], "user");
}

#[tokio::test]
async fn profile_and_role_management() {
    let app = router();
    let admin = register(&app, "Admin", "admin@shop.test").await;
    let shopper = register(&app, "Ann", "ann@shop.test").await;

    let (status, user, _) = call(&app, "PUT", "/api/v1/profile/address", Some(&shopper),
        Some(json!({"street": "1 Main", "city": "Pune", "state": "MH", "pincode": "411001"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["address"]["city"], "Pune");
    let uid = user["id"].as_str().unwrap().to_string();

    let (_, users, _) = call(&app, "GET", "/api/v1/admin/users", Some(&admin), None).await;
    assert_eq!(users.as_array().unwrap().len(), 2);
    let (status, promoted, _) = call(&app, "PUT", &format!("/api/v1/admin/users/{uid}/role"), Some(&admin), Some(json!({"role": "admin"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(promoted["role"], "admin");

    let (status, _, _) = call(&app, "GET", "/api/v1/admin/products", Some(&shopper), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = call(&app, "PUT", "/api/v1/admin/products/missing", Some(&admin),
        Some(json!({"productName": "X", "Amount": 1, "Image": "x.png"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_logins_leave_embedded_session_alone() {
    let app = Storefront::in_memory(StorefrontConfig::with_secret("http-api-secret-http-api-secret-xx"));
    let mut session = Session::start(app.clone()).await.unwrap();
    let owner = Registration { name: "Owner".into(), email: "owner@shop.test".into(), password: "pass-word-1".into(), mobile: None };
    app.accounts().register(owner).await.unwrap();
    assert!(session.next_change().await.unwrap());
    let signed_in = session.identity().cloned();

    let api = http::router(app.clone());
    register(&api, "Ann", "ann@shop.test").await;
    let (status, _, _) = call(&api, "POST", "/api/v1/auth/login", None, Some(json!({"email": "ann@shop.test", "password": "pass-word-1"}))).await;
    assert_eq!(status, StatusCode::OK);
    let bo = register(&api, "Bo", "bo@shop.test").await;
    let (status, _, _) = call(&api, "POST", "/api/v1/auth/logout", Some(&bo), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let moved = tokio::time::timeout(std::time::Duration::from_millis(50), session.next_change()).await;
    assert!(moved.is_err(), "shared identity changed");
    assert_eq!(session.identity().cloned(), signed_in);
    assert_eq!(signed_in.map(|i| i.email), Some("owner@shop.test".to_string()));
}
