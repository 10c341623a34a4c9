//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::aggregates::{Cart, CartLine};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::pricing;
use crate::domain::value_objects::Size;
use crate::{Result, StorefrontError};

/// Mobile placeholder stored when the shopper never provided one.
pub const MOBILE_NOT_PROVIDED: &str = "Not Provided";

/// Immutable copy of a cart line taken at checkout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(rename = "productId")]
    pub product_id: String,
    #[serde(rename = "productName", default)]
    pub product_name: String,
    #[serde(default)]
    pub size: Size,
    pub quantity: u32,
    #[serde(rename = "Amount", default, with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "Discount", default, with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(rename = "FinalPrice", default, with = "rust_decimal::serde::float")]
    pub final_price: Decimal,
    #[serde(default)]
    pub image: String,
}

impl From<&CartLine> for OrderLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id.clone(), product_name: line.product_name.clone(), size: line.size.clone(),
            quantity: line.quantity.max(1), amount: line.amount, discount: line.discount, final_price: line.unit_price(),
            image: line.image.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContactInfo { pub email: String, pub mobile: Option<String> }

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "userEmail", default)]
    pub user_email: String,
    #[serde(rename = "userMobile", default)]
    pub user_mobile: String,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    #[serde(rename = "totalAmount", default, with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "checkoutToken", default, skip_serializing_if = "Option::is_none")]
    pub checkout_token: Option<String>,
}

/// Delivery progress, in strict forward order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered }

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimelineStep { pub status: OrderStatus, pub active: bool }

/// Which administrator transitions are accepted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Any status may be set from any other.
    #[default]
    Permissive,
    /// Status may only stay or move towards `Delivered`.
    ForwardOnly,
}

impl OrderStatus {
    pub const STEPS: [OrderStatus; 4] = [Self::Pending, Self::Processing, Self::Shipped, Self::Delivered];

    pub fn index(&self) -> usize { *self as usize }
    pub fn is_terminal(&self) -> bool { *self == Self::Delivered }
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "Pending", Self::Processing => "Processing", Self::Shipped => "Shipped", Self::Delivered => "Delivered" }
    }

    /// Case-insensitive; anything unrecognized renders as `Pending`.
    pub fn parse_lossy(value: &str) -> Self { value.parse().unwrap_or_default() }
}

impl FromStr for OrderStatus {
    type Err = StorefrontError;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            other => Err(StorefrontError::validation(format!("Unknown order status: {other}"))),
        }
    }
}

impl From<String> for OrderStatus { fn from(s: String) -> Self { Self::parse_lossy(&s) } }
impl From<OrderStatus> for &'static str { fn from(s: OrderStatus) -> Self { s.as_str() } }

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl StatusPolicy {
    pub fn permits(&self, from: OrderStatus, to: OrderStatus) -> bool {
        match self { Self::Permissive => true, Self::ForwardOnly => to.index() >= from.index() }
    }
}

impl FromStr for StatusPolicy {
    type Err = StorefrontError;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "forward-only" | "forward_only" => Ok(Self::ForwardOnly),
            other => Err(StorefrontError::validation(format!("Unknown status policy: {other}"))),
        }
    }
}

impl Order {
    /// Snapshots every cart line into a `Pending` order keyed by the cart's
    /// checkout token.
    pub fn place(user_id: impl Into<String>, contact: ContactInfo, cart: &Cart, now: DateTime<Utc>) -> Result<Self> {
        if cart.is_empty() { return Err(StorefrontError::EmptyCart); }
        let items: Vec<OrderLine> = cart.lines().iter().map(OrderLine::from).collect();
        let total = pricing::sum(items.iter().map(|i| pricing::line_total(i.final_price, i.quantity)))?;
        let mobile = contact.mobile.filter(|m| !m.trim().is_empty()).unwrap_or_else(|| MOBILE_NOT_PROVIDED.to_string());
        Ok(Self {
            id: cart.checkout_token().to_string(), user_id: user_id.into(), user_email: contact.email, user_mobile: mobile,
            items, total_amount: total, status: OrderStatus::Pending, created_at: Some(now),
            checkout_token: Some(cart.checkout_token().to_string()),
        })
    }

    pub fn status(&self) -> OrderStatus { self.status }

    /// Returns the event describing the change; line items are never touched.
    pub fn set_status(&mut self, to: OrderStatus, policy: StatusPolicy) -> Result<DomainEvent> {
        let from = self.status;
        if !policy.permits(from, to) {
            return Err(StorefrontError::validation(format!("Order {} cannot move from {from} back to {to}", self.id)));
        }
        self.status = to;
        Ok(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id.clone(), from, to }))
    }

    pub fn timeline(&self) -> Vec<TimelineStep> {
        let current = self.status.index();
        OrderStatus::STEPS.iter().map(|s| TimelineStep { status: *s, active: s.index() <= current }).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Product;
    use crate::domain::value_objects::Quantity;

    fn cart_with(amount: i64, discount: i64, qty: u32) -> Cart {
        let product = Product {
            id: "A".into(), name: "Latte".into(), amount: Decimal::new(amount, 0), discount: Decimal::new(discount, 0),
            image: "i".into(), final_price: Decimal::ZERO, created_at: None, updated_at: None,
        };
        let mut cart = Cart::new();
        cart.add_line(CartLine::capture(&product, Size::new("S"), Quantity::new(qty).unwrap()).unwrap()).unwrap();
        cart
    }

    fn contact() -> ContactInfo { ContactInfo { email: "a@b.c".into(), mobile: None } }

    #[test]
    fn test_order_snapshot() {
        let cart = cart_with(100, 10, 1);
        let order = Order::place("u1", contact(), &cart, Utc::now()).unwrap();
        assert_eq!(order.total_amount, Decimal::new(9000, 2));
        assert_eq!(order.items[0].final_price, Decimal::new(9000, 2));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.user_mobile, MOBILE_NOT_PROVIDED);
        assert_eq!(order.id, cart.checkout_token());
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert_eq!(Order::place("u1", contact(), &Cart::new(), Utc::now()), Err(StorefrontError::EmptyCart));
    }

    #[test]
    fn test_permissive_jump_to_delivered() {
        let mut order = Order::place("u1", contact(), &cart_with(10, 0, 2), Utc::now()).unwrap();
        order.set_status(OrderStatus::Delivered, StatusPolicy::Permissive).unwrap();
        assert!(order.timeline().iter().all(|s| s.active));
        order.set_status(OrderStatus::Processing, StatusPolicy::Permissive).unwrap();
        let active: Vec<bool> = order.timeline().iter().map(|s| s.active).collect();
        assert_eq!(active, vec![true, true, false, false]);
    }

    #[test]
    fn test_forward_only_rejects_backwards() {
        let mut order = Order::place("u1", contact(), &cart_with(10, 0, 2), Utc::now()).unwrap();
        order.set_status(OrderStatus::Shipped, StatusPolicy::ForwardOnly).unwrap();
        assert!(order.set_status(OrderStatus::Pending, StatusPolicy::ForwardOnly).is_err());
        assert_eq!(order.status(), OrderStatus::Shipped);
    }

    #[test]
    fn test_unknown_status_renders_as_pending() {
        let order: Order = serde_json::from_value(serde_json::json!({"userId": "u1", "status": "on-hold"})).unwrap();
        assert_eq!(order.status().index(), 0);
        assert_eq!(OrderStatus::parse_lossy("SHIPPED"), OrderStatus::Shipped);
        assert!("bogus".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_capitalized() {
        assert_eq!(serde_json::to_value(OrderStatus::Shipped).unwrap(), serde_json::json!("Shipped"));
    }
}
