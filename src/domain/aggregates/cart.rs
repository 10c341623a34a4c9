//! Cart Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::domain::pricing;
use crate::domain::value_objects::{Quantity, Size};
use crate::Result;

/// One (product, size) entry with prices captured when it was added.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(rename = "id")]
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
    #[serde(rename = "Image", default)]
    pub image: String,
}

impl CartLine {
    pub fn capture(product: &Product, size: Size, quantity: Quantity) -> Result<Self> {
        let final_price = pricing::final_price(product.amount, product.discount)?;
        Ok(Self {
            product_id: product.id.clone(), product_name: product.name.clone(), size, quantity: quantity.value(),
            amount: product.amount, discount: product.discount, final_price, image: product.image.clone(),
        })
    }

    /// Unit price re-derived from the captured amount and discount.
    pub fn unit_price(&self) -> Decimal {
        pricing::final_price(self.amount, self.discount).unwrap_or(self.final_price)
    }

    pub fn line_total(&self) -> Result<Decimal> { pricing::line_total(self.unit_price(), self.quantity.max(1)) }

    fn is(&self, product_id: &str, size: &Size) -> bool { self.product_id == product_id && &self.size == size }
}

/// Shopper cart, persisted as the `userCarts/<uid>` document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    #[serde(rename = "items", default)]
    lines: Vec<CartLine>,
    /// Idempotency key of the order this exact set of lines will become.
    /// Renewed whenever the lines change.
    #[serde(rename = "checkoutToken", default = "new_checkout_token")]
    checkout_token: String,
}

fn new_checkout_token() -> String { Uuid::new_v4().simple().to_string() }

impl Default for Cart {
    fn default() -> Self { Self { lines: vec![], checkout_token: new_checkout_token() } }
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn checkout_token(&self) -> &str { &self.checkout_token }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn item_count(&self) -> u32 { self.lines.iter().map(|l| l.quantity).sum() }

    pub fn total(&self) -> Result<Decimal> {
        pricing::sum(self.lines.iter().map(CartLine::line_total))
    }

    pub fn line(&self, product_id: &str, size: &Size) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.is(product_id, size))
    }

    /// Merges into an existing (product, size) line or appends a new one.
    /// Fails without touching the cart when the total would not fit.
    pub fn add_line(&mut self, line: CartLine) -> Result<()> {
        let mut lines = self.lines.clone();
        if let Some(existing) = lines.iter_mut().find(|l| l.is(&line.product_id, &line.size)) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
        } else {
            lines.push(line);
        }
        self.replace_lines(lines)
    }

    /// Returns false when no line matched.
    pub fn remove_line(&mut self, product_id: &str, size: &Size) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| !l.is(product_id, size));
        let removed = self.lines.len() != before;
        if removed {
            self.checkout_token = new_checkout_token();
        }
        removed
    }

    /// Quantities below one are ignored; removal is a separate action.
    pub fn update_quantity(&mut self, product_id: &str, size: &Size, quantity: u32) -> Result<bool> {
        if quantity < 1 { return Ok(false); }
        let mut lines = self.lines.clone();
        match lines.iter_mut().find(|l| l.is(product_id, size)) {
            Some(line) if line.quantity == quantity => return Ok(true),
            Some(line) => line.quantity = quantity,
            None => return Ok(false),
        }
        self.replace_lines(lines)?;
        Ok(true)
    }

    fn replace_lines(&mut self, lines: Vec<CartLine>) -> Result<()> {
        let candidate = Self { lines, checkout_token: new_checkout_token() };
        candidate.total()?;
        *self = candidate;
        Ok(())
    }

    /// Empties the cart and starts a new checkout generation.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.checkout_token = new_checkout_token();
    }
}
