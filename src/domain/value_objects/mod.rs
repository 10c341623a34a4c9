//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::StorefrontError;

/// Size used when a product has no size concept.
pub const DEFAULT_SIZE: &str = "Default";

/// Percentage discount, always within `0..=100`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Discount(Decimal);

impl Discount {
    pub fn new(percent: Decimal) -> Result<Self, StorefrontError> {
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(StorefrontError::validation(format!("Discount must be between 0 and 100, got {percent}")));
        }
        Ok(Self(percent))
    }
    pub fn none() -> Self { Self(Decimal::ZERO) }
    pub fn percent(&self) -> Decimal { self.0 }
}

/// Line quantity; never below one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Result<Self, StorefrontError> {
        if value == 0 { return Err(StorefrontError::validation("Quantity must be at least 1")); }
        Ok(Self(value))
    }
    pub fn one() -> Self { Self(1) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0)) }
}

impl Default for Quantity { fn default() -> Self { Self::one() } }

/// Free-form size label. Blank input falls back to [`DEFAULT_SIZE`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size(String);

impl Size {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() { Self::default() } else { Self(trimmed.to_string()) }
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl Default for Size { fn default() -> Self { Self(DEFAULT_SIZE.to_string()) } }

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl From<Option<String>> for Size {
    fn from(value: Option<String>) -> Self { value.map(Size::new).unwrap_or_default() }
}
