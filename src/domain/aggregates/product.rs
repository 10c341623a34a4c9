//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::pricing;
use crate::Result;

/// Catalog entry as stored in the `products` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "productName", default)]
    pub name: String,
    #[serde(rename = "Amount", with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "Discount", default, with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(rename = "Image", default)]
    pub image: String,
    #[serde(rename = "FinalPrice", default, with = "rust_decimal::serde::float")]
    pub final_price: Decimal,
    #[serde(rename = "CreatedAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "UpdatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Final price derived from amount and discount; the stored value is only
    /// trusted when the pair itself is out of range.
    pub fn effective_final_price(&self) -> Decimal {
        pricing::final_price(self.amount, self.discount).unwrap_or(self.final_price)
    }

    pub fn matches(&self, search: &str) -> bool {
        self.name.to_lowercase().contains(&search.trim().to_lowercase())
    }
}

/// Admin form for creating or replacing a product.
#[derive(Clone, Debug, Default, Serialize, Deserialize, Validate)]
pub struct ProductDraft {
    #[serde(rename = "productName")]
    #[validate(length(min = 1, message = "Product name is required"))]
    pub name: String,
    #[serde(rename = "Amount", with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(rename = "Discount", default, with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    #[serde(rename = "Image")]
    #[validate(length(min = 1, message = "Image is required"))]
    pub image: String,
}

impl ProductDraft {
    /// Checks required fields and prices the draft.
    pub fn price(&self) -> Result<Decimal> {
        self.validate()?;
        if self.amount <= Decimal::ZERO {
            return Err(crate::StorefrontError::validation("Amount is required"));
        }
        pricing::final_price(self.amount, self.discount)
    }

    pub fn into_product(self, id: impl Into<String>, created_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<Product> {
        let final_price = self.price()?;
        let created_at = created_at.or(Some(now));
        Ok(Product {
            id: id.into(), name: self.name.trim().to_string(), amount: self.amount, discount: self.discount,
            image: self.image.trim().to_string(), final_price, created_at, updated_at: Some(now),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorefrontError;

    fn draft() -> ProductDraft {
        ProductDraft { name: "Cold Brew".into(), amount: Decimal::new(100, 0), discount: Decimal::new(10, 0), image: "https://img/cb.png".into() }
    }

    #[test]
    fn test_product_from_draft() {
        let p = draft().into_product("p1", None, Utc::now()).unwrap();
        assert_eq!(p.final_price, Decimal::new(9000, 2));
        assert!(p.created_at.is_some());
    }

    #[test]
    fn test_draft_requires_fields() {
        let mut d = draft();
        d.name.clear();
        assert!(matches!(d.price(), Err(StorefrontError::Validation(_))));
        let mut d = draft();
        d.amount = Decimal::ZERO;
        assert!(matches!(d.price(), Err(StorefrontError::Validation(_))));
        let mut d = draft();
        d.discount = Decimal::new(120, 0);
        assert!(matches!(d.price(), Err(StorefrontError::Validation(_))));
    }

    #[test]
    fn test_document_shape() {
        let p = draft().into_product("p1", None, Utc::now()).unwrap();
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["productName"], "Cold Brew");
        assert_eq!(v["FinalPrice"], serde_json::json!(90.0));
        let back: Product = serde_json::from_value(serde_json::json!({"id": "x", "productName": "Tea", "Amount": 40, "Discount": 5, "Image": "i"})).unwrap();
        assert_eq!(back.effective_final_price(), Decimal::new(3800, 2));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let p = draft().into_product("p1", None, Utc::now()).unwrap();
        assert!(p.matches("cold"));
        assert!(p.matches("BREW "));
        assert!(!p.matches("latte"));
    }
}
