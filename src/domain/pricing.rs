//! Discounted price computation.
//!
//! Every monetary value that is displayed or persisted goes through
//! [`round_money`]: half away from zero, two decimal places.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::value_objects::Discount;
use crate::{Result, StorefrontError};

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn too_large() -> StorefrontError {
    StorefrontError::validation("Price is too large")
}

/// `amount - amount * discount / 100`, rounded. Results outside the decimal
/// range are rejected instead of overflowing.
pub fn final_price(amount: Decimal, discount: Decimal) -> Result<Decimal> {
    if amount < Decimal::ZERO {
        return Err(StorefrontError::validation(format!("Amount must not be negative, got {amount}")));
    }
    let discount = Discount::new(discount)?;
    let kept = Decimal::ONE_HUNDRED
        .checked_sub(discount.percent())
        .and_then(|pct| pct.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(too_large)?;
    amount.checked_mul(kept).map(round_money).ok_or_else(too_large)
}

pub fn line_total(unit_price: Decimal, quantity: u32) -> Result<Decimal> {
    unit_price.checked_mul(Decimal::from(quantity)).map(round_money).ok_or_else(too_large)
}

/// Rounded sum of line totals; the first failed line fails the sum.
pub fn sum(values: impl IntoIterator<Item = Result<Decimal>>) -> Result<Decimal> {
    let mut total = Decimal::ZERO;
    for value in values {
        total = total.checked_add(value?).ok_or_else(too_large)?;
    }
    Ok(round_money(total))
}
