//! Pricing
//!
//! Quote derivation for carts and orders: subtotal, coupon discount, tax,
//! and the tax-inclusive total, all in minor units.

use decimal_percentage::Percentage;
use rust_decimal::{
    Decimal, RoundingStrategy,
    prelude::{FromPrimitive, ToPrimitive},
};
use thiserror::Error;

use crate::cart::LineItem;

/// The single recognized coupon code.
pub const COUPON_CODE: &str = "SAVE10";

/// Errors specific to quote calculations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    /// An amount overflowed the representable minor-unit range.
    #[error("amount overflowed the representable minor-unit range")]
    AmountOutOfRange,
}

/// Advisory result of evaluating a submitted coupon field.
///
/// An unrecognized coupon is feedback for the shopper, not an error:
/// totals are still derived, with a zero discount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponOutcome {
    /// The coupon field was absent or blank.
    NotSubmitted,

    /// The recognized code applied.
    Applied {
        /// Normalized form of the accepted code.
        code: String,
    },

    /// The submitted code is not recognized; no discount applies.
    Invalid {
        /// Trimmed form of the rejected input.
        submitted: String,
    },
}

impl CouponOutcome {
    /// Whether the recognized code applied.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, CouponOutcome::Applied { .. })
    }
}

/// Derived totals for a set of line items plus a coupon field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Sum of line totals in minor units.
    pub subtotal: u64,

    /// Coupon discount in minor units; zero unless the recognized code applied.
    pub discount: u64,

    /// Tax in minor units, applied to the discounted subtotal.
    pub tax: u64,

    /// Tax-inclusive total: `(subtotal - discount) + tax`.
    pub total: u64,

    /// What happened to the submitted coupon field.
    pub coupon: CouponOutcome,
}

impl Quote {
    /// The discounted subtotal before tax, `subtotal - discount`.
    #[must_use]
    pub fn taxable(&self) -> u64 {
        self.subtotal.saturating_sub(self.discount)
    }
}

/// Normalize a submitted coupon field: trim surrounding whitespace and
/// uppercase. Returns `None` when the field is absent or blank.
#[must_use]
pub fn normalize_coupon(submitted: Option<&str>) -> Option<String> {
    let trimmed = submitted?.trim();

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

/// Evaluate a submitted coupon field against the recognized code.
#[must_use]
pub fn evaluate_coupon(submitted: Option<&str>) -> CouponOutcome {
    match normalize_coupon(submitted) {
        None => CouponOutcome::NotSubmitted,
        Some(code) if code == COUPON_CODE => CouponOutcome::Applied { code },
        Some(_) => CouponOutcome::Invalid {
            submitted: submitted.map_or_else(String::new, |raw| raw.trim().to_string()),
        },
    }
}

/// Derive a quote for the given line items and submitted coupon field.
///
/// The quote is pure and deterministic: identical items and coupon input
/// produce identical amounts. Each percentage is applied once, directly in
/// minor units, rounding the midpoint away from zero.
///
/// # Errors
///
/// Returns [`PricingError::AmountOutOfRange`] if a sum or percentage
/// application cannot be represented in minor units.
pub fn quote(items: &[LineItem], submitted_coupon: Option<&str>) -> Result<Quote, PricingError> {
    // Summed from unit price and quantity, not the stored line totals, so
    // a decoded cart with inconsistent lines still quotes correctly.
    let subtotal = items.iter().try_fold(0u64, |acc, item| {
        item.unit_price()
            .checked_mul(u64::from(item.quantity()))
            .and_then(|line| acc.checked_add(line))
            .ok_or(PricingError::AmountOutOfRange)
    })?;

    let coupon = evaluate_coupon(submitted_coupon);

    let discount = if coupon.is_applied() {
        percent_of_minor(coupon_rate(), subtotal)?
    } else {
        0
    };

    let taxable = subtotal
        .checked_sub(discount)
        .ok_or(PricingError::AmountOutOfRange)?;

    let tax = percent_of_minor(tax_rate(), taxable)?;

    let total = taxable
        .checked_add(tax)
        .ok_or(PricingError::AmountOutOfRange)?;

    Ok(Quote {
        subtotal,
        discount,
        tax,
        total,
        coupon,
    })
}

/// Discount rate for the recognized coupon.
fn coupon_rate() -> Percentage {
    Percentage::from(Decimal::new(10, 2))
}

/// Flat tax rate applied to the discounted subtotal.
fn tax_rate() -> Percentage {
    Percentage::from(Decimal::new(8, 2))
}

/// Apply a fractional percentage to a minor-unit amount, rounding the
/// midpoint away from zero.
fn percent_of_minor(percent: Percentage, minor: u64) -> Result<u64, PricingError> {
    // `Percentage` is a fraction (e.g. 0.10); extract it as a plain decimal.
    let rate = percent * Decimal::ONE;

    let Some(minor) = Decimal::from_u64(minor) else {
        unreachable!("always returns `Some` for every `u64`")
    };

    let Some(applied) = rate.checked_mul(minor) else {
        return Err(PricingError::AmountOutOfRange);
    };

    let rounded = applied.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

    rounded.to_u64().ok_or(PricingError::AmountOutOfRange)
}
