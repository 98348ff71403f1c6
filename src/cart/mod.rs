//! Cart
//!
//! A session-scoped cart: line items plus derived totals, recomputed
//! atomically after every mutation. The cart's own `total` excludes tax;
//! tax appears on quotes and placed orders.

pub mod service;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pricing::{self, CouponOutcome, PricingError, Quote};

/// Errors related to cart mutation.
#[derive(Debug, Error)]
pub enum CartError {
    /// A line item was given a negative unit price.
    #[error("unit price {0} must not be negative")]
    InvalidUnitPrice(i64),

    /// A line item was given a quantity below one, or beyond what a line
    /// can hold.
    #[error("quantity {0} must be at least 1")]
    InvalidQuantity(i64),

    /// Wrapped pricing arithmetic error.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// A single cart line: one product at one unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    product_id: String,
    name: String,
    unit_price: u64,
    quantity: u32,
    line_total: u64,
}

impl LineItem {
    /// Create a line item, validating price and quantity.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidUnitPrice`] for a negative unit price,
    /// [`CartError::InvalidQuantity`] for a quantity below one, and a
    /// wrapped [`PricingError`] if the line total cannot be represented.
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        unit_price: i64,
        quantity: i64,
    ) -> Result<Self, CartError> {
        let Ok(unit_price) = u64::try_from(unit_price) else {
            return Err(CartError::InvalidUnitPrice(unit_price));
        };

        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }

        let Ok(quantity) = u32::try_from(quantity) else {
            return Err(CartError::InvalidQuantity(quantity));
        };

        Ok(LineItem {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            quantity,
            line_total: line_total_for(unit_price, quantity)?,
        })
    }

    /// Identifier of the product this line holds.
    #[must_use]
    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    /// Display name captured when the line was added.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Price of one unit, in minor units.
    #[must_use]
    pub fn unit_price(&self) -> u64 {
        self.unit_price
    }

    /// Units of the product on this line.
    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// `unit_price * quantity`, recomputed on every quantity change.
    #[must_use]
    pub fn line_total(&self) -> u64 {
        self.line_total
    }

    /// Grow this line's quantity, leaving the line untouched on failure.
    fn add_quantity(&mut self, additional: u32) -> Result<(), CartError> {
        let Some(quantity) = self.quantity.checked_add(additional) else {
            return Err(CartError::InvalidQuantity(
                i64::from(self.quantity) + i64::from(additional),
            ));
        };

        self.line_total = line_total_for(self.unit_price, quantity)?;
        self.quantity = quantity;

        Ok(())
    }
}

/// Line total in minor units.
fn line_total_for(unit_price: u64, quantity: u32) -> Result<u64, CartError> {
    unit_price
        .checked_mul(u64::from(quantity))
        .ok_or(CartError::Pricing(PricingError::AmountOutOfRange))
}

/// A shopper's cart with derived totals.
///
/// Mutations stage their change and commit only once the totals have been
/// re-derived, so a failed operation leaves the cart exactly as it was and
/// no observer ever sees items and totals out of step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<LineItem>,
    subtotal: u64,
    discount_code: Option<String>,
    discount: u64,
    total: u64,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product line, merging quantities when the product is already
    /// present. A merged line keeps its original unit price.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidUnitPrice`] or
    /// [`CartError::InvalidQuantity`] for malformed input, and a wrapped
    /// [`PricingError`] if the totals cannot be represented. The cart is
    /// unchanged on error.
    pub fn add_item(
        &mut self,
        product_id: &str,
        name: &str,
        unit_price: i64,
        quantity: i64,
    ) -> Result<(), CartError> {
        let line = LineItem::new(product_id, name, unit_price, quantity)?;

        let mut staged = self.clone();

        match staged
            .items
            .iter_mut()
            .find(|item| item.product_id() == line.product_id())
        {
            Some(existing) => existing.add_quantity(line.quantity())?,
            None => staged.items.push(line),
        }

        staged.recompute()?;
        *self = staged;

        Ok(())
    }

    /// Remove every line for the given product.
    ///
    /// Removing a product that is not in the cart is a no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`PricingError`] if the totals cannot be
    /// re-derived; the cart is unchanged on error.
    pub fn remove_item(&mut self, product_id: &str) -> Result<(), CartError> {
        let mut staged = self.clone();

        staged.items.retain(|item| item.product_id() != product_id);
        staged.recompute()?;
        *self = staged;

        Ok(())
    }

    /// Empty the cart and drop any applied coupon.
    pub fn clear(&mut self) {
        *self = Cart::new();
    }

    /// Evaluate the submitted coupon field against this cart.
    ///
    /// The recognized code is stored in normalized form; an absent, blank
    /// or unrecognized submission clears any previously applied code. The
    /// returned outcome is advisory either way.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`PricingError`] if the totals cannot be
    /// re-derived; the cart is unchanged on error.
    pub fn apply_coupon(&mut self, submitted: Option<&str>) -> Result<CouponOutcome, CartError> {
        let outcome = pricing::evaluate_coupon(submitted);

        let mut staged = self.clone();

        staged.discount_code = match &outcome {
            CouponOutcome::Applied { code } => Some(code.clone()),
            CouponOutcome::NotSubmitted | CouponOutcome::Invalid { .. } => None,
        };

        staged.recompute()?;
        *self = staged;

        Ok(outcome)
    }

    /// Derive the tax-inclusive quote for the current cart state, as shown
    /// on an order preview.
    ///
    /// # Errors
    ///
    /// Returns a [`PricingError`] if the totals cannot be represented.
    pub fn quote(&self) -> Result<Quote, PricingError> {
        pricing::quote(&self.items, self.discount_code.as_deref())
    }

    /// The lines currently in the cart.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    /// Iterate over the lines currently in the cart.
    pub fn iter(&self) -> impl Iterator<Item = &LineItem> {
        self.items.iter()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity()))
            .sum()
    }

    /// Sum of line totals, in minor units.
    #[must_use]
    pub fn subtotal(&self) -> u64 {
        self.subtotal
    }

    /// The applied coupon code, if any, in normalized form.
    #[must_use]
    pub fn discount_code(&self) -> Option<&str> {
        self.discount_code.as_deref()
    }

    /// Coupon discount in minor units.
    #[must_use]
    pub fn discount(&self) -> u64 {
        self.discount
    }

    /// `subtotal - discount`, in minor units. Tax is not included.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Re-derive all totals from the current items and coupon state.
    fn recompute(&mut self) -> Result<(), CartError> {
        let quote = self.quote()?;

        self.subtotal = quote.subtotal;
        self.discount = quote.discount;
        self.total = quote.taxable();

        Ok(())
    }
}
