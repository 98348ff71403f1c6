//! Orders
//!
//! Placed orders: an immutable snapshot of the cart at checkout, the
//! customer it was placed for, and the lifecycle state it moves through.

pub mod lifecycle;
pub mod service;

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    cart::{Cart, LineItem},
    order::lifecycle::{OrderStatus, StatusEntry, TransitionError},
    pricing::{self, CouponOutcome, PricingError},
};

/// Errors related to customer details validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required customer field was empty or whitespace.
    #[error("customer {0} must not be blank")]
    Blank(&'static str),
}

/// Errors related to order creation.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Checkout was attempted with nothing in the cart.
    #[error("cannot create an order from an empty cart")]
    EmptyCart,

    /// Wrapped pricing arithmetic error.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Unique identifier for a placed order.
///
/// Generated ids are `ORD` followed by the 32 uppercase hex digits of a
/// UUIDv7, so they sort roughly by creation time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Generate a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        let uuid = Uuid::now_v7();
        let mut buf = [0u8; uuid::fmt::Simple::LENGTH];
        let hex = uuid.simple().encode_upper(&mut buf);

        OrderId(format!("ORD{hex}"))
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for OrderId {
    fn from(value: String) -> Self {
        OrderId(value)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        OrderId(value.to_string())
    }
}

/// Validated customer contact and delivery details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDetails {
    customer_name: String,
    customer_email: String,
    customer_address: String,
    customer_phone: String,
}

impl CustomerDetails {
    /// Validate and normalize raw customer input.
    ///
    /// All fields are trimmed, and the email is lowercased.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Blank`] naming the first field that is
    /// empty or whitespace.
    pub fn new(
        name: &str,
        email: &str,
        address: &str,
        phone: &str,
    ) -> Result<Self, ValidationError> {
        Ok(CustomerDetails {
            customer_name: required(name, "name")?,
            customer_email: required(email, "email")?.to_lowercase(),
            customer_address: required(address, "address")?,
            customer_phone: required(phone, "phone")?,
        })
    }

    /// The customer's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.customer_name
    }

    /// The customer's email, lowercased.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.customer_email
    }

    /// The delivery address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.customer_address
    }

    /// The contact phone number.
    #[must_use]
    pub fn phone(&self) -> &str {
        &self.customer_phone
    }
}

/// Trim a required field, rejecting blank values.
fn required(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::Blank(field));
    }

    Ok(trimmed.to_string())
}

/// A placed order: a snapshot of the cart at checkout, plus the customer
/// and the lifecycle state.
///
/// Monetary fields are re-derived from the items at creation, never copied
/// from the cart's own stored totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    order_id: OrderId,
    #[serde(flatten)]
    customer: CustomerDetails,
    items: Vec<LineItem>,
    subtotal: u64,
    discount_code: Option<String>,
    discount: u64,
    tax: u64,
    total: u64,
    status: OrderStatus,
    status_history: Vec<StatusEntry>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Order {
    /// Snapshot `cart` into a new `Placed` order for `customer`.
    ///
    /// The items are copied and all totals are quoted afresh, so later cart
    /// mutations cannot reach into the order. The first history entry is
    /// written together with the order itself.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::EmptyCart`] when the cart holds no lines, and
    /// a wrapped [`PricingError`] if the totals cannot be represented.
    pub fn from_cart(
        cart: &Cart,
        customer: CustomerDetails,
        now: Timestamp,
    ) -> Result<Self, OrderError> {
        if cart.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let quote = pricing::quote(cart.items(), cart.discount_code())?;

        // The stored code is re-evaluated, so a code that no longer applies
        // is dropped rather than copied onto the order.
        let discount_code = match &quote.coupon {
            CouponOutcome::Applied { code } => Some(code.clone()),
            CouponOutcome::NotSubmitted | CouponOutcome::Invalid { .. } => None,
        };

        Ok(Order {
            order_id: OrderId::generate(),
            customer,
            items: cart.items().to_vec(),
            subtotal: quote.subtotal,
            discount_code,
            discount: quote.discount,
            tax: quote.tax,
            total: quote.total,
            status: OrderStatus::Placed,
            status_history: vec![StatusEntry::new(OrderStatus::Placed, None, now)],
            created_at: now,
            updated_at: now,
        })
    }

    /// Move this order to `to`, recording a history entry.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Illegal`] when the lifecycle does not
    /// permit the move; the order is unchanged on error.
    pub fn transition(
        &mut self,
        to: OrderStatus,
        note: Option<String>,
        now: Timestamp,
    ) -> Result<(), TransitionError> {
        self.status.ensure_can_become(to)?;
        self.apply_status(StatusEntry::new(to, note, now));

        Ok(())
    }

    /// Apply an already-validated status entry.
    ///
    /// Callers must have checked the move with
    /// [`OrderStatus::ensure_can_become`] first.
    pub(crate) fn apply_status(&mut self, entry: StatusEntry) {
        self.status = entry.status();
        self.updated_at = entry.changed_at();
        self.status_history.push(entry);
    }

    /// Unique identifier of this order.
    #[must_use]
    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// The customer the order was placed for.
    #[must_use]
    pub fn customer(&self) -> &CustomerDetails {
        &self.customer
    }

    /// Snapshot of the cart lines at checkout.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
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

    /// The coupon code that applied at checkout, if any.
    #[must_use]
    pub fn discount_code(&self) -> Option<&str> {
        self.discount_code.as_deref()
    }

    /// Coupon discount in minor units.
    #[must_use]
    pub fn discount(&self) -> u64 {
        self.discount
    }

    /// Tax in minor units, applied to the discounted subtotal.
    #[must_use]
    pub fn tax(&self) -> u64 {
        self.tax
    }

    /// Tax-inclusive total the customer pays, in minor units.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Every status the order has been in, oldest first.
    #[must_use]
    pub fn status_history(&self) -> &[StatusEntry] {
        &self.status_history
    }

    /// When the order was placed.
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// When the order last changed status.
    #[must_use]
    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use testresult::TestResult;

    use super::*;
    use crate::cart::CartError;

    fn checkout_cart() -> Result<Cart, CartError> {
        let mut cart = Cart::new();

        cart.add_item("widget", "Widget", 60_00, 1)?;
        cart.add_item("gadget", "Gadget", 20_00, 2)?;
        cart.apply_coupon(Some("SAVE10"))?;

        Ok(cart)
    }

    fn customer() -> Result<CustomerDetails, ValidationError> {
        CustomerDetails::new(
            "Ada Lovelace",
            "ada@example.com",
            "12 Analytical Row",
            "+44 20 7946 0000",
        )
    }

    #[test]
    fn from_cart_snapshots_items_and_requotes() -> TestResult {
        let cart = checkout_cart()?;

        let order = Order::from_cart(&cart, customer()?, Timestamp::UNIX_EPOCH)?;

        assert_eq!(order.subtotal(), 100_00);
        assert_eq!(order.discount(), 10_00);
        assert_eq!(order.tax(), 7_20);
        assert_eq!(order.total(), 97_20);
        assert_eq!(order.discount_code(), Some("SAVE10"));
        assert_eq!(order.items(), cart.items());
        assert_eq!(order.item_count(), 3);
        assert_eq!(order.customer().email(), "ada@example.com");

        Ok(())
    }

    #[test]
    fn order_snapshot_is_independent_of_the_cart() -> TestResult {
        let mut cart = checkout_cart()?;

        let order = Order::from_cart(&cart, customer()?, Timestamp::UNIX_EPOCH)?;

        cart.add_item("widget", "Widget", 60_00, 5)?;
        cart.clear();

        assert_eq!(order.items().len(), 2);
        assert_eq!(order.total(), 97_20);

        Ok(())
    }

    #[test]
    fn empty_cart_cannot_become_an_order() -> TestResult {
        let result = Order::from_cart(&Cart::new(), customer()?, Timestamp::UNIX_EPOCH);

        assert!(
            matches!(result, Err(OrderError::EmptyCart)),
            "expected EmptyCart, got {result:?}"
        );

        Ok(())
    }

    #[test]
    fn order_starts_placed_with_one_history_entry() -> TestResult {
        let order = Order::from_cart(&checkout_cart()?, customer()?, Timestamp::UNIX_EPOCH)?;

        assert_eq!(order.status(), OrderStatus::Placed);
        assert_eq!(order.status_history().len(), 1);

        let first = order
            .status_history()
            .first()
            .expect("history should have an entry");

        assert_eq!(first.status(), OrderStatus::Placed);
        assert_eq!(first.note(), "Status changed to Placed");
        assert_eq!(first.changed_at(), order.created_at());

        Ok(())
    }

    #[test]
    fn transition_appends_history_and_touches_updated_at() -> TestResult {
        let mut order = Order::from_cart(&checkout_cart()?, customer()?, Timestamp::UNIX_EPOCH)?;
        let later = Timestamp::from_second(60)?;

        order.transition(
            OrderStatus::Processing,
            Some("Picked by warehouse".to_string()),
            later,
        )?;

        assert_eq!(order.status(), OrderStatus::Processing);
        assert_eq!(order.status_history().len(), 2);
        assert_eq!(order.updated_at(), later);
        assert_eq!(order.created_at(), Timestamp::UNIX_EPOCH);

        let entry = order
            .status_history()
            .last()
            .expect("history should have entries");

        assert_eq!(entry.note(), "Picked by warehouse");

        Ok(())
    }

    #[test]
    fn illegal_transition_leaves_order_untouched() -> TestResult {
        let mut order = Order::from_cart(&checkout_cart()?, customer()?, Timestamp::UNIX_EPOCH)?;
        let before = order.clone();

        let result = order.transition(OrderStatus::Delivered, None, Timestamp::from_second(60)?);

        assert!(
            matches!(result, Err(TransitionError::Illegal { .. })),
            "expected Illegal, got {result:?}"
        );
        assert_eq!(order, before);

        Ok(())
    }

    #[test]
    fn tampered_cart_blob_is_requoted_at_checkout() -> TestResult {
        let blob = serde_json::json!({
            "items": [{
                "product_id": "widget",
                "name": "Widget",
                "unit_price": 100_00,
                "quantity": 1,
                "line_total": 100_00,
            }],
            "subtotal": 1,
            "discount_code": "NOPE",
            "discount": 99_99,
            "total": 1,
        });
        let cart: Cart = serde_json::from_value(blob)?;

        let order = Order::from_cart(&cart, customer()?, Timestamp::UNIX_EPOCH)?;

        assert_eq!(order.subtotal(), 100_00);
        assert_eq!(order.discount(), 0);
        assert_eq!(order.discount_code(), None);
        assert_eq!(order.tax(), 8_00);
        assert_eq!(order.total(), 108_00);

        Ok(())
    }

    #[test]
    fn generated_ids_are_unique_and_well_formed() {
        let mut seen = HashSet::new();

        for _ in 0..10_000 {
            let id = OrderId::generate();

            let hex = id
                .as_str()
                .strip_prefix("ORD")
                .expect("id should start with ORD");

            assert_eq!(hex.len(), 32, "unexpected length: {id}");
            assert!(
                hex.chars()
                    .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()),
                "unexpected characters: {id}"
            );
            assert!(seen.insert(id), "duplicate order id generated");
        }
    }

    #[test]
    fn customer_fields_are_trimmed_and_email_lowercased() -> TestResult {
        let details = CustomerDetails::new(
            "  Ada Lovelace  ",
            " Ada@Example.COM ",
            " 12 Analytical Row ",
            " +44 20 7946 0000 ",
        )?;

        assert_eq!(details.name(), "Ada Lovelace");
        assert_eq!(details.email(), "ada@example.com");
        assert_eq!(details.address(), "12 Analytical Row");
        assert_eq!(details.phone(), "+44 20 7946 0000");

        Ok(())
    }

    #[test]
    fn blank_customer_fields_are_rejected_by_name() {
        let cases = [
            ("", "ada@example.com", "12 Analytical Row", "+44", "name"),
            ("Ada", "   ", "12 Analytical Row", "+44", "email"),
            ("Ada", "ada@example.com", "\t", "+44", "address"),
            ("Ada", "ada@example.com", "12 Analytical Row", "", "phone"),
        ];

        for (name, email, address, phone, field) in cases {
            let result = CustomerDetails::new(name, email, address, phone);

            assert_eq!(
                result,
                Err(ValidationError::Blank(field)),
                "field {field} should be rejected"
            );
        }
    }

    #[test]
    fn order_round_trips_through_json_with_flat_customer_fields() -> TestResult {
        let order = Order::from_cart(&checkout_cart()?, customer()?, Timestamp::UNIX_EPOCH)?;

        let value = serde_json::to_value(&order)?;

        assert_eq!(
            value.get("customer_name").and_then(|v| v.as_str()),
            Some("Ada Lovelace")
        );

        let restored: Order = serde_json::from_value(value)?;

        assert_eq!(restored, order);

        Ok(())
    }
}
