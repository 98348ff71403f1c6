//! Till
//!
//! Till is a small commerce core for server-rendered storefronts: session-scoped carts with coupon pricing, and order placement with a compare-and-swap status lifecycle.

pub mod cart;
pub mod catalog;
pub mod order;
pub mod prelude;
pub mod pricing;
pub mod store;
