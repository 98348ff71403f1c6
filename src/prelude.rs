//! Till prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{
        Cart, CartError, LineItem,
        service::{CartsService, CartsServiceError},
    },
    catalog::{CatalogError, Product, sample_products},
    order::{
        CustomerDetails, Order, OrderError, OrderId, ValidationError,
        lifecycle::{OrderStatus, StatusEntry, TransitionError},
        service::{ORDER_SEARCH_LIMIT, OrdersService, OrdersServiceError},
    },
    pricing::{COUPON_CODE, CouponOutcome, PricingError, Quote},
    store::{
        OrderStore, OrderStoreError, SessionId, SessionStore, SessionStoreError,
        memory::{MemoryOrderStore, MemorySessionStore},
    },
};
