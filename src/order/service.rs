//! Orders Service
//!
//! Places orders from carts and walks them through the lifecycle, with
//! compare-and-swap status updates so racing admins cannot both land a
//! change on the same order.

use std::{fmt, sync::Arc};

use jiff::Timestamp;
use thiserror::Error;
use tracing::{Span, info};

use crate::{
    cart::Cart,
    order::{
        CustomerDetails, Order, OrderError, OrderId,
        lifecycle::{OrderStatus, StatusEntry, TransitionError},
    },
    store::{OrderStore, OrderStoreError},
};

/// Most orders returned by a single lookup.
pub const ORDER_SEARCH_LIMIT: usize = 50;

/// Generated-id collisions tolerated before a placement is abandoned.
const ID_ATTEMPTS: usize = 3;

/// Errors related to the orders service.
#[derive(Debug, Error)]
pub enum OrdersServiceError {
    /// Wrapped order creation error.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Wrapped lifecycle transition error.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// No order matched the requested id.
    #[error("order not found")]
    NotFound,

    /// The order changed underneath the request; retry against fresh state.
    #[error("order was modified concurrently")]
    Conflict,

    /// The order store could not serve the request.
    #[error("order storage unavailable")]
    Storage(#[source] OrderStoreError),
}

impl From<OrderStoreError> for OrdersServiceError {
    fn from(err: OrderStoreError) -> Self {
        match err {
            OrderStoreError::NotFound => OrdersServiceError::NotFound,
            OrderStoreError::Conflict => OrdersServiceError::Conflict,
            OrderStoreError::AlreadyExists | OrderStoreError::Unavailable(_) => {
                OrdersServiceError::Storage(err)
            }
        }
    }
}

/// Places orders and walks them through the lifecycle.
#[derive(Clone)]
pub struct OrdersService {
    orders: Arc<dyn OrderStore>,
}

impl fmt::Debug for OrdersService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrdersService").finish_non_exhaustive()
    }
}

impl OrdersService {
    /// Create a service over the given order store.
    #[must_use]
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    /// Place an order for the cart's current contents.
    ///
    /// The cart is snapshotted and re-quoted, the order is stored, and only
    /// then is the cart cleared for its next use. A generated id that turns
    /// out to be taken is retried with a fresh one before the placement is
    /// abandoned.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`OrderError`] when the cart is empty or its
    /// totals cannot be represented, and [`OrdersServiceError::Storage`]
    /// when the store cannot serve the request. The cart is left untouched
    /// on error.
    #[tracing::instrument(
        name = "orders.service.place_order",
        skip(self, cart, customer),
        fields(
            customer_email = %customer.email(),
            order_id = tracing::field::Empty,
        ),
        err
    )]
    pub async fn place_order(
        &self,
        cart: &mut Cart,
        customer: CustomerDetails,
    ) -> Result<Order, OrdersServiceError> {
        let mut attempts = 0;

        let order = loop {
            let order = Order::from_cart(cart, customer.clone(), Timestamp::now())?;

            match self.orders.insert(order.clone()).await {
                Ok(()) => break order,
                Err(OrderStoreError::AlreadyExists) if attempts + 1 < ID_ATTEMPTS => {
                    attempts += 1;
                }
                Err(err) => return Err(err.into()),
            }
        };

        cart.clear();

        let span = Span::current();

        span.record("order_id", tracing::field::display(order.order_id()));

        info!(order_id = %order.order_id(), total = order.total(), "placed order");

        Ok(order)
    }

    /// Move an order to a new status, appending a history entry.
    ///
    /// Legality is checked against the freshly loaded order, and the store
    /// applies the change only while the status is still the one that was
    /// loaded, so two racing updates cannot both land.
    ///
    /// # Errors
    ///
    /// Returns [`OrdersServiceError::NotFound`] for an unknown id, a
    /// wrapped [`TransitionError`] for a move the lifecycle does not
    /// permit, and [`OrdersServiceError::Conflict`] when the order changed
    /// underneath the request.
    #[tracing::instrument(
        name = "orders.service.transition_order",
        skip(self, order_id, to, note),
        fields(order_id = %order_id, to = %to),
        err
    )]
    pub async fn transition_order(
        &self,
        order_id: &OrderId,
        to: OrderStatus,
        note: Option<String>,
    ) -> Result<Order, OrdersServiceError> {
        let current = self.orders.find_by_order_id(order_id).await?;

        current.status().ensure_can_become(to)?;

        let entry = StatusEntry::new(to, note, Timestamp::now());

        let order = self
            .orders
            .update_status(order_id, current.status(), entry)
            .await?;

        info!(from = %current.status(), to = %to, "order status changed");

        Ok(order)
    }

    /// Fetch a single order by id.
    ///
    /// # Errors
    ///
    /// Returns [`OrdersServiceError::NotFound`] when no order matches.
    #[tracing::instrument(
        name = "orders.service.order",
        skip(self, order_id),
        fields(order_id = %order_id),
        err
    )]
    pub async fn order(&self, order_id: &OrderId) -> Result<Order, OrdersServiceError> {
        Ok(self.orders.find_by_order_id(order_id).await?)
    }

    /// Fetch a customer's most recent orders, newest first.
    ///
    /// The email is normalized the same way placement normalizes it, and at
    /// most [`ORDER_SEARCH_LIMIT`] orders are returned.
    ///
    /// # Errors
    ///
    /// Returns [`OrdersServiceError::Storage`] when the store cannot serve
    /// the request.
    #[tracing::instrument(
        name = "orders.service.orders_for_email",
        skip(self, email),
        fields(customer_email = %email),
        err
    )]
    pub async fn orders_for_email(&self, email: &str) -> Result<Vec<Order>, OrdersServiceError> {
        let email = email.trim().to_lowercase();

        Ok(self
            .orders
            .find_by_customer_email(&email, ORDER_SEARCH_LIMIT)
            .await?)
    }

    /// Fetch every order currently in `status`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`OrdersServiceError::Storage`] when the store cannot serve
    /// the request.
    #[tracing::instrument(
        name = "orders.service.orders_with_status",
        skip(self, status),
        fields(status = %status),
        err
    )]
    pub async fn orders_with_status(
        &self,
        status: OrderStatus,
    ) -> Result<Vec<Order>, OrdersServiceError> {
        Ok(self.orders.find_by_status(status).await?)
    }
}
