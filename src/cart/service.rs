//! Carts Service
//!
//! Session-scoped cart operations. Each session's cart lives in the
//! session store as an opaque JSON blob, and every operation on a session
//! runs behind that session's lock so read-modify-write cycles never
//! interleave.

use std::{fmt, sync::Arc};

use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{Span, info};

use crate::{
    cart::{Cart, CartError},
    order::{
        CustomerDetails, Order,
        service::{OrdersService, OrdersServiceError},
    },
    pricing::{CouponOutcome, PricingError, Quote},
    store::{SessionId, SessionStore, SessionStoreError},
};

/// Errors related to the carts service.
#[derive(Debug, Error)]
pub enum CartsServiceError {
    /// Wrapped cart mutation error.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Wrapped pricing arithmetic error.
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// The session cart blob could not be encoded or decoded.
    #[error("session cart blob could not be encoded or decoded")]
    CorruptBlob(#[source] serde_json::Error),

    /// The session store could not serve the request.
    #[error(transparent)]
    Storage(#[from] SessionStoreError),

    /// Checkout failed while placing the order.
    #[error(transparent)]
    Orders(#[from] OrdersServiceError),
}

/// Session-scoped cart operations over a session store.
///
/// Clones share the per-session locks, so every clone serializes with
/// every other.
#[derive(Clone)]
pub struct CartsService {
    sessions: Arc<dyn SessionStore>,
    locks: Arc<std::sync::Mutex<FxHashMap<SessionId, Arc<Mutex<()>>>>>,
}

impl fmt::Debug for CartsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartsService").finish_non_exhaustive()
    }
}

impl CartsService {
    /// Create a service over the given session store.
    #[must_use]
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            sessions,
            locks: Arc::new(std::sync::Mutex::new(FxHashMap::default())),
        }
    }

    /// The lock serializing operations for one session.
    fn session_lock(&self, session: &SessionId) -> Result<Arc<Mutex<()>>, CartsServiceError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|err| SessionStoreError::Unavailable(err.to_string().into()))?;

        Ok(Arc::clone(locks.entry(session.clone()).or_default()))
    }

    async fn read_cart(&self, session: &SessionId) -> Result<Cart, CartsServiceError> {
        match self.sessions.get(session).await? {
            Some(blob) => serde_json::from_str(&blob).map_err(CartsServiceError::CorruptBlob),
            None => Ok(Cart::new()),
        }
    }

    async fn write_cart(&self, session: &SessionId, cart: &Cart) -> Result<(), CartsServiceError> {
        let blob = serde_json::to_string(cart).map_err(CartsServiceError::CorruptBlob)?;

        Ok(self.sessions.put(session, blob).await?)
    }

    /// Load, mutate and store the session's cart under its lock.
    async fn mutate<T>(
        &self,
        session: &SessionId,
        op: impl FnOnce(&mut Cart) -> Result<T, CartError> + Send,
    ) -> Result<T, CartsServiceError> {
        let lock = self.session_lock(session)?;
        let _guard = lock.lock().await;

        let mut cart = self.read_cart(session).await?;
        let value = op(&mut cart)?;

        self.write_cart(session, &cart).await?;

        Ok(value)
    }

    /// The session's current cart; a session with nothing stored gets an
    /// empty one.
    ///
    /// # Errors
    ///
    /// Returns [`CartsServiceError::CorruptBlob`] when the stored blob
    /// cannot be decoded, and a wrapped [`SessionStoreError`] when the
    /// store cannot serve the request.
    #[tracing::instrument(
        name = "carts.service.cart",
        skip(self, session),
        fields(session = %session),
        err
    )]
    pub async fn cart(&self, session: &SessionId) -> Result<Cart, CartsServiceError> {
        let lock = self.session_lock(session)?;
        let _guard = lock.lock().await;

        self.read_cart(session).await
    }

    /// Add a product line to the session's cart, returning the cart after
    /// the change.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`CartError`] for malformed input and a wrapped
    /// [`SessionStoreError`] when the store cannot serve the request. The
    /// stored cart is unchanged on error.
    #[tracing::instrument(
        name = "carts.service.add_item",
        skip(self, session, product_id, name, unit_price, quantity),
        fields(session = %session, product_id = %product_id, quantity),
        err
    )]
    pub async fn add_item(
        &self,
        session: &SessionId,
        product_id: &str,
        name: &str,
        unit_price: i64,
        quantity: i64,
    ) -> Result<Cart, CartsServiceError> {
        self.mutate(session, |cart| {
            cart.add_item(product_id, name, unit_price, quantity)?;

            Ok(cart.clone())
        })
        .await
    }

    /// Remove every line for a product from the session's cart, returning
    /// the cart after the change.
    ///
    /// Removing a product the cart does not hold is a no-op.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`SessionStoreError`] when the store cannot serve
    /// the request.
    #[tracing::instrument(
        name = "carts.service.remove_item",
        skip(self, session, product_id),
        fields(session = %session, product_id = %product_id),
        err
    )]
    pub async fn remove_item(
        &self,
        session: &SessionId,
        product_id: &str,
    ) -> Result<Cart, CartsServiceError> {
        self.mutate(session, |cart| {
            cart.remove_item(product_id)?;

            Ok(cart.clone())
        })
        .await
    }

    /// Empty the session's cart.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`SessionStoreError`] when the store cannot serve
    /// the request.
    #[tracing::instrument(
        name = "carts.service.clear",
        skip(self, session),
        fields(session = %session),
        err
    )]
    pub async fn clear(&self, session: &SessionId) -> Result<(), CartsServiceError> {
        self.mutate(session, |cart| {
            cart.clear();

            Ok(())
        })
        .await
    }

    /// Evaluate a submitted coupon field against the session's cart,
    /// returning the outcome together with the cart after the change.
    ///
    /// An unrecognized or absent submission strips any previously applied
    /// code; the outcome reports this without failing the request.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`SessionStoreError`] when the store cannot serve
    /// the request. The stored cart is unchanged on error.
    #[tracing::instrument(
        name = "carts.service.apply_coupon",
        skip(self, session, submitted),
        fields(session = %session, coupon = ?submitted),
        err
    )]
    pub async fn apply_coupon(
        &self,
        session: &SessionId,
        submitted: Option<&str>,
    ) -> Result<(CouponOutcome, Cart), CartsServiceError> {
        self.mutate(session, |cart| {
            let outcome = cart.apply_coupon(submitted)?;

            Ok((outcome, cart.clone()))
        })
        .await
    }

    /// Quote the session's cart as it would be charged at checkout,
    /// including tax.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`PricingError`] if the totals cannot be
    /// represented, and [`CartsServiceError::CorruptBlob`] when the stored
    /// blob cannot be decoded.
    #[tracing::instrument(
        name = "carts.service.preview",
        skip(self, session),
        fields(session = %session),
        err
    )]
    pub async fn preview(&self, session: &SessionId) -> Result<Quote, CartsServiceError> {
        let lock = self.session_lock(session)?;
        let _guard = lock.lock().await;

        let cart = self.read_cart(session).await?;

        Ok(cart.quote()?)
    }

    /// Check the session's cart out into a placed order.
    ///
    /// The whole cycle runs under the session lock: the cart is loaded,
    /// the order placed, and the emptied cart written back, so a
    /// concurrent cart mutation cannot slip in between snapshot and reset.
    ///
    /// # Errors
    ///
    /// Returns a wrapped [`OrdersServiceError`] when the cart is empty or
    /// the order cannot be stored. The stored cart is unchanged unless the
    /// order was placed.
    #[tracing::instrument(
        name = "carts.service.checkout",
        skip(self, session, customer, orders),
        fields(
            session = %session,
            customer_email = %customer.email(),
            order_id = tracing::field::Empty,
        ),
        err
    )]
    pub async fn checkout(
        &self,
        session: &SessionId,
        customer: CustomerDetails,
        orders: &OrdersService,
    ) -> Result<Order, CartsServiceError> {
        let lock = self.session_lock(session)?;
        let _guard = lock.lock().await;

        let mut cart = self.read_cart(session).await?;

        let order = orders.place_order(&mut cart, customer).await?;

        self.write_cart(session, &cart).await?;

        let span = Span::current();

        span.record("order_id", tracing::field::display(order.order_id()));

        info!(order_id = %order.order_id(), "checked out session cart");

        Ok(order)
    }
}
