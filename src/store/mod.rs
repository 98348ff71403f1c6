//! Stores
//!
//! Persistence seams for orders and session carts, with in-memory
//! backends for tests and single-process deployments.

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use mockall::automock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::{
    Order, OrderId,
    lifecycle::{OrderStatus, StatusEntry},
};

/// Errors related to order persistence.
#[derive(Debug, Error)]
pub enum OrderStoreError {
    /// An order with the same id is already stored.
    #[error("an order with this id already exists")]
    AlreadyExists,

    /// No order matched the requested id.
    #[error("order not found")]
    NotFound,

    /// The stored status no longer matches the caller's expectation.
    #[error("order status changed concurrently")]
    Conflict,

    /// The backend could not serve the request.
    #[error("order storage unavailable")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Order persistence.
///
/// Backends store and fetch orders mechanically. Transition legality is
/// the caller's concern and is settled before
/// [`update_status`](OrderStore::update_status) is invoked.
#[automock]
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Store a new order under its id.
    ///
    /// # Errors
    ///
    /// Returns [`OrderStoreError::AlreadyExists`] when the id is already
    /// taken, and [`OrderStoreError::Unavailable`] when the backend cannot
    /// serve the request.
    async fn insert(&self, order: Order) -> Result<(), OrderStoreError>;

    /// Fetch the order with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`OrderStoreError::NotFound`] when no order matches, and
    /// [`OrderStoreError::Unavailable`] when the backend cannot serve the
    /// request.
    async fn find_by_order_id(&self, order_id: &OrderId) -> Result<Order, OrderStoreError>;

    /// Fetch up to `limit` orders for a customer email, newest first.
    ///
    /// The email is matched exactly as stored.
    ///
    /// # Errors
    ///
    /// Returns [`OrderStoreError::Unavailable`] when the backend cannot
    /// serve the request.
    async fn find_by_customer_email(
        &self,
        email: &str,
        limit: usize,
    ) -> Result<Vec<Order>, OrderStoreError>;

    /// Fetch every order currently in `status`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`OrderStoreError::Unavailable`] when the backend cannot
    /// serve the request.
    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderStoreError>;

    /// Append `entry` to the order's history, provided its status still
    /// equals `expected`, and return the updated order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderStoreError::NotFound`] when no order matches,
    /// [`OrderStoreError::Conflict`] when the status moved underneath the
    /// caller, and [`OrderStoreError::Unavailable`] when the backend cannot
    /// serve the request.
    async fn update_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatus,
        entry: StatusEntry,
    ) -> Result<Order, OrderStoreError>;
}

/// Opaque identifier for a shopper's session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wrap a raw session identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        SessionId(value.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        SessionId(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        SessionId(value.to_string())
    }
}

/// Errors related to session persistence.
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// The backend could not serve the request.
    #[error("session storage unavailable")]
    Unavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Session cart persistence.
///
/// Carts travel as opaque serialized blobs. The store neither inspects nor
/// validates them.
#[automock]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch the blob stored for a session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStoreError::Unavailable`] when the backend cannot
    /// serve the request.
    async fn get(&self, session: &SessionId) -> Result<Option<String>, SessionStoreError>;

    /// Store the blob for a session, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`SessionStoreError::Unavailable`] when the backend cannot
    /// serve the request.
    async fn put(&self, session: &SessionId, blob: String) -> Result<(), SessionStoreError>;
}
