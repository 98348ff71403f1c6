//! In-memory store backends.
//!
//! Orders and session blobs live in process-local maps behind an
//! [`RwLock`], shared by cloning. Suitable for tests and single-process
//! deployments; nothing survives a restart.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use rustc_hash::FxHashMap;

use crate::{
    order::{
        Order, OrderId,
        lifecycle::{OrderStatus, StatusEntry},
    },
    store::{OrderStore, OrderStoreError, SessionId, SessionStore, SessionStoreError},
};

/// [`OrderStore`] backed by a process-local map.
#[derive(Debug, Clone, Default)]
pub struct MemoryOrderStore {
    orders: Arc<RwLock<FxHashMap<OrderId, Order>>>,
}

impl MemoryOrderStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, FxHashMap<OrderId, Order>>, OrderStoreError> {
        self.orders
            .read()
            .map_err(|err| OrderStoreError::Unavailable(err.to_string().into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, FxHashMap<OrderId, Order>>, OrderStoreError> {
        self.orders
            .write()
            .map_err(|err| OrderStoreError::Unavailable(err.to_string().into()))
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: Order) -> Result<(), OrderStoreError> {
        let mut orders = self.write()?;

        if orders.contains_key(order.order_id()) {
            return Err(OrderStoreError::AlreadyExists);
        }

        orders.insert(order.order_id().clone(), order);

        Ok(())
    }

    async fn find_by_order_id(&self, order_id: &OrderId) -> Result<Order, OrderStoreError> {
        self.read()?
            .get(order_id)
            .cloned()
            .ok_or(OrderStoreError::NotFound)
    }

    async fn find_by_customer_email(
        &self,
        email: &str,
        limit: usize,
    ) -> Result<Vec<Order>, OrderStoreError> {
        let mut matches: Vec<Order> = self
            .read()?
            .values()
            .filter(|order| order.customer().email() == email)
            .cloned()
            .collect();

        sort_newest_first(&mut matches);
        matches.truncate(limit);

        Ok(matches)
    }

    async fn find_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderStoreError> {
        let mut matches: Vec<Order> = self
            .read()?
            .values()
            .filter(|order| order.status() == status)
            .cloned()
            .collect();

        sort_newest_first(&mut matches);

        Ok(matches)
    }

    async fn update_status(
        &self,
        order_id: &OrderId,
        expected: OrderStatus,
        entry: StatusEntry,
    ) -> Result<Order, OrderStoreError> {
        let mut orders = self.write()?;

        let order = orders.get_mut(order_id).ok_or(OrderStoreError::NotFound)?;

        if order.status() != expected {
            return Err(OrderStoreError::Conflict);
        }

        order.apply_status(entry);

        Ok(order.clone())
    }
}

/// Newest placement first, ties broken by id for a stable order.
fn sort_newest_first(orders: &mut [Order]) {
    orders.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.order_id().cmp(a.order_id()))
    });
}

/// [`SessionStore`] backed by a process-local map.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    blobs: Arc<RwLock<FxHashMap<SessionId, String>>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session: &SessionId) -> Result<Option<String>, SessionStoreError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|err| SessionStoreError::Unavailable(err.to_string().into()))?;

        Ok(blobs.get(session).cloned())
    }

    async fn put(&self, session: &SessionId, blob: String) -> Result<(), SessionStoreError> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|err| SessionStoreError::Unavailable(err.to_string().into()))?;

        blobs.insert(session.clone(), blob);

        Ok(())
    }
}
