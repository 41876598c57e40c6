//! Order persistence as an external collaborator
//!
//! The relational order store lives outside this core; the trait captures the
//! two things the event path needs from it: commit a write, hand back the
//! committed snapshot.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::models::{OrderSnapshot, OrderStatus};

/// Errors from the order store collaborator
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("order store unavailable: {0}")]
    Unavailable(String),
}

/// Committed order state, read and written by the order service only
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Commit a new order
    async fn insert(&self, order: &OrderSnapshot) -> Result<(), StoreError>;

    /// Read the committed snapshot of an order
    async fn get(&self, order_id: &str) -> Result<Option<OrderSnapshot>, StoreError>;

    /// Commit a status transition, returning the updated snapshot
    ///
    /// `None` means the order does not exist.
    async fn set_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<Option<OrderSnapshot>, StoreError>;
}

/// In-memory order store for dev and tests
#[derive(Default)]
pub struct InMemoryOrderStore {
    orders: Mutex<HashMap<String, OrderSnapshot>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: &OrderSnapshot) -> Result<(), StoreError> {
        self.orders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(order.id.clone(), order.clone());
        Ok(())
    }

    async fn get(&self, order_id: &str) -> Result<Option<OrderSnapshot>, StoreError> {
        Ok(self
            .orders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(order_id)
            .cloned())
    }

    async fn set_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<Option<OrderSnapshot>, StoreError> {
        let mut orders = self
            .orders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(orders.get_mut(order_id).map(|order| {
            order.status = status;
            order.clone()
        }))
    }
}
