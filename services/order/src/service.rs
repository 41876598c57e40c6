//! Order write operations: commit locally, then announce on the bus
//!
//! The HTTP layer in front of these calls is out of scope here; handlers call
//! straight into this service. The HTTP response never waits for any consumer
//! to process the published event.

use std::sync::Arc;

use crate::models::{OrderItem, OrderSnapshot, OrderStatus};
use crate::publisher::OrderEventPublisher;
use crate::store::{OrderStore, StoreError};

/// Write side of the order service
pub struct OrderService {
    store: Arc<dyn OrderStore>,
    publisher: OrderEventPublisher,
}

impl OrderService {
    pub fn new(store: Arc<dyn OrderStore>, publisher: OrderEventPublisher) -> Self {
        Self { store, publisher }
    }

    /// Commit a new pending order and publish `order.created`
    pub async fn create_order(
        &self,
        user_id: &str,
        items: Vec<OrderItem>,
    ) -> Result<OrderSnapshot, StoreError> {
        let order = OrderSnapshot::new(user_id, items);
        self.store.insert(&order).await?;

        self.publisher.order_created(&order).await;
        Ok(order)
    }

    /// Read the committed snapshot of an order
    pub async fn get_order(&self, order_id: &str) -> Result<Option<OrderSnapshot>, StoreError> {
        self.store.get(order_id).await
    }

    /// Commit a status transition and publish `order.updated`
    ///
    /// Status transitions carry no stock effect; cancellation goes through
    /// [`OrderService::cancel_order`] so the reconciler sees a distinct event.
    pub async fn update_status(
        &self,
        order_id: &str,
        status: OrderStatus,
    ) -> Result<Option<OrderSnapshot>, StoreError> {
        let updated = self.store.set_status(order_id, status).await?;
        if let Some(order) = &updated {
            self.publisher.order_updated(order).await;
        }
        Ok(updated)
    }

    /// Commit a cancellation and publish `order.cancelled`
    pub async fn cancel_order(
        &self,
        order_id: &str,
    ) -> Result<Option<OrderSnapshot>, StoreError> {
        let updated = self
            .store
            .set_status(order_id, OrderStatus::Cancelled)
            .await?;
        if let Some(order) = &updated {
            self.publisher.order_cancelled(order).await;
        }
        Ok(updated)
    }
}
