//! Order lifecycle event publishing
//!
//! Fired strictly after the local commit; the publisher never participates in
//! the order store's transaction. From the write path's perspective it is
//! fire-and-forget: a publish failure is logged as an eventual-consistency
//! gap to monitor, and never rolls back or fails the committed write.

use message_bus::{BrokerClient, EventKind};
use std::sync::Arc;

use crate::models::OrderSnapshot;

/// Emits `order.created` / `order.updated` / `order.cancelled` envelopes
/// from committed order state
pub struct OrderEventPublisher {
    broker: Arc<BrokerClient>,
}

impl OrderEventPublisher {
    pub fn new(broker: Arc<BrokerClient>) -> Self {
        Self { broker }
    }

    /// Announce a newly committed order
    pub async fn order_created(&self, order: &OrderSnapshot) {
        self.emit(EventKind::OrderCreated, order).await;
    }

    /// Announce a committed status transition
    pub async fn order_updated(&self, order: &OrderSnapshot) {
        self.emit(EventKind::OrderUpdated, order).await;
    }

    /// Announce a committed cancellation
    pub async fn order_cancelled(&self, order: &OrderSnapshot) {
        self.emit(EventKind::OrderCancelled, order).await;
    }

    async fn emit(&self, kind: EventKind, order: &OrderSnapshot) {
        if let Err(e) = self.broker.publish(kind, order).await {
            // The order write has already committed; consumers will not see
            // this change until the gap is reconciled out of band.
            tracing::error!(
                order_id = %order.id,
                kind = %kind,
                error = %e,
                "failed to publish order event"
            );
        } else {
            tracing::info!(order_id = %order.id, kind = %kind, "published order event");
        }
    }
}
