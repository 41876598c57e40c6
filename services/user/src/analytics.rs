//! Order analytics consumer
//!
//! Structurally the same delivery-loop shape as the inventory reconciler,
//! with a single lower-stakes handler: fold `order.created` events into
//! per-user aggregates. No inventory effect.

use message_bus::{BrokerClient, BusResult, Delivery, Envelope, EventKind, HandlerOutcome,
    SubscriptionHandle};
use std::sync::Arc;

use crate::models::OrderCreatedPayload;
use crate::store::UserStore;

/// Maintains per-user order counts and spend from order events
pub struct OrderAnalyticsConsumer {
    store: Arc<dyn UserStore>,
}

impl OrderAnalyticsConsumer {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Fold one `order.created` envelope into the aggregates
    pub async fn on_order_created(&self, delivery: Delivery) -> HandlerOutcome {
        let envelope = match Envelope::<OrderCreatedPayload>::decode(&delivery.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                return HandlerOutcome::DeadLetter(format!("malformed order.created envelope: {e}"))
            }
        };
        let order = envelope.payload;

        match self
            .store
            .record_order(&order.id, &order.user_id, order.total_amount_minor)
            .await
        {
            Ok(true) => {
                tracing::info!(
                    user_id = %order.user_id,
                    order_id = %order.id,
                    amount_minor = order.total_amount_minor,
                    "user statistics updated"
                );
                HandlerOutcome::Processed
            }
            Ok(false) => {
                tracing::info!(order_id = %order.id, "duplicate order.created ignored");
                HandlerOutcome::Processed
            }
            Err(e) => HandlerOutcome::Retry(format!("statistics update failed: {e}")),
        }
    }
}

/// Register the analytics subscription on the broker
pub async fn start_analytics_consumer(
    broker: Arc<BrokerClient>,
    store: Arc<dyn UserStore>,
) -> BusResult<SubscriptionHandle> {
    let consumer = Arc::new(OrderAnalyticsConsumer::new(store));

    broker
        .subscribe(EventKind::OrderCreated, move |delivery| {
            let consumer = consumer.clone();
            async move { consumer.on_order_created(delivery).await }
        })
        .await
}
