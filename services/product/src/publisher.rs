//! Product event publishing

use message_bus::{BrokerClient, EventKind};
use std::sync::Arc;

use crate::models::ProductSnapshot;

/// Emits `product.updated` envelopes after a product write commits
///
/// Same fire-and-forget discipline as the order publisher: the admin write
/// has already committed, so a publish failure is logged and never surfaced
/// back into the write path.
pub struct ProductEventPublisher {
    broker: Arc<BrokerClient>,
}

impl ProductEventPublisher {
    pub fn new(broker: Arc<BrokerClient>) -> Self {
        Self { broker }
    }

    pub async fn product_updated(&self, product: &ProductSnapshot) {
        if let Err(e) = self
            .broker
            .publish(EventKind::ProductUpdated, product)
            .await
        {
            tracing::error!(
                product_id = %product.id,
                error = %e,
                "failed to publish product.updated"
            );
        } else {
            tracing::info!(product_id = %product.id, "published product.updated");
        }
    }
}
