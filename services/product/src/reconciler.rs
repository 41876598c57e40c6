//! Inventory reconciliation driven by order lifecycle events
//!
//! Keeps product stock consistent with sold and cancelled quantities without
//! any cross-service transaction: the order write and the stock adjustment
//! are two independent local commits connected only by the bus, so "order
//! created, stock not yet decremented" is a valid transient state.

use message_bus::{BrokerClient, BusResult, Delivery, Envelope, EventKind, HandlerOutcome,
    SubscriptionHandle};
use std::sync::Arc;

use crate::models::{InventoryLowPayload, OrderEventPayload, OrderItemPayload, StockDelta};
use crate::store::ProductStore;

/// Stock quantity below which a product triggers a restock signal
///
/// Fixed platform-wide; not configurable per product.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Consumes order events and adjusts stock accordingly
///
/// | Event             | Effect per product               | Side effect            |
/// |-------------------|----------------------------------|------------------------|
/// | `order.created`   | stock -= summed item quantities  | `inventory.low` when the post-decrement quantity drops below the threshold |
/// | `order.cancelled` | stock += summed item quantities  | none                   |
/// | `order.updated`   | none (status-only transition)    | none                   |
pub struct InventoryReconciler {
    store: Arc<dyn ProductStore>,
    broker: Arc<BrokerClient>,
}

impl InventoryReconciler {
    pub fn new(store: Arc<dyn ProductStore>, broker: Arc<BrokerClient>) -> Self {
        Self { store, broker }
    }

    /// Apply an `order.created` envelope: decrement stock, signal low stock
    pub async fn on_order_created(&self, delivery: Delivery) -> HandlerOutcome {
        let envelope = match Envelope::<OrderEventPayload>::decode(&delivery.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                return HandlerOutcome::DeadLetter(format!("malformed order.created envelope: {e}"))
            }
        };
        let order = envelope.payload;

        let deltas = aggregate_deltas(&order.items, -1);
        if deltas.is_empty() {
            return HandlerOutcome::Processed;
        }

        match self
            .store
            .apply_order_adjustments(&order.id, EventKind::OrderCreated, &deltas)
            .await
        {
            Ok(Some(levels)) => {
                tracing::info!(
                    order_id = %order.id,
                    user_id = %order.user_id,
                    total_amount_minor = order.total_amount_minor,
                    products = levels.len(),
                    "stock decremented for order"
                );

                // Threshold check runs strictly after the decrement commits,
                // against the post-decrement value; one signal per product
                // per order, regardless of how many items carried it.
                for level in &levels {
                    if level.quantity < LOW_STOCK_THRESHOLD {
                        self.publish_inventory_low(level.product_id.clone(), level.quantity)
                            .await;
                    }
                }
                HandlerOutcome::Processed
            }
            Ok(None) => {
                tracing::info!(order_id = %order.id, "duplicate order.created ignored");
                HandlerOutcome::Processed
            }
            Err(e) => HandlerOutcome::Retry(format!("stock decrement failed: {e}")),
        }
    }

    /// Apply an `order.cancelled` envelope: restore stock
    pub async fn on_order_cancelled(&self, delivery: Delivery) -> HandlerOutcome {
        let envelope = match Envelope::<OrderEventPayload>::decode(&delivery.payload) {
            Ok(envelope) => envelope,
            Err(e) => {
                return HandlerOutcome::DeadLetter(format!(
                    "malformed order.cancelled envelope: {e}"
                ))
            }
        };
        let order = envelope.payload;

        let deltas = aggregate_deltas(&order.items, 1);
        if deltas.is_empty() {
            return HandlerOutcome::Processed;
        }

        match self
            .store
            .apply_order_adjustments(&order.id, EventKind::OrderCancelled, &deltas)
            .await
        {
            Ok(Some(_)) => {
                tracing::info!(order_id = %order.id, "stock restored for cancelled order");
                HandlerOutcome::Processed
            }
            Ok(None) => {
                tracing::info!(order_id = %order.id, "duplicate order.cancelled ignored");
                HandlerOutcome::Processed
            }
            Err(e) => HandlerOutcome::Retry(format!("stock restore failed: {e}")),
        }
    }

    /// `order.updated` is a status-only transition; no stock effect
    pub async fn on_order_updated(&self, delivery: Delivery) -> HandlerOutcome {
        match Envelope::<OrderEventPayload>::decode(&delivery.payload) {
            Ok(envelope) => {
                tracing::debug!(order_id = %envelope.payload.id, "order status transition observed");
                HandlerOutcome::Processed
            }
            Err(e) => HandlerOutcome::DeadLetter(format!("malformed order.updated envelope: {e}")),
        }
    }

    async fn publish_inventory_low(&self, product_id: String, quantity: i64) {
        let payload = InventoryLowPayload {
            product_id,
            quantity,
        };
        if let Err(e) = self.broker.publish(EventKind::InventoryLow, &payload).await {
            // The decrement has committed; losing the signal is an
            // alerting gap, not a stock-consistency problem.
            tracing::error!(
                product_id = %payload.product_id,
                quantity = payload.quantity,
                error = %e,
                "failed to publish inventory.low"
            );
        } else {
            tracing::warn!(
                product_id = %payload.product_id,
                quantity = payload.quantity,
                "inventory low, restock signal published"
            );
        }
    }
}

/// Sum item quantities per product, preserving first-seen order
///
/// Batching per product before the store write (and before the threshold
/// check) is what guarantees at most one `inventory.low` per product per
/// order.
fn aggregate_deltas(items: &[OrderItemPayload], sign: i64) -> Vec<StockDelta> {
    let mut deltas: Vec<StockDelta> = Vec::new();
    for item in items {
        match deltas
            .iter_mut()
            .find(|existing| existing.product_id == item.product_id)
        {
            Some(existing) => existing.delta += sign * item.quantity,
            None => deltas.push(StockDelta {
                product_id: item.product_id.clone(),
                delta: sign * item.quantity,
            }),
        }
    }
    deltas
}

/// Register the reconciler's subscriptions on the broker
///
/// Returns the delivery-loop handles; closing the broker cancels them all.
pub async fn start_reconciler(
    broker: Arc<BrokerClient>,
    store: Arc<dyn ProductStore>,
) -> BusResult<Vec<SubscriptionHandle>> {
    let reconciler = Arc::new(InventoryReconciler::new(store, broker.clone()));

    let on_created = reconciler.clone();
    let created = broker
        .subscribe(EventKind::OrderCreated, move |delivery| {
            let reconciler = on_created.clone();
            async move { reconciler.on_order_created(delivery).await }
        })
        .await?;

    let on_cancelled = reconciler.clone();
    let cancelled = broker
        .subscribe(EventKind::OrderCancelled, move |delivery| {
            let reconciler = on_cancelled.clone();
            async move { reconciler.on_order_cancelled(delivery).await }
        })
        .await?;

    let on_updated = reconciler;
    let updated = broker
        .subscribe(EventKind::OrderUpdated, move |delivery| {
            let reconciler = on_updated.clone();
            async move { reconciler.on_order_updated(delivery).await }
        })
        .await?;

    Ok(vec![created, cancelled, updated])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: &str, quantity: i64) -> OrderItemPayload {
        OrderItemPayload {
            product_id: product_id.to_string(),
            quantity,
        }
    }

    #[test]
    fn deltas_batch_repeated_products() {
        let deltas = aggregate_deltas(&[item("p1", 2), item("p2", 1), item("p1", 3)], -1);
        assert_eq!(
            deltas,
            vec![
                StockDelta { product_id: "p1".into(), delta: -5 },
                StockDelta { product_id: "p2".into(), delta: -1 },
            ]
        );
    }

    #[test]
    fn positive_sign_restores() {
        let deltas = aggregate_deltas(&[item("p1", 4)], 1);
        assert_eq!(deltas[0].delta, 4);
    }

    #[test]
    fn empty_items_yield_no_deltas() {
        assert!(aggregate_deltas(&[], -1).is_empty());
    }
}
