//! Event payloads as the product service reads and writes them
//!
//! Incoming order payloads are declared here with only the fields this
//! service uses; envelope decoding ignores everything else, so the order
//! service may evolve its snapshot without breaking the reconciler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of an incoming order event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemPayload {
    pub product_id: String,
    pub quantity: i64,
}

/// Payload of `order.created` / `order.cancelled` events
///
/// `total_amount_minor` was fixed by the order service at creation; it is
/// carried for logging only and never recomputed or validated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEventPayload {
    pub id: String,
    pub user_id: String,
    pub items: Vec<OrderItemPayload>,
    #[serde(default)]
    pub total_amount_minor: i64,
}

/// Payload of outgoing `inventory.low` events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryLowPayload {
    pub product_id: String,
    /// Post-decrement stock quantity
    pub quantity: i64,
}

/// Committed product state, as published on `product.updated` events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: String,
    pub name: String,
    pub price_minor: i64,
    pub category: String,
    pub stock: i64,
    pub updated_at: DateTime<Utc>,
}

/// Current stock for one product, as the product store reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLevel {
    pub product_id: String,
    pub quantity: i64,
}

/// A signed stock adjustment for one product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDelta {
    pub product_id: String,
    pub delta: i64,
}
