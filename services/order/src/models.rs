//! Order domain types as they appear on the wire

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle states an order moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

/// One line of an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_minor: i64,
}

/// The committed state of an order, as published on order lifecycle events
///
/// `total_amount_minor` is fixed at creation as the sum of
/// `quantity * unit_price_minor` over the items. Consumers use it for
/// logging and statistics only; they never recompute it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub id: String,
    pub user_id: String,
    pub items: Vec<OrderItem>,
    pub total_amount_minor: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderSnapshot {
    /// Build a fresh pending order, computing the total from its items
    pub fn new(user_id: impl Into<String>, items: Vec<OrderItem>) -> Self {
        let total_amount_minor = items
            .iter()
            .map(|item| item.quantity * item.unit_price_minor)
            .sum();

        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            items,
            total_amount_minor,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }
}
