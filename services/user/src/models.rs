//! Event payloads and read models of the user service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The slice of `order.created` payloads this service reads
///
/// Only the fields analytics needs are declared; the rest of the order
/// snapshot is ignored during decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreatedPayload {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub total_amount_minor: i64,
}

/// Payload of outgoing `user.registered` events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegisteredPayload {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

/// Per-user order aggregates maintained from order events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserStats {
    pub order_count: u64,
    pub total_spent_minor: i64,
}
