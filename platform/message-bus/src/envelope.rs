//! # Event Envelope & Taxonomy
//!
//! The wire shape of every cross-service notification and the closed set of
//! event kinds the platform exchanges.
//!
//! Each kind maps 1:1 to a named durable channel; the channel name IS the
//! kind's wire value. There is no wildcard or fan-out topic matching.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// The closed set of event kinds exchanged between services
///
/// Wire values double as channel names, so adding a variant here is the only
/// step needed to introduce a new channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "order.created")]
    OrderCreated,
    #[serde(rename = "order.updated")]
    OrderUpdated,
    #[serde(rename = "order.cancelled")]
    OrderCancelled,
    #[serde(rename = "user.registered")]
    UserRegistered,
    #[serde(rename = "product.updated")]
    ProductUpdated,
    #[serde(rename = "inventory.low")]
    InventoryLow,
}

impl EventKind {
    /// The durable channel this kind is delivered on
    pub fn channel(self) -> &'static str {
        match self {
            EventKind::OrderCreated => "order.created",
            EventKind::OrderUpdated => "order.updated",
            EventKind::OrderCancelled => "order.cancelled",
            EventKind::UserRegistered => "user.registered",
            EventKind::ProductUpdated => "product.updated",
            EventKind::InventoryLow => "inventory.low",
        }
    }

    /// Parse a channel name back into a kind
    pub fn from_channel(channel: &str) -> Option<Self> {
        match channel {
            "order.created" => Some(EventKind::OrderCreated),
            "order.updated" => Some(EventKind::OrderUpdated),
            "order.cancelled" => Some(EventKind::OrderCancelled),
            "user.registered" => Some(EventKind::UserRegistered),
            "product.updated" => Some(EventKind::ProductUpdated),
            "inventory.low" => Some(EventKind::InventoryLow),
            _ => None,
        }
    }

    /// Every kind, in declaration order. Used for channel provisioning.
    pub const ALL: [EventKind; 6] = [
        EventKind::OrderCreated,
        EventKind::OrderUpdated,
        EventKind::OrderCancelled,
        EventKind::UserRegistered,
        EventKind::ProductUpdated,
        EventKind::InventoryLow,
    ];
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.channel())
    }
}

/// The serialized unit of communication placed on the bus
///
/// Immutable once constructed. The publishing service creates it, the bus
/// copies it, and the receiving service owns its own deserialized copy.
/// `event_id` is the idempotency key consumers track to make redelivery a
/// no-op.
///
/// Consumers deserialize with unknown fields ignored, so producers may add
/// fields without breaking older consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Unique event identifier (idempotency key)
    pub event_id: Uuid,

    /// Which kind of event this is; also names the channel it travels on
    pub kind: EventKind,

    /// When the publishing service emitted the event
    pub emitted_at: DateTime<Utc>,

    /// Event-specific payload; shape is agreed out of band per kind
    pub payload: T,
}

impl<T: Serialize> Envelope<T> {
    /// Wrap a payload in a new envelope with a fresh id and timestamp
    pub fn new(kind: EventKind, payload: T) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            kind,
            emitted_at: Utc::now(),
            payload,
        }
    }

    /// Serialize to the JSON wire form
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Deserialize from the JSON wire form, ignoring unknown fields
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize)]
    struct TestPayload {
        product_id: String,
        quantity: i64,
    }

    #[test]
    fn kind_round_trips_through_channel_name() {
        for kind in EventKind::ALL {
            assert_eq!(EventKind::from_channel(kind.channel()), Some(kind));
        }
        assert_eq!(EventKind::from_channel("order.shipped"), None);
    }

    #[test]
    fn kind_serializes_to_wire_value() {
        let value = serde_json::to_value(EventKind::OrderCreated).unwrap();
        assert_eq!(value, json!("order.created"));
        let value = serde_json::to_value(EventKind::InventoryLow).unwrap();
        assert_eq!(value, json!("inventory.low"));
    }

    #[test]
    fn envelope_round_trip() {
        let envelope = Envelope::new(
            EventKind::InventoryLow,
            TestPayload {
                product_id: "p1".to_string(),
                quantity: 5,
            },
        );

        let bytes = envelope.encode().unwrap();
        let decoded: Envelope<TestPayload> = Envelope::decode(&bytes).unwrap();

        assert_eq!(decoded.event_id, envelope.event_id);
        assert_eq!(decoded.kind, EventKind::InventoryLow);
        assert_eq!(decoded.payload.product_id, "p1");
        assert_eq!(decoded.payload.quantity, 5);
    }

    #[test]
    fn decode_ignores_unknown_fields() {
        let wire = json!({
            "event_id": "550e8400-e29b-41d4-a716-446655440000",
            "kind": "order.created",
            "emitted_at": "2024-01-01T00:00:00Z",
            "payload": { "product_id": "p1", "quantity": 2, "warehouse": "east" },
            "trace_id": "added-by-a-newer-producer"
        });

        let decoded: Envelope<TestPayload> =
            Envelope::decode(&serde_json::to_vec(&wire).unwrap()).unwrap();
        assert_eq!(decoded.kind, EventKind::OrderCreated);
        assert_eq!(decoded.payload.quantity, 2);
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        let wire = json!({
            "event_id": "550e8400-e29b-41d4-a716-446655440000",
            "kind": "order.exploded",
            "emitted_at": "2024-01-01T00:00:00Z",
            "payload": {}
        });

        let result: Result<Envelope<serde_json::Value>, _> =
            Envelope::decode(&serde_json::to_vec(&wire).unwrap());
        assert!(result.is_err());
    }
}
