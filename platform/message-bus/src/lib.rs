//! # Message Bus
//!
//! Shared client for the platform's durable event bus. Services use it for
//! every cross-service notification: the order service publishes lifecycle
//! events, the product and user services run delivery loops that keep their
//! own stores consistent with them.
//!
//! ## Pieces
//!
//! - [`EventKind`] / [`Envelope`]: the closed event taxonomy and the wire
//!   shape of everything on the bus
//! - [`BrokerClient`]: one explicitly-owned connection per service, with
//!   idempotent `connect`, durable `publish`, cancellable `subscribe` loops,
//!   and a `close` that reliably stops them
//! - [`HandlerOutcome`]: handlers report `Processed`, `Retry`, or
//!   `DeadLetter`; the delivery loop drives backoff and dead-lettering so
//!   failures are never silently swallowed
//! - Transports: [`NatsTransport`] (production, JetStream-backed durability)
//!   and [`InMemoryTransport`] (dev/test), selected via [`BrokerConfig`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use message_bus::{BrokerClient, BrokerConfig, EventKind, HandlerOutcome};
//! use std::sync::Arc;
//!
//! # #[derive(serde::Serialize)]
//! # struct Payload { product_id: String }
//! # async fn example() -> Result<(), message_bus::BusError> {
//! let broker = Arc::new(BrokerClient::new(
//!     "product",
//!     BrokerConfig::Nats { url: "nats://localhost:4222".into() },
//! ));
//! broker.connect().await?;
//!
//! broker
//!     .publish(EventKind::ProductUpdated, &Payload { product_id: "p1".into() })
//!     .await?;
//!
//! let handle = broker
//!     .subscribe(EventKind::OrderCreated, |delivery| async move {
//!         // decode and apply...
//!         HandlerOutcome::Processed
//!     })
//!     .await?;
//!
//! // at shutdown:
//! broker.close().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod envelope;
mod inmemory;
mod nats;
pub mod retry;
mod transport;

pub use client::{BrokerClient, HandlerOutcome, SubscriptionHandle};
pub use config::BrokerConfig;
pub use envelope::{Envelope, EventKind};
pub use inmemory::InMemoryTransport;
pub use nats::NatsTransport;
pub use retry::RetryPolicy;
pub use transport::{BusTransport, Delivery};

/// Errors from the publish/connect path of the bus
///
/// Consume-path failures never surface here; handlers report them as
/// [`HandlerOutcome`] values and the delivery loop acts on those.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The bus cannot be reached (connect or publish transport failure)
    #[error("broker unavailable: {0}")]
    BrokerUnavailable(String),

    /// Declaring a channel or opening its delivery stream failed
    #[error("failed to subscribe: {0}")]
    SubscribeError(String),

    /// An envelope could not be serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for bus operations
pub type BusResult<T> = Result<T, BusError>;
