//! # Order Service Core
//!
//! The order service's event-path core: commit order writes to the (external)
//! order store, then publish lifecycle events on the durable bus. Consumers
//! in the product and user services react asynchronously; there is no
//! synchronous acknowledgment path back, so consistency is eventual and
//! one-directional per event.

pub mod models;
pub mod publisher;
pub mod service;
pub mod store;

pub use models::{OrderItem, OrderSnapshot, OrderStatus};
pub use publisher::OrderEventPublisher;
pub use service::OrderService;
pub use store::{InMemoryOrderStore, OrderStore, StoreError};
