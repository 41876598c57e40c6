//! # Product Service Core
//!
//! The product service's event path: delivery loops over order lifecycle
//! events keep stock consistent with sold and cancelled quantities, a
//! restock signal goes out whenever a decrement pushes a product below the
//! low-stock threshold, and committed product writes are announced as
//! `product.updated`.

pub mod models;
pub mod publisher;
pub mod reconciler;
pub mod store;

pub use models::{
    InventoryLowPayload, OrderEventPayload, OrderItemPayload, ProductSnapshot, StockDelta,
    StockLevel,
};
pub use publisher::ProductEventPublisher;
pub use reconciler::{start_reconciler, InventoryReconciler, LOW_STOCK_THRESHOLD};
pub use store::{InMemoryProductStore, ProductStore, StoreError};
