//! # User Service Core
//!
//! The user service's event path: publish `user.registered` after signups
//! commit, and consume `order.created` to maintain per-user order statistics.

pub mod analytics;
pub mod models;
pub mod publisher;
pub mod store;

pub use analytics::{start_analytics_consumer, OrderAnalyticsConsumer};
pub use models::{OrderCreatedPayload, UserRegisteredPayload, UserStats};
pub use publisher::UserEventPublisher;
pub use store::{InMemoryUserStore, StoreError, UserStore};
