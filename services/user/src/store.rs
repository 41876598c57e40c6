//! User aggregate persistence as an external collaborator

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::models::UserStats;

/// Errors from the user store collaborator
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user store unavailable: {0}")]
    Unavailable(String),
}

/// Per-user order aggregates, keyed by user id
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fold one order into the user's aggregates, keyed by order id
    ///
    /// Returns `false` when the order id was already recorded, so a
    /// redelivered event cannot inflate the counters.
    async fn record_order(
        &self,
        order_id: &str,
        user_id: &str,
        amount_minor: i64,
    ) -> Result<bool, StoreError>;

    /// Current aggregates for a user
    async fn get_stats(&self, user_id: &str) -> Result<UserStats, StoreError>;
}

#[derive(Default)]
struct StatsState {
    stats: HashMap<String, UserStats>,
    recorded_orders: HashSet<String>,
}

/// In-memory user store for dev and tests
#[derive(Default)]
pub struct InMemoryUserStore {
    state: Mutex<StatsState>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn record_order(
        &self,
        order_id: &str,
        user_id: &str,
        amount_minor: i64,
    ) -> Result<bool, StoreError> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if !state.recorded_orders.insert(order_id.to_string()) {
            return Ok(false);
        }

        let stats = state.stats.entry(user_id.to_string()).or_default();
        stats.order_count += 1;
        stats.total_spent_minor += amount_minor;
        Ok(true)
    }

    async fn get_stats(&self, user_id: &str) -> Result<UserStats, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .stats
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}
