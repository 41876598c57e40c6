//! Product stock persistence as an external collaborator
//!
//! The trait shapes what the reconciler needs: read current stock, and apply
//! all of one order's adjustments as a single atomic unit keyed by
//! `(order_id, kind)` so redelivery cannot double-apply.

use async_trait::async_trait;
use message_bus::EventKind;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::models::{StockDelta, StockLevel};

/// Errors from the product store collaborator
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("product store unavailable: {0}")]
    Unavailable(String),
}

/// Stock state owned by the product service
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Current stock for a product, `None` if unknown
    async fn get_stock(&self, product_id: &str) -> Result<Option<i64>, StoreError>;

    /// Atomically apply every delta of one order event and record the
    /// `(order_id, kind)` pair as applied
    ///
    /// Either all deltas commit or none do; a crash can never leave an order
    /// partially applied. Returns `Ok(None)` when the pair was already
    /// applied (redelivered envelope), and the post-adjustment levels of the
    /// touched products otherwise. Unknown product ids are skipped.
    async fn apply_order_adjustments(
        &self,
        order_id: &str,
        kind: EventKind,
        deltas: &[StockDelta],
    ) -> Result<Option<Vec<StockLevel>>, StoreError>;
}

#[derive(Default)]
struct StockState {
    stock: HashMap<String, i64>,
    applied: HashSet<(String, EventKind)>,
}

/// In-memory product store for dev and tests
#[derive(Default)]
pub struct InMemoryProductStore {
    state: Mutex<StockState>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or overwrite the stock level of a product
    pub fn set_stock(&self, product_id: &str, quantity: i64) {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .stock
            .insert(product_id.to_string(), quantity);
    }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn get_stock(&self, product_id: &str) -> Result<Option<i64>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .stock
            .get(product_id)
            .copied())
    }

    async fn apply_order_adjustments(
        &self,
        order_id: &str,
        kind: EventKind,
        deltas: &[StockDelta],
    ) -> Result<Option<Vec<StockLevel>>, StoreError> {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let key = (order_id.to_string(), kind);
        if state.applied.contains(&key) {
            return Ok(None);
        }

        let mut levels = Vec::with_capacity(deltas.len());
        for delta in deltas {
            if let Some(quantity) = state.stock.get_mut(&delta.product_id) {
                *quantity += delta.delta;
                levels.push(StockLevel {
                    product_id: delta.product_id.clone(),
                    quantity: *quantity,
                });
            } else {
                tracing::debug!(
                    product_id = %delta.product_id,
                    order_id = %order_id,
                    "skipping adjustment for unknown product"
                );
            }
        }

        state.applied.insert(key);
        Ok(Some(levels))
    }
}
