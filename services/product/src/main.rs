//! Inventory reconciliation worker
//!
//! Runs the product service's delivery loops against the configured bus.
//! The HTTP/admin surface of the product service is deployed separately.

use message_bus::{BrokerClient, BrokerConfig};
use product_service::{start_reconciler, InMemoryProductStore};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting inventory reconciliation worker...");

    let config = BrokerConfig::from_env().expect("Failed to load broker configuration");
    let broker = Arc::new(BrokerClient::new("product", config));
    broker
        .connect()
        .await
        .expect("Failed to connect to message bus");

    // TODO: swap for the SQL-backed store once the product store client ships
    let store = Arc::new(InMemoryProductStore::new());

    let handles = start_reconciler(broker.clone(), store)
        .await
        .expect("Failed to start reconciler subscriptions");
    tracing::info!(subscriptions = handles.len(), "reconciler running");

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");

    tracing::info!("Shutting down...");
    broker.close().await;
}
