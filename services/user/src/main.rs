//! Order analytics worker
//!
//! Runs the user service's `order.created` delivery loop against the
//! configured bus. The HTTP/auth surface of the user service is deployed
//! separately.

use message_bus::{BrokerClient, BrokerConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use user_service::{start_analytics_consumer, InMemoryUserStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    tracing::info!("Starting order analytics worker...");

    let config = BrokerConfig::from_env().expect("Failed to load broker configuration");
    let broker = Arc::new(BrokerClient::new("user", config));
    broker
        .connect()
        .await
        .expect("Failed to connect to message bus");

    let store = Arc::new(InMemoryUserStore::new());
    let _handle = start_analytics_consumer(broker.clone(), store)
        .await
        .expect("Failed to start analytics subscription");
    tracing::info!("analytics consumer running");

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for shutdown signal");

    tracing::info!("Shutting down...");
    broker.close().await;
}
