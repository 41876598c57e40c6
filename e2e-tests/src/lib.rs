//! Shared helpers for the cross-service flow tests

use message_bus::{BrokerClient, BrokerConfig, InMemoryTransport, RetryPolicy};
use std::time::Duration;

/// A broker client for `service` on the shared in-memory bus, with retry
/// backoff tightened for test speed
pub fn broker_for(bus: &InMemoryTransport, service: &str) -> BrokerClient {
    BrokerClient::new(service, BrokerConfig::InMemory(bus.clone())).with_retry_policy(
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(40),
        },
    )
}
