//! In-memory transport for tests and local development
//!
//! Delivery is at-least-once in spirit but best-effort in practice: a lagging
//! subscriber can drop messages once the ring buffer wraps, which is
//! acceptable for the dev/test scenarios this transport serves.

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::transport::{BusTransport, Delivery};
use crate::BusResult;

/// Transport backed by a process-local broadcast channel
///
/// Cloning is cheap and every clone shares the same bus, so several broker
/// clients (one per simulated service) can exchange events inside one test.
///
/// Channel identity is the exact channel name; there is no pattern matching.
#[derive(Clone)]
pub struct InMemoryTransport {
    sender: Arc<broadcast::Sender<Delivery>>,
}

impl InMemoryTransport {
    /// Create a bus with the default ring buffer of 1024 messages
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create a bus with a custom ring buffer size
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }
}

impl std::fmt::Debug for InMemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InMemoryTransport")
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BusTransport for InMemoryTransport {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> BusResult<()> {
        // A send error only means nobody is subscribed yet; durable semantics
        // are out of scope for the in-memory bus.
        let _ = self.sender.send(Delivery::new(channel, payload));
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        _subscriber: &str,
    ) -> BusResult<BoxStream<'static, Delivery>> {
        let mut receiver = self.sender.subscribe();
        let channel = channel.to_string();

        let stream = async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(delivery) => {
                        if delivery.channel == channel {
                            yield delivery;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            channel = %channel,
                            skipped = skipped,
                            "in-memory subscriber lagged, messages dropped"
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        };

        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn publish_reaches_subscriber_on_same_channel() {
        let bus = InMemoryTransport::new();
        let mut stream = bus.subscribe("order.created", "test").await.unwrap();

        bus.publish("order.created", b"hello".to_vec()).await.unwrap();

        let delivery = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended");
        assert_eq!(delivery.channel, "order.created");
        assert_eq!(delivery.payload, b"hello");
    }

    #[tokio::test]
    async fn channel_filtering_is_exact() {
        let bus = InMemoryTransport::new();
        let mut stream = bus.subscribe("order.created", "test").await.unwrap();

        bus.publish("order.cancelled", b"other".to_vec())
            .await
            .unwrap();
        bus.publish("order.created", b"mine".to_vec()).await.unwrap();

        let delivery = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended");
        assert_eq!(delivery.payload, b"mine");
    }

    #[tokio::test]
    async fn each_subscriber_gets_its_own_copy() {
        let bus = InMemoryTransport::new();
        let mut product_side = bus.subscribe("order.created", "product").await.unwrap();
        let mut user_side = bus.subscribe("order.created", "user").await.unwrap();

        bus.publish("order.created", b"fanout".to_vec()).await.unwrap();

        for stream in [&mut product_side, &mut user_side] {
            let delivery = tokio::time::timeout(Duration::from_secs(1), stream.next())
                .await
                .expect("timeout")
                .expect("stream ended");
            assert_eq!(delivery.payload, b"fanout");
        }
    }

    #[tokio::test]
    async fn clones_share_one_bus() {
        let bus = InMemoryTransport::new();
        let other_handle = bus.clone();
        let mut stream = bus.subscribe("user.registered", "test").await.unwrap();

        other_handle
            .publish("user.registered", b"shared".to_vec())
            .await
            .unwrap();

        let delivery = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("timeout")
            .expect("stream ended");
        assert_eq!(delivery.payload, b"shared");
    }
}
