//! NATS JetStream implementation of the transport
//!
//! Channels live inside one JetStream stream so accepted payloads survive a
//! broker restart. Each `(channel, subscriber)` pair gets its own durable
//! consumer, so independent subscribers each receive every payload.

use async_nats::jetstream::{self, consumer::pull, stream};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::time::Duration;

use crate::transport::{BusTransport, Delivery};
use crate::{BusError, BusResult, EventKind};

/// Name of the JetStream stream holding all platform event channels
const STREAM_NAME: &str = "COMMERCE_EVENTS";

/// Retention for events awaiting consumption
const MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 14); // 14 days

/// Transport backed by a NATS JetStream stream
///
/// Envelope acknowledgment happens at receipt: once a delivery is handed to
/// the application, redelivery and dead-lettering are driven by the broker
/// client's outcome handling, not by JetStream redelivery.
#[derive(Clone)]
pub struct NatsTransport {
    context: jetstream::Context,
}

impl NatsTransport {
    /// Connect to a NATS server and provision the event stream
    ///
    /// Idempotent: an existing stream is reused as-is.
    pub async fn connect(url: &str) -> BusResult<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::BrokerUnavailable(e.to_string()))?;

        let context = jetstream::new(client);

        let mut subjects: Vec<String> = EventKind::ALL
            .iter()
            .map(|kind| kind.channel().to_string())
            .collect();
        // Dead-lettered envelopes share the stream under their own prefix
        subjects.push("dlq.>".to_string());

        context
            .get_or_create_stream(stream::Config {
                name: STREAM_NAME.to_string(),
                subjects,
                max_age: MAX_AGE,
                ..Default::default()
            })
            .await
            .map_err(|e| BusError::BrokerUnavailable(e.to_string()))?;

        Ok(Self { context })
    }

    /// Durable consumer name for a `(channel, subscriber)` pair
    ///
    /// NATS durable names may not contain dots.
    fn durable_name(channel: &str, subscriber: &str) -> String {
        format!("{}-{}", subscriber, channel.replace('.', "-"))
    }
}

#[async_trait]
impl BusTransport for NatsTransport {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> BusResult<()> {
        // Await the server ack so `Ok` really means "accepted and durable"
        self.context
            .publish(channel.to_string(), payload.into())
            .await
            .map_err(|e| BusError::BrokerUnavailable(e.to_string()))?
            .await
            .map_err(|e| BusError::BrokerUnavailable(e.to_string()))?;

        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        subscriber: &str,
    ) -> BusResult<BoxStream<'static, Delivery>> {
        let stream = self
            .context
            .get_stream(STREAM_NAME)
            .await
            .map_err(|e| BusError::SubscribeError(e.to_string()))?;

        let durable = Self::durable_name(channel, subscriber);
        let consumer = stream
            .get_or_create_consumer(
                &durable,
                pull::Config {
                    durable_name: Some(durable.clone()),
                    filter_subject: channel.to_string(),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| BusError::SubscribeError(e.to_string()))?;

        let mut messages = consumer
            .messages()
            .await
            .map_err(|e| BusError::SubscribeError(e.to_string()))?;

        let channel_name = channel.to_string();
        let stream = async_stream::stream! {
            while let Some(next) = messages.next().await {
                match next {
                    Ok(msg) => {
                        if let Err(e) = msg.ack().await {
                            tracing::warn!(
                                channel = %channel_name,
                                error = %e,
                                "failed to ack delivery"
                            );
                        }
                        yield Delivery::new(msg.subject.to_string(), msg.payload.to_vec());
                    }
                    Err(e) => {
                        tracing::warn!(
                            channel = %channel_name,
                            error = %e,
                            "error pulling from durable consumer"
                        );
                    }
                }
            }
        };

        Ok(stream.boxed())
    }
}
