//! Transport abstraction under the broker client
//!
//! A transport moves opaque bytes to and from named durable channels. The
//! broker client layers envelopes, delivery loops, and outcome handling on
//! top of it.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::BusResult;

/// One message as it arrives off a channel
#[derive(Debug, Clone)]
pub struct Delivery {
    /// The channel this message was published to
    pub channel: String,
    /// The serialized envelope
    pub payload: Vec<u8>,
}

impl Delivery {
    pub fn new(channel: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            channel: channel.into(),
            payload,
        }
    }
}

/// Byte-level publish/subscribe over named durable channels
///
/// Implementations must tolerate concurrent use from multiple call sites
/// without external locking; the broker client multiplexes every publish and
/// every delivery loop of a service over one transport instance.
#[async_trait]
pub trait BusTransport: Send + Sync {
    /// Publish a payload to a channel, requesting durable delivery
    ///
    /// Once this returns `Ok`, the payload survives a broker restart.
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> BusResult<()>;

    /// Open a delivery stream for a channel, creating the channel if absent
    ///
    /// `subscriber` names the consuming service so that independent
    /// subscribers each receive their own copy of every payload.
    async fn subscribe(
        &self,
        channel: &str,
        subscriber: &str,
    ) -> BusResult<BoxStream<'static, Delivery>>;
}

impl std::fmt::Debug for dyn BusTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BusTransport")
    }
}
