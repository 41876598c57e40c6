//! The broker client: one owned connection per service, multiplexing all
//! publishes and delivery loops
//!
//! Explicitly constructed and explicitly owned; there is no global client.
//! A service creates one at startup, hands `Arc` clones to whatever publishes
//! or consumes, and closes it at shutdown, which cancels every delivery loop
//! the client owns.

use futures::stream::StreamExt;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;

use crate::config::BrokerConfig;
use crate::envelope::{Envelope, EventKind};
use crate::nats::NatsTransport;
use crate::retry::RetryPolicy;
use crate::transport::{BusTransport, Delivery};
use crate::{BusError, BusResult};

/// Upper bound on waiting for delivery loops to drain during `close`
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bound on a single handler invocation
const DEFAULT_HANDLER_TIMEOUT: Duration = Duration::from_secs(30);

/// What a handler reports back for one delivered envelope
///
/// The delivery loop drives redelivery and dead-lettering from this; no
/// handler failure ever escapes the loop or stops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The envelope was applied (or recognized as a duplicate); move on
    Processed,
    /// Transient failure (store unreachable etc.); retry with backoff,
    /// dead-letter once attempts are exhausted
    Retry(String),
    /// Permanent failure (malformed payload etc.); move the envelope to the
    /// kind's dead-letter channel and move on
    DeadLetter(String),
}

/// A cancellable handle to one delivery loop
///
/// Dropping the handle leaves the loop running; it then stops when the owning
/// client is closed.
pub struct SubscriptionHandle {
    kind: EventKind,
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// The kind this subscription delivers
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Whether the delivery loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop this delivery loop and wait for it to finish
    ///
    /// An in-flight handler invocation completes before the loop exits.
    pub async fn cancel(self) {
        let _ = self.cancel_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(kind = %self.kind, error = %e, "delivery loop task failed during cancel");
        }
    }
}

/// Client for the durable message bus
///
/// Safe for concurrent use from any number of call sites; all internal state
/// is synchronized. `publish` and `subscribe` connect implicitly on first use.
pub struct BrokerClient {
    service: String,
    config: BrokerConfig,
    retry: RetryPolicy,
    handler_timeout: Duration,
    transport: RwLock<Option<Arc<dyn BusTransport>>>,
    // close() broadcast: every delivery loop listens on a subscription of this
    shutdown_tx: broadcast::Sender<()>,
    // Each loop holds a clone of the guard sender; when the prototype and all
    // clones are dropped, the receiver resolves and close() knows the loops
    // have drained.
    loop_guard: Mutex<Option<mpsc::Sender<()>>>,
    loop_done: Mutex<Option<mpsc::Receiver<()>>>,
}

impl BrokerClient {
    /// Create a client for `service` against the given broker
    ///
    /// The service name scopes durable consumers, so two services subscribing
    /// to the same kind each receive their own copy of every envelope.
    pub fn new(service: impl Into<String>, config: BrokerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let (guard_tx, guard_rx) = mpsc::channel(1);
        Self {
            service: service.into(),
            config,
            retry: RetryPolicy::default(),
            handler_timeout: DEFAULT_HANDLER_TIMEOUT,
            transport: RwLock::new(None),
            shutdown_tx,
            loop_guard: Mutex::new(Some(guard_tx)),
            loop_done: Mutex::new(Some(guard_rx)),
        }
    }

    /// Override the retry policy applied to `HandlerOutcome::Retry`
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Override the per-invocation handler timeout
    ///
    /// A timed-out invocation counts as a transient failure.
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// The service name this client was created for
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Establish the connection to the bus
    ///
    /// Idempotent: calling while connected is a no-op. Fails with
    /// `BusError::BrokerUnavailable` if the bus cannot be reached; the caller
    /// decides whether to retry or abort startup.
    pub async fn connect(&self) -> BusResult<()> {
        let mut guard = self.transport.write().await;
        if guard.is_some() {
            return Ok(());
        }

        let transport: Arc<dyn BusTransport> = match &self.config {
            BrokerConfig::InMemory(bus) => Arc::new(bus.clone()),
            BrokerConfig::Nats { url } => {
                tracing::info!(service = %self.service, url = %url, "connecting to NATS");
                Arc::new(NatsTransport::connect(url).await?)
            }
        };

        *guard = Some(transport);
        tracing::info!(service = %self.service, "connected to message bus");
        Ok(())
    }

    async fn ensure_connected(&self) -> BusResult<Arc<dyn BusTransport>> {
        if let Some(transport) = self.transport.read().await.as_ref() {
            return Ok(transport.clone());
        }
        self.connect().await?;
        self.transport
            .read()
            .await
            .as_ref()
            .cloned()
            .ok_or_else(|| BusError::BrokerUnavailable("connection lost during connect".into()))
    }

    /// Publish a payload as a fresh envelope on the channel named by `kind`
    ///
    /// Durable once accepted. Connects implicitly if needed. A failure here
    /// must be surfaced for logging/alerting by the caller, whose business
    /// write has already committed and must not be rolled back.
    pub async fn publish<T: Serialize>(&self, kind: EventKind, payload: &T) -> BusResult<()> {
        let transport = self.ensure_connected().await?;

        let envelope = Envelope::new(kind, payload);
        let bytes = envelope.encode()?;
        transport.publish(kind.channel(), bytes).await?;

        tracing::info!(
            service = %self.service,
            kind = %kind,
            event_id = %envelope.event_id,
            "published event"
        );
        Ok(())
    }

    /// Start a delivery loop invoking `handler` once per delivered envelope
    ///
    /// The loop owns the subscription until it is cancelled via the returned
    /// handle or the client is closed. Handler outcomes drive retry and
    /// dead-lettering; nothing a handler reports can crash the loop.
    pub async fn subscribe<F, Fut>(
        &self,
        kind: EventKind,
        handler: F,
    ) -> BusResult<SubscriptionHandle>
    where
        F: Fn(Delivery) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerOutcome> + Send + 'static,
    {
        let transport = self.ensure_connected().await?;
        let mut stream = transport.subscribe(kind.channel(), &self.service).await?;

        let loop_guard = self
            .loop_guard
            .lock()
            .await
            .clone()
            .ok_or_else(|| BusError::SubscribeError("client is closed".into()))?;

        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let policy = self.retry.clone();
        let handler_timeout = self.handler_timeout;
        let service = self.service.clone();

        let task = tokio::spawn(async move {
            let _loop_guard = loop_guard;
            tracing::info!(service = %service, channel = kind.channel(), "delivery loop started");

            loop {
                let delivery = tokio::select! {
                    _ = cancel_rx.changed() => break,
                    _ = shutdown_rx.recv() => break,
                    next = stream.next() => match next {
                        Some(delivery) => delivery,
                        None => break,
                    },
                };

                // Runs outside the select, so cancellation waits for the
                // in-flight envelope to finish.
                process_delivery(&transport, kind, &delivery, &handler, &policy, handler_timeout)
                    .await;
            }

            tracing::info!(service = %service, channel = kind.channel(), "delivery loop stopped");
        });

        Ok(SubscriptionHandle {
            kind,
            cancel_tx,
            task,
        })
    }

    /// Stop every delivery loop owned by this client and release the connection
    ///
    /// Bounded: loops that fail to drain within a few seconds are abandoned
    /// with a warning rather than blocking shutdown forever.
    pub async fn close(&self) {
        let _ = self.shutdown_tx.send(());

        // Drop the guard prototype so the done-channel closes once every loop
        // has dropped its clone.
        self.loop_guard.lock().await.take();

        if let Some(mut done) = self.loop_done.lock().await.take() {
            let drained = tokio::time::timeout(CLOSE_TIMEOUT, async {
                while done.recv().await.is_some() {}
            })
            .await;

            if drained.is_err() {
                tracing::warn!(
                    service = %self.service,
                    "delivery loops did not drain within close timeout"
                );
            }
        }

        *self.transport.write().await = None;
        tracing::info!(service = %self.service, "broker client closed");
    }
}

/// Run the handler for one envelope, honoring its outcome
///
/// `Retry` backs off and re-invokes up to the policy's attempt cap, then
/// dead-letters. `DeadLetter` moves the envelope to `dlq.<channel>`
/// immediately. The loop always proceeds to the next envelope afterwards.
async fn process_delivery<F, Fut>(
    transport: &Arc<dyn BusTransport>,
    kind: EventKind,
    delivery: &Delivery,
    handler: &F,
    policy: &RetryPolicy,
    handler_timeout: Duration,
) where
    F: Fn(Delivery) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerOutcome> + Send,
{
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let outcome = match tokio::time::timeout(handler_timeout, handler(delivery.clone())).await
        {
            Ok(outcome) => outcome,
            Err(_) => HandlerOutcome::Retry(format!(
                "handler exceeded timeout of {}ms",
                handler_timeout.as_millis()
            )),
        };

        match outcome {
            HandlerOutcome::Processed => {
                if attempt > 1 {
                    tracing::debug!(
                        channel = kind.channel(),
                        attempt = attempt,
                        "envelope processed after retry"
                    );
                }
                return;
            }
            HandlerOutcome::DeadLetter(reason) => {
                tracing::error!(
                    channel = kind.channel(),
                    reason = %reason,
                    "handler rejected envelope permanently, dead-lettering"
                );
                dead_letter(transport, kind, delivery, &reason).await;
                return;
            }
            HandlerOutcome::Retry(reason) => {
                if attempt >= policy.max_attempts {
                    tracing::error!(
                        channel = kind.channel(),
                        attempts = attempt,
                        reason = %reason,
                        "handler failed after max retries, dead-lettering"
                    );
                    dead_letter(transport, kind, delivery, &reason).await;
                    return;
                }

                let backoff = policy.backoff_for(attempt);
                tracing::warn!(
                    channel = kind.channel(),
                    attempt = attempt,
                    max_attempts = policy.max_attempts,
                    backoff_ms = backoff.as_millis(),
                    reason = %reason,
                    "handler reported transient failure, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

/// Move a failed envelope to the kind's dead-letter channel
///
/// Failing to dead-letter is logged and the envelope is dropped; the loop
/// must keep going either way.
async fn dead_letter(
    transport: &Arc<dyn BusTransport>,
    kind: EventKind,
    delivery: &Delivery,
    reason: &str,
) {
    let dlq_channel = format!("dlq.{}", kind.channel());
    if let Err(e) = transport
        .publish(&dlq_channel, delivery.payload.clone())
        .await
    {
        tracing::error!(
            channel = kind.channel(),
            dlq_channel = %dlq_channel,
            reason = %reason,
            error = %e,
            "failed to dead-letter envelope, dropping"
        );
    } else {
        tracing::warn!(
            channel = kind.channel(),
            dlq_channel = %dlq_channel,
            reason = %reason,
            "envelope moved to dead-letter channel"
        );
    }
}
