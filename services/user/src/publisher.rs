//! Registration event publishing

use message_bus::{BrokerClient, EventKind};
use std::sync::Arc;

use crate::models::UserRegisteredPayload;

/// Emits `user.registered` envelopes after a registration commits
///
/// Same fire-and-forget discipline as the order publisher: the registration
/// has already committed, so a publish failure is logged and never surfaced
/// into the signup path.
pub struct UserEventPublisher {
    broker: Arc<BrokerClient>,
}

impl UserEventPublisher {
    pub fn new(broker: Arc<BrokerClient>) -> Self {
        Self { broker }
    }

    pub async fn user_registered(&self, user: &UserRegisteredPayload) {
        if let Err(e) = self.broker.publish(EventKind::UserRegistered, user).await {
            tracing::error!(
                user_id = %user.id,
                error = %e,
                "failed to publish user.registered"
            );
        } else {
            tracing::info!(user_id = %user.id, "published user.registered");
        }
    }
}
