//! Domain event publishing to NATS.

use crate::domain::events::DomainEvent;

/// Publishes domain events when a NATS client is configured; otherwise logs them.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }

    /// Best-effort: failures are logged and never reach the caller.
    pub async fn publish(&self, event: DomainEvent) {
        let subject = event.subject();
        let Some(nats) = &self.nats else {
            tracing::debug!(%subject, ?event, "Event bus not configured");
            return;
        };
        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(%subject, error = %e, "Failed to serialize event");
                return;
            }
        };
        if let Err(e) = nats.publish(subject.clone(), payload.into()).await {
            tracing::warn!(%subject, error = %e, "Failed to publish event");
        }
    }
}
