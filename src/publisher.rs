//! Fire-and-forget publication of domain events.

use tracing::{debug, warn};

use crate::domain::events::DomainEvent;

/// Publishes events to NATS under `{prefix}.{event subject}` when a client is
/// configured; otherwise events are only logged. Publication failures are
/// logged and never reach the caller.
#[derive(Clone, Debug, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
    prefix: String,
}

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>, prefix: impl Into<String>) -> Self {
        Self { nats, prefix: prefix.into() }
    }

    /// Log-only publisher.
    pub fn disabled() -> Self { Self::default() }

    pub fn subject_for(&self, event: &DomainEvent) -> String {
        if self.prefix.is_empty() { event.subject().to_string() } else { format!("{}.{}", self.prefix, event.subject()) }
    }

    pub async fn publish(&self, event: &DomainEvent) {
        let subject = self.subject_for(event);
        let Some(nats) = &self.nats else {
            debug!(%subject, ?event, "domain event");
            return;
        };
        let payload = match serde_json::to_vec(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%subject, error = %e, "failed to encode domain event");
                return;
            }
        };
        if let Err(e) = nats.publish(subject.clone(), payload.into()).await {
            warn!(%subject, error = %e, "failed to publish domain event");
        }
    }

    pub async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in &events {
            self.publish(event).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::OrderEvent;
    use uuid::Uuid;

    #[test]
    fn test_subject_prefix() {
        let event = DomainEvent::Order(OrderEvent::Deleted { order_id: Uuid::new_v4() });
        assert_eq!(EventPublisher::new(None, "storefront").subject_for(&event), "storefront.order.deleted");
        assert_eq!(EventPublisher::disabled().subject_for(&event), "order.deleted");
    }

    #[tokio::test]
    async fn test_disabled_publisher_swallows_events() {
        let event = DomainEvent::Order(OrderEvent::Deleted { order_id: Uuid::new_v4() });
        EventPublisher::disabled().publish(&event).await;
    }
}
