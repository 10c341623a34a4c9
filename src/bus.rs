//! Domain event publishing over NATS.

use crate::domain::events::DomainEvent;

#[derive(Clone, Default)]
pub struct EventBus {
    nats: Option<async_nats::Client>,
}

impl EventBus {
    /// Bus that only traces events.
    pub fn disconnected() -> Self { Self::default() }

    pub fn with_client(client: async_nats::Client) -> Self { Self { nats: Some(client) } }

    pub async fn connect(url: &str) -> Result<Self, async_nats::ConnectError> {
        let client = async_nats::connect(url).await?;
        tracing::info!(url, "connected to NATS");
        Ok(Self::with_client(client))
    }

    pub fn is_connected(&self) -> bool { self.nats.is_some() }

    /// Best effort: publish failures are logged, never returned.
    pub async fn publish(&self, event: &DomainEvent) {
        let subject = event.subject();
        tracing::info!(subject = %subject, "domain event");
        let Some(client) = &self.nats else { return };
        let payload = match serde_json::to_vec(event) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(subject = %subject, error = %e, "could not encode event");
                return;
            }
        };
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            tracing::warn!(subject = %subject, error = %e, "event publish failed");
        }
    }
}
