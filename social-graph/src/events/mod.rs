//! Notification fanout.
//!
//! The engine hands every committed mutation to an [`EventPublisher`].
//! Publishing happens after the store write, so a publish failure cannot be
//! rolled back; it is logged and the operation still succeeds.

mod broadcast;
#[cfg(feature = "kafka")]
mod kafka;

pub use broadcast::{BroadcastPublisher, DEFAULT_CHANNEL_CAPACITY};
#[cfg(feature = "kafka")]
pub use kafka::KafkaPublisher;

use async_trait::async_trait;
use social_graph_shared::{DomainEvent, EventKind};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that can occur while publishing an event.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The event could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The transport refused or failed to deliver the event.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl PublishError {
    /// Create a transport error.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

impl From<serde_json::Error> for PublishError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Sink for domain events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The event was handed to the transport
    /// * `Err(PublishError)` - The event could not be published
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError>;
}

/// Publisher that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPublisher;

#[async_trait]
impl EventPublisher for NoopPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        debug!(event = event.name(), "Dropping event");
        Ok(())
    }
}

/// Stamp and publish an event, logging instead of failing.
pub(crate) async fn emit(publisher: &dyn EventPublisher, kind: EventKind) {
    let event = DomainEvent::now(kind);
    if let Err(e) = publisher.publish(&event).await {
        warn!(event = event.name(), error = %e, "Failed to publish event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use social_graph_shared::StoryId;

    struct FailingPublisher;

    #[async_trait]
    impl EventPublisher for FailingPublisher {
        async fn publish(&self, _event: &DomainEvent) -> Result<(), PublishError> {
            Err(PublishError::transport("broker down"))
        }
    }

    #[tokio::test]
    async fn test_emit_swallows_publish_failures() {
        emit(
            &FailingPublisher,
            EventKind::StoryDeleted {
                story_id: StoryId::new("s1"),
            },
        )
        .await;
    }

    #[tokio::test]
    async fn test_noop_publisher_accepts_everything() {
        let event = DomainEvent::now(EventKind::StoryDeleted {
            story_id: StoryId::new("s1"),
        });
        assert!(NoopPublisher.publish(&event).await.is_ok());
    }
}
