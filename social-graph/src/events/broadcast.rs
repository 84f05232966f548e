use async_trait::async_trait;
use social_graph_shared::DomainEvent;
use tokio::sync::broadcast;
use tracing::debug;

use super::{EventPublisher, PublishError};

/// Default capacity of the in-process event channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// In-process publisher backed by a `tokio::sync::broadcast` channel.
///
/// Real-time subscribers (websocket sessions, notification workers) call
/// [`BroadcastPublisher::subscribe`]. Slow receivers lag and lose the oldest
/// events rather than applying back-pressure to the engine.
#[derive(Debug, Clone)]
pub struct BroadcastPublisher {
    sender: broadcast::Sender<DomainEvent>,
}

impl BroadcastPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Attach a new subscriber. It only sees events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastPublisher {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        match self.sender.send(event.clone()) {
            Ok(receivers) => debug!(event = event.name(), receivers, "Broadcast event"),
            // No subscribers is not a delivery failure.
            Err(_) => debug!(event = event.name(), "No subscribers for event"),
        }
        Ok(())
    }
}
