//! Kafka event sink.
//!
//! Events are produced as JSON, keyed by the acting user so one user's events
//! land on one partition in order.

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use social_graph_shared::DomainEvent;
use std::time::Duration;
use tracing::debug;

use super::{EventPublisher, PublishError};

/// How long a send may wait for room in the local producer queue.
const QUEUE_TIMEOUT: Duration = Duration::from_secs(1);

/// Kafka publisher for domain events.
pub struct KafkaPublisher {
    producer: FutureProducer,
    topic: String,
}

impl KafkaPublisher {
    /// Create a publisher connected to the given broker.
    ///
    /// SASL/SSL is enabled when `KAFKA_USERNAME` and `KAFKA_PASSWORD` are set,
    /// with an optional `KAFKA_SSL_CA_PEM` certificate. Otherwise plaintext is used.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let publisher = KafkaPublisher::new("localhost:9092", "social.events")?;
    /// ```
    pub fn new(broker: &str, topic: &str) -> Result<Self, KafkaError> {
        let mut config = ClientConfig::new();

        config
            .set("bootstrap.servers", broker)
            .set("client.id", "social-graph")
            .set("compression.type", "zstd")
            .set("message.timeout.ms", "5000");

        if let (Ok(username), Ok(password)) = (
            std::env::var("KAFKA_USERNAME"),
            std::env::var("KAFKA_PASSWORD"),
        ) {
            config
                .set("security.protocol", "SASL_SSL")
                .set("sasl.mechanisms", "PLAIN")
                .set("sasl.username", &username)
                .set("sasl.password", &password);

            if let Ok(ca_pem) = std::env::var("KAFKA_SSL_CA_PEM") {
                config.set("ssl.ca.pem", &ca_pem);
            }
        }

        let producer = config.create()?;

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

fn partition_key(event: &DomainEvent) -> &str {
    event
        .actor()
        .map(|actor| actor.as_str())
        .unwrap_or_else(|| event.name())
}

#[async_trait]
impl EventPublisher for KafkaPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_vec(event)?;
        let key = partition_key(event);
        let record = FutureRecord::to(&self.topic).key(key).payload(&payload);

        let (partition, offset) = self
            .producer
            .send(record, Timeout::After(QUEUE_TIMEOUT))
            .await
            .map_err(|(e, _)| PublishError::transport(e.to_string()))?;

        debug!(event = event.name(), partition, offset, "Produced event");
        Ok(())
    }
}

impl std::fmt::Debug for KafkaPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaPublisher")
            .field("topic", &self.topic)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use social_graph_shared::{EventKind, StoryId, UserId};

    #[test]
    fn test_partition_key_prefers_actor() {
        let liked = DomainEvent::now(EventKind::StoryLiked {
            actor_id: UserId::new("u1"),
            story_id: StoryId::new("s1"),
            like_count: 1,
        });
        assert_eq!(partition_key(&liked), "u1");

        let deleted = DomainEvent::now(EventKind::StoryDeleted {
            story_id: StoryId::new("s1"),
        });
        assert_eq!(partition_key(&deleted), "story.deleted");
    }
}
