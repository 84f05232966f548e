//! Dependency initialization and wiring for the social graph engine.

use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::engine::SocialGraphEngine;
use crate::events::{BroadcastPublisher, EventPublisher, NoopPublisher};
use crate::AppError;
use social_graph_repository::{GraphStore, MemoryGraphStore, Neo4jConfig, Neo4jGraphStore};

/// Default Neo4j Bolt URI.
const DEFAULT_NEO4J_URI: &str = "bolt://localhost:7687";

/// Default Neo4j user.
const DEFAULT_NEO4J_USER: &str = "neo4j";

/// Default per-statement timeout in milliseconds.
const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Default Kafka broker address.
#[cfg(feature = "kafka")]
const DEFAULT_KAFKA_BROKER: &str = "localhost:9092";

/// Default Kafka topic for domain events.
#[cfg(feature = "kafka")]
const DEFAULT_KAFKA_TOPIC: &str = "social.events";

/// Connection mode for Neo4j.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry the connection until it succeeds.
    Retry,
}

impl ConnectionMode {
    /// Parse connection mode from `NEO4J_CONNECTION_MODE`.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "retry" if not set or invalid.
    fn from_env() -> Self {
        match env::var("NEO4J_CONNECTION_MODE")
            .unwrap_or_else(|_| "retry".to_string())
            .to_lowercase()
            .as_str()
        {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid NEO4J_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Which graph store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Neo4j,
}

impl StoreBackend {
    fn parse(value: &str) -> Result<Self, AppError> {
        match value.to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "neo4j" => Ok(Self::Neo4j),
            other => Err(AppError::config(format!("Unknown GRAPH_STORE '{other}'"))),
        }
    }
}

/// Where domain events go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSink {
    Broadcast,
    Kafka,
    None,
}

impl EventSink {
    fn parse(value: &str) -> Result<Self, AppError> {
        match value.to_lowercase().as_str() {
            "broadcast" => Ok(Self::Broadcast),
            "kafka" => Ok(Self::Kafka),
            "none" | "noop" => Ok(Self::None),
            other => Err(AppError::config(format!("Unknown EVENT_SINK '{other}'"))),
        }
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The engine, ready to serve requests.
    pub engine: SocialGraphEngine,
    /// The in-process event channel, when `EVENT_SINK=broadcast`.
    pub broadcast: Option<BroadcastPublisher>,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `GRAPH_STORE`: "memory" or "neo4j" (default: neo4j)
    /// - `NEO4J_URI`: Bolt URI (default: bolt://localhost:7687)
    /// - `NEO4J_USER` / `NEO4J_PASSWORD`: Credentials (default user: neo4j)
    /// - `NEO4J_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    /// - `NEO4J_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `STORE_TIMEOUT_MS`: Per-statement timeout (default: 5000)
    /// - `EVENT_SINK`: "broadcast", "kafka" or "none" (default: broadcast)
    /// - `KAFKA_BROKER` / `KAFKA_TOPIC`: Kafka sink settings (default: localhost:9092, social.events)
    /// - `ADMIN_TOKEN`: Enables administrative operations
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(AppError)` - If configuration is invalid or the store is unreachable in fail-fast mode
    pub async fn new() -> Result<Self, AppError> {
        let backend = StoreBackend::parse(
            &env::var("GRAPH_STORE").unwrap_or_else(|_| "neo4j".to_string()),
        )?;
        let sink = EventSink::parse(
            &env::var("EVENT_SINK").unwrap_or_else(|_| "broadcast".to_string()),
        )?;
        let config = EngineConfig::from_env();

        info!(
            backend = ?backend,
            sink = ?sink,
            admin_enabled = config.admin_token.is_some(),
            "Initializing dependencies"
        );

        let store = Self::build_store(backend).await?;
        let (publisher, broadcast) = Self::build_publisher(sink, &config)?;

        Ok(Self {
            engine: SocialGraphEngine::new(store, publisher, config),
            broadcast,
        })
    }

    async fn build_store(backend: StoreBackend) -> Result<Arc<dyn GraphStore>, AppError> {
        match backend {
            StoreBackend::Memory => {
                warn!("Using the in-memory graph store; data is lost on exit");
                Ok(Arc::new(MemoryGraphStore::new()))
            }
            StoreBackend::Neo4j => {
                let timeout_ms = env::var("STORE_TIMEOUT_MS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_STORE_TIMEOUT_MS);
                let config = Neo4jConfig::new(
                    env::var("NEO4J_URI").unwrap_or_else(|_| DEFAULT_NEO4J_URI.to_string()),
                )
                .with_credentials(
                    env::var("NEO4J_USER").unwrap_or_else(|_| DEFAULT_NEO4J_USER.to_string()),
                    env::var("NEO4J_PASSWORD").unwrap_or_default(),
                )
                .with_statement_timeout(Duration::from_millis(timeout_ms));

                let retry_interval = env::var("NEO4J_RETRY_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_RETRY_INTERVAL_SECS);

                let store = Self::connect_to_neo4j(
                    config,
                    ConnectionMode::from_env(),
                    Duration::from_secs(retry_interval),
                )
                .await?;

                info!("Neo4j connection established");

                store
                    .ensure_constraints()
                    .await
                    .map_err(|e| AppError::config(format!("Failed to ensure constraints: {e}")))?;

                Ok(Arc::new(store))
            }
        }
    }

    /// Connect to Neo4j with retry logic based on connection mode.
    async fn connect_to_neo4j(
        config: Neo4jConfig,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<Neo4jGraphStore, AppError> {
        loop {
            let attempt = match Neo4jGraphStore::connect(config.clone()) {
                Ok(store) => match store.ping().await {
                    Ok(()) => Ok(store),
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };

            match attempt {
                Ok(store) => return Ok(store),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(AppError::config(format!(
                            "Failed to connect to Neo4j: {e}"
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            neo4j_uri = %config.uri,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to Neo4j, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }

    fn build_publisher(
        sink: EventSink,
        config: &EngineConfig,
    ) -> Result<(Arc<dyn EventPublisher>, Option<BroadcastPublisher>), AppError> {
        match sink {
            EventSink::Broadcast => {
                let publisher = BroadcastPublisher::new(config.event_channel_capacity);
                let shared: Arc<dyn EventPublisher> = Arc::new(publisher.clone());
                Ok((shared, Some(publisher)))
            }
            EventSink::None => Ok((Arc::new(NoopPublisher), None)),
            EventSink::Kafka => Ok((Self::kafka_publisher()?, None)),
        }
    }

    #[cfg(feature = "kafka")]
    fn kafka_publisher() -> Result<Arc<dyn EventPublisher>, AppError> {
        let broker = env::var("KAFKA_BROKER").unwrap_or_else(|_| DEFAULT_KAFKA_BROKER.to_string());
        let topic = env::var("KAFKA_TOPIC").unwrap_or_else(|_| DEFAULT_KAFKA_TOPIC.to_string());

        let publisher = crate::events::KafkaPublisher::new(&broker, &topic)
            .map_err(|e| AppError::config(format!("Failed to create Kafka producer: {e}")))?;
        info!(kafka_broker = %broker, kafka_topic = %topic, "Kafka publisher created");

        Ok(Arc::new(publisher))
    }

    #[cfg(not(feature = "kafka"))]
    fn kafka_publisher() -> Result<Arc<dyn EventPublisher>, AppError> {
        Err(AppError::config(
            "EVENT_SINK=kafka requires building with the 'kafka' feature",
        ))
    }
}
