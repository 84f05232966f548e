//! Configuration types for the Neo4j graph store.

use std::time::Duration;

/// Default Bolt URI.
pub const DEFAULT_NEO4J_URI: &str = "bolt://localhost:7687";

/// Default per-statement timeout.
pub const DEFAULT_STATEMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for [`crate::Neo4jGraphStore`].
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    /// Bolt URI (e.g. `bolt://localhost:7687`).
    pub uri: String,
    pub user: String,
    pub password: String,
    /// Upper bound on a single statement round-trip. A statement that does not
    /// finish in time fails with `GraphStoreError::Timeout`.
    pub statement_timeout: Duration,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_NEO4J_URI.to_string(),
            user: String::new(),
            password: String::new(),
            statement_timeout: DEFAULT_STATEMENT_TIMEOUT,
        }
    }
}

impl Neo4jConfig {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Set basic-auth credentials.
    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }

    /// Set the per-statement timeout.
    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = timeout;
        self
    }
}
