//! Configuration and dependency initialization.

mod dependencies;

pub use dependencies::{ConnectionMode, Dependencies, EventSink, StoreBackend};

use std::env;

use crate::events::DEFAULT_CHANNEL_CAPACITY;

/// Engine-level settings.
#[derive(Clone)]
pub struct EngineConfig {
    /// Secret that must be presented to obtain an
    /// [`AdminCapability`](crate::AdminCapability). When unset, administrative
    /// operations are disabled.
    pub admin_token: Option<String>,
    /// Capacity of the in-process event channel.
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            admin_token: None,
            event_channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Read `ADMIN_TOKEN` and `EVENT_CHANNEL_CAPACITY` from the environment.
    pub fn from_env() -> Self {
        let admin_token = env::var("ADMIN_TOKEN").ok().filter(|t| !t.trim().is_empty());
        let event_channel_capacity = env::var("EVENT_CHANNEL_CAPACITY")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_CHANNEL_CAPACITY);

        Self {
            admin_token,
            event_channel_capacity,
        }
    }

    pub fn with_admin_token(mut self, token: impl Into<String>) -> Self {
        self.admin_token = Some(token.into());
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

// The token never appears in logs.
impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConfig")
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .field("event_channel_capacity", &self.event_channel_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_admin_token() {
        let config = EngineConfig::new().with_admin_token("hunter2");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
