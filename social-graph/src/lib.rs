//! # Social Graph
//!
//! Consistency engine for a social content backend: how friendship gates
//! likes, how like counters stay consistent with the edges they summarize,
//! and how deleting a story or highlight cascades across every relationship
//! that references it.
//!
//! ## Architecture
//!
//! The engine is split into four components sharing one graph store and one
//! event publisher:
//!
//! 1. **Relationships**: friend request / accept / reject / remove state machine
//! 2. **Content**: story and highlight creation, update and cascading deletion
//! 3. **Visibility**: which highlights and stories a listing returns
//! 4. **Likes**: `LIKED` edges and the cached like counter
//!
//! ## Modules
//!
//! - [`config`]: Engine configuration and dependency initialization
//! - [`engine`]: The [`SocialGraphEngine`] facade
//! - [`events`]: Event publishers (broadcast, Kafka, no-op)
//! - [`errors`]: Error types for the engine

pub mod admin;
pub mod config;
pub mod content;
pub mod counters;
pub mod engine;
pub mod errors;
pub mod events;
mod lookup;
mod mapping;
pub mod relationship;
pub mod visibility;

pub use admin::AdminCapability;
pub use config::{Dependencies, EngineConfig};
pub use content::{ContentManager, CreateHighlightRequest, CreateStoryRequest, StoryDeletion};
pub use counters::{LikeCounter, LikeReconciliation};
pub use engine::SocialGraphEngine;
pub use errors::EngineError;
pub use events::{BroadcastPublisher, EventPublisher, NoopPublisher, PublishError};
pub use relationship::RelationshipManager;
pub use visibility::VisibilityGate;

use thiserror::Error;

/// Errors that can occur during startup or while running a command.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Engine error.
    #[error("Engine error: {0}")]
    EngineError(#[from] EngineError),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
