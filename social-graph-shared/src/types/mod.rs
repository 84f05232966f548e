//! This module defines the core data structures used across the social graph engine.
//! It re-exports the entity, identifier, and event types.

pub mod event;
pub mod friendship;
pub mod highlight;
pub mod ids;
pub mod story;
pub mod user;

pub use event::{DomainEvent, EventKind};
pub use friendship::FriendshipStatus;
pub use highlight::Highlight;
pub use ids::{HighlightId, StoryId, UserId};
pub use story::Story;
pub use user::User;
