//! # Social Graph Shared
//!
//! This crate defines the domain types shared across the social graph ecosystem:
//! identifiers, the User/Story/Highlight entities, friendship status, and the
//! domain events emitted after mutations.

pub mod types;

pub use types::event::{DomainEvent, EventKind};
pub use types::friendship::FriendshipStatus;
pub use types::highlight::Highlight;
pub use types::ids::{HighlightId, StoryId, UserId};
pub use types::story::Story;
pub use types::user::User;
