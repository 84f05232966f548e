//! Domain events
//!
//! One event is emitted per significant mutation. Each carries the identifiers
//! of the affected entities and of the acting user. Delivery topics and
//! transport belong to the publisher, not to these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{HighlightId, StoryId, UserId};

/// A domain event together with the time it was produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainEvent {
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// The payload of a domain event, tagged with its wire name (e.g. `story.liked`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum EventKind {
    #[serde(rename = "story.created")]
    StoryCreated { actor_id: UserId, story_id: StoryId },
    #[serde(rename = "story.updated")]
    StoryUpdated { story_id: StoryId },
    #[serde(rename = "story.deleted")]
    StoryDeleted { story_id: StoryId },
    #[serde(rename = "story.viewed")]
    StoryViewed { actor_id: UserId, story_id: StoryId },
    #[serde(rename = "story.liked")]
    StoryLiked {
        actor_id: UserId,
        story_id: StoryId,
        like_count: u64,
    },
    #[serde(rename = "story.unliked")]
    StoryUnliked {
        actor_id: UserId,
        story_id: StoryId,
        like_count: u64,
    },
    #[serde(rename = "highlight.created")]
    HighlightCreated {
        actor_id: UserId,
        highlight_id: HighlightId,
    },
    #[serde(rename = "highlight.story_added")]
    HighlightStoryAdded {
        highlight_id: HighlightId,
        story_id: StoryId,
    },
    #[serde(rename = "highlight.deleted")]
    HighlightDeleted { highlight_id: HighlightId },
    #[serde(rename = "friend.requested")]
    FriendRequested { actor_id: UserId, target_id: UserId },
    #[serde(rename = "friend.accepted")]
    FriendAccepted { actor_id: UserId, target_id: UserId },
    #[serde(rename = "friend.rejected")]
    FriendRejected { actor_id: UserId, target_id: UserId },
    #[serde(rename = "friend.removed")]
    FriendRemoved { actor_id: UserId, target_id: UserId },
}

impl DomainEvent {
    /// Stamp an event with the current time.
    pub fn now(kind: EventKind) -> Self {
        Self {
            occurred_at: Utc::now(),
            kind,
        }
    }

    /// The dotted wire name of this event.
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// The acting user, when the event has one.
    pub fn actor(&self) -> Option<&UserId> {
        self.kind.actor()
    }
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::StoryCreated { .. } => "story.created",
            EventKind::StoryUpdated { .. } => "story.updated",
            EventKind::StoryDeleted { .. } => "story.deleted",
            EventKind::StoryViewed { .. } => "story.viewed",
            EventKind::StoryLiked { .. } => "story.liked",
            EventKind::StoryUnliked { .. } => "story.unliked",
            EventKind::HighlightCreated { .. } => "highlight.created",
            EventKind::HighlightStoryAdded { .. } => "highlight.story_added",
            EventKind::HighlightDeleted { .. } => "highlight.deleted",
            EventKind::FriendRequested { .. } => "friend.requested",
            EventKind::FriendAccepted { .. } => "friend.accepted",
            EventKind::FriendRejected { .. } => "friend.rejected",
            EventKind::FriendRemoved { .. } => "friend.removed",
        }
    }

    pub fn actor(&self) -> Option<&UserId> {
        match self {
            EventKind::StoryCreated { actor_id, .. }
            | EventKind::StoryViewed { actor_id, .. }
            | EventKind::StoryLiked { actor_id, .. }
            | EventKind::StoryUnliked { actor_id, .. }
            | EventKind::HighlightCreated { actor_id, .. }
            | EventKind::FriendRequested { actor_id, .. }
            | EventKind::FriendAccepted { actor_id, .. }
            | EventKind::FriendRejected { actor_id, .. }
            | EventKind::FriendRemoved { actor_id, .. } => Some(actor_id),
            EventKind::StoryUpdated { .. }
            | EventKind::StoryDeleted { .. }
            | EventKind::HighlightStoryAdded { .. }
            | EventKind::HighlightDeleted { .. } => None,
        }
    }
}

impl fmt::Display for DomainEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_name_matches_serde_tag() {
        let event = DomainEvent::now(EventKind::StoryLiked {
            actor_id: UserId::new("u1"),
            story_id: StoryId::new("s1"),
            like_count: 1,
        });

        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "story.liked");
        assert_eq!(json["actor_id"], "u1");
        assert_eq!(json["story_id"], "s1");
        assert_eq!(event.name(), "story.liked");
    }

    #[test]
    fn test_deserializes_flattened_payload() {
        let json = r#"{"occurred_at":"2024-01-01T00:00:00Z","type":"friend.accepted","actor_id":"u2","target_id":"u1"}"#;
        let event: DomainEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event.kind,
            EventKind::FriendAccepted {
                actor_id: UserId::new("u2"),
                target_id: UserId::new("u1"),
            }
        );
        assert_eq!(event.actor(), Some(&UserId::new("u2")));
    }

    #[test]
    fn test_events_without_actor() {
        let event = DomainEvent::now(EventKind::StoryDeleted {
            story_id: StoryId::new("s1"),
        });
        assert!(event.actor().is_none());
    }
}
