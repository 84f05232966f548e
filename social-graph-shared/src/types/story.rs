//! Story entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{StoryId, UserId};

/// An ephemeral piece of content published by a user.
///
/// `creator_id` is a denormalized copy of the publishing user's identifier
/// (the authoritative link is the `PUBLISHED` edge). `like_count` is a cached
/// aggregate of the `LIKED` edges targeting the story and is never negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Story {
    pub id: StoryId,
    pub creator_id: UserId,
    /// Content reference (URL or text body).
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub like_count: u64,
}

impl Story {
    /// Create a new, unliked story stamped with the current time.
    pub fn new(id: StoryId, creator_id: UserId, content: impl Into<String>) -> Self {
        Self {
            id,
            creator_id,
            content: content.into(),
            created_at: Utc::now(),
            like_count: 0,
        }
    }

    /// Whether `user` is the story's creator.
    pub fn is_created_by(&self, user: &UserId) -> bool {
        &self.creator_id == user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_story_starts_unliked() {
        let story = Story::new(StoryId::new("s1"), UserId::new("u2"), "https://cdn/1.png");
        assert_eq!(story.like_count, 0);
        assert!(story.is_created_by(&UserId::new("u2")));
        assert!(!story.is_created_by(&UserId::new("u1")));
    }
}
