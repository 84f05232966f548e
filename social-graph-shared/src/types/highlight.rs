use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::HighlightId;

/// A named collection of stories pinned to a user's profile.
///
/// Ownership is expressed by the `HAS_HIGHLIGHT` edge, not stored on the node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Highlight {
    pub id: HighlightId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Highlight {
    pub fn new(id: HighlightId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}
