//! Friendship status between an ordered pair of users.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The complete set of states a (viewer, target) pair can be in.
///
/// There is no "blocked" or "rejected" state: a rejected request returns the
/// pair to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FriendshipStatus {
    /// A confirmed friendship exists (in either direction).
    Friends,
    /// A request is pending and not yet accepted.
    RequestSent,
    /// No relation.
    None,
}

impl FriendshipStatus {
    /// Numeric code consumed by the profile page's action button
    /// (1 = remove friend, 2 = request sent, 3 = send request).
    pub fn code(&self) -> u8 {
        match self {
            FriendshipStatus::Friends => 1,
            FriendshipStatus::RequestSent => 2,
            FriendshipStatus::None => 3,
        }
    }

    pub fn is_friends(&self) -> bool {
        matches!(self, FriendshipStatus::Friends)
    }
}

impl fmt::Display for FriendshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FriendshipStatus::Friends => "FRIENDS",
            FriendshipStatus::RequestSent => "REQUEST_SENT",
            FriendshipStatus::None => "NONE",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_profile_buttons() {
        assert_eq!(FriendshipStatus::Friends.code(), 1);
        assert_eq!(FriendshipStatus::RequestSent.code(), 2);
        assert_eq!(FriendshipStatus::None.code(), 3);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&FriendshipStatus::RequestSent).unwrap();
        assert_eq!(json, "\"REQUEST_SENT\"");
        assert_eq!(FriendshipStatus::RequestSent.to_string(), "REQUEST_SENT");
    }
}
