//! Conversion between graph nodes and domain entities.

use social_graph_repository::{GraphStoreError, Node, Properties, PropertyValue};
use social_graph_shared::{Highlight, HighlightId, Story, StoryId, User, UserId};

use crate::errors::EngineError;

pub(crate) const CREATOR_ID: &str = "creator_id";
pub(crate) const CONTENT: &str = "content";
pub(crate) const CREATED_AT: &str = "created_at";
pub(crate) const LIKE_COUNT: &str = "like_count";
pub(crate) const NAME: &str = "name";
pub(crate) const USER_NAME: &str = "user_name";
pub(crate) const DISPLAY_NAME: &str = "display_name";
pub(crate) const PROFILE_PICTURE: &str = "profile_picture";

fn missing(node: &Node, key: &str) -> EngineError {
    EngineError::Store(GraphStoreError::decode(format!(
        "{} has no '{key}' property",
        node.node
    )))
}

pub(crate) fn story_properties(story: &Story) -> Properties {
    let mut properties = Properties::new();
    properties.insert(
        CREATOR_ID.to_string(),
        PropertyValue::text(story.creator_id.as_str()),
    );
    properties.insert(CONTENT.to_string(), PropertyValue::text(&story.content));
    properties.insert(
        CREATED_AT.to_string(),
        PropertyValue::timestamp(story.created_at),
    );
    properties.insert(
        LIKE_COUNT.to_string(),
        PropertyValue::Integer(story.like_count as i64),
    );
    properties
}

pub(crate) fn story_from_node(node: &Node) -> Result<Story, EngineError> {
    let creator_id = node
        .text(CREATOR_ID)
        .ok_or_else(|| missing(node, CREATOR_ID))?;
    let content = node.text(CONTENT).ok_or_else(|| missing(node, CONTENT))?;
    let created_at = node
        .timestamp(CREATED_AT)
        .ok_or_else(|| missing(node, CREATED_AT))?;
    // A counter that drifted below zero is read as zero.
    let like_count = node.integer(LIKE_COUNT).unwrap_or(0).max(0) as u64;

    Ok(Story {
        id: StoryId::new(node.id()),
        creator_id: UserId::new(creator_id),
        content: content.to_string(),
        created_at,
        like_count,
    })
}

pub(crate) fn highlight_properties(highlight: &Highlight) -> Properties {
    let mut properties = Properties::new();
    properties.insert(NAME.to_string(), PropertyValue::text(&highlight.name));
    properties.insert(
        CREATED_AT.to_string(),
        PropertyValue::timestamp(highlight.created_at),
    );
    properties
}

pub(crate) fn highlight_from_node(node: &Node) -> Result<Highlight, EngineError> {
    let name = node.text(NAME).ok_or_else(|| missing(node, NAME))?;
    let created_at = node
        .timestamp(CREATED_AT)
        .ok_or_else(|| missing(node, CREATED_AT))?;

    Ok(Highlight {
        id: HighlightId::new(node.id()),
        name: name.to_string(),
        created_at,
    })
}

/// Users are written by the identity provider; only `user_name` is required.
pub(crate) fn user_from_node(node: &Node) -> Result<User, EngineError> {
    let user_name = node.text(USER_NAME).ok_or_else(|| missing(node, USER_NAME))?;

    Ok(User {
        id: UserId::new(node.id()),
        user_name: user_name.to_string(),
        display_name: node.text(DISPLAY_NAME).map(str::to_string),
        profile_picture: node.text(PROFILE_PICTURE).map(str::to_string),
    })
}
