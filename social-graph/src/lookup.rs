//! Input validation and existence checks shared by the engine components.
//!
//! Every check here runs before the first write of an operation.

use social_graph_repository::{GraphStore, NodeRef};
use social_graph_shared::{Highlight, HighlightId, Story, StoryId, User, UserId};

use crate::errors::EngineError;
use crate::mapping::{highlight_from_node, story_from_node, user_from_node};

/// Reject a blank identifier or required text field.
pub(crate) fn require_present(field: &str, value: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::validation(format!("{field} is required")));
    }
    Ok(())
}

pub(crate) async fn require_user(store: &dyn GraphStore, id: &UserId) -> Result<(), EngineError> {
    if !store.exists(&NodeRef::user(id)).await? {
        return Err(EngineError::not_found("User", id.as_str()));
    }
    Ok(())
}

pub(crate) async fn load_user(store: &dyn GraphStore, id: &UserId) -> Result<User, EngineError> {
    match store.get_node(&NodeRef::user(id)).await? {
        Some(node) => user_from_node(&node),
        None => Err(EngineError::not_found("User", id.as_str())),
    }
}

pub(crate) async fn find_story(
    store: &dyn GraphStore,
    id: &StoryId,
) -> Result<Option<Story>, EngineError> {
    store
        .get_node(&NodeRef::story(id))
        .await?
        .map(|node| story_from_node(&node))
        .transpose()
}

pub(crate) async fn require_story(store: &dyn GraphStore, id: &StoryId) -> Result<Story, EngineError> {
    find_story(store, id)
        .await?
        .ok_or_else(|| EngineError::not_found("Story", id.as_str()))
}

pub(crate) async fn require_highlight(
    store: &dyn GraphStore,
    id: &HighlightId,
) -> Result<Highlight, EngineError> {
    match store.get_node(&NodeRef::highlight(id)).await? {
        Some(node) => highlight_from_node(&node),
        None => Err(EngineError::not_found("Highlight", id.as_str())),
    }
}
