//! Story and highlight lifecycle.
//!
//! Creation validates every input and checks every referenced entity before
//! the first write. Deletion removes each relationship type that can point at
//! the entity, in a fixed order, before the node itself; the store refuses to
//! remove a node that still has relationships, so a failed cascade can never
//! leave dangling edges behind.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use social_graph_repository::{
    EdgeMerge, EdgePattern, EdgeType, GraphStore, NodeLabel, NodeQuery, NodeRef, PropertyValue,
};
use social_graph_shared::{EventKind, Highlight, HighlightId, Story, StoryId, UserId};

use crate::admin::AdminCapability;
use crate::errors::EngineError;
use crate::events::{emit, EventPublisher};
use crate::lookup::{require_highlight, require_present, require_story, require_user};
use crate::mapping::{
    highlight_from_node, highlight_properties, story_from_node, story_properties, CONTENT,
};

/// Request to publish a story.
#[derive(Debug, Clone)]
pub struct CreateStoryRequest {
    pub creator_id: UserId,
    /// Reference to the stored media (URL or object key).
    pub content: String,
    /// Caller-chosen identifier. Retrying with the same id is safe.
    pub story_id: Option<StoryId>,
}

impl CreateStoryRequest {
    pub fn new(creator_id: impl Into<UserId>, content: impl Into<String>) -> Self {
        Self {
            creator_id: creator_id.into(),
            content: content.into(),
            story_id: None,
        }
    }

    pub fn with_id(mut self, story_id: impl Into<StoryId>) -> Self {
        self.story_id = Some(story_id.into());
        self
    }
}

/// Request to create a highlight.
#[derive(Debug, Clone)]
pub struct CreateHighlightRequest {
    pub owner_id: UserId,
    pub name: String,
    pub highlight_id: Option<HighlightId>,
}

impl CreateHighlightRequest {
    pub fn new(owner_id: impl Into<UserId>, name: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            name: name.into(),
            highlight_id: None,
        }
    }

    pub fn with_id(mut self, highlight_id: impl Into<HighlightId>) -> Self {
        self.highlight_id = Some(highlight_id.into());
        self
    }
}

/// Summary of a story deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoryDeletion {
    /// Whether the story node existed and was removed.
    pub deleted: bool,
    pub likes_removed: usize,
    pub views_removed: usize,
    pub highlight_links_removed: usize,
}

/// Owns creation, update and cascading deletion of stories and highlights.
#[derive(Clone)]
pub struct ContentManager {
    store: Arc<dyn GraphStore>,
    publisher: Arc<dyn EventPublisher>,
}

impl ContentManager {
    pub fn new(store: Arc<dyn GraphStore>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self { store, publisher }
    }

    /// Publish a story for `request.creator_id`.
    ///
    /// The story node is merged on its id and then linked with a `PUBLISHED`
    /// edge, both idempotently, so retrying a request that failed halfway
    /// completes it instead of duplicating it.
    ///
    /// # Returns
    ///
    /// * `Ok(Story)` - The stored story (the existing one on retry)
    /// * `Err(EngineError::ValidationError)` - The creator id or content is blank
    /// * `Err(EngineError::NotFound)` - The creator does not exist
    /// * `Err(EngineError::Conflict)` - The id belongs to another user's story
    #[instrument(skip(self, request), fields(creator = %request.creator_id))]
    pub async fn create_story(&self, request: CreateStoryRequest) -> Result<Story, EngineError> {
        require_present("creator id", request.creator_id.as_str())?;
        require_present("content", &request.content)?;
        if let Some(id) = &request.story_id {
            require_present("story id", id.as_str())?;
        }
        require_user(self.store.as_ref(), &request.creator_id).await?;

        let id = request.story_id.unwrap_or_else(StoryId::generate);
        let story = Story::new(id, request.creator_id, request.content);

        let outcome = self
            .store
            .merge_node(NodeLabel::Story, story.id.as_str(), story_properties(&story))
            .await?;
        let stored = story_from_node(&outcome.node)?;
        if !stored.is_created_by(&story.creator_id) {
            return Err(EngineError::conflict(format!(
                "story id {} is already in use",
                story.id
            )));
        }

        let creator = NodeRef::user(&stored.creator_id);
        let linked = self
            .store
            .merge_edge(&creator, EdgeType::Published, &NodeRef::story(&stored.id))
            .await?;
        if !linked.is_linked() {
            return Err(EngineError::not_found("User", stored.creator_id.as_str()));
        }

        if outcome.created {
            info!(story_id = %stored.id, creator = %stored.creator_id, "Story created");
            emit(
                self.publisher.as_ref(),
                EventKind::StoryCreated {
                    actor_id: stored.creator_id.clone(),
                    story_id: stored.id.clone(),
                },
            )
            .await;
        } else {
            debug!(story_id = %stored.id, "Story already existed");
        }

        Ok(stored)
    }

    /// Read a story.
    pub async fn get_story(&self, story_id: &StoryId) -> Result<Story, EngineError> {
        require_present("story id", story_id.as_str())?;
        require_story(self.store.as_ref(), story_id).await
    }

    /// Stories `user_id` published, oldest first.
    pub async fn list_stories_by_user(&self, user_id: &UserId) -> Result<Vec<Story>, EngineError> {
        require_present("user id", user_id.as_str())?;
        require_user(self.store.as_ref(), user_id).await?;

        let published = self
            .store
            .query_edges(&EdgePattern::of(EdgeType::Published).from_node(NodeRef::user(user_id)))
            .await?;

        let mut stories = Vec::with_capacity(published.len());
        for edge in published {
            if let Some(node) = self.store.get_node(&edge.to).await? {
                stories.push(story_from_node(&node)?);
            }
        }
        stories.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        stories.dedup_by(|a, b| a.id == b.id);

        Ok(stories)
    }

    /// Replace a story's content.
    #[instrument(skip(self, content))]
    pub async fn update_story(
        &self,
        story_id: &StoryId,
        content: &str,
    ) -> Result<Story, EngineError> {
        require_present("story id", story_id.as_str())?;
        require_present("content", content)?;
        let mut story = require_story(self.store.as_ref(), story_id).await?;

        let updated = self
            .store
            .set_property(&NodeRef::story(story_id), CONTENT, PropertyValue::text(content))
            .await?;
        if !updated {
            return Err(EngineError::not_found("Story", story_id.as_str()));
        }
        story.content = content.to_string();

        info!(story_id = %story_id, "Story updated");
        emit(
            self.publisher.as_ref(),
            EventKind::StoryUpdated {
                story_id: story_id.clone(),
            },
        )
        .await;

        Ok(story)
    }

    /// Delete a story and every relationship that references it.
    ///
    /// Order: `PUBLISHED`, `LIKED`, `PART_OF_HIGHLIGHT`, `VIEWED`, then the
    /// node. Other stories, including ones sharing a highlight, are never
    /// touched. Deleting a story that does not exist succeeds.
    #[instrument(skip(self))]
    pub async fn delete_story(&self, story_id: &StoryId) -> Result<StoryDeletion, EngineError> {
        require_present("story id", story_id.as_str())?;
        let story = NodeRef::story(story_id);

        self.store
            .delete_edges(&EdgePattern::of(EdgeType::Published).to_node(story.clone()))
            .await?;
        let likes_removed = self
            .store
            .delete_edges(&EdgePattern::of(EdgeType::Liked).to_node(story.clone()))
            .await?;
        let highlight_links_removed = self
            .store
            .delete_edges(&EdgePattern::of(EdgeType::PartOfHighlight).from_node(story.clone()))
            .await?;
        let views_removed = self
            .store
            .delete_edges(&EdgePattern::of(EdgeType::Viewed).to_node(story.clone()))
            .await?;
        let deleted = self.store.delete_node(&story).await?;

        let summary = StoryDeletion {
            deleted,
            likes_removed,
            views_removed,
            highlight_links_removed,
        };

        if deleted {
            info!(
                story_id = %story_id,
                likes_removed,
                views_removed,
                highlight_links_removed,
                "Story deleted"
            );
            emit(
                self.publisher.as_ref(),
                EventKind::StoryDeleted {
                    story_id: story_id.clone(),
                },
            )
            .await;
        } else {
            debug!(story_id = %story_id, "Story already absent");
        }

        Ok(summary)
    }

    /// Record that `user_id` viewed `story_id`. Every view is kept.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The view was recorded
    /// * `Err(EngineError::ValidationError)` - An id is blank
    /// * `Err(EngineError::NotFound)` - The story or the user does not exist
    #[instrument(skip(self))]
    pub async fn view_story(&self, user_id: &UserId, story_id: &StoryId) -> Result<(), EngineError> {
        require_present("user id", user_id.as_str())?;
        require_present("story id", story_id.as_str())?;
        require_story(self.store.as_ref(), story_id).await?;
        require_user(self.store.as_ref(), user_id).await?;

        let written = self
            .store
            .create_edge(&NodeRef::user(user_id), EdgeType::Viewed, &NodeRef::story(story_id))
            .await?;
        if !written {
            return Err(EngineError::not_found("Story", story_id.as_str()));
        }

        emit(
            self.publisher.as_ref(),
            EventKind::StoryViewed {
                actor_id: user_id.clone(),
                story_id: story_id.clone(),
            },
        )
        .await;

        Ok(())
    }

    /// Total number of recorded views of a story.
    pub async fn view_count(&self, story_id: &StoryId) -> Result<u64, EngineError> {
        require_present("story id", story_id.as_str())?;
        require_story(self.store.as_ref(), story_id).await?;

        Ok(self
            .store
            .count_edges(&EdgePattern::of(EdgeType::Viewed).to_node(NodeRef::story(story_id)))
            .await?)
    }

    /// Create a highlight owned by `request.owner_id`.
    ///
    /// Retrying with the same highlight id returns the existing highlight.
    ///
    /// # Returns
    ///
    /// * `Ok(Highlight)` - The stored highlight (the existing one on retry)
    /// * `Err(EngineError::ValidationError)` - The owner id or name is blank
    /// * `Err(EngineError::NotFound)` - The owner does not exist
    /// * `Err(EngineError::Conflict)` - The id belongs to another user's highlight
    #[instrument(skip(self, request), fields(owner = %request.owner_id))]
    pub async fn create_highlight(
        &self,
        request: CreateHighlightRequest,
    ) -> Result<Highlight, EngineError> {
        require_present("owner id", request.owner_id.as_str())?;
        require_present("highlight name", &request.name)?;
        if let Some(id) = &request.highlight_id {
            require_present("highlight id", id.as_str())?;
        }
        require_user(self.store.as_ref(), &request.owner_id).await?;

        let id = request.highlight_id.unwrap_or_else(HighlightId::generate);
        let highlight = Highlight::new(id, request.name.trim());
        let node = NodeRef::highlight(&highlight.id);
        let owner = NodeRef::user(&request.owner_id);

        let outcome = self
            .store
            .merge_node(NodeLabel::Highlight, highlight.id.as_str(), highlight_properties(&highlight))
            .await?;
        if !outcome.created {
            let owners = self
                .store
                .query_edges(&EdgePattern::of(EdgeType::HasHighlight).to_node(node.clone()))
                .await?;
            if owners.iter().any(|edge| edge.from != owner) {
                return Err(EngineError::conflict(format!(
                    "highlight id {} is already in use",
                    highlight.id
                )));
            }
        }

        let linked = self
            .store
            .merge_edge(&owner, EdgeType::HasHighlight, &node)
            .await?;
        if !linked.is_linked() {
            return Err(EngineError::not_found("User", request.owner_id.as_str()));
        }

        let stored = highlight_from_node(&outcome.node)?;
        if outcome.created {
            info!(highlight_id = %stored.id, owner = %request.owner_id, "Highlight created");
            emit(
                self.publisher.as_ref(),
                EventKind::HighlightCreated {
                    actor_id: request.owner_id.clone(),
                    highlight_id: stored.id.clone(),
                },
            )
            .await;
        }

        Ok(stored)
    }

    /// Add a story to a highlight.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The story was added
    /// * `Ok(false)` - The story was already part of the highlight
    /// * `Err(EngineError::ValidationError)` - An id is blank
    /// * `Err(EngineError::NotFound)` - The highlight or the story does not exist
    #[instrument(skip(self))]
    pub async fn add_story_to_highlight(
        &self,
        highlight_id: &HighlightId,
        story_id: &StoryId,
    ) -> Result<bool, EngineError> {
        require_present("highlight id", highlight_id.as_str())?;
        require_present("story id", story_id.as_str())?;
        require_highlight(self.store.as_ref(), highlight_id).await?;
        require_story(self.store.as_ref(), story_id).await?;

        let story = NodeRef::story(story_id);
        let highlight = NodeRef::highlight(highlight_id);
        match self
            .store
            .merge_edge(&story, EdgeType::PartOfHighlight, &highlight)
            .await?
        {
            EdgeMerge::Created => {}
            EdgeMerge::Existed => return Ok(false),
            EdgeMerge::MissingEndpoint => {
                return Err(EngineError::not_found("Story", story_id.as_str()))
            }
        }

        info!(highlight_id = %highlight_id, story_id = %story_id, "Story added to highlight");
        emit(
            self.publisher.as_ref(),
            EventKind::HighlightStoryAdded {
                highlight_id: highlight_id.clone(),
                story_id: story_id.clone(),
            },
        )
        .await;

        Ok(true)
    }

    /// Delete a highlight. The stories it contained are kept.
    ///
    /// Returns whether the highlight existed.
    #[instrument(skip(self))]
    pub async fn delete_highlight(&self, highlight_id: &HighlightId) -> Result<bool, EngineError> {
        require_present("highlight id", highlight_id.as_str())?;
        let node = NodeRef::highlight(highlight_id);

        self.store
            .delete_edges(&EdgePattern::of(EdgeType::HasHighlight).to_node(node.clone()))
            .await?;
        let unlinked = self
            .store
            .delete_edges(&EdgePattern::of(EdgeType::PartOfHighlight).to_node(node.clone()))
            .await?;
        let deleted = self.store.delete_node(&node).await?;

        if deleted {
            info!(highlight_id = %highlight_id, stories_unlinked = unlinked, "Highlight deleted");
            emit(
                self.publisher.as_ref(),
                EventKind::HighlightDeleted {
                    highlight_id: highlight_id.clone(),
                },
            )
            .await;
        }

        Ok(deleted)
    }

    /// Delete every highlight in the graph. Stories are kept.
    ///
    /// Returns the number of highlights removed.
    #[instrument(skip(self, _admin))]
    pub async fn delete_all_highlights(&self, _admin: &AdminCapability) -> Result<usize, EngineError> {
        let highlights = self
            .store
            .query_nodes(&NodeQuery::label(NodeLabel::Highlight))
            .await?;

        let owners_removed = self
            .store
            .delete_edges(&EdgePattern::of(EdgeType::HasHighlight).to_label(NodeLabel::Highlight))
            .await?;
        let links_removed = self
            .store
            .delete_edges(&EdgePattern::of(EdgeType::PartOfHighlight).to_label(NodeLabel::Highlight))
            .await?;

        let mut deleted = 0;
        for highlight in &highlights {
            if self.store.delete_node(&highlight.node).await? {
                deleted += 1;
                emit(
                    self.publisher.as_ref(),
                    EventKind::HighlightDeleted {
                        highlight_id: HighlightId::new(highlight.id()),
                    },
                )
                .await;
            } else {
                warn!(highlight = %highlight.node, "Highlight vanished during bulk delete");
            }
        }

        info!(deleted, owners_removed, links_removed, "All highlights deleted");
        Ok(deleted)
    }
}
