//! Like edges and the cached like counter.
//!
//! The `like_count` property on a story caches the number of `LIKED` edges
//! pointing at it. Like and unlike write the edge first and then adjust the
//! counter with a single floored add. Concurrent calls on one story are not
//! serialized here, so the counter can drift from the edge count;
//! [`LikeCounter::reconcile`] recomputes it from the edges.

use std::sync::Arc;
use tracing::{info, instrument, warn};

use social_graph_repository::{
    EdgeMerge, EdgePattern, EdgeType, GraphStore, NodeLabel, NodeQuery, NodeRef, PropertyValue,
};
use social_graph_shared::{EventKind, Story, StoryId, UserId};

use crate::admin::AdminCapability;
use crate::errors::EngineError;
use crate::events::{emit, EventPublisher};
use crate::lookup::{require_present, require_story, require_user};
use crate::mapping::{story_from_node, LIKE_COUNT};
use crate::relationship::RelationshipManager;

/// Result of recomputing one story's like counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikeReconciliation {
    pub story_id: StoryId,
    /// The cached value before reconciliation.
    pub cached: u64,
    /// The number of `LIKED` edges, now stored as the cached value.
    pub actual: u64,
}

impl LikeReconciliation {
    pub fn drifted(&self) -> bool {
        self.cached != self.actual
    }
}

/// Maintains `LIKED` edges and the `like_count` derived from them.
#[derive(Clone)]
pub struct LikeCounter {
    store: Arc<dyn GraphStore>,
    publisher: Arc<dyn EventPublisher>,
    relationships: RelationshipManager,
}

fn liked_edge(user_id: &UserId, story_id: &StoryId) -> EdgePattern {
    EdgePattern::exact(NodeRef::user(user_id), EdgeType::Liked, NodeRef::story(story_id))
}

impl LikeCounter {
    pub fn new(
        store: Arc<dyn GraphStore>,
        publisher: Arc<dyn EventPublisher>,
        relationships: RelationshipManager,
    ) -> Self {
        Self {
            store,
            publisher,
            relationships,
        }
    }

    /// `user_id` likes `story_id`.
    ///
    /// Checks, in order, before any write: the story exists, the user exists,
    /// the user is a confirmed friend of the creator (so creators cannot like
    /// their own stories), and the user has not liked the story yet.
    ///
    /// # Returns
    ///
    /// * `Ok(Story)` - The story with its updated like count
    /// * `Err(EngineError::NotFound)` - The story or the user does not exist
    /// * `Err(EngineError::Forbidden)` - The user is not a friend of the creator
    /// * `Err(EngineError::Conflict)` - The user already liked the story
    #[instrument(skip(self))]
    pub async fn like(&self, story_id: &StoryId, user_id: &UserId) -> Result<Story, EngineError> {
        require_present("story id", story_id.as_str())?;
        require_present("user id", user_id.as_str())?;
        let mut story = require_story(self.store.as_ref(), story_id).await?;
        require_user(self.store.as_ref(), user_id).await?;

        if !self
            .relationships
            .are_friends(user_id, &story.creator_id)
            .await?
        {
            return Err(EngineError::forbidden(format!(
                "{user_id} is not a friend of {}",
                story.creator_id
            )));
        }

        let edge = liked_edge(user_id, story_id);
        if self.store.count_edges(&edge).await? > 0 {
            return Err(EngineError::conflict(format!(
                "{user_id} already liked story {story_id}"
            )));
        }

        let node = NodeRef::story(story_id);
        match self
            .store
            .merge_edge(&NodeRef::user(user_id), EdgeType::Liked, &node)
            .await?
        {
            EdgeMerge::Created => {}
            EdgeMerge::Existed => {
                return Err(EngineError::conflict(format!(
                    "{user_id} already liked story {story_id}"
                )))
            }
            EdgeMerge::MissingEndpoint => {
                // Deleted between the checks and the write.
                return Err(if self.store.exists(&node).await? {
                    EngineError::not_found("User", user_id.as_str())
                } else {
                    EngineError::not_found("Story", story_id.as_str())
                });
            }
        }
        let count = self
            .store
            .adjust_counter(&node, LIKE_COUNT, 1)
            .await?
            .ok_or_else(|| EngineError::not_found("Story", story_id.as_str()))?;
        story.like_count = count.max(0) as u64;

        info!(story_id = %story_id, user = %user_id, like_count = story.like_count, "Story liked");
        emit(
            self.publisher.as_ref(),
            EventKind::StoryLiked {
                actor_id: user_id.clone(),
                story_id: story_id.clone(),
                like_count: story.like_count,
            },
        )
        .await;

        Ok(story)
    }

    /// `user_id` withdraws a like. The counter never goes below zero.
    ///
    /// # Returns
    ///
    /// * `Ok(Story)` - The story with its updated like count
    /// * `Err(EngineError::NotFound)` - The story or the user does not exist
    /// * `Err(EngineError::BadRequest)` - The user has not liked the story
    #[instrument(skip(self))]
    pub async fn unlike(&self, story_id: &StoryId, user_id: &UserId) -> Result<Story, EngineError> {
        require_present("story id", story_id.as_str())?;
        require_present("user id", user_id.as_str())?;
        let mut story = require_story(self.store.as_ref(), story_id).await?;
        require_user(self.store.as_ref(), user_id).await?;

        let removed = self.store.delete_edges(&liked_edge(user_id, story_id)).await?;
        if removed == 0 {
            return Err(EngineError::bad_request(format!(
                "{user_id} has not liked story {story_id}"
            )));
        }

        let node = NodeRef::story(story_id);
        let before = story.like_count;
        let count = self
            .store
            .adjust_counter(&node, LIKE_COUNT, -1)
            .await?
            .ok_or_else(|| EngineError::not_found("Story", story_id.as_str()))?;
        story.like_count = count.max(0) as u64;
        if before == 0 {
            warn!(story_id = %story_id, "Like counter was already zero on unlike");
        }

        info!(story_id = %story_id, user = %user_id, like_count = story.like_count, "Story unliked");
        emit(
            self.publisher.as_ref(),
            EventKind::StoryUnliked {
                actor_id: user_id.clone(),
                story_id: story_id.clone(),
                like_count: story.like_count,
            },
        )
        .await;

        Ok(story)
    }

    /// The cached like count of a story.
    pub async fn like_count(&self, story_id: &StoryId) -> Result<u64, EngineError> {
        require_present("story id", story_id.as_str())?;
        Ok(require_story(self.store.as_ref(), story_id).await?.like_count)
    }

    pub async fn has_liked(&self, story_id: &StoryId, user_id: &UserId) -> Result<bool, EngineError> {
        require_present("story id", story_id.as_str())?;
        require_present("user id", user_id.as_str())?;
        Ok(self.store.count_edges(&liked_edge(user_id, story_id)).await? > 0)
    }

    /// Set the cached counter of one story to its `LIKED` edge count.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, story_id: &StoryId) -> Result<LikeReconciliation, EngineError> {
        require_present("story id", story_id.as_str())?;
        let story = require_story(self.store.as_ref(), story_id).await?;
        self.reconcile_story(story).await
    }

    /// Reconcile every story in the graph.
    ///
    /// Returns one entry per story, drifted or not.
    #[instrument(skip(self, _admin))]
    pub async fn reconcile_all(
        &self,
        _admin: &AdminCapability,
    ) -> Result<Vec<LikeReconciliation>, EngineError> {
        let nodes = self
            .store
            .query_nodes(&NodeQuery::label(NodeLabel::Story))
            .await?;

        let mut results = Vec::with_capacity(nodes.len());
        for node in &nodes {
            results.push(self.reconcile_story(story_from_node(node)?).await?);
        }

        let drifted = results.iter().filter(|r| r.drifted()).count();
        info!(stories = results.len(), drifted, "Reconciled like counters");
        Ok(results)
    }

    async fn reconcile_story(&self, story: Story) -> Result<LikeReconciliation, EngineError> {
        let node = NodeRef::story(&story.id);
        let actual = self
            .store
            .count_edges(&EdgePattern::of(EdgeType::Liked).to_node(node.clone()))
            .await?;

        let result = LikeReconciliation {
            story_id: story.id,
            cached: story.like_count,
            actual,
        };
        if result.drifted() {
            warn!(
                story_id = %result.story_id,
                cached = result.cached,
                actual = result.actual,
                "Like counter drifted"
            );
            self.store
                .set_property(&node, LIKE_COUNT, PropertyValue::Integer(actual as i64))
                .await?;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentManager, CreateStoryRequest};
    use crate::events::NoopPublisher;
    use social_graph_repository::MemoryGraphStore;

    struct Fixture {
        store: Arc<MemoryGraphStore>,
        likes: LikeCounter,
        relationships: RelationshipManager,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryGraphStore::new());
        store.insert_user("u1", "alice").await.unwrap();
        store.insert_user("u2", "bob").await.unwrap();
        let publisher = Arc::new(NoopPublisher);
        let relationships = RelationshipManager::new(store.clone(), publisher.clone());
        ContentManager::new(store.clone(), publisher.clone())
            .create_story(CreateStoryRequest::new("u2", "c").with_id("s1"))
            .await
            .unwrap();
        Fixture {
            likes: LikeCounter::new(store.clone(), publisher, relationships.clone()),
            store,
            relationships,
        }
    }

    async fn befriend(f: &Fixture) {
        let (alice, bob) = (UserId::new("u1"), UserId::new("u2"));
        f.relationships.send_request(&alice, &bob).await.unwrap();
        f.relationships.accept_request(&bob, &alice).await.unwrap();
    }

    fn s1() -> StoryId {
        StoryId::new("s1")
    }

    #[tokio::test]
    async fn test_like_requires_friendship() {
        let f = fixture().await;
        let edges = f.store.edge_count().await;

        assert!(matches!(
            f.likes.like(&s1(), &UserId::new("u1")).await,
            Err(EngineError::Forbidden(_))
        ));
        assert_eq!(f.store.edge_count().await, edges);
        assert_eq!(f.likes.like_count(&s1()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_creator_cannot_like_own_story() {
        let f = fixture().await;
        assert!(matches!(
            f.likes.like(&s1(), &UserId::new("u2")).await,
            Err(EngineError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_like_then_unlike() {
        let f = fixture().await;
        befriend(&f).await;
        let alice = UserId::new("u1");

        assert_eq!(f.likes.like(&s1(), &alice).await.unwrap().like_count, 1);
        assert!(f.likes.has_liked(&s1(), &alice).await.unwrap());
        assert!(matches!(
            f.likes.like(&s1(), &alice).await,
            Err(EngineError::Conflict(_))
        ));
        assert_eq!(f.likes.like_count(&s1()).await.unwrap(), 1);

        assert_eq!(f.likes.unlike(&s1(), &alice).await.unwrap().like_count, 0);
        assert!(!f.likes.has_liked(&s1(), &alice).await.unwrap());
    }

    #[tokio::test]
    async fn test_unlike_without_like_is_bad_request() {
        let f = fixture().await;
        befriend(&f).await;

        assert!(matches!(
            f.likes.unlike(&s1(), &UserId::new("u1")).await,
            Err(EngineError::BadRequest(_))
        ));
        assert_eq!(f.likes.like_count(&s1()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_precondition_order() {
        let f = fixture().await;
        // missing story is reported before missing user
        assert!(matches!(
            f.likes.like(&StoryId::new("nope"), &UserId::new("ghost")).await,
            Err(EngineError::NotFound { entity: "Story", .. })
        ));
        assert!(matches!(
            f.likes.like(&s1(), &UserId::new("ghost")).await,
            Err(EngineError::NotFound { entity: "User", .. })
        ));
    }

    #[tokio::test]
    async fn test_reconcile_repairs_drift() {
        let f = fixture().await;
        befriend(&f).await;
        f.likes.like(&s1(), &UserId::new("u1")).await.unwrap();
        f.store
            .set_property(
                &NodeRef::new(NodeLabel::Story, "s1"),
                LIKE_COUNT,
                PropertyValue::Integer(7),
            )
            .await
            .unwrap();

        let result = f.likes.reconcile(&s1()).await.unwrap();
        assert!(result.drifted());
        assert_eq!((result.cached, result.actual), (7, 1));
        assert_eq!(f.likes.like_count(&s1()).await.unwrap(), 1);

        assert!(!f.likes.reconcile(&s1()).await.unwrap().drifted());
    }

    #[tokio::test]
    async fn test_unlike_floors_drifted_counter() {
        let f = fixture().await;
        befriend(&f).await;
        f.likes.like(&s1(), &UserId::new("u1")).await.unwrap();
        f.store
            .set_property(
                &NodeRef::new(NodeLabel::Story, "s1"),
                LIKE_COUNT,
                PropertyValue::Integer(0),
            )
            .await
            .unwrap();

        let story = f.likes.unlike(&s1(), &UserId::new("u1")).await.unwrap();
        assert_eq!(story.like_count, 0);
    }
}
