//! Read-side visibility rules.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use social_graph_repository::{EdgePattern, EdgeType, GraphStore, NodeRef};
use social_graph_shared::{Highlight, HighlightId, Story, UserId};

use crate::errors::EngineError;
use crate::lookup::{require_present, require_user};
use crate::mapping::{highlight_from_node, story_from_node};
use crate::relationship::RelationshipManager;

/// Decides which highlights and stories a listing returns.
#[derive(Clone)]
pub struct VisibilityGate {
    store: Arc<dyn GraphStore>,
    relationships: RelationshipManager,
}

impl VisibilityGate {
    pub fn new(store: Arc<dyn GraphStore>, relationships: RelationshipManager) -> Self {
        Self {
            store,
            relationships,
        }
    }

    /// Highlights owned by `user_id` that contain at least one story the same
    /// user published. Empty highlights, and highlights holding only other
    /// users' stories, are left out.
    pub async fn highlights_for_user(&self, user_id: &UserId) -> Result<Vec<Highlight>, EngineError> {
        require_present("user id", user_id.as_str())?;
        require_user(self.store.as_ref(), user_id).await?;
        let user = NodeRef::user(user_id);

        let published: HashSet<NodeRef> = self
            .store
            .query_edges(&EdgePattern::of(EdgeType::Published).from_node(user.clone()))
            .await?
            .into_iter()
            .map(|edge| edge.to)
            .collect();
        if published.is_empty() {
            return Ok(Vec::new());
        }

        let owned = self
            .store
            .query_edges(&EdgePattern::of(EdgeType::HasHighlight).from_node(user))
            .await?;

        let mut visible = Vec::new();
        for edge in owned {
            let members = self
                .store
                .query_edges(&EdgePattern::of(EdgeType::PartOfHighlight).to_node(edge.to.clone()))
                .await?;
            if !members.iter().any(|m| published.contains(&m.from)) {
                debug!(highlight = %edge.to, "Skipping highlight without own stories");
                continue;
            }
            if let Some(node) = self.store.get_node(&edge.to).await? {
                visible.push(highlight_from_node(&node)?);
            }
        }

        visible.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        visible.dedup_by(|a, b| a.id == b.id);
        Ok(visible)
    }

    /// Every story linked to the highlight. No friendship gating; an unknown
    /// highlight yields an empty list.
    pub async fn stories_by_highlight(
        &self,
        highlight_id: &HighlightId,
    ) -> Result<Vec<Story>, EngineError> {
        require_present("highlight id", highlight_id.as_str())?;

        let members = self
            .store
            .query_edges(
                &EdgePattern::of(EdgeType::PartOfHighlight)
                    .to_node(NodeRef::highlight(highlight_id)),
            )
            .await?;

        let mut seen = HashSet::new();
        let mut stories = Vec::with_capacity(members.len());
        for edge in members {
            if !seen.insert(edge.from.clone()) {
                continue;
            }
            if let Some(node) = self.store.get_node(&edge.from).await? {
                stories.push(story_from_node(&node)?);
            }
        }

        Ok(stories)
    }

    /// Whether `viewer` may interact with `story`: the creator, or a
    /// confirmed friend of the creator.
    pub async fn can_interact(&self, viewer: &UserId, story: &Story) -> Result<bool, EngineError> {
        if story.is_created_by(viewer) {
            return Ok(true);
        }
        self.relationships.are_friends(viewer, &story.creator_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentManager, CreateHighlightRequest, CreateStoryRequest};
    use crate::events::NoopPublisher;
    use social_graph_repository::MemoryGraphStore;
    use social_graph_shared::StoryId;

    struct Fixture {
        content: ContentManager,
        relationships: RelationshipManager,
        gate: VisibilityGate,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryGraphStore::new());
        for (id, name) in [("u1", "alice"), ("u2", "bob"), ("u3", "carol")] {
            store.insert_user(id, name).await.unwrap();
        }
        let publisher = Arc::new(NoopPublisher);
        let relationships = RelationshipManager::new(store.clone(), publisher.clone());
        Fixture {
            content: ContentManager::new(store.clone(), publisher),
            gate: VisibilityGate::new(store, relationships.clone()),
            relationships,
        }
    }

    async fn story(f: &Fixture, creator: &str, id: &str) -> Story {
        f.content
            .create_story(CreateStoryRequest::new(creator, "c").with_id(id))
            .await
            .unwrap()
    }

    async fn highlight(f: &Fixture, owner: &str, id: &str) -> HighlightId {
        f.content
            .create_highlight(CreateHighlightRequest::new(owner, id).with_id(id))
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_highlight_needs_own_published_story() {
        let f = fixture().await;
        story(&f, "u2", "s-bob").await;
        story(&f, "u1", "s-alice").await;
        let own = highlight(&f, "u2", "h-own").await;
        let foreign = highlight(&f, "u2", "h-foreign").await;
        highlight(&f, "u2", "h-empty").await;

        f.content
            .add_story_to_highlight(&own, &StoryId::new("s-bob"))
            .await
            .unwrap();
        f.content
            .add_story_to_highlight(&foreign, &StoryId::new("s-alice"))
            .await
            .unwrap();

        let visible = f.gate.highlights_for_user(&UserId::new("u2")).await.unwrap();
        let ids: Vec<_> = visible.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["h-own"]);
    }

    #[tokio::test]
    async fn test_highlights_for_unknown_user_is_not_found() {
        let f = fixture().await;
        assert!(matches!(
            f.gate.highlights_for_user(&UserId::new("ghost")).await,
            Err(EngineError::NotFound { entity: "User", .. })
        ));
    }

    #[tokio::test]
    async fn test_stories_by_highlight_is_unconditional() {
        let f = fixture().await;
        story(&f, "u2", "s1").await;
        story(&f, "u3", "s2").await;
        let h = highlight(&f, "u2", "h1").await;
        for id in ["s1", "s2"] {
            f.content
                .add_story_to_highlight(&h, &StoryId::new(id))
                .await
                .unwrap();
        }

        assert_eq!(f.gate.stories_by_highlight(&h).await.unwrap().len(), 2);
        assert!(f
            .gate
            .stories_by_highlight(&HighlightId::new("unknown"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_can_interact() {
        let f = fixture().await;
        let s = story(&f, "u2", "s1").await;
        let (alice, bob) = (UserId::new("u1"), UserId::new("u2"));

        assert!(f.gate.can_interact(&bob, &s).await.unwrap());
        assert!(!f.gate.can_interact(&alice, &s).await.unwrap());

        f.relationships.send_request(&alice, &bob).await.unwrap();
        f.relationships.accept_request(&bob, &alice).await.unwrap();
        assert!(f.gate.can_interact(&alice, &s).await.unwrap());
    }
}
