//! Integration tests for the social graph engine.
//!
//! These tests drive the real engine over the in-memory graph store, with a
//! recording publisher to observe emitted events and a store wrapper that
//! can fail chosen operations to check that interrupted mutations resume
//! cleanly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

use async_trait::async_trait;
use social_graph::{
    BroadcastPublisher, CreateHighlightRequest, CreateStoryRequest, EngineConfig, EngineError,
    EventPublisher, PublishError, SocialGraphEngine,
};
use social_graph_repository::{
    Edge, EdgeMerge, EdgePattern, EdgeType, GraphStore, GraphStoreError, MemoryGraphStore,
    MergeOutcome, Node, NodeLabel, NodeQuery, NodeRef, Properties, PropertyValue,
};
use social_graph_shared::{DomainEvent, FriendshipStatus, HighlightId, StoryId, UserId};

// Mock publisher that records every event
struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    fn names(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().iter().map(|e| e.name()).collect()
    }

    fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), PublishError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

// Publisher whose transport is always down
struct BrokenPublisher;

#[async_trait]
impl EventPublisher for BrokenPublisher {
    async fn publish(&self, _event: &DomainEvent) -> Result<(), PublishError> {
        Err(PublishError::transport("broker unreachable"))
    }
}

// Store that delegates to memory but can fail node deletion once, or
// answer like counts as if a concurrent writer had not landed yet
struct InterruptingStore {
    inner: MemoryGraphStore,
    fail_next_delete_node: AtomicBool,
    stale_like_counts: AtomicBool,
}

impl InterruptingStore {
    fn new(inner: MemoryGraphStore) -> Self {
        Self {
            inner,
            fail_next_delete_node: AtomicBool::new(false),
            stale_like_counts: AtomicBool::new(false),
        }
    }

    fn interrupt_next_delete_node(&self) {
        self.fail_next_delete_node.store(true, Ordering::SeqCst);
    }

    fn serve_stale_like_counts(&self) {
        self.stale_like_counts.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl GraphStore for InterruptingStore {
    async fn create_node(
        &self,
        label: NodeLabel,
        id: &str,
        properties: Properties,
    ) -> Result<Node, GraphStoreError> {
        self.inner.create_node(label, id, properties).await
    }

    async fn merge_node(
        &self,
        label: NodeLabel,
        id: &str,
        on_create: Properties,
    ) -> Result<MergeOutcome, GraphStoreError> {
        self.inner.merge_node(label, id, on_create).await
    }

    async fn get_node(&self, node: &NodeRef) -> Result<Option<Node>, GraphStoreError> {
        self.inner.get_node(node).await
    }

    async fn exists(&self, node: &NodeRef) -> Result<bool, GraphStoreError> {
        self.inner.exists(node).await
    }

    async fn set_property(
        &self,
        node: &NodeRef,
        key: &str,
        value: PropertyValue,
    ) -> Result<bool, GraphStoreError> {
        self.inner.set_property(node, key, value).await
    }

    async fn adjust_counter(
        &self,
        node: &NodeRef,
        key: &str,
        delta: i64,
    ) -> Result<Option<i64>, GraphStoreError> {
        self.inner.adjust_counter(node, key, delta).await
    }

    async fn create_edge(
        &self,
        from: &NodeRef,
        edge_type: EdgeType,
        to: &NodeRef,
    ) -> Result<bool, GraphStoreError> {
        self.inner.create_edge(from, edge_type, to).await
    }

    async fn merge_edge(
        &self,
        from: &NodeRef,
        edge_type: EdgeType,
        to: &NodeRef,
    ) -> Result<EdgeMerge, GraphStoreError> {
        self.inner.merge_edge(from, edge_type, to).await
    }

    async fn delete_edges(&self, pattern: &EdgePattern) -> Result<usize, GraphStoreError> {
        self.inner.delete_edges(pattern).await
    }

    async fn delete_node(&self, node: &NodeRef) -> Result<bool, GraphStoreError> {
        if self.fail_next_delete_node.swap(false, Ordering::SeqCst) {
            return Err(GraphStoreError::timeout("simulated timeout"));
        }
        self.inner.delete_node(node).await
    }

    async fn query_edges(&self, pattern: &EdgePattern) -> Result<Vec<Edge>, GraphStoreError> {
        self.inner.query_edges(pattern).await
    }

    async fn query_nodes(&self, query: &NodeQuery) -> Result<Vec<Node>, GraphStoreError> {
        self.inner.query_nodes(query).await
    }

    async fn count_edges(&self, pattern: &EdgePattern) -> Result<u64, GraphStoreError> {
        if pattern.edge_type == Some(EdgeType::Liked) && self.stale_like_counts.load(Ordering::SeqCst) {
            return Ok(0);
        }
        self.inner.count_edges(pattern).await
    }
}

const ADMIN_TOKEN: &str = "test-admin-token";

async fn seeded_store() -> MemoryGraphStore {
    let store = MemoryGraphStore::new();
    for (id, name) in [("u1", "alice"), ("u2", "bob"), ("u3", "carol")] {
        store.insert_user(id, name).await.unwrap();
    }
    store
}

/// Helper to create an engine over a seeded in-memory store
async fn create_test_engine() -> (SocialGraphEngine, Arc<MemoryGraphStore>, Arc<RecordingPublisher>) {
    let store = Arc::new(seeded_store().await);
    let publisher = Arc::new(RecordingPublisher::new());
    let engine = SocialGraphEngine::new(
        store.clone(),
        publisher.clone(),
        EngineConfig::new().with_admin_token(ADMIN_TOKEN),
    );
    (engine, store, publisher)
}

fn alice() -> UserId {
    UserId::new("u1")
}

fn bob() -> UserId {
    UserId::new("u2")
}

fn carol() -> UserId {
    UserId::new("u3")
}

async fn befriend(engine: &SocialGraphEngine, a: &UserId, b: &UserId) {
    engine.relationships().send_request(a, b).await.unwrap();
    engine.relationships().accept_request(b, a).await.unwrap();
}

async fn publish(engine: &SocialGraphEngine, creator: &UserId, id: &str) -> StoryId {
    engine
        .content()
        .create_story(CreateStoryRequest::new(creator.clone(), format!("https://cdn/{id}.png")).with_id(id))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn test_alice_and_bob_scenario() {
    let (engine, store, publisher) = create_test_engine().await;

    befriend(&engine, &alice(), &bob()).await;
    assert_eq!(
        engine.relationships().status(&alice(), &bob()).await.unwrap(),
        FriendshipStatus::Friends
    );
    assert_eq!(
        engine.relationships().status(&bob(), &alice()).await.unwrap(),
        FriendshipStatus::Friends
    );

    let s1 = publish(&engine, &bob(), "s1").await;
    assert_eq!(engine.likes().like(&s1, &alice()).await.unwrap().like_count, 1);
    assert_eq!(engine.likes().like_count(&s1).await.unwrap(), 1);
    assert_eq!(engine.likes().unlike(&s1, &alice()).await.unwrap().like_count, 0);

    let h1 = engine
        .content()
        .create_highlight(CreateHighlightRequest::new(bob(), "Best of").with_id("h1"))
        .await
        .unwrap()
        .id;
    engine.content().add_story_to_highlight(&h1, &s1).await.unwrap();
    assert_eq!(engine.visibility().stories_by_highlight(&h1).await.unwrap().len(), 1);

    engine.content().delete_story(&s1).await.unwrap();
    assert!(engine.visibility().stories_by_highlight(&h1).await.unwrap().is_empty());
    assert!(store
        .edges_touching(&NodeRef::new(NodeLabel::Story, "s1"))
        .await
        .is_empty());

    assert_eq!(
        publisher.names(),
        vec![
            "friend.requested",
            "friend.accepted",
            "story.created",
            "story.liked",
            "story.unliked",
            "highlight.created",
            "highlight.story_added",
            "story.deleted",
        ]
    );
}

#[tokio::test]
async fn test_like_by_non_friend_changes_nothing() {
    let (engine, store, publisher) = create_test_engine().await;
    let s1 = publish(&engine, &bob(), "s1").await;
    publisher.clear();
    let edges_before = store.edge_count().await;

    let err = engine.likes().like(&s1, &carol()).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
    assert!(!err.is_retryable());

    assert_eq!(store.edge_count().await, edges_before);
    assert_eq!(engine.likes().like_count(&s1).await.unwrap(), 0);
    assert!(publisher.names().is_empty());
}

#[tokio::test]
async fn test_pending_request_does_not_allow_likes() {
    let (engine, _, _) = create_test_engine().await;
    let s1 = publish(&engine, &bob(), "s1").await;
    engine.relationships().send_request(&alice(), &bob()).await.unwrap();

    assert!(matches!(
        engine.likes().like(&s1, &alice()).await,
        Err(EngineError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_repeated_likes_conflict() {
    let (engine, store, _) = create_test_engine().await;
    befriend(&engine, &alice(), &bob()).await;
    let s1 = publish(&engine, &bob(), "s1").await;

    engine.likes().like(&s1, &alice()).await.unwrap();
    for _ in 0..3 {
        assert!(matches!(
            engine.likes().like(&s1, &alice()).await,
            Err(EngineError::Conflict(_))
        ));
    }

    let likes = store
        .count_edges(&EdgePattern::exact(
            NodeRef::user(&alice()),
            EdgeType::Liked,
            NodeRef::story(&s1),
        ))
        .await
        .unwrap();
    assert_eq!(likes, 1);
    assert_eq!(engine.likes().like_count(&s1).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unlike_without_like_keeps_counter_at_zero() {
    let (engine, _, _) = create_test_engine().await;
    befriend(&engine, &alice(), &bob()).await;
    let s1 = publish(&engine, &bob(), "s1").await;

    assert!(matches!(
        engine.likes().unlike(&s1, &alice()).await,
        Err(EngineError::BadRequest(_))
    ));
    assert_eq!(engine.likes().like_count(&s1).await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_likes_from_distinct_friends() {
    let (engine, _, _) = create_test_engine().await;
    befriend(&engine, &alice(), &bob()).await;
    befriend(&engine, &carol(), &bob()).await;
    let s1 = publish(&engine, &bob(), "s1").await;

    let (al, ca) = (alice(), carol());
    let (a, c) = tokio::join!(engine.likes().like(&s1, &al), engine.likes().like(&s1, &ca));
    a.unwrap();
    c.unwrap();

    assert_eq!(engine.likes().like_count(&s1).await.unwrap(), 2);
}

#[tokio::test]
async fn test_duplicate_like_racing_past_the_check_conflicts() {
    let store = Arc::new(InterruptingStore::new(seeded_store().await));
    let publisher = Arc::new(RecordingPublisher::new());
    let engine = SocialGraphEngine::new(store.clone(), publisher.clone(), EngineConfig::new());
    befriend(&engine, &alice(), &bob()).await;
    let s1 = publish(&engine, &bob(), "s1").await;
    engine.likes().like(&s1, &alice()).await.unwrap();
    publisher.clear();

    // the duplicate check sees no like, as if the first write were still in flight
    store.serve_stale_like_counts();
    assert!(matches!(
        engine.likes().like(&s1, &alice()).await,
        Err(EngineError::Conflict(_))
    ));

    assert_eq!(engine.likes().like_count(&s1).await.unwrap(), 1);
    assert!(publisher.names().is_empty());
}

#[tokio::test]
async fn test_update_round_trip() {
    let (engine, _, publisher) = create_test_engine().await;
    befriend(&engine, &alice(), &bob()).await;
    let s1 = publish(&engine, &bob(), "s1").await;
    engine.likes().like(&s1, &alice()).await.unwrap();
    let before = engine.content().get_story(&s1).await.unwrap();

    engine
        .content()
        .update_story(&s1, "https://cdn/s1-v2.png")
        .await
        .unwrap();
    let after = engine.content().get_story(&s1).await.unwrap();

    assert_eq!(after.content, "https://cdn/s1-v2.png");
    assert_eq!(after.id, before.id);
    assert_eq!(after.creator_id, before.creator_id);
    assert_eq!(after.created_at, before.created_at);
    assert_eq!(after.like_count, before.like_count);
    assert_eq!(after.like_count, 1);
    assert!(publisher.names().contains(&"story.updated"));
}

#[tokio::test]
async fn test_list_stories_by_user() {
    let (engine, _, _) = create_test_engine().await;
    publish(&engine, &bob(), "s1").await;
    publish(&engine, &bob(), "s2").await;
    publish(&engine, &alice(), "s3").await;

    let stories = engine.content().list_stories_by_user(&bob()).await.unwrap();
    let mut ids: Vec<_> = stories.iter().map(|s| s.id.as_str().to_string()).collect();
    ids.sort();
    assert_eq!(ids, vec!["s1", "s2"]);

    assert!(matches!(
        engine
            .content()
            .list_stories_by_user(&UserId::new("ghost"))
            .await,
        Err(EngineError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_delete_story_is_idempotent_and_spares_neighbours() {
    let (engine, store, publisher) = create_test_engine().await;
    befriend(&engine, &alice(), &bob()).await;
    let s1 = publish(&engine, &bob(), "s1").await;
    let s2 = publish(&engine, &bob(), "s2").await;
    let h1 = engine
        .content()
        .create_highlight(CreateHighlightRequest::new(bob(), "Trips").with_id("h1"))
        .await
        .unwrap()
        .id;
    for story in [&s1, &s2] {
        engine.content().add_story_to_highlight(&h1, story).await.unwrap();
    }
    engine.likes().like(&s1, &alice()).await.unwrap();
    engine.content().view_story(&alice(), &s1).await.unwrap();

    let first = engine.content().delete_story(&s1).await.unwrap();
    assert!(first.deleted);
    assert_eq!(first.likes_removed, 1);
    assert_eq!(first.highlight_links_removed, 1);
    assert_eq!(first.views_removed, 1);

    publisher.clear();
    let second = engine.content().delete_story(&s1).await.unwrap();
    assert!(!second.deleted);
    assert!(publisher.names().is_empty());

    let remaining = engine.visibility().stories_by_highlight(&h1).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, s2);
    assert!(store.edges_touching(&NodeRef::story(&s1)).await.is_empty());
}

#[tokio::test]
async fn test_interrupted_delete_resumes_cleanly() {
    let store = Arc::new(InterruptingStore::new(seeded_store().await));
    let engine = SocialGraphEngine::new(
        store.clone(),
        Arc::new(RecordingPublisher::new()),
        EngineConfig::new(),
    );
    befriend(&engine, &alice(), &bob()).await;
    let s1 = publish(&engine, &bob(), "s1").await;
    engine.likes().like(&s1, &alice()).await.unwrap();

    store.interrupt_next_delete_node();
    let err = engine.content().delete_story(&s1).await.unwrap_err();
    assert!(err.is_retryable());

    // edges are gone, node is still there, nothing dangles
    assert!(store.inner.edges_touching(&NodeRef::story(&s1)).await.is_empty());
    assert!(engine.content().get_story(&s1).await.is_ok());

    assert!(engine.content().delete_story(&s1).await.unwrap().deleted);
    assert!(matches!(
        engine.content().get_story(&s1).await,
        Err(EngineError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_unreachable_store_is_service_unavailable() {
    let (engine, store, publisher) = create_test_engine().await;
    let s1 = publish(&engine, &bob(), "s1").await;
    publisher.clear();

    store.set_unavailable(true);
    let err = engine.likes().like(&s1, &alice()).await.unwrap_err();
    assert!(matches!(err, EngineError::ServiceUnavailable(_)));
    assert!(err.is_retryable());
    assert!(matches!(
        engine.relationships().status(&alice(), &bob()).await,
        Err(EngineError::ServiceUnavailable(_))
    ));
    assert!(publisher.names().is_empty());

    store.set_unavailable(false);
    assert_eq!(
        engine.relationships().status(&alice(), &bob()).await.unwrap(),
        FriendshipStatus::None
    );
}

#[tokio::test]
async fn test_highlight_listing_policy() {
    let (engine, _, _) = create_test_engine().await;
    let own = publish(&engine, &bob(), "s-bob").await;
    let foreign = publish(&engine, &alice(), "s-alice").await;

    let visible = engine
        .content()
        .create_highlight(CreateHighlightRequest::new(bob(), "Mine").with_id("h-visible"))
        .await
        .unwrap()
        .id;
    let hidden = engine
        .content()
        .create_highlight(CreateHighlightRequest::new(bob(), "Others").with_id("h-hidden"))
        .await
        .unwrap()
        .id;
    engine.content().add_story_to_highlight(&visible, &own).await.unwrap();
    engine.content().add_story_to_highlight(&hidden, &foreign).await.unwrap();

    let listed = engine.visibility().highlights_for_user(&bob()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, visible);

    // deleting a highlight keeps its stories
    assert!(engine.content().delete_highlight(&visible).await.unwrap());
    assert!(engine.content().get_story(&own).await.is_ok());
    assert!(engine.visibility().highlights_for_user(&bob()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_bulk_highlight_delete_requires_admin() {
    let (engine, store, _) = create_test_engine().await;
    let s1 = publish(&engine, &bob(), "s1").await;
    for id in ["h1", "h2"] {
        let h = engine
            .content()
            .create_highlight(CreateHighlightRequest::new(bob(), id).with_id(id))
            .await
            .unwrap()
            .id;
        engine.content().add_story_to_highlight(&h, &s1).await.unwrap();
    }

    assert!(matches!(
        engine.authorize_admin("wrong"),
        Err(EngineError::Forbidden(_))
    ));

    let admin = engine.authorize_admin(ADMIN_TOKEN).unwrap();
    assert_eq!(engine.content().delete_all_highlights(&admin).await.unwrap(), 2);

    assert!(engine.content().get_story(&s1).await.is_ok());
    assert!(engine
        .visibility()
        .stories_by_highlight(&HighlightId::new("h1"))
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        store
            .query_nodes(&NodeQuery::label(NodeLabel::Highlight))
            .await
            .unwrap()
            .len(),
        0
    );
}

#[tokio::test]
async fn test_reconcile_all_repairs_every_story() {
    let (engine, store, _) = create_test_engine().await;
    befriend(&engine, &alice(), &bob()).await;
    let s1 = publish(&engine, &bob(), "s1").await;
    publish(&engine, &bob(), "s2").await;
    engine.likes().like(&s1, &alice()).await.unwrap();

    store
        .set_property(&NodeRef::story(&s1), "like_count", PropertyValue::Integer(5))
        .await
        .unwrap();

    let admin = engine.authorize_admin(ADMIN_TOKEN).unwrap();
    let results = engine.likes().reconcile_all(&admin).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results.iter().filter(|r| r.drifted()).count(), 1);
    assert_eq!(engine.likes().like_count(&s1).await.unwrap(), 1);
}

#[tokio::test]
async fn test_publish_failure_does_not_fail_mutation() {
    let store = Arc::new(seeded_store().await);
    let engine = SocialGraphEngine::new(store, Arc::new(BrokenPublisher), EngineConfig::new());

    let status = engine
        .relationships()
        .send_request(&alice(), &bob())
        .await
        .unwrap();
    assert_eq!(status, FriendshipStatus::RequestSent);
    assert_eq!(
        engine.relationships().status(&bob(), &alice()).await.unwrap(),
        FriendshipStatus::RequestSent
    );
}

#[tokio::test]
async fn test_broadcast_subscribers_see_events() {
    let store = Arc::new(seeded_store().await);
    let broadcast = BroadcastPublisher::new(16);
    let mut receiver = broadcast.subscribe();
    let engine = SocialGraphEngine::new(store, Arc::new(broadcast), EngineConfig::new());

    engine
        .relationships()
        .send_request(&alice(), &bob())
        .await
        .unwrap();

    let event = timeout(Duration::from_secs(1), receiver.recv())
        .await
        .expect("event delivered in time")
        .unwrap();
    assert_eq!(event.name(), "friend.requested");
    assert_eq!(event.actor(), Some(&alice()));
}

#[tokio::test]
async fn test_validation_precedes_store_access() {
    let (engine, store, _) = create_test_engine().await;
    store.set_unavailable(true);

    // blank input is rejected without touching the store
    assert!(matches!(
        engine.likes().like(&StoryId::new(" "), &alice()).await,
        Err(EngineError::ValidationError(_))
    ));
    assert!(matches!(
        engine
            .content()
            .create_story(CreateStoryRequest::new(bob(), ""))
            .await,
        Err(EngineError::ValidationError(_))
    ));
}
