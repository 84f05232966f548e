use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::GraphStoreError;
use crate::interfaces::GraphStore;
use crate::types::{
    validate_property_key, Edge, EdgeMerge, EdgePattern, EdgeType, MergeOutcome, Node, NodeLabel,
    NodeQuery, NodeRef, Properties, PropertyValue,
};

#[derive(Debug, Default)]
struct GraphState {
    nodes: BTreeMap<NodeRef, Properties>,
    /// Kept in insertion order; duplicates are allowed (e.g. repeated views).
    edges: Vec<Edge>,
}

impl GraphState {
    fn node(&self, node: &NodeRef) -> Option<Node> {
        self.nodes.get(node).map(|properties| Node {
            node: node.clone(),
            properties: properties.clone(),
        })
    }

    fn has_edges(&self, node: &NodeRef) -> bool {
        self.edges.iter().any(|e| &e.from == node || &e.to == node)
    }
}

/// In-memory property graph.
///
/// Besides implementing [`GraphStore`], it offers a connectivity switch
/// ([`MemoryGraphStore::set_unavailable`]) so callers can exercise their
/// handling of an unreachable store, and a few inspection helpers for tests.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    state: RwLock<GraphState>,
    unavailable: AtomicBool,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with `GraphStoreError::Unavailable`
    /// (or succeed again when `false`).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Insert a user node the way the identity provider would.
    pub async fn insert_user(&self, id: &str, user_name: &str) -> Result<Node, GraphStoreError> {
        let mut properties = Properties::new();
        properties.insert("user_name".to_string(), PropertyValue::text(user_name));
        self.create_node(NodeLabel::User, id, properties).await
    }

    /// Total number of nodes currently stored.
    pub async fn node_count(&self) -> usize {
        self.state.read().await.nodes.len()
    }

    /// Total number of edges currently stored.
    pub async fn edge_count(&self) -> usize {
        self.state.read().await.edges.len()
    }

    /// Every edge touching `node`, in either direction.
    pub async fn edges_touching(&self, node: &NodeRef) -> Vec<Edge> {
        self.state
            .read()
            .await
            .edges
            .iter()
            .filter(|e| &e.from == node || &e.to == node)
            .cloned()
            .collect()
    }

    fn check_available(&self) -> Result<(), GraphStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(GraphStoreError::unavailable("in-memory store marked unavailable"))
        } else {
            Ok(())
        }
    }

    fn validate_properties(properties: &Properties) -> Result<(), GraphStoreError> {
        properties.keys().try_for_each(|k| validate_property_key(k))
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn create_node(
        &self,
        label: NodeLabel,
        id: &str,
        properties: Properties,
    ) -> Result<Node, GraphStoreError> {
        self.check_available()?;
        Self::validate_properties(&properties)?;

        let node = NodeRef::new(label, id);
        let mut state = self.state.write().await;
        if state.nodes.contains_key(&node) {
            return Err(GraphStoreError::DuplicateNode(node.to_string()));
        }
        state.nodes.insert(node.clone(), properties.clone());
        debug!(node = %node, "Created node");

        Ok(Node { node, properties })
    }

    async fn merge_node(
        &self,
        label: NodeLabel,
        id: &str,
        on_create: Properties,
    ) -> Result<MergeOutcome, GraphStoreError> {
        self.check_available()?;
        Self::validate_properties(&on_create)?;

        let node = NodeRef::new(label, id);
        let mut state = self.state.write().await;
        let created = !state.nodes.contains_key(&node);
        let properties = state.nodes.entry(node.clone()).or_insert(on_create).clone();

        Ok(MergeOutcome {
            node: Node { node, properties },
            created,
        })
    }

    async fn get_node(&self, node: &NodeRef) -> Result<Option<Node>, GraphStoreError> {
        self.check_available()?;
        Ok(self.state.read().await.node(node))
    }

    async fn exists(&self, node: &NodeRef) -> Result<bool, GraphStoreError> {
        self.check_available()?;
        Ok(self.state.read().await.nodes.contains_key(node))
    }

    async fn set_property(
        &self,
        node: &NodeRef,
        key: &str,
        value: PropertyValue,
    ) -> Result<bool, GraphStoreError> {
        self.check_available()?;
        validate_property_key(key)?;

        let mut state = self.state.write().await;
        match state.nodes.get_mut(node) {
            Some(properties) => {
                properties.insert(key.to_string(), value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn adjust_counter(
        &self,
        node: &NodeRef,
        key: &str,
        delta: i64,
    ) -> Result<Option<i64>, GraphStoreError> {
        self.check_available()?;
        validate_property_key(key)?;

        let mut state = self.state.write().await;
        let Some(properties) = state.nodes.get_mut(node) else {
            return Ok(None);
        };
        let current = properties
            .get(key)
            .and_then(PropertyValue::as_integer)
            .unwrap_or(0);
        let next = current.saturating_add(delta).max(0);
        properties.insert(key.to_string(), PropertyValue::Integer(next));

        Ok(Some(next))
    }

    async fn create_edge(
        &self,
        from: &NodeRef,
        edge_type: EdgeType,
        to: &NodeRef,
    ) -> Result<bool, GraphStoreError> {
        self.check_available()?;

        let mut state = self.state.write().await;
        if !state.nodes.contains_key(from) || !state.nodes.contains_key(to) {
            return Ok(false);
        }
        state
            .edges
            .push(Edge::new(from.clone(), edge_type, to.clone()));
        Ok(true)
    }

    async fn merge_edge(
        &self,
        from: &NodeRef,
        edge_type: EdgeType,
        to: &NodeRef,
    ) -> Result<EdgeMerge, GraphStoreError> {
        self.check_available()?;

        let mut state = self.state.write().await;
        if !state.nodes.contains_key(from) || !state.nodes.contains_key(to) {
            return Ok(EdgeMerge::MissingEndpoint);
        }
        let edge = Edge::new(from.clone(), edge_type, to.clone());
        if state.edges.contains(&edge) {
            return Ok(EdgeMerge::Existed);
        }
        state.edges.push(edge);
        Ok(EdgeMerge::Created)
    }

    async fn delete_edges(&self, pattern: &EdgePattern) -> Result<usize, GraphStoreError> {
        self.check_available()?;
        if pattern.is_unbounded() {
            return Err(GraphStoreError::invalid_pattern(
                "refusing to delete with an unbounded edge pattern",
            ));
        }

        let mut state = self.state.write().await;
        let before = state.edges.len();
        state.edges.retain(|e| !pattern.matches(e));
        Ok(before - state.edges.len())
    }

    async fn delete_node(&self, node: &NodeRef) -> Result<bool, GraphStoreError> {
        self.check_available()?;

        let mut state = self.state.write().await;
        if state.has_edges(node) {
            return Err(GraphStoreError::NodeHasEdges(node.to_string()));
        }
        Ok(state.nodes.remove(node).is_some())
    }

    async fn query_edges(&self, pattern: &EdgePattern) -> Result<Vec<Edge>, GraphStoreError> {
        self.check_available()?;
        Ok(self
            .state
            .read()
            .await
            .edges
            .iter()
            .filter(|e| pattern.matches(e))
            .cloned()
            .collect())
    }

    async fn query_nodes(&self, query: &NodeQuery) -> Result<Vec<Node>, GraphStoreError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state
            .nodes
            .iter()
            .map(|(node, properties)| Node {
                node: node.clone(),
                properties: properties.clone(),
            })
            .filter(|n| query.matches(n))
            .collect())
    }

    async fn count_edges(&self, pattern: &EdgePattern) -> Result<u64, GraphStoreError> {
        self.check_available()?;
        let state = self.state.read().await;
        Ok(state.edges.iter().filter(|e| pattern.matches(e)).count() as u64)
    }
}
