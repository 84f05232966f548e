//! Graph store trait definition.
//!
//! This module defines the abstract interface for property-graph operations,
//! allowing different backends (Neo4j, in-memory) to be injected into the engine.

use async_trait::async_trait;

use crate::errors::GraphStoreError;
use crate::types::{
    Edge, EdgeMerge, EdgePattern, EdgeType, MergeOutcome, Node, NodeLabel, NodeQuery, NodeRef,
    Properties, PropertyValue,
};

/// Abstracts the underlying property graph (Neo4j, in-memory, etc.).
///
/// Every operation is a single statement against the store; there are no
/// multi-statement transactions at this level. Any operation may fail with a
/// connectivity error (`GraphStoreError::Unavailable` / `Timeout`). Retry
/// policy, if any, belongs to the implementation, not to callers.
///
/// Nodes are addressed by `(label, id)`. Operations that take endpoint nodes
/// follow MATCH semantics: when an endpoint is missing nothing is written and
/// the method reports it through its return value rather than an error.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Create a node with the given identifier and properties.
    ///
    /// # Returns
    ///
    /// * `Ok(Node)` - The created node
    /// * `Err(GraphStoreError::DuplicateNode)` - If `(label, id)` already exists
    async fn create_node(
        &self,
        label: NodeLabel,
        id: &str,
        properties: Properties,
    ) -> Result<Node, GraphStoreError>;

    /// Create the node if absent, otherwise return the existing one untouched.
    ///
    /// `on_create` properties are only written when the node is created, so
    /// repeating the call with the same identifier never duplicates or
    /// overwrites anything.
    async fn merge_node(
        &self,
        label: NodeLabel,
        id: &str,
        on_create: Properties,
    ) -> Result<MergeOutcome, GraphStoreError>;

    /// Read a node, or `None` if it does not exist.
    async fn get_node(&self, node: &NodeRef) -> Result<Option<Node>, GraphStoreError>;

    /// Whether a node exists.
    async fn exists(&self, node: &NodeRef) -> Result<bool, GraphStoreError>;

    /// Overwrite a single property. Returns `false` if the node does not exist.
    async fn set_property(
        &self,
        node: &NodeRef,
        key: &str,
        value: PropertyValue,
    ) -> Result<bool, GraphStoreError>;

    /// Add `delta` to an integer property in one statement, flooring the
    /// result at zero. A missing property counts as zero.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(value))` - The stored value after the adjustment
    /// * `Ok(None)` - If the node does not exist
    async fn adjust_counter(
        &self,
        node: &NodeRef,
        key: &str,
        delta: i64,
    ) -> Result<Option<i64>, GraphStoreError>;

    /// Create an edge. Repeated calls create repeated edges.
    ///
    /// Returns `false` if either endpoint does not exist.
    async fn create_edge(
        &self,
        from: &NodeRef,
        edge_type: EdgeType,
        to: &NodeRef,
    ) -> Result<bool, GraphStoreError>;

    /// Create an edge unless an identical one already exists.
    ///
    /// Reports whether this call wrote the edge, found it already present, or
    /// wrote nothing because an endpoint is missing.
    async fn merge_edge(
        &self,
        from: &NodeRef,
        edge_type: EdgeType,
        to: &NodeRef,
    ) -> Result<EdgeMerge, GraphStoreError>;

    /// Delete every edge matching the pattern and return how many were removed.
    ///
    /// # Returns
    ///
    /// * `Err(GraphStoreError::InvalidPattern)` - If the pattern is unbounded
    async fn delete_edges(&self, pattern: &EdgePattern) -> Result<usize, GraphStoreError>;

    /// Delete a node that has no remaining edges.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The node was deleted
    /// * `Ok(false)` - The node did not exist
    /// * `Err(GraphStoreError::NodeHasEdges)` - Edges still reference the node
    async fn delete_node(&self, node: &NodeRef) -> Result<bool, GraphStoreError>;

    /// List edges matching the pattern.
    async fn query_edges(&self, pattern: &EdgePattern) -> Result<Vec<Edge>, GraphStoreError>;

    /// List nodes matching the query, ordered by identifier.
    async fn query_nodes(&self, query: &NodeQuery) -> Result<Vec<Node>, GraphStoreError>;

    /// Count edges matching the pattern.
    async fn count_edges(&self, pattern: &EdgePattern) -> Result<u64, GraphStoreError>;
}
