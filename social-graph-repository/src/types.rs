//! Typed vocabulary for graph store operations.
//!
//! Labels and relationship types are closed enums, node addresses are
//! `(label, id)` pairs, and edge lookups are expressed as [`EdgePattern`]s.
//! Backends translate these into their own query language; callers never
//! build query strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use social_graph_shared::{HighlightId, StoryId, UserId};

use crate::errors::GraphStoreError;

/// Node labels known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeLabel {
    User,
    Story,
    Highlight,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::User => "User",
            NodeLabel::Story => "Story",
            NodeLabel::Highlight => "Highlight",
        }
    }

    pub fn all() -> [NodeLabel; 3] {
        [NodeLabel::User, NodeLabel::Story, NodeLabel::Highlight]
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeLabel {
    type Err = GraphStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(NodeLabel::User),
            "Story" => Ok(NodeLabel::Story),
            "Highlight" => Ok(NodeLabel::Highlight),
            other => Err(GraphStoreError::decode(format!("unknown node label '{other}'"))),
        }
    }
}

/// Relationship types known to the engine. All edges are directed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EdgeType {
    /// User -> Story
    Published,
    /// User -> Highlight
    HasHighlight,
    /// Story -> Highlight
    PartOfHighlight,
    /// User -> Story, at most one per pair
    Liked,
    /// User -> Story, repeatable
    Viewed,
    /// Requester -> target, pending
    FriendRequest,
    /// Confirmed friendship, stored once per unordered pair
    Friend,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Published => "PUBLISHED",
            EdgeType::HasHighlight => "HAS_HIGHLIGHT",
            EdgeType::PartOfHighlight => "PART_OF_HIGHLIGHT",
            EdgeType::Liked => "LIKED",
            EdgeType::Viewed => "VIEWED",
            EdgeType::FriendRequest => "FRIEND_REQUEST",
            EdgeType::Friend => "FRIEND",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeType {
    type Err = GraphStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUBLISHED" => Ok(EdgeType::Published),
            "HAS_HIGHLIGHT" => Ok(EdgeType::HasHighlight),
            "PART_OF_HIGHLIGHT" => Ok(EdgeType::PartOfHighlight),
            "LIKED" => Ok(EdgeType::Liked),
            "VIEWED" => Ok(EdgeType::Viewed),
            "FRIEND_REQUEST" => Ok(EdgeType::FriendRequest),
            "FRIEND" => Ok(EdgeType::Friend),
            other => Err(GraphStoreError::decode(format!(
                "unknown relationship type '{other}'"
            ))),
        }
    }
}

/// Address of a node: its label plus its `id` property.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeRef {
    pub label: NodeLabel,
    pub id: String,
}

impl NodeRef {
    pub fn new(label: NodeLabel, id: impl Into<String>) -> Self {
        Self {
            label,
            id: id.into(),
        }
    }

    pub fn user(id: &UserId) -> Self {
        Self::new(NodeLabel::User, id.as_str())
    }

    pub fn story(id: &StoryId) -> Self {
        Self::new(NodeLabel::Story, id.as_str())
    }

    pub fn highlight(id: &HighlightId) -> Self {
        Self::new(NodeLabel::Highlight, id.as_str())
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.label, self.id)
    }
}

/// A scalar node property.
///
/// Timestamps are stored as RFC 3339 text so that every backend can hold them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Integer(i64),
    Text(String),
}

impl PropertyValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Self::Text(value.to_rfc3339())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Integer(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Text(_) => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        self.as_text()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Node properties, excluding the `id` key which lives on [`NodeRef`].
pub type Properties = BTreeMap<String, PropertyValue>;

/// Check that a property key is safe to use as a bare identifier.
///
/// Keys must be non-empty, contain only ASCII alphanumerics and underscores,
/// and must not be `id` (the identity key cannot be rewritten).
pub fn validate_property_key(key: &str) -> Result<(), GraphStoreError> {
    let valid = !key.is_empty()
        && key != "id"
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !key.starts_with("__");
    if valid {
        Ok(())
    } else {
        Err(GraphStoreError::invalid_property(key))
    }
}

/// A node read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub node: NodeRef,
    pub properties: Properties,
}

impl Node {
    pub fn id(&self) -> &str {
        &self.node.id
    }

    pub fn label(&self) -> NodeLabel {
        self.node.label
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PropertyValue::as_text)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PropertyValue::as_integer)
    }

    pub fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key).and_then(PropertyValue::as_timestamp)
    }
}

/// Result of an idempotent node merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub node: Node,
    /// `true` when the merge created the node, `false` when it already existed.
    pub created: bool,
}

/// Result of an idempotent edge merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMerge {
    /// This call wrote the edge.
    Created,
    /// An identical edge was already present.
    Existed,
    /// One of the endpoints does not exist; nothing was written.
    MissingEndpoint,
}

impl EdgeMerge {
    /// Whether the edge is present after the merge.
    pub fn is_linked(self) -> bool {
        !matches!(self, Self::MissingEndpoint)
    }
}

/// A directed, typed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: NodeRef,
    pub edge_type: EdgeType,
    pub to: NodeRef,
}

impl Edge {
    pub fn new(from: NodeRef, edge_type: EdgeType, to: NodeRef) -> Self {
        Self {
            from,
            edge_type,
            to,
        }
    }
}

/// Constraint on one end of an edge pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Any,
    Label(NodeLabel),
    Node(NodeRef),
}

impl Endpoint {
    pub fn matches(&self, node: &NodeRef) -> bool {
        match self {
            Endpoint::Any => true,
            Endpoint::Label(label) => node.label == *label,
            Endpoint::Node(expected) => expected == node,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Endpoint::Any)
    }
}

/// A typed edge match pattern, built fluently:
///
/// ```
/// use social_graph_repository::{EdgePattern, EdgeType, NodeRef, NodeLabel};
///
/// let likes_of_story = EdgePattern::of(EdgeType::Liked)
///     .to_node(NodeRef::new(NodeLabel::Story, "s1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgePattern {
    pub edge_type: Option<EdgeType>,
    pub from: Endpoint,
    pub to: Endpoint,
}

impl EdgePattern {
    /// Match edges of one relationship type.
    pub fn of(edge_type: EdgeType) -> Self {
        Self {
            edge_type: Some(edge_type),
            from: Endpoint::Any,
            to: Endpoint::Any,
        }
    }

    /// Match edges of any relationship type.
    pub fn any_type() -> Self {
        Self {
            edge_type: None,
            from: Endpoint::Any,
            to: Endpoint::Any,
        }
    }

    pub fn from_node(mut self, node: NodeRef) -> Self {
        self.from = Endpoint::Node(node);
        self
    }

    pub fn to_node(mut self, node: NodeRef) -> Self {
        self.to = Endpoint::Node(node);
        self
    }

    pub fn from_label(mut self, label: NodeLabel) -> Self {
        self.from = Endpoint::Label(label);
        self
    }

    pub fn to_label(mut self, label: NodeLabel) -> Self {
        self.to = Endpoint::Label(label);
        self
    }

    /// The exact edge `from -[edge_type]-> to`.
    pub fn exact(from: NodeRef, edge_type: EdgeType, to: NodeRef) -> Self {
        Self::of(edge_type).from_node(from).to_node(to)
    }

    pub fn matches(&self, edge: &Edge) -> bool {
        self.edge_type.map_or(true, |t| t == edge.edge_type)
            && self.from.matches(&edge.from)
            && self.to.matches(&edge.to)
    }

    /// A pattern with no type and no endpoint constraint matches the whole graph.
    pub fn is_unbounded(&self) -> bool {
        self.edge_type.is_none() && self.from.is_any() && self.to.is_any()
    }
}

/// A node lookup by label with an optional equality filter on one property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeQuery {
    pub label: NodeLabel,
    pub filter: Option<(String, PropertyValue)>,
}

impl NodeQuery {
    pub fn label(label: NodeLabel) -> Self {
        Self {
            label,
            filter: None,
        }
    }

    pub fn where_eq(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.filter = Some((key.into(), value.into()));
        self
    }

    pub fn matches(&self, node: &Node) -> bool {
        if node.label() != self.label {
            return false;
        }
        match &self.filter {
            None => true,
            Some((key, value)) if key == "id" => value.as_text() == Some(node.id()),
            Some((key, value)) => node.get(key) == Some(value),
        }
    }
}
