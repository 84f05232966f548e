//! Graph store error types.
//!
//! This module defines the unified error type for all graph store operations,
//! covering connectivity failures as well as statements the store rejected.

use thiserror::Error;

/// Unified errors from graph store operations.
///
/// Used by the `GraphStore` trait and every backend implementing it. Callers
/// that need to decide whether a failure is transient should use
/// [`GraphStoreError::is_connectivity`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphStoreError {
    /// The store could not be reached.
    #[error("Graph store unavailable: {0}")]
    Unavailable(String),

    /// A statement did not complete within the configured timeout.
    #[error("Graph store timeout: {0}")]
    Timeout(String),

    /// The store rejected a statement.
    #[error("Query error: {0}")]
    Query(String),

    /// A returned row could not be mapped back into graph types.
    #[error("Decode error: {0}")]
    Decode(String),

    /// An edge pattern was too broad or otherwise unusable for the operation.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// A property key contained characters that cannot be used as a key.
    #[error("Invalid property key: {0}")]
    InvalidProperty(String),

    /// A node with the same label and identifier already exists.
    #[error("Duplicate node: {0}")]
    DuplicateNode(String),

    /// A node cannot be removed while relationships still reference it.
    #[error("Node still has relationships: {0}")]
    NodeHasEdges(String),
}

impl GraphStoreError {
    /// Create an unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an invalid pattern error.
    pub fn invalid_pattern(msg: impl Into<String>) -> Self {
        Self::InvalidPattern(msg.into())
    }

    /// Create an invalid property error.
    pub fn invalid_property(key: &str) -> Self {
        Self::InvalidProperty(key.to_string())
    }

    /// Whether the failure is a connectivity problem (unreachable or timed out).
    ///
    /// These are the only failures a caller may retry.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}
