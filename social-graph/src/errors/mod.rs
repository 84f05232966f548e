//! Error types for the social graph engine.

use social_graph_repository::GraphStoreError;
use thiserror::Error;

/// Errors returned by engine operations.
///
/// Every variant except [`EngineError::ServiceUnavailable`] is terminal for
/// the request that produced it. Validation, existence and permission checks
/// are all performed before the first write, so any of those variants means
/// nothing was changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A required input was missing or malformed.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The operation would duplicate an existing edge (like, friend request).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A friendship or capability precondition was not met.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The caller asked to undo something that never happened.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The graph store could not be reached or timed out. Safe to retry.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// The graph store rejected a statement or returned unusable data.
    #[error("Store error: {0}")]
    Store(GraphStoreError),
}

impl EngineError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a not-found error for the given entity kind.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a forbidden error.
    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    /// Create a bad request error.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Whether the caller may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_))
    }
}

impl From<GraphStoreError> for EngineError {
    fn from(err: GraphStoreError) -> Self {
        if err.is_connectivity() {
            Self::ServiceUnavailable(err.to_string())
        } else {
            Self::Store(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connectivity_errors_are_retryable() {
        let err: EngineError = GraphStoreError::unavailable("connection refused").into();
        assert!(matches!(err, EngineError::ServiceUnavailable(_)));
        assert!(err.is_retryable());

        let err: EngineError = GraphStoreError::timeout("5000ms").into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_store_rejections_are_terminal() {
        let err: EngineError = GraphStoreError::query("syntax error").into();
        assert!(matches!(err, EngineError::Store(GraphStoreError::Query(_))));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_not_found_display() {
        let err = EngineError::not_found("Story", "s1");
        assert_eq!(err.to_string(), "Story not found: s1");
        assert!(!err.is_retryable());
    }
}
