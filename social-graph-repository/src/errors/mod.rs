//! Error types for the graph store repository.
//!
//! This module provides a unified error type for all graph store operations.

mod graph_store_error;

pub use graph_store_error::GraphStoreError;
