//! Interface definitions for the graph store.
//!
//! This module defines the abstract `GraphStore` trait that allows for
//! dependency injection and swappable graph backends.

mod graph_store;

pub use graph_store::GraphStore;
