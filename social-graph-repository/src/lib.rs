//! # Social Graph Repository
//!
//! This crate provides the graph store contract the social graph engine is
//! written against, together with two backends: an in-memory store (used for
//! tests and local runs) and a Neo4j store. The engine only ever calls the
//! typed operations on [`GraphStore`]; pattern rendering to Cypher stays
//! private to the Neo4j backend.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod memory;
pub mod neo4j;
pub mod types;

pub use config::Neo4jConfig;
pub use errors::GraphStoreError;
pub use interfaces::GraphStore;
pub use memory::MemoryGraphStore;
pub use neo4j::Neo4jGraphStore;
pub use types::{
    Edge, EdgeMerge, EdgePattern, EdgeType, Endpoint, MergeOutcome, Node, NodeLabel, NodeQuery,
    NodeRef, Properties, PropertyValue,
};
