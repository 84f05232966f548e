//! Neo4j implementation of the graph store.
//!
//! Typed patterns are rendered to parameterised Cypher by a private builder
//! and executed through `neo4rs`.

mod cypher;
mod store;

pub use store::Neo4jGraphStore;
