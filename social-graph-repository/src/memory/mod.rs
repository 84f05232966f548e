//! In-memory implementation of the graph store.
//!
//! Holds the whole graph behind an async lock. Used as the injected store in
//! tests and for local runs without a Neo4j instance.

mod store;

pub use store::MemoryGraphStore;
