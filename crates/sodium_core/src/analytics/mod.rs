//! Read-only graph analytics over a snapshot.
//!
//! # Responsibility
//! - Project a snapshot into an undirected simple graph.
//! - Compute centrality scores, clusters and tag co-occurrence.
//!
//! # Invariants
//! - Analytics never mutate the store; every call recomputes from the
//!   snapshot it is given.
//! - Results are deterministic for a given snapshot.

pub mod centrality;
pub mod clusters;
pub mod cooccurrence;
pub mod engine;
pub mod graph;
