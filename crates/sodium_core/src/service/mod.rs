//! Graph store services.
//!
//! # Responsibility
//! - Apply consistency-preserving mutations to the graph.
//! - Provide a lock-guarded handle for callers that share one store.

pub mod graph_store;
pub mod shared;
