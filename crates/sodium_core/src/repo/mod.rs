//! Snapshot persistence contracts and implementations.
//!
//! # Responsibility
//! - Define the storage contract for the single persisted graph document.
//! - Isolate JSON file and SQLite blob details from the graph store.
//!
//! # Invariants
//! - `save` replaces the whole document; there is no partial update.
//! - `load_raw` returns `None` only when nothing was ever persisted.

pub mod snapshot_repo;
