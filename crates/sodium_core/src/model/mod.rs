//! Graph domain model shared by storage, search and analytics.
//!
//! # Responsibility
//! - Define the persisted snapshot shape (`notes`, `links`, `tags`, `logs`).
//! - Keep pure snapshot mutations in one place so the store can apply them
//!   to a scratch copy before persisting.
//!
//! # Invariants
//! - Every committed snapshot has symmetric link entries.
//! - No tag maps to an empty note list after a note removal.

pub mod note;
pub mod snapshot;
