//! Core of the Sodium personal knowledge graph.
//! This crate owns every invariant over notes, links, tags and logs, plus
//! the analytics derived from them. Front ends only call into it.

mod atomic_file;

pub mod analytics;
pub mod config;
pub mod content;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod search;
pub mod service;

pub use analytics::centrality::{AnalyticsError, CentralityReport, EigenvectorSource};
pub use analytics::clusters::{ClusterStrategy, Clusters};
pub use analytics::cooccurrence::Cooccurrence;
pub use analytics::engine::{AnalysisReport, AnalyticsConfig, AnalyticsEngine};
pub use analytics::graph::{LinkGraph, Scores};
pub use config::SodiumConfig;
pub use content::note_files::{FsNoteFileStore, NoteFileError, NoteFileStore};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::note::{NoteId, NoteIdError};
pub use model::snapshot::{GraphSnapshot, IntegrityIssue};
pub use repo::snapshot_repo::{
    JsonFileSnapshotRepository, RepoError, RepoResult, SnapshotRepository,
    SqliteSnapshotRepository,
};
pub use search::text::{LogHit, LogMatch, SearchResults};
pub use service::graph_store::{
    GraphStore, LinkOutcome, LoadOutcome, NoteView, StoreError, StoreResult,
};
pub use service::shared::SharedGraphStore;

/// Minimal health-check API for front-end wiring.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
