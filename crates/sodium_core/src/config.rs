//! Runtime configuration resolved from environment variables.
//!
//! # Responsibility
//! - Resolve graph file, notes directory, editor and logging settings.
//! - Build the default file-backed store from those settings.
//!
//! # Invariants
//! - Blank variables are treated as unset.
//! - Resolution never fails; missing values fall back to defaults.

use crate::content::note_files::FsNoteFileStore;
use crate::logging::default_log_level;
use crate::repo::snapshot_repo::JsonFileSnapshotRepository;
use crate::service::graph_store::{GraphStore, StoreResult};
use std::path::PathBuf;

pub const GRAPH_FILE_VAR: &str = "GRAPH_FILE";
pub const NOTES_DIR_VAR: &str = "NOTES_DIR";
pub const EDITOR_VAR: &str = "EDITOR";
pub const LOG_LEVEL_VAR: &str = "SODIUM_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "SODIUM_LOG_DIR";

const DEFAULT_NOTES_DIR: &str = "notes";
const DEFAULT_EDITOR: &str = "nvim";
const DEFAULT_STATE_DIR: &str = ".sodium";
const DEFAULT_GRAPH_FILE_NAME: &str = "graph.json";

/// Resolved settings for one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SodiumConfig {
    /// Persisted snapshot location.
    pub graph_file: PathBuf,
    /// Directory holding `<id>.na.md` note files.
    pub notes_dir: PathBuf,
    /// Editor command handed to front ends that open notes.
    pub editor: String,
    pub log_level: String,
    /// Log directory; file logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl SodiumConfig {
    /// Reads settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, e.g. a fixed map in tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            graph_file: get(GRAPH_FILE_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(default_graph_file),
            notes_dir: PathBuf::from(
                get(NOTES_DIR_VAR).unwrap_or_else(|| DEFAULT_NOTES_DIR.to_string()),
            ),
            editor: get(EDITOR_VAR).unwrap_or_else(|| DEFAULT_EDITOR.to_string()),
            log_level: get(LOG_LEVEL_VAR).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: get(LOG_DIR_VAR).map(PathBuf::from),
        }
    }

    /// Opens the JSON-file store described by this configuration.
    pub fn open_store(&self) -> StoreResult<GraphStore> {
        let files = FsNoteFileStore::open(&self.notes_dir)?;
        let repo = JsonFileSnapshotRepository::new(&self.graph_file);
        GraphStore::open(repo, files)
    }
}

/// `~/.sodium/graph.json`, or `.sodium/graph.json` when no home directory
/// is known.
pub fn default_graph_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(DEFAULT_STATE_DIR)
        .join(DEFAULT_GRAPH_FILE_NAME)
}
