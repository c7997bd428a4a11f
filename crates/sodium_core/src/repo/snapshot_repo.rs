//! Snapshot repository contract with JSON file and SQLite blob backends.
//!
//! # Responsibility
//! - Read the raw persisted document and write full replacements.
//! - Keep encoding (`serde_json`) consistent across backends.
//!
//! # Invariants
//! - Both backends store byte-identical JSON documents.
//! - JSON file writes are atomic (temp file + rename).
//!
//! # See also
//! - `service::graph_store` for the decode/recovery policy.

use crate::atomic_file::write_atomic;
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::snapshot::GraphSnapshot;
use log::debug;
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Row key used by the SQLite backend for the graph document.
pub const GRAPH_SNAPSHOT_KEY: &str = "graph";

pub type RepoResult<T> = Result<T, RepoError>;

/// Snapshot persistence error.
#[derive(Debug)]
pub enum RepoError {
    Io { path: PathBuf, source: io::Error },
    Db(DbError),
    Encode(serde_json::Error),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
            Self::Db(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "failed to encode snapshot: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract for the persisted graph document.
pub trait SnapshotRepository {
    /// Returns the raw persisted bytes, or `None` when absent.
    ///
    /// Bytes are returned undecoded so that invalid text surfaces as a
    /// malformed document rather than a read failure.
    fn load_raw(&self) -> RepoResult<Option<Vec<u8>>>;
    /// Replaces the persisted document with `snapshot`.
    fn save(&self, snapshot: &GraphSnapshot) -> RepoResult<()>;
    /// Human-readable location used in log events.
    fn describe(&self) -> String;
}

/// Encodes a snapshot the way every backend stores it.
pub fn encode_snapshot(snapshot: &GraphSnapshot) -> RepoResult<String> {
    serde_json::to_string_pretty(snapshot).map_err(RepoError::Encode)
}

/// Decodes a raw document. The error string describes why it is malformed,
/// including bytes that are not valid UTF-8.
pub fn decode_snapshot(raw: &[u8]) -> Result<GraphSnapshot, String> {
    serde_json::from_slice(raw).map_err(|err| err.to_string())
}

/// Graph document stored as a JSON file (the `GRAPH_FILE` layout).
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotRepository {
    path: PathBuf,
}

impl JsonFileSnapshotRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotRepository for JsonFileSnapshotRepository {
    fn load_raw(&self) -> RepoResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(RepoError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn save(&self, snapshot: &GraphSnapshot) -> RepoResult<()> {
        let body = encode_snapshot(snapshot)?;
        write_atomic(&self.path, body.as_bytes()).map_err(|source| RepoError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!(
            "event=snapshot_save module=repo status=ok backend=json bytes={}",
            body.len()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

/// Graph document stored as a key-value blob in SQLite.
pub struct SqliteSnapshotRepository {
    conn: Mutex<Connection>,
    label: String,
}

impl SqliteSnapshotRepository {
    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        let label = format!("sqlite:{}", path.as_ref().display());
        let conn = open_db(path)?;
        Ok(Self {
            conn: Mutex::new(conn),
            label,
        })
    }

    pub fn open_in_memory() -> RepoResult<Self> {
        let conn = open_db_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
            label: "sqlite::memory:".to_string(),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> RepoResult<T>) -> RepoResult<T> {
        let guard = self
            .conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }
}

impl SnapshotRepository for SqliteSnapshotRepository {
    fn load_raw(&self) -> RepoResult<Option<Vec<u8>>> {
        self.with_conn(|conn| {
            let body = conn
                .query_row(
                    "SELECT CAST(body AS BLOB) FROM snapshots WHERE key = ?1;",
                    [GRAPH_SNAPSHOT_KEY],
                    |row| row.get::<_, Vec<u8>>(0),
                )
                .optional()?;
            Ok(body)
        })
    }

    fn save(&self, snapshot: &GraphSnapshot) -> RepoResult<()> {
        let body = encode_snapshot(snapshot)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO snapshots (key, body, updated_at)
                 VALUES (?1, ?2, strftime('%s', 'now') * 1000)
                 ON CONFLICT(key) DO UPDATE SET
                    body = excluded.body,
                    updated_at = excluded.updated_at;",
                params![GRAPH_SNAPSHOT_KEY, body],
            )?;
            Ok(())
        })?;
        debug!(
            "event=snapshot_save module=repo status=ok backend=sqlite bytes={}",
            body.len()
        );
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
