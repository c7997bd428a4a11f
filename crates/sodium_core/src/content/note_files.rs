//! Note content store contract and file-system implementation.
//!
//! # Responsibility
//! - Place new notes at `<notes_dir>/<id>.na.md`.
//! - Read and write content at the location recorded for a note, which may
//!   lie outside the notes directory.
//! - Surface semantic errors (`AlreadyExists`, `NotFound`) in addition to
//!   raw I/O failures.
//!
//! # Invariants
//! - New content is seeded with a `# <id>` heading.
//! - A failed `create` leaves no file behind.
//! - `append` never creates a missing file.

use crate::atomic_file::write_atomic;
use crate::model::note::NoteId;
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File suffix that marks a note content resource.
pub const NOTE_FILE_SUFFIX: &str = ".na.md";

pub type NoteFileResult<T> = Result<T, NoteFileError>;

/// Content store error.
#[derive(Debug)]
pub enum NoteFileError {
    /// Content for this id already exists at its default location.
    AlreadyExists(NoteId),
    /// No content at this location.
    NotFound(String),
    Io { path: PathBuf, source: io::Error },
}

impl Display for NoteFileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyExists(id) => write!(f, "note content already exists: {id}"),
            Self::NotFound(location) => write!(f, "note content not found: {location}"),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl Error for NoteFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Storage contract for note text.
///
/// Everything except `create`, `location` and `list_ids` is addressed by the
/// location recorded in the graph, not by note id.
pub trait NoteFileStore {
    /// Location a new note with `id` gets.
    fn location(&self, id: &str) -> String;
    /// Whether content currently exists at `location`.
    fn exists(&self, location: &str) -> bool;
    /// Creates seeded content at the default location and returns it.
    fn create(&self, id: &str) -> NoteFileResult<String>;
    /// Appends `text` to existing content.
    fn append(&self, location: &str, text: &str) -> NoteFileResult<()>;
    fn read(&self, location: &str) -> NoteFileResult<String>;
    /// Replaces the full content, creating it when missing.
    fn overwrite(&self, location: &str, text: &str) -> NoteFileResult<()>;
    fn delete(&self, location: &str) -> NoteFileResult<()>;
    /// Ids with content in the notes directory, sorted.
    fn list_ids(&self) -> NoteFileResult<Vec<NoteId>>;
}

/// Notes stored as markdown files; new ones go into one directory.
#[derive(Debug, Clone)]
pub struct FsNoteFileStore {
    dir: PathBuf,
}

impl FsNoteFileStore {
    /// Opens (and creates if needed) the notes directory.
    pub fn open(dir: impl Into<PathBuf>) -> NoteFileResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| NoteFileError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}{NOTE_FILE_SUFFIX}"))
    }
}

/// Initial content for a freshly created note.
pub fn default_heading(id: &str) -> String {
    format!("# {id}\n\n")
}

impl NoteFileStore for FsNoteFileStore {
    fn location(&self, id: &str) -> String {
        self.path_for(id).to_string_lossy().into_owned()
    }

    fn exists(&self, location: &str) -> bool {
        Path::new(location).is_file()
    }

    fn create(&self, id: &str) -> NoteFileResult<String> {
        let path = self.path_for(id);
        let heading = default_heading(id);
        match create_seeded(&path, |file| file.write_all(heading.as_bytes())) {
            Ok(()) => {}
            Err(source) if source.kind() == io::ErrorKind::AlreadyExists => {
                return Err(NoteFileError::AlreadyExists(id.to_string()));
            }
            Err(source) => return Err(NoteFileError::Io { path, source }),
        }
        debug!("event=note_file_create module=content status=ok id={id}");
        Ok(path.to_string_lossy().into_owned())
    }

    fn append(&self, location: &str, text: &str) -> NoteFileResult<()> {
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(location)
            .map_err(|source| map_io(location, source))?;
        file.write_all(text.as_bytes())
            .map_err(|source| map_io(location, source))
    }

    fn read(&self, location: &str) -> NoteFileResult<String> {
        fs::read_to_string(location).map_err(|source| map_io(location, source))
    }

    fn overwrite(&self, location: &str, text: &str) -> NoteFileResult<()> {
        write_atomic(Path::new(location), text.as_bytes())
            .map_err(|source| map_io(location, source))
    }

    fn delete(&self, location: &str) -> NoteFileResult<()> {
        fs::remove_file(location).map_err(|source| map_io(location, source))?;
        debug!("event=note_file_delete module=content status=ok location={location}");
        Ok(())
    }

    fn list_ids(&self) -> NoteFileResult<Vec<NoteId>> {
        let entries = fs::read_dir(&self.dir).map_err(|source| NoteFileError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| NoteFileError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let is_file = entry.file_type().map(|kind| kind.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if let Some(id) = name.strip_suffix(NOTE_FILE_SUFFIX) {
                if !id.is_empty() {
                    ids.push(id.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }
}

/// Creates `path` exclusively and fills it with `seed`, removing the file
/// again when seeding fails.
fn create_seeded(
    path: &Path,
    seed: impl FnOnce(&mut fs::File) -> io::Result<()>,
) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    if let Err(err) = seed(&mut file) {
        drop(file);
        let _ = fs::remove_file(path);
        return Err(err);
    }
    Ok(())
}

fn map_io(location: &str, source: io::Error) -> NoteFileError {
    match source.kind() {
        io::ErrorKind::NotFound => NoteFileError::NotFound(location.to_string()),
        _ => NoteFileError::Io {
            path: PathBuf::from(location),
            source,
        },
    }
}
