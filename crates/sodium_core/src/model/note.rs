//! Note identity rules.
//!
//! # Invariants
//! - A note id doubles as the content file stem, so it must be a single,
//!   printable path segment.
//! - Ids never change once a note is created.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stable note identifier (also the note title).
pub type NoteId = String;

/// Validation failures for note ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteIdError {
    /// Id is empty or whitespace only.
    Blank,
    /// Id is `.` or `..`.
    Reserved(String),
    /// Id contains a path separator or control character.
    ForbiddenChar { id: String, ch: char },
}

impl Display for NoteIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => write!(f, "note id cannot be blank"),
            Self::Reserved(id) => write!(f, "note id `{id}` is reserved"),
            Self::ForbiddenChar { id, ch } => {
                write!(f, "note id `{id}` contains forbidden character {ch:?}")
            }
        }
    }
}

impl Error for NoteIdError {}

/// Checks that `id` can be used as a note id and content file stem.
pub fn validate_note_id(id: &str) -> Result<(), NoteIdError> {
    if id.trim().is_empty() {
        return Err(NoteIdError::Blank);
    }
    if id == "." || id == ".." {
        return Err(NoteIdError::Reserved(id.to_string()));
    }
    if let Some(ch) = id
        .chars()
        .find(|ch| matches!(ch, '/' | '\\') || ch.is_control())
    {
        return Err(NoteIdError::ForbiddenChar {
            id: id.to_string(),
            ch,
        });
    }
    Ok(())
}

/// Normalizes one tag label. Returns `None` for blank input.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
