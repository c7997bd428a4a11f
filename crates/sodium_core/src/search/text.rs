//! Case-insensitive substring search.
//!
//! # Invariants
//! - Blank queries return empty results. Other queries match as given,
//!   surrounding whitespace included.
//! - Note results follow note id order; log results follow title order with
//!   a title hit listed before a body hit for the same log.
//! - Notes whose content resource is missing are skipped, not fatal.

use crate::content::note_files::{NoteFileError, NoteFileStore};
use crate::model::note::NoteId;
use crate::model::snapshot::GraphSnapshot;
use log::warn;

/// Which part of a log entry matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMatch {
    Title,
    Body,
}

/// One matching log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHit {
    pub title: String,
    pub body: String,
    pub matched: LogMatch,
}

/// Search output split by source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    /// Ids of notes whose content contains the query.
    pub notes: Vec<NoteId>,
    pub logs: Vec<LogHit>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.logs.is_empty()
    }
}

/// Searches note content (through `files`) and the snapshot logs.
///
/// # Errors
/// - Returns content store errors other than `NotFound`.
pub fn search_snapshot<F>(
    snapshot: &GraphSnapshot,
    files: &F,
    query: &str,
) -> Result<SearchResults, NoteFileError>
where
    F: NoteFileStore + ?Sized,
{
    if query.trim().is_empty() {
        return Ok(SearchResults::default());
    }
    let needle = query.to_lowercase();

    let mut results = SearchResults::default();
    for (id, location) in &snapshot.notes {
        match files.read(location) {
            Ok(content) => {
                if content.to_lowercase().contains(&needle) {
                    results.notes.push(id.clone());
                }
            }
            Err(NoteFileError::NotFound(_)) => {
                warn!("event=search_skip module=search status=warn reason=content_missing id={id}");
            }
            Err(err) => return Err(err),
        }
    }

    for (title, body) in &snapshot.logs {
        if title.to_lowercase().contains(&needle) {
            results.logs.push(LogHit {
                title: title.clone(),
                body: body.clone(),
                matched: LogMatch::Title,
            });
        }
        if body.to_lowercase().contains(&needle) {
            results.logs.push(LogHit {
                title: title.clone(),
                body: body.clone(),
                matched: LogMatch::Body,
            });
        }
    }

    Ok(results)
}
