//! Graph store: the single writer of notes, links, tags and logs.
//!
//! # Responsibility
//! - Own the in-memory snapshot and keep it in step with the persisted one.
//! - Coordinate content side effects (seeded files, link markers, deletes).
//! - Maintain the backlink index incrementally.
//!
//! # Invariants
//! - Every mutation builds the next snapshot on a copy, persists it, then
//!   swaps it in. A failed save leaves memory and content untouched.
//! - Links and tag memberships have set semantics; repeating an identical
//!   operation changes nothing and writes nothing.
//! - A removed note is referenced by no link, backlink or tag.
//!
//! # See also
//! - `repo::snapshot_repo` for persistence backends.

use crate::content::markers::{link_marker, marker_targets};
use crate::content::note_files::{FsNoteFileStore, NoteFileError, NoteFileStore};
use crate::model::note::{normalize_tag, validate_note_id, NoteId, NoteIdError};
use crate::model::snapshot::{GraphSnapshot, IntegrityIssue};
use crate::repo::snapshot_repo::{
    decode_snapshot, JsonFileSnapshotRepository, RepoError, SnapshotRepository,
};
use crate::search::text::{search_snapshot, SearchResults};
use log::{error, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Graph store error.
#[derive(Debug)]
pub enum StoreError {
    /// Referenced note does not exist.
    NotFound(NoteId),
    /// Note (or its content) already exists.
    AlreadyExists(NoteId),
    InvalidNoteId(NoteIdError),
    /// Tag label is blank.
    InvalidTag(String),
    /// A note cannot link to itself.
    SelfLink(NoteId),
    /// Persisted document could not be decoded (strict open only).
    MalformedPersistedState(String),
    Content(NoteFileError),
    Persist(RepoError),
    /// A writer panicked while holding the shared store lock.
    LockPoisoned,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::AlreadyExists(id) => write!(f, "note already exists: {id}"),
            Self::InvalidNoteId(err) => write!(f, "{err}"),
            Self::InvalidTag(value) => write!(f, "invalid tag: `{value}`"),
            Self::SelfLink(id) => write!(f, "note cannot link to itself: {id}"),
            Self::MalformedPersistedState(reason) => {
                write!(f, "malformed persisted graph: {reason}")
            }
            Self::Content(err) => write!(f, "{err}"),
            Self::Persist(err) => write!(f, "{err}"),
            Self::LockPoisoned => write!(f, "graph store lock poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidNoteId(err) => Some(err),
            Self::Content(err) => Some(err),
            Self::Persist(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NoteIdError> for StoreError {
    fn from(value: NoteIdError) -> Self {
        Self::InvalidNoteId(value)
    }
}

impl From<NoteFileError> for StoreError {
    fn from(value: NoteFileError) -> Self {
        Self::Content(value)
    }
}

impl From<RepoError> for StoreError {
    fn from(value: RepoError) -> Self {
        Self::Persist(value)
    }
}

/// How the snapshot was obtained when the store was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing was persisted yet.
    Fresh,
    Loaded,
    /// The persisted document was malformed and the store started empty.
    Recovered { reason: String },
}

/// Result of `create_link`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    Created,
    AlreadyLinked,
}

/// Read model for a single note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteView {
    pub id: NoteId,
    pub location: String,
    pub content: String,
    pub links: Vec<NoteId>,
    pub backlinks: Vec<NoteId>,
    pub tags: Vec<String>,
    /// `[[target]]` markers present in the content.
    pub markers: Vec<String>,
}

/// Authoritative graph store.
pub struct GraphStore<R = JsonFileSnapshotRepository, F = FsNoteFileStore> {
    repo: R,
    files: F,
    snapshot: GraphSnapshot,
    backlinks: BTreeMap<NoteId, BTreeSet<NoteId>>,
    load_outcome: LoadOutcome,
}

impl<R: SnapshotRepository, F: NoteFileStore> GraphStore<R, F> {
    /// Opens the store, resetting to an empty graph when the persisted
    /// document is malformed. The reset is reported via [`Self::load_outcome`].
    pub fn open(repo: R, files: F) -> StoreResult<Self> {
        let (snapshot, load_outcome) = match repo.load_raw()? {
            None => (GraphSnapshot::default(), LoadOutcome::Fresh),
            Some(raw) => match decode_snapshot(&raw) {
                Ok(snapshot) => (snapshot, LoadOutcome::Loaded),
                Err(reason) => {
                    warn!(
                        "event=snapshot_load module=store status=recovered source={} reason={}",
                        repo.describe(),
                        reason
                    );
                    (GraphSnapshot::default(), LoadOutcome::Recovered { reason })
                }
            },
        };

        info!(
            "event=snapshot_load module=store status=ok source={} notes={} tags={} logs={}",
            repo.describe(),
            snapshot.notes.len(),
            snapshot.tags.len(),
            snapshot.logs.len()
        );

        Ok(Self {
            backlinks: snapshot.backlink_index(),
            repo,
            files,
            snapshot,
            load_outcome,
        })
    }

    /// Opens the store, failing instead of resetting on a malformed document.
    pub fn open_strict(repo: R, files: F) -> StoreResult<Self> {
        let store = Self::open(repo, files)?;
        if let LoadOutcome::Recovered { reason } = &store.load_outcome {
            return Err(StoreError::MalformedPersistedState(reason.clone()));
        }
        Ok(store)
    }

    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.load_outcome
    }

    /// Current committed snapshot.
    pub fn snapshot(&self) -> &GraphSnapshot {
        &self.snapshot
    }

    pub fn files(&self) -> &F {
        &self.files
    }

    /// Creates a note with seeded content and returns its content location.
    pub fn create_note(&mut self, id: &str) -> StoreResult<String> {
        validate_note_id(id)?;
        if self.snapshot.contains_note(id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }

        let location = self.files.create(id).map_err(|err| match err {
            NoteFileError::AlreadyExists(id) => StoreError::AlreadyExists(id),
            other => StoreError::Content(other),
        })?;

        let mut next = self.snapshot.clone();
        next.notes.insert(id.to_string(), location.clone());
        if let Err(err) = self.repo.save(&next) {
            if let Err(cleanup) = self.files.delete(&location) {
                error!("event=note_create module=store status=error phase=rollback id={id} error={cleanup}");
            }
            return Err(err.into());
        }
        self.snapshot = next;

        info!("event=note_create module=store status=ok id={id}");
        Ok(location)
    }

    /// Removes a note, its links, backlinks, tag memberships and content.
    pub fn remove_note(&mut self, id: &str) -> StoreResult<()> {
        if !self.snapshot.contains_note(id) {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let location = self.note_location(id)?.to_string();
        let targets = self.snapshot.links_of(id).to_vec();
        let mut next = self.snapshot.clone();
        next.purge_note(id);

        let mut journal = ContentJournal::new(&self.files);
        let content_existed = journal.delete(&location)?;
        if let Err(err) = self.repo.save(&next) {
            journal.rollback();
            return Err(err.into());
        }
        journal.commit();

        self.snapshot = next;
        self.backlinks.remove(id);
        for target in targets {
            if let Some(sources) = self.backlinks.get_mut(&target) {
                sources.remove(id);
                if sources.is_empty() {
                    self.backlinks.remove(&target);
                }
            }
        }

        info!("event=note_remove module=store status=ok id={id} content_existed={content_existed}");
        Ok(())
    }

    /// Links two notes in both directions and appends `[[target]]` markers.
    pub fn create_link(&mut self, a: &str, b: &str) -> StoreResult<LinkOutcome> {
        for id in [a, b] {
            if !self.snapshot.contains_note(id) {
                return Err(StoreError::NotFound(id.to_string()));
            }
        }
        if a == b {
            return Err(StoreError::SelfLink(a.to_string()));
        }

        let forward_missing = !self.snapshot.has_link(a, b);
        let backward_missing = !self.snapshot.has_link(b, a);
        let mut next = self.snapshot.clone();
        if !next.insert_link(a, b) {
            return Ok(LinkOutcome::AlreadyLinked);
        }

        let (a_location, b_location) = (&self.snapshot.notes[a], &self.snapshot.notes[b]);
        let mut journal = ContentJournal::new(&self.files);
        let marked = (|| {
            if forward_missing {
                journal.append(a_location, &link_marker(b))?;
            }
            if backward_missing {
                journal.append(b_location, &link_marker(a))?;
            }
            Ok::<(), NoteFileError>(())
        })();
        if let Err(err) = marked {
            journal.rollback();
            return Err(err.into());
        }
        if let Err(err) = self.repo.save(&next) {
            journal.rollback();
            return Err(err.into());
        }
        journal.commit();

        self.snapshot = next;
        self.backlinks
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
        self.backlinks
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());

        info!("event=link_create module=store status=ok from={a} to={b}");
        Ok(LinkOutcome::Created)
    }

    /// Outgoing links of `id` in creation order.
    pub fn list_links(&self, id: &str) -> StoreResult<Vec<NoteId>> {
        self.ensure_note(id)?;
        Ok(self.snapshot.links_of(id).to_vec())
    }

    /// Notes that link to `id`, sorted. Unknown ids have no backlinks.
    pub fn list_backlinks(&self, id: &str) -> Vec<NoteId> {
        self.backlinks
            .get(id)
            .map(|sources| sources.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Tags `note`. Returns `false` when the note already carried the tag.
    pub fn add_tag(&mut self, note: &str, tag: &str) -> StoreResult<bool> {
        self.ensure_note(note)?;
        let Some(tag) = normalize_tag(tag) else {
            return Err(StoreError::InvalidTag(tag.to_string()));
        };

        let mut next = self.snapshot.clone();
        if !next.insert_tag(note, &tag) {
            return Ok(false);
        }
        self.repo.save(&next)?;
        self.snapshot = next;

        info!("event=tag_add module=store status=ok note={note} tag={tag}");
        Ok(true)
    }

    /// Tag label -> tagged notes.
    pub fn list_tags(&self) -> &BTreeMap<String, Vec<NoteId>> {
        &self.snapshot.tags
    }

    pub fn tags_for_note(&self, id: &str) -> StoreResult<Vec<String>> {
        self.ensure_note(id)?;
        Ok(self.snapshot.tags_of(id))
    }

    /// Case-insensitive substring search over note content and logs.
    pub fn search_notes(&self, query: &str) -> StoreResult<SearchResults> {
        Ok(search_snapshot(&self.snapshot, &self.files, query)?)
    }

    /// Registers content resources that are not yet notes.
    ///
    /// Returns the newly registered ids; an empty result writes nothing.
    pub fn init_from_directory(&mut self) -> StoreResult<Vec<NoteId>> {
        let mut next = self.snapshot.clone();
        let mut added = Vec::new();
        for id in self.files.list_ids()? {
            if next.contains_note(&id) {
                continue;
            }
            if let Err(err) = validate_note_id(&id) {
                warn!("event=init_scan module=store status=skip id={id} reason={err}");
                continue;
            }
            next.notes.insert(id.clone(), self.files.location(&id));
            added.push(id);
        }

        if added.is_empty() {
            return Ok(added);
        }
        self.repo.save(&next)?;
        self.snapshot = next;

        info!("event=init_scan module=store status=ok added={}", added.len());
        Ok(added)
    }

    /// Upserts a log entry; the last write for a title wins.
    pub fn log_entry(&mut self, title: &str, text: &str) -> StoreResult<()> {
        let mut next = self.snapshot.clone();
        let previous = next.upsert_log(title, text);
        if previous.as_deref() == Some(text) {
            return Ok(());
        }
        self.repo.save(&next)?;
        self.snapshot = next;

        info!(
            "event=log_entry module=store status=ok replaced={}",
            previous.is_some()
        );
        Ok(())
    }

    pub fn logs(&self) -> &BTreeMap<String, String> {
        &self.snapshot.logs
    }

    /// Note ids in sorted order.
    pub fn note_ids(&self) -> Vec<NoteId> {
        self.snapshot.notes.keys().cloned().collect()
    }

    /// Content location for `id`, e.g. to hand to an editor.
    pub fn note_location(&self, id: &str) -> StoreResult<&str> {
        self.snapshot
            .notes
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn read_note(&self, id: &str) -> StoreResult<NoteView> {
        let location = self.note_location(id)?.to_string();
        let content = self.files.read(&location)?;
        Ok(NoteView {
            id: id.to_string(),
            location,
            markers: marker_targets(&content),
            content,
            links: self.list_links(id)?,
            backlinks: self.list_backlinks(id),
            tags: self.snapshot.tags_of(id),
        })
    }

    /// Replaces the full text of an existing note.
    pub fn update_note_content(&mut self, id: &str, text: &str) -> StoreResult<()> {
        let location = self.note_location(id)?;
        self.files.overwrite(location, text)?;
        info!("event=note_update module=store status=ok id={id}");
        Ok(())
    }

    /// Reports structural problems plus notes whose content is missing.
    pub fn verify(&self) -> Vec<IntegrityIssue> {
        let mut issues = self.snapshot.structural_issues();
        issues.extend(
            self.snapshot
                .notes
                .iter()
                .filter(|(_, location)| !self.files.exists(location))
                .map(|(id, _)| IntegrityIssue::MissingContent(id.clone())),
        );
        issues
    }

    fn ensure_note(&self, id: &str) -> StoreResult<()> {
        if self.snapshot.contains_note(id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(id.to_string()))
        }
    }
}

/// Records content changes so they can be undone when persisting fails.
///
/// Entries are keyed by content location.
struct ContentJournal<'a, F: NoteFileStore + ?Sized> {
    files: &'a F,
    saved: Vec<(String, String)>,
}

impl<'a, F: NoteFileStore + ?Sized> ContentJournal<'a, F> {
    fn new(files: &'a F) -> Self {
        Self {
            files,
            saved: Vec::new(),
        }
    }

    fn append(&mut self, location: &str, text: &str) -> Result<(), NoteFileError> {
        let before = self.files.read(location)?;
        self.files.append(location, text)?;
        self.saved.push((location.to_string(), before));
        Ok(())
    }

    /// Deletes content at `location`. Missing content is a no-op (returns `false`).
    fn delete(&mut self, location: &str) -> Result<bool, NoteFileError> {
        let before = match self.files.read(location) {
            Ok(content) => content,
            Err(NoteFileError::NotFound(_)) => return Ok(false),
            Err(err) => return Err(err),
        };
        match self.files.delete(location) {
            Ok(()) | Err(NoteFileError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }
        self.saved.push((location.to_string(), before));
        Ok(true)
    }

    fn rollback(self) {
        for (location, before) in self.saved.into_iter().rev() {
            if let Err(err) = self.files.overwrite(&location, &before) {
                error!(
                    "event=content_rollback module=store status=error location={location} error={err}"
                );
            }
        }
    }

    fn commit(self) {}
}
