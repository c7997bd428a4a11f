//! Note content resources.
//!
//! # Responsibility
//! - Own the mapping from note id to content location.
//! - Create, append to, read, overwrite and delete note text.
//! - Parse wiki-style `[[target]]` markers out of note text.
//!
//! # Invariants
//! - Content for one id lives at exactly one location.
//! - `create` never overwrites existing content.

pub mod markers;
pub mod note_files;
