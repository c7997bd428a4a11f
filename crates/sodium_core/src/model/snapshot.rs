//! Persisted graph snapshot.
//!
//! # Responsibility
//! - Mirror the on-disk JSON document (`notes`, `links`, `tags`, `logs`).
//! - Provide the pure mutations used by the graph store.
//!
//! # Invariants
//! - Missing top-level keys decode as empty maps.
//! - Older layouts still decode: a note may be recorded as `{"path": ...}`
//!   and a log body as a list of lines (joined with `\n`).
//! - `insert_link` always writes both adjacency directions.
//! - `purge_note` leaves no reference to the removed id anywhere.

use crate::model::note::NoteId;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Full graph state persisted as one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    /// Note id -> content location (file path).
    #[serde(default, deserialize_with = "deserialize_notes")]
    pub notes: BTreeMap<NoteId, String>,
    /// Note id -> linked note ids, in link creation order.
    #[serde(default)]
    pub links: BTreeMap<NoteId, Vec<NoteId>>,
    /// Tag label -> tagged note ids, in tagging order.
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<NoteId>>,
    /// Log title -> log body.
    #[serde(default, deserialize_with = "deserialize_logs")]
    pub logs: BTreeMap<String, String>,
}

/// Accepted encodings of a note entry.
#[derive(Deserialize)]
#[serde(untagged)]
enum NoteEntry {
    Path(String),
    Record { path: String },
}

/// Accepted encodings of a log body.
#[derive(Deserialize)]
#[serde(untagged)]
enum LogBody {
    Text(String),
    Lines(Vec<String>),
}

fn deserialize_notes<'de, D>(deserializer: D) -> Result<BTreeMap<NoteId, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = BTreeMap::<NoteId, NoteEntry>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|(id, entry)| match entry {
            NoteEntry::Path(path) | NoteEntry::Record { path } => (id, path),
        })
        .collect())
}

fn deserialize_logs<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = BTreeMap::<String, LogBody>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .map(|(title, body)| match body {
            LogBody::Text(text) => (title, text),
            LogBody::Lines(lines) => (title, lines.join("\n")),
        })
        .collect())
}

/// Structural problem found in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum IntegrityIssue {
    /// `from -> to` exists without `to -> from`.
    AsymmetricLink { from: NoteId, to: NoteId },
    /// Adjacency entry references an unknown note.
    DanglingLink { from: NoteId, to: NoteId },
    /// Same adjacency entry stored more than once.
    DuplicateLink { from: NoteId, to: NoteId },
    /// Tag lists an unknown note.
    DanglingTagMember { tag: String, note: NoteId },
    /// Tag lists the same note more than once.
    DuplicateTagMember { tag: String, note: NoteId },
    /// Tag with no notes.
    EmptyTag(String),
    /// Registered note whose content resource is gone.
    MissingContent(NoteId),
}

impl GraphSnapshot {
    pub fn contains_note(&self, id: &str) -> bool {
        self.notes.contains_key(id)
    }

    /// Returns outgoing links for `id` (empty when none recorded).
    pub fn links_of(&self, id: &str) -> &[NoteId] {
        self.links.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_link(&self, from: &str, to: &str) -> bool {
        self.links_of(from).iter().any(|target| target == to)
    }

    /// Tags attached to `id`, sorted by label.
    pub fn tags_of(&self, id: &str) -> Vec<String> {
        self.tags
            .iter()
            .filter(|(_, notes)| notes.iter().any(|note| note == id))
            .map(|(tag, _)| tag.clone())
            .collect()
    }

    /// Records both adjacency entries. Returns `false` when already linked.
    pub fn insert_link(&mut self, a: &str, b: &str) -> bool {
        let forward = self.has_link(a, b);
        let backward = self.has_link(b, a);
        if forward && backward {
            return false;
        }
        if !forward {
            self.links.entry(a.to_string()).or_default().push(b.to_string());
        }
        if !backward {
            self.links.entry(b.to_string()).or_default().push(a.to_string());
        }
        true
    }

    /// Adds `note` to `tag`. Returns `false` when the note already carries it.
    pub fn insert_tag(&mut self, note: &str, tag: &str) -> bool {
        let members = self.tags.entry(tag.to_string()).or_default();
        if members.iter().any(|member| member == note) {
            return false;
        }
        members.push(note.to_string());
        true
    }

    /// Upserts a log entry. Returns the previous body, if any.
    pub fn upsert_log(&mut self, title: &str, text: &str) -> Option<String> {
        self.logs.insert(title.to_string(), text.to_string())
    }

    /// Removes `id` together with every link, backlink and tag membership.
    ///
    /// Tags left without members are dropped. Returns the content location
    /// of the removed note.
    pub fn purge_note(&mut self, id: &str) -> Option<String> {
        let location = self.notes.remove(id)?;

        self.links.remove(id);
        for targets in self.links.values_mut() {
            targets.retain(|target| target != id);
        }
        self.links.retain(|_, targets| !targets.is_empty());

        for members in self.tags.values_mut() {
            members.retain(|member| member != id);
        }
        self.tags.retain(|_, members| !members.is_empty());

        Some(location)
    }

    /// Reverse adjacency: target -> set of sources pointing at it.
    pub fn backlink_index(&self) -> BTreeMap<NoteId, BTreeSet<NoteId>> {
        let mut index: BTreeMap<NoteId, BTreeSet<NoteId>> = BTreeMap::new();
        for (source, targets) in &self.links {
            for target in targets {
                index
                    .entry(target.clone())
                    .or_default()
                    .insert(source.clone());
            }
        }
        index
    }

    /// Reports structural problems without modifying the snapshot.
    pub fn structural_issues(&self) -> Vec<IntegrityIssue> {
        let mut issues = BTreeSet::new();

        for (from, targets) in &self.links {
            let mut seen = BTreeSet::new();
            for to in targets {
                if !seen.insert(to) {
                    issues.insert(IntegrityIssue::DuplicateLink {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
                if !self.contains_note(from) || !self.contains_note(to) {
                    issues.insert(IntegrityIssue::DanglingLink {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
                if !self.has_link(to, from) {
                    issues.insert(IntegrityIssue::AsymmetricLink {
                        from: from.clone(),
                        to: to.clone(),
                    });
                }
            }
        }

        for (tag, members) in &self.tags {
            if members.is_empty() {
                issues.insert(IntegrityIssue::EmptyTag(tag.clone()));
            }
            let mut seen = BTreeSet::new();
            for note in members {
                if !seen.insert(note) {
                    issues.insert(IntegrityIssue::DuplicateTagMember {
                        tag: tag.clone(),
                        note: note.clone(),
                    });
                }
                if !self.contains_note(note) {
                    issues.insert(IntegrityIssue::DanglingTagMember {
                        tag: tag.clone(),
                        note: note.clone(),
                    });
                }
            }
        }

        issues.into_iter().collect()
    }
}
