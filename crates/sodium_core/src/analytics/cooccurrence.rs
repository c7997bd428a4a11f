//! Shared-tag overlap between notes.
//!
//! # Invariants
//! - The result is symmetric: `m[a][b] == m[b][a]`.
//! - Only pairs sharing at least one tag appear; a note is never related to
//!   itself.
//! - A note listed twice under one tag counts once.

use crate::model::note::NoteId;
use crate::model::snapshot::GraphSnapshot;
use std::collections::{BTreeMap, BTreeSet};

/// Note -> related note -> number of shared tags.
pub type Cooccurrence = BTreeMap<NoteId, BTreeMap<NoteId, usize>>;

/// Counts shared tags for every note pair, walking each tag's member list
/// instead of intersecting every pair of notes.
pub fn tag_cooccurrence(snapshot: &GraphSnapshot) -> Cooccurrence {
    let mut pair_counts: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for members in snapshot.tags.values() {
        let distinct: BTreeSet<&str> = members.iter().map(String::as_str).collect();
        let distinct: Vec<&str> = distinct.into_iter().collect();
        for (position, first) in distinct.iter().enumerate() {
            for second in &distinct[position + 1..] {
                *pair_counts.entry((*first, *second)).or_default() += 1;
            }
        }
    }

    let mut cooccurrence = Cooccurrence::new();
    for ((first, second), count) in pair_counts {
        cooccurrence
            .entry(first.to_string())
            .or_default()
            .insert(second.to_string(), count);
        cooccurrence
            .entry(second.to_string())
            .or_default()
            .insert(first.to_string(), count);
    }
    cooccurrence
}
