//! Undirected simple graph projected from a snapshot.

use crate::model::note::NoteId;
use crate::model::snapshot::GraphSnapshot;
use std::collections::{BTreeMap, BTreeSet};

/// Score per note.
pub type Scores = BTreeMap<NoteId, f64>;

/// Note graph with dense indices assigned in sorted id order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkGraph {
    names: Vec<NoteId>,
    adjacency: Vec<BTreeSet<usize>>,
}

impl LinkGraph {
    /// Builds the graph from every note plus every link endpoint.
    ///
    /// Duplicate adjacency entries collapse into one edge and self loops are
    /// dropped.
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Self {
        let mut names: BTreeSet<&str> = snapshot.notes.keys().map(String::as_str).collect();
        for (source, targets) in &snapshot.links {
            names.insert(source.as_str());
            names.extend(targets.iter().map(String::as_str));
        }

        let index: BTreeMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(position, name)| (*name, position))
            .collect();
        let mut adjacency = vec![BTreeSet::new(); names.len()];
        for (source, targets) in &snapshot.links {
            let from = index[source.as_str()];
            for target in targets {
                let to = index[target.as_str()];
                if from != to {
                    adjacency[from].insert(to);
                    adjacency[to].insert(from);
                }
            }
        }

        Self {
            names: names.into_iter().map(str::to_string).collect(),
            adjacency,
        }
    }

    /// Builds a graph from explicit edges; used by callers without a snapshot.
    pub fn from_edges<'a>(edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut snapshot = GraphSnapshot::default();
        for (a, b) in edges {
            snapshot.notes.entry(a.to_string()).or_default();
            snapshot.notes.entry(b.to_string()).or_default();
            if a != b {
                snapshot.insert_link(a, b);
            }
        }
        Self::from_snapshot(&snapshot)
    }

    pub fn node_count(&self) -> usize {
        self.names.len()
    }

    /// Number of undirected edges.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(BTreeSet::len).sum::<usize>() / 2
    }

    pub fn name(&self, node: usize) -> &str {
        &self.names[node]
    }

    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[node].iter().copied()
    }

    pub fn degree(&self, node: usize) -> usize {
        self.adjacency[node].len()
    }

    /// Pairs each node name with `values[node]`.
    pub(crate) fn scores_from(&self, values: &[f64]) -> Scores {
        self.names
            .iter()
            .cloned()
            .zip(values.iter().copied())
            .collect()
    }
}
