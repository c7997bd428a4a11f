//! Cluster detection: Louvain modularity partitions or connected components.
//!
//! # Invariants
//! - Callers always receive a tagged [`Clusters`] value and must handle both
//!   shapes.
//! - Community ids are dense, numbered in order of the first (sorted) note
//!   that belongs to them.
//! - Node visiting order is the sorted note order, so partitions are
//!   reproducible.

use crate::analytics::graph::LinkGraph;
use crate::model::note::NoteId;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Minimum gain that justifies moving a node between communities.
const MIN_GAIN: f64 = 1.0e-12;

/// Requested clustering algorithm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClusterStrategy {
    /// Louvain modularity optimisation; falls back to components when the
    /// graph has no edges.
    #[default]
    Modularity,
    ConnectedComponents,
}

/// Cluster detection output.
#[derive(Debug, Clone, PartialEq)]
pub enum Clusters {
    /// Note -> community id, with the partition's modularity.
    Partition {
        communities: BTreeMap<NoteId, usize>,
        modularity: f64,
    },
    /// Connected components ordered by their smallest note id.
    Components(Vec<BTreeSet<NoteId>>),
}

/// Detects clusters with `strategy`.
pub fn detect_clusters(graph: &LinkGraph, strategy: ClusterStrategy) -> Clusters {
    match strategy {
        ClusterStrategy::Modularity if graph.edge_count() > 0 => louvain(graph),
        _ => Clusters::Components(connected_components(graph)),
    }
}

/// Connected components, each as a set of note ids.
pub fn connected_components(graph: &LinkGraph) -> Vec<BTreeSet<NoteId>> {
    let n = graph.node_count();
    let mut seen = vec![false; n];
    let mut components = Vec::new();

    for start in 0..n {
        if seen[start] {
            continue;
        }
        seen[start] = true;
        let mut component = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            component.insert(graph.name(node).to_string());
            for neighbor in graph.neighbors(node) {
                if !seen[neighbor] {
                    seen[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }
        components.push(component);
    }

    components
}

/// Modularity of `assignment` (node index -> community) on `graph`.
pub fn modularity(graph: &LinkGraph, assignment: &[usize]) -> f64 {
    WeightedGraph::from_link_graph(graph).modularity(assignment)
}

fn louvain(graph: &LinkGraph) -> Clusters {
    let n = graph.node_count();
    let base = WeightedGraph::from_link_graph(graph);

    // membership[node] tracks each original node's community across levels.
    let mut membership: Vec<usize> = (0..n).collect();
    let mut level = base.clone();
    loop {
        let (assignment, moved) = level.one_level();
        if !moved {
            break;
        }
        let (renumbered, count) = renumber(&assignment);
        for community in &mut membership {
            *community = renumbered[*community];
        }
        if count == level.node_count() {
            break;
        }
        level = level.aggregate(&renumbered, count);
    }

    let (membership, _) = renumber(&membership);
    let modularity = base.modularity(&membership);
    let communities = (0..n)
        .map(|node| (graph.name(node).to_string(), membership[node]))
        .collect();

    Clusters::Partition {
        communities,
        modularity,
    }
}

/// Maps arbitrary community labels to `0..count` in first-seen order.
fn renumber(assignment: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping = BTreeMap::new();
    let renumbered = assignment
        .iter()
        .map(|label| {
            let next = mapping.len();
            *mapping.entry(*label).or_insert(next)
        })
        .collect();
    (renumbered, mapping.len())
}

/// Weighted undirected graph; self loops are stored once at `adj[i][i]`.
#[derive(Debug, Clone)]
struct WeightedGraph {
    adj: Vec<BTreeMap<usize, f64>>,
}

impl WeightedGraph {
    fn from_link_graph(graph: &LinkGraph) -> Self {
        let adj = (0..graph.node_count())
            .map(|node| graph.neighbors(node).map(|other| (other, 1.0)).collect())
            .collect();
        Self { adj }
    }

    fn node_count(&self) -> usize {
        self.adj.len()
    }

    /// Weighted degree; a self loop counts twice.
    fn degree(&self, node: usize) -> f64 {
        self.adj[node]
            .iter()
            .map(|(&other, &weight)| if other == node { 2.0 * weight } else { weight })
            .sum()
    }

    /// Twice the total edge weight.
    fn total_degree(&self) -> f64 {
        (0..self.node_count()).map(|node| self.degree(node)).sum()
    }

    fn modularity(&self, assignment: &[usize]) -> f64 {
        let two_m = self.total_degree();
        if two_m == 0.0 {
            return 0.0;
        }

        let mut internal: BTreeMap<usize, f64> = BTreeMap::new();
        let mut totals: BTreeMap<usize, f64> = BTreeMap::new();
        for node in 0..self.node_count() {
            let community = assignment[node];
            *totals.entry(community).or_default() += self.degree(node);
            for (&other, &weight) in &self.adj[node] {
                if assignment[other] == community {
                    // Edges between distinct nodes are seen from both ends.
                    let share = if other == node { 2.0 * weight } else { weight };
                    *internal.entry(community).or_default() += share;
                }
            }
        }

        totals
            .iter()
            .map(|(community, total)| {
                let inside = internal.get(community).copied().unwrap_or(0.0);
                inside / two_m - (total / two_m).powi(2)
            })
            .sum()
    }

    /// Local moving phase. Returns node -> community and whether any node moved.
    fn one_level(&self) -> (Vec<usize>, bool) {
        let n = self.node_count();
        let two_m = self.total_degree();
        let degrees: Vec<f64> = (0..n).map(|node| self.degree(node)).collect();
        let mut community: Vec<usize> = (0..n).collect();
        let mut totals = degrees.clone();
        let mut moved_any = false;

        loop {
            let mut moved = false;
            for node in 0..n {
                let current = community[node];
                let k_i = degrees[node];
                totals[current] -= k_i;

                let mut links_to: BTreeMap<usize, f64> = BTreeMap::new();
                for (&other, &weight) in &self.adj[node] {
                    if other != node {
                        *links_to.entry(community[other]).or_default() += weight;
                    }
                }

                let gain = |target: usize, weight: f64| weight - totals[target] * k_i / two_m;
                let mut best = current;
                let mut best_gain = gain(current, links_to.get(&current).copied().unwrap_or(0.0));
                for (&target, &weight) in &links_to {
                    let candidate = gain(target, weight);
                    if candidate > best_gain + MIN_GAIN {
                        best = target;
                        best_gain = candidate;
                    }
                }

                totals[best] += k_i;
                if best != current {
                    community[node] = best;
                    moved = true;
                    moved_any = true;
                }
            }
            if !moved {
                break;
            }
        }

        (community, moved_any)
    }

    /// Collapses each community into one node.
    fn aggregate(&self, assignment: &[usize], count: usize) -> Self {
        let mut adj: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); count];
        for node in 0..self.node_count() {
            let from = assignment[node];
            for (&other, &weight) in &self.adj[node] {
                if other < node {
                    continue;
                }
                let to = assignment[other];
                *adj[from].entry(to).or_default() += weight;
                if from != to {
                    *adj[to].entry(from).or_default() += weight;
                }
            }
        }
        Self { adj }
    }
}
