//! Centrality measures.
//!
//! # Invariants
//! - Degree scores are `degree / (n - 1)`; a single-node graph scores 0.
//! - Betweenness is normalized by `1 / ((n - 1)(n - 2))` and is 0 for
//!   graphs with fewer than three nodes.
//! - Eigenvector iteration is capped; exceeding the cap is an error the
//!   caller can recover from.

use crate::analytics::graph::{LinkGraph, Scores};
use log::warn;
use std::collections::VecDeque;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default power-iteration cap.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;
/// Default per-node convergence tolerance.
pub const DEFAULT_TOLERANCE: f64 = 1.0e-6;

/// Analytics failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    /// Power iteration did not converge within `iterations` rounds.
    NonConvergence { iterations: usize },
}

impl Display for AnalyticsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonConvergence { iterations } => write!(
                f,
                "eigenvector centrality did not converge within {iterations} iterations"
            ),
        }
    }
}

impl Error for AnalyticsError {}

/// Where the eigenvector column of a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EigenvectorSource {
    PowerIteration,
    /// Power iteration failed to converge; degree scores were used.
    DegreeFallback,
}

/// All centrality measures for one graph.
#[derive(Debug, Clone, PartialEq)]
pub struct CentralityReport {
    pub degree: Scores,
    pub betweenness: Scores,
    pub eigenvector: Scores,
    pub eigenvector_source: EigenvectorSource,
}

/// Normalized degree centrality.
pub fn degree_centrality(graph: &LinkGraph) -> Scores {
    let n = graph.node_count();
    let scale = if n > 1 { 1.0 / (n - 1) as f64 } else { 0.0 };
    let values: Vec<f64> = (0..n)
        .map(|node| graph.degree(node) as f64 * scale)
        .collect();
    graph.scores_from(&values)
}

/// Shortest-path betweenness (Brandes) over the undirected graph.
pub fn betweenness_centrality(graph: &LinkGraph) -> Scores {
    let n = graph.node_count();
    let mut betweenness = vec![0.0_f64; n];

    for source in 0..n {
        let mut order = Vec::with_capacity(n);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut path_counts = vec![0.0_f64; n];
        let mut distance: Vec<Option<usize>> = vec![None; n];
        path_counts[source] = 1.0;
        distance[source] = Some(0);

        let mut queue = VecDeque::from([source]);
        while let Some(node) = queue.pop_front() {
            order.push(node);
            let next_distance = distance[node].map_or(0, |d| d + 1);
            for neighbor in graph.neighbors(node) {
                if distance[neighbor].is_none() {
                    distance[neighbor] = Some(next_distance);
                    queue.push_back(neighbor);
                }
                if distance[neighbor] == Some(next_distance) {
                    path_counts[neighbor] += path_counts[node];
                    predecessors[neighbor].push(node);
                }
            }
        }

        let mut dependency = vec![0.0_f64; n];
        while let Some(node) = order.pop() {
            for &predecessor in &predecessors[node] {
                dependency[predecessor] +=
                    path_counts[predecessor] / path_counts[node] * (1.0 + dependency[node]);
            }
            if node != source {
                betweenness[node] += dependency[node];
            }
        }
    }

    // Each undirected pair is visited from both ends, which the normalization
    // factor already accounts for.
    let scale = if n > 2 {
        1.0 / ((n - 1) * (n - 2)) as f64
    } else {
        0.0
    };
    for value in &mut betweenness {
        *value *= scale;
    }
    graph.scores_from(&betweenness)
}

/// Power-iteration eigenvector centrality on `A + I`, L2-normalized.
///
/// # Errors
/// - [`AnalyticsError::NonConvergence`] when the summed absolute change is
///   still above `n * tolerance` after `max_iterations` rounds.
pub fn eigenvector_centrality(
    graph: &LinkGraph,
    max_iterations: usize,
    tolerance: f64,
) -> Result<Scores, AnalyticsError> {
    let n = graph.node_count();
    if n == 0 {
        return Ok(Scores::new());
    }

    let mut current = vec![1.0 / n as f64; n];
    for _ in 0..max_iterations {
        let previous = current.clone();
        for node in 0..n {
            for neighbor in graph.neighbors(node) {
                current[neighbor] += previous[node];
            }
        }

        let norm = current.iter().map(|value| value * value).sum::<f64>().sqrt();
        let norm = if norm == 0.0 { 1.0 } else { norm };
        for value in &mut current {
            *value /= norm;
        }

        let change: f64 = current
            .iter()
            .zip(&previous)
            .map(|(now, before)| (now - before).abs())
            .sum();
        if change < n as f64 * tolerance {
            return Ok(graph.scores_from(&current));
        }
    }

    Err(AnalyticsError::NonConvergence {
        iterations: max_iterations,
    })
}

/// Computes all measures, substituting degree scores when eigenvector
/// iteration does not converge.
pub fn centrality(graph: &LinkGraph, max_iterations: usize, tolerance: f64) -> CentralityReport {
    let degree = degree_centrality(graph);
    let betweenness = betweenness_centrality(graph);
    let (eigenvector, eigenvector_source) =
        match eigenvector_centrality(graph, max_iterations, tolerance) {
            Ok(scores) => (scores, EigenvectorSource::PowerIteration),
            Err(err) => {
                warn!(
                    "event=centrality module=analytics status=fallback metric=eigenvector error={err}"
                );
                (degree.clone(), EigenvectorSource::DegreeFallback)
            }
        };

    CentralityReport {
        degree,
        betweenness,
        eigenvector,
        eigenvector_source,
    }
}
