//! Analytics entry point over store snapshots.

use crate::analytics::centrality::{
    betweenness_centrality, centrality, degree_centrality, eigenvector_centrality,
    AnalyticsError, CentralityReport, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE,
};
use crate::analytics::clusters::{detect_clusters, ClusterStrategy, Clusters};
use crate::analytics::cooccurrence::{tag_cooccurrence, Cooccurrence};
use crate::analytics::graph::{LinkGraph, Scores};
use crate::model::snapshot::GraphSnapshot;
use log::info;
use std::time::Instant;

/// Tunables for analytics runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticsConfig {
    /// Power-iteration cap for eigenvector centrality.
    pub max_iterations: usize,
    /// Per-node convergence tolerance for eigenvector centrality.
    pub tolerance: f64,
    pub cluster_strategy: ClusterStrategy,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            cluster_strategy: ClusterStrategy::default(),
        }
    }
}

/// Everything the analytics engine derives from one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub node_count: usize,
    pub edge_count: usize,
    pub centrality: CentralityReport,
    pub clusters: Clusters,
    pub cooccurrence: Cooccurrence,
}

/// Stateless analytics over snapshots; nothing is cached between calls.
#[derive(Debug, Clone, Default)]
pub struct AnalyticsEngine {
    config: AnalyticsConfig,
}

impl AnalyticsEngine {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    pub fn degree_centrality(&self, snapshot: &GraphSnapshot) -> Scores {
        degree_centrality(&LinkGraph::from_snapshot(snapshot))
    }

    pub fn betweenness_centrality(&self, snapshot: &GraphSnapshot) -> Scores {
        betweenness_centrality(&LinkGraph::from_snapshot(snapshot))
    }

    pub fn eigenvector_centrality(
        &self,
        snapshot: &GraphSnapshot,
    ) -> Result<Scores, AnalyticsError> {
        eigenvector_centrality(
            &LinkGraph::from_snapshot(snapshot),
            self.config.max_iterations,
            self.config.tolerance,
        )
    }

    /// All three centrality measures, with the degree fallback applied.
    pub fn centrality(&self, snapshot: &GraphSnapshot) -> CentralityReport {
        centrality(
            &LinkGraph::from_snapshot(snapshot),
            self.config.max_iterations,
            self.config.tolerance,
        )
    }

    pub fn detect_clusters(&self, snapshot: &GraphSnapshot) -> Clusters {
        detect_clusters(
            &LinkGraph::from_snapshot(snapshot),
            self.config.cluster_strategy,
        )
    }

    pub fn tag_cooccurrence(&self, snapshot: &GraphSnapshot) -> Cooccurrence {
        tag_cooccurrence(snapshot)
    }

    /// Runs every analysis against one graph projection.
    pub fn analyze(&self, snapshot: &GraphSnapshot) -> AnalysisReport {
        let started_at = Instant::now();
        let graph = LinkGraph::from_snapshot(snapshot);
        let report = AnalysisReport {
            node_count: graph.node_count(),
            edge_count: graph.edge_count(),
            centrality: centrality(&graph, self.config.max_iterations, self.config.tolerance),
            clusters: detect_clusters(&graph, self.config.cluster_strategy),
            cooccurrence: tag_cooccurrence(snapshot),
        };

        info!(
            "event=analyze module=analytics status=ok nodes={} edges={} duration_ms={}",
            report.node_count,
            report.edge_count,
            started_at.elapsed().as_millis()
        );
        report
    }
}
