use sodium_core::{
    AnalyticsConfig, AnalyticsEngine, ClusterStrategy, Clusters, EigenvectorSource,
    FsNoteFileStore, GraphStore, JsonFileSnapshotRepository,
};
use tempfile::TempDir;

fn open_store(dir: &TempDir) -> GraphStore {
    let files = FsNoteFileStore::open(dir.path().join("notes")).unwrap();
    GraphStore::open(
        JsonFileSnapshotRepository::new(dir.path().join("graph.json")),
        files,
    )
    .unwrap()
}

fn store_with_links(dir: &TempDir, ids: &[&str], links: &[(&str, &str)]) -> GraphStore {
    let mut store = open_store(dir);
    for id in ids {
        store.create_note(id).unwrap();
    }
    for (a, b) in links {
        store.create_link(a, b).unwrap();
    }
    store
}

#[test]
fn cooccurrence_counts_shared_tags_symmetrically() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_with_links(&dir, &["A", "B", "C"], &[]);
    store.add_tag("A", "x").unwrap();
    store.add_tag("B", "x").unwrap();
    store.add_tag("B", "y").unwrap();
    store.add_tag("C", "y").unwrap();

    let matrix = AnalyticsEngine::default().tag_cooccurrence(store.snapshot());

    assert_eq!(matrix["A"]["B"], 1);
    assert_eq!(matrix["B"]["A"], 1);
    assert_eq!(matrix["B"]["C"], 1);
    assert_eq!(matrix["C"]["B"], 1);
    assert!(!matrix["A"].contains_key("C"));
    assert!(!matrix["C"].contains_key("A"));
    for (note, related) in &matrix {
        assert!(!related.contains_key(note));
        for (other, count) in related {
            assert_eq!(matrix[other][note], *count);
        }
    }
}

#[test]
fn degree_centrality_on_path() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_links(&dir, &["A", "B", "C"], &[("A", "B"), ("B", "C")]);

    let degree = AnalyticsEngine::default().degree_centrality(store.snapshot());

    assert_eq!(degree["A"], 0.5);
    assert_eq!(degree["B"], 1.0);
    assert_eq!(degree["C"], 0.5);
}

#[test]
fn betweenness_and_eigenvector_rank_hub_highest() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_links(
        &dir,
        &["hub", "a", "b", "c"],
        &[("hub", "a"), ("hub", "b"), ("hub", "c")],
    );
    let engine = AnalyticsEngine::default();

    let betweenness = engine.betweenness_centrality(store.snapshot());
    assert!((betweenness["hub"] - 1.0).abs() < 1e-9);
    assert_eq!(betweenness["a"], 0.0);

    let eigenvector = engine.eigenvector_centrality(store.snapshot()).unwrap();
    assert!(eigenvector["hub"] > eigenvector["a"]);
    assert!((eigenvector["a"] - eigenvector["c"]).abs() < 1e-9);
}

#[test]
fn clusters_follow_link_structure() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_links(
        &dir,
        &["a1", "a2", "a3", "b1", "b2", "b3", "lonely"],
        &[
            ("a1", "a2"),
            ("a2", "a3"),
            ("a3", "a1"),
            ("b1", "b2"),
            ("b2", "b3"),
            ("b3", "b1"),
            ("a3", "b1"),
        ],
    );

    let Clusters::Partition {
        communities,
        modularity,
    } = AnalyticsEngine::default().detect_clusters(store.snapshot())
    else {
        panic!("expected a modularity partition");
    };
    assert!(modularity > 0.0);
    assert_eq!(communities["a1"], communities["a2"]);
    assert_eq!(communities["a1"], communities["a3"]);
    assert_eq!(communities["b1"], communities["b3"]);
    assert_ne!(communities["a1"], communities["b1"]);
    assert_ne!(communities["lonely"], communities["a1"]);
    assert_ne!(communities["lonely"], communities["b1"]);

    let components = AnalyticsEngine::new(AnalyticsConfig {
        cluster_strategy: ClusterStrategy::ConnectedComponents,
        ..AnalyticsConfig::default()
    })
    .detect_clusters(store.snapshot());
    let Clusters::Components(groups) = components else {
        panic!("expected connected components");
    };
    assert_eq!(groups.len(), 2);
    assert_eq!(groups.iter().map(|group| group.len()).sum::<usize>(), 7);
}

#[test]
fn analyze_reports_counts_and_falls_back_on_non_convergence() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = store_with_links(&dir, &["A", "B", "C"], &[("A", "B"), ("B", "C")]);
    store.add_tag("A", "x").unwrap();
    store.add_tag("C", "x").unwrap();

    let report = AnalyticsEngine::default().analyze(store.snapshot());
    assert_eq!(report.node_count, 3);
    assert_eq!(report.edge_count, 2);
    assert_eq!(
        report.centrality.eigenvector_source,
        EigenvectorSource::PowerIteration
    );
    assert_eq!(report.cooccurrence["A"]["C"], 1);

    let strict = AnalyticsEngine::new(AnalyticsConfig {
        max_iterations: 1,
        ..AnalyticsConfig::default()
    });
    assert!(strict.eigenvector_centrality(store.snapshot()).is_err());
    let report = strict.analyze(store.snapshot());
    assert_eq!(
        report.centrality.eigenvector_source,
        EigenvectorSource::DegreeFallback
    );
    assert_eq!(report.centrality.eigenvector, report.centrality.degree);
}

#[test]
fn analytics_on_empty_graph_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);

    let report = AnalyticsEngine::default().analyze(store.snapshot());
    assert_eq!(report.node_count, 0);
    assert!(report.centrality.degree.is_empty());
    assert!(report.cooccurrence.is_empty());
}
