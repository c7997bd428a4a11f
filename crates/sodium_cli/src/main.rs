//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `sodium_core` linkage and configuration resolution.
//! - Print a one-screen summary of the configured graph.
//!
//! Argument parsing and editor launching belong to the full front end.

use sodium_core::{init_logging, AnalyticsEngine, LoadOutcome, SodiumConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let config = SodiumConfig::from_env();

    if let Some(log_dir) = config.log_dir.as_ref() {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("sodium_core ping={}", sodium_core::ping());
    println!("sodium_core version={}", sodium_core::core_version());
    println!("graph_file={}", config.graph_file.display());
    println!("notes_dir={}", config.notes_dir.display());

    let store = match config.open_store() {
        Ok(store) => store,
        Err(err) => {
            log::error!("event=cli_open module=cli status=error error={err}");
            eprintln!("failed to open graph: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let LoadOutcome::Recovered { reason } = store.load_outcome() {
        eprintln!("warning: graph file was malformed and has been reset in memory: {reason}");
    }

    let report = AnalyticsEngine::default().analyze(store.snapshot());
    println!(
        "nodes={} links={} tags={} logs={}",
        report.node_count,
        report.edge_count,
        store.list_tags().len(),
        store.logs().len()
    );

    let issues = store.verify();
    if !issues.is_empty() {
        println!("integrity_issues={}", issues.len());
        for issue in issues {
            println!("  {issue:?}");
        }
    }

    ExitCode::SUCCESS
}
