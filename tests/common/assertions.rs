//! Custom test assertions for integration tests

use amass_dl::{Event, Outcome, RunReport};
use std::path::Path;
use tokio::sync::broadcast;

/// Drain every event currently buffered in `events`
pub fn drain_events(events: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    received
}

/// Assert the datasets and outcomes of a report, in order
pub fn assert_outcomes(report: &RunReport, expected: &[(&str, Outcome)]) {
    let actual: Vec<(&str, Outcome)> = report
        .results
        .iter()
        .map(|r| (r.task.dataset.as_str(), r.outcome))
        .collect();
    assert_eq!(actual, expected, "unexpected outcomes: {:#?}", report.results);
}

/// Number of regular files below `dir`
pub fn count_files(dir: &Path) -> usize {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .count()
}

/// Files ending in `.part` directly inside `dir`
pub fn partial_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".part"))
        .collect();
    names.sort();
    names
}
