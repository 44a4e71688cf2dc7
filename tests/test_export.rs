//! Tests for flat-file export

use salescope::config::CleaningConfig;
use salescope::pipeline::{run_pipeline, Summaries};
use salescope::report::{export_all, RunSummary, MANIFEST_FILE};

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_manifest_records_tables_and_counts() {
    let (dir, path) = scenario_csv();
    let config = CleaningConfig::default();
    let cleaned = run_pipeline(&path, 100, &config.missing).unwrap();
    let summaries = Summaries::compute(&cleaned.frame, config.top_n, config.histogram_bins).unwrap();
    let out = dir.path().join("out");

    let written = export_all(&cleaned, &summaries, &config, &path, &out).unwrap();

    assert_eq!(written.len(), 10);
    assert!(written.last().unwrap().ends_with(MANIFEST_FILE));

    let text = std::fs::read_to_string(out.join(MANIFEST_FILE)).unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(manifest["input_rows"], 3);
    assert_eq!(manifest["cleaned_rows"], 3);
    assert_eq!(manifest["invalid_records"], 0);
    assert_eq!(manifest["metadata"]["config"]["missing"]["sentinel"], "Unknown");

    let tables = manifest["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 7);
    let centroids = tables
        .iter()
        .find(|t| t["name"] == "town_centroids")
        .unwrap();
    assert_eq!(centroids["ignored_rows"], 1);
    assert_eq!(centroids["columns"][0], "town");
}

#[test]
fn test_cleaned_csv_has_derived_columns() {
    let (dir, path) = scenario_csv();
    let config = CleaningConfig::default();
    let cleaned = run_pipeline(&path, 100, &config.missing).unwrap();
    let summaries = Summaries::compute(&cleaned.frame, config.top_n, config.histogram_bins).unwrap();
    let out = dir.path().join("out");

    export_all(&cleaned, &summaries, &config, &path, &out).unwrap();

    let text = std::fs::read_to_string(out.join("cleaned.csv")).unwrap();
    let header = text.lines().next().unwrap();
    for column in ["price_per_1k_assessed", "log_sale_amount", "latitude", "longitude"] {
        assert!(header.contains(column), "header lacks {}: {}", column, header);
    }
    assert_eq!(text.lines().count(), 4);
}

#[test]
fn test_run_summary_counts() {
    let (_dir, path) = scenario_csv();
    let config = CleaningConfig::default();
    let cleaned = run_pipeline(&path, 100, &config.missing).unwrap();
    let summaries = Summaries::compute(&cleaned.frame, config.top_n, config.histogram_bins).unwrap();

    let mut summary = RunSummary::new(&cleaned);
    summary.add_reductions(&summaries);

    assert_eq!(summary.input_rows, 3);
    assert_eq!(summary.output_rows, 3);
    assert_eq!(summary.dropped_columns.len(), 2);
    // residential_type: 1, non_use_code: 2
    assert_eq!(summary.filled_cells, 3);
    assert_eq!(summary.ignored_rows.len(), 7);
}
