//! End-to-end cleaning: schema check, normalization, missing-data
//! resolution and feature derivation, in that order.

use polars::prelude::*;
use std::path::Path;
use tracing::{info, warn};

use super::error::{IssueKind, IssueLog, PipelineResult};
use super::features::derive_features;
use super::loader::load_dataset;
use super::missing::{resolve_missing, MissingConfig};
use super::normalize::normalize_types;
use super::schema::{canonicalize_columns, validate_schema};

/// Number of individual issues logged at warn level before switching to a count
const WARN_SAMPLE: usize = 5;

/// An analysis-ready table and everything observed while producing it
#[derive(Debug, Clone)]
pub struct CleanedDataset {
    pub frame: DataFrame,
    pub input_rows: usize,
    pub missing_ratios: Vec<(String, f64)>,
    pub dropped_columns: Vec<String>,
    pub filled_counts: Vec<(String, usize)>,
    pub issues: IssueLog,
}

/// Run every cleaning stage over a raw table.
///
/// Each stage takes the previous stage's table by reference and returns a
/// new one. Schema problems abort before any transformation; per-record
/// problems are collected in `issues` and never drop a row.
pub fn clean_dataset(raw: &DataFrame, missing: &MissingConfig) -> PipelineResult<CleanedDataset> {
    validate_schema(raw)?;
    missing.validate()?;

    let canonical = canonicalize_columns(raw)?;
    let mut issues = IssueLog::new();

    let normalized = normalize_types(&canonical)?;
    issues.extend(normalized.issues);

    let resolved = resolve_missing(&normalized.frame, missing)?;

    let derived = derive_features(&resolved.frame)?;
    issues.extend(derived.issues);

    for issue in issues.iter().take(WARN_SAMPLE) {
        warn!("{}", issue);
    }
    if issues.len() > WARN_SAMPLE {
        warn!("... and {} more record issue(s)", issues.len() - WARN_SAMPLE);
    }
    info!(
        rows = derived.frame.height(),
        invalid_records = issues.count(IssueKind::InvalidRecord),
        parse_warnings = issues.count(IssueKind::ParseWarning),
        "dataset cleaned"
    );

    Ok(CleanedDataset {
        input_rows: raw.height(),
        frame: derived.frame,
        missing_ratios: resolved.missing_ratios,
        dropped_columns: resolved.dropped_columns,
        filled_counts: resolved.filled_counts,
        issues,
    })
}

/// Load a file and clean it
pub fn run_pipeline(
    path: &Path,
    infer_schema_length: usize,
    missing: &MissingConfig,
) -> PipelineResult<CleanedDataset> {
    let raw = load_dataset(path, infer_schema_length)?;
    clean_dataset(&raw, missing)
}
