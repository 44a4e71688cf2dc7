//! Missing value analysis and resolution

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::{PipelineError, PipelineResult};
use super::schema::{is_required, NON_USE_CODE, RECORDED_MONTH, RECORDED_YEAR, RESIDENTIAL_TYPE};

/// Placeholder category substituted for absent values
pub const DEFAULT_SENTINEL: &str = "Unknown";

/// Which columns to drop and which to sentinel-fill.
///
/// The lists are fixed configuration, not derived from the data. An
/// optional `drop_threshold` additionally drops any non-required column whose
/// missing ratio is strictly above it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingConfig {
    pub columns_to_drop: Vec<String>,
    pub columns_to_fill: Vec<String>,
    pub sentinel: String,
    pub drop_threshold: Option<f64>,
}

impl Default for MissingConfig {
    fn default() -> Self {
        Self {
            columns_to_drop: vec!["opm_remarks".to_string(), "assessor_remarks".to_string()],
            columns_to_fill: vec![RESIDENTIAL_TYPE.to_string(), NON_USE_CODE.to_string()],
            sentinel: DEFAULT_SENTINEL.to_string(),
            drop_threshold: None,
        }
    }
}

impl MissingConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if let Some(t) = self.drop_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(PipelineError::Config(format!(
                    "drop_threshold must be between 0.0 and 1.0, got {}",
                    t
                )));
            }
        }
        if let Some(name) = self
            .columns_to_fill
            .iter()
            .find(|c| self.columns_to_drop.contains(c))
        {
            return Err(PipelineError::Config(format!(
                "column '{}' is listed both to drop and to fill",
                name
            )));
        }
        Ok(())
    }
}

/// Output of the missing-data resolver
#[derive(Debug, Clone)]
pub struct Resolved {
    pub frame: DataFrame,
    /// Missing ratio per column before any modification, sorted descending
    pub missing_ratios: Vec<(String, f64)>,
    pub dropped_columns: Vec<String>,
    /// Configured drop columns that were not present in the table
    pub not_found: Vec<String>,
    /// Number of cells filled with the sentinel, per column
    pub filled_counts: Vec<(String, usize)>,
}

/// Analyze missing values in the dataset.
///
/// Returns `(column, null_count / row_count)` for every column, sorted by
/// missing ratio descending.
pub fn analyze_missing_values(df: &DataFrame) -> Vec<(String, f64)> {
    // Handle empty DataFrame
    if df.height() == 0 {
        return Vec::new();
    }

    let rows = df.height() as f64;
    let mut missing_ratios: Vec<(String, f64)> = df
        .get_columns()
        .iter()
        .map(|col| (col.name().to_string(), col.null_count() as f64 / rows))
        .collect();

    missing_ratios.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    missing_ratios
}

/// Get columns whose missing ratio is strictly above the threshold.
///
/// Required input columns and the year/month split of the recording date are
/// never returned.
pub fn get_columns_above_threshold(missing_ratios: &[(String, f64)], threshold: f64) -> Vec<String> {
    missing_ratios
        .iter()
        .filter(|(name, ratio)| *ratio > threshold && !is_protected(name))
        .map(|(name, _)| name.clone())
        .collect()
}

fn is_protected(name: &str) -> bool {
    is_required(name) || name == RECORDED_YEAR || name == RECORDED_MONTH
}

/// Drop the configured columns and fill the configured ones with the sentinel
pub fn resolve_missing(df: &DataFrame, config: &MissingConfig) -> PipelineResult<Resolved> {
    config.validate()?;

    let missing_ratios = analyze_missing_values(df);
    for (name, ratio) in &missing_ratios {
        debug!(column = %name, ratio, "missing ratio");
    }

    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut dropped_columns: Vec<String> = Vec::new();
    let mut not_found: Vec<String> = Vec::new();
    for name in &config.columns_to_drop {
        if present.contains(name) {
            dropped_columns.push(name.clone());
        } else {
            not_found.push(name.clone());
        }
    }

    if let Some(threshold) = config.drop_threshold {
        for name in get_columns_above_threshold(&missing_ratios, threshold) {
            if !dropped_columns.contains(&name) && !config.columns_to_fill.contains(&name) {
                dropped_columns.push(name);
            }
        }
    }

    let mut frame = df.drop_many(dropped_columns.iter().map(|s| s.as_str()));

    let mut filled_counts = Vec::with_capacity(config.columns_to_fill.len());
    for name in &config.columns_to_fill {
        let col = frame.column(name).map_err(|_| PipelineError::Schema {
            missing: vec![name.clone()],
            available: present.clone(),
        })?;
        let (filled, count) = fill_with_sentinel(col, &config.sentinel)?;
        frame.with_column(filled)?;
        filled_counts.push((name.clone(), count));
    }

    info!(
        dropped = dropped_columns.len(),
        filled = filled_counts.iter().map(|(_, n)| n).sum::<usize>(),
        "missing data resolved"
    );

    Ok(Resolved {
        frame,
        missing_ratios,
        dropped_columns,
        not_found,
        filled_counts,
    })
}

fn fill_with_sentinel(col: &Column, sentinel: &str) -> PipelineResult<(Column, usize)> {
    let count = col.null_count();
    let text = col.cast(&DataType::String)?;
    let values: Vec<String> = text
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or(sentinel).to_string())
        .collect();
    Ok((Column::new(col.name().clone(), values), count))
}
