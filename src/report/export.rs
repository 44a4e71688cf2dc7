//! Flat-file export of the cleaned table and every reduction
//!
//! Output directory layout:
//! - `cleaned.csv` - the analysis-ready table
//! - `<reduction>.csv` - one file per reduction, fixed column names
//! - `record_issues.csv` - one line per invalid record / parse warning
//! - `manifest.json` - run metadata, ignored-row counts, missing ratios

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use polars::prelude::*;
use serde::Serialize;

use crate::config::CleaningConfig;
use crate::pipeline::{CleanedDataset, IssueKind, IssueLog, Summaries};

pub const CLEANED_FILE: &str = "cleaned.csv";
pub const ISSUES_FILE: &str = "record_issues.csv";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Metadata about the run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    pub salescope_version: String,
    pub input_file: String,
    pub config: CleaningConfig,
}

/// One exported reduction
#[derive(Serialize)]
pub struct TableEntry {
    pub name: String,
    pub file: String,
    pub columns: Vec<String>,
    pub rows: usize,
    pub ignored_rows: usize,
}

/// Complete export manifest
#[derive(Serialize)]
pub struct ExportManifest {
    pub metadata: RunMetadata,
    pub input_rows: usize,
    pub cleaned_rows: usize,
    pub dropped_columns: Vec<String>,
    pub filled_counts: BTreeMap<String, usize>,
    pub missing_ratios: Vec<MissingRatioEntry>,
    pub invalid_records: usize,
    pub parse_warnings: usize,
    /// Sale amount vs assessed value correlation, if defined
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_assessed_pearson: Option<f64>,
    pub tables: Vec<TableEntry>,
}

#[derive(Serialize)]
pub struct MissingRatioEntry {
    pub column: String,
    pub ratio: f64,
}

fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    CsvWriter::new(&mut file)
        .finish(df)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
    Ok(())
}

/// Escape a field for CSV (handle commas, quotes and line breaks)
fn escape_csv_field(field: &str) -> String {
    if field.contains(',')
        || field.contains('"')
        || field.contains('\n')
        || field.contains('\r')
    {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write one line per record issue: `row,column,kind,message`
pub fn export_issues_csv(issues: &IssueLog, path: &Path) -> Result<()> {
    use std::io::Write;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

    writeln!(file, "row,column,kind,message")?;
    for issue in issues.iter() {
        let kind = match issue.kind {
            IssueKind::InvalidRecord => "invalid_record",
            IssueKind::ParseWarning => "parse_warning",
        };
        writeln!(
            file,
            "{},{},{},{}",
            issue.row,
            escape_csv_field(&issue.column),
            kind,
            escape_csv_field(&issue.message)
        )?;
    }

    Ok(())
}

/// Write the cleaned table, every reduction, the issue list and the manifest.
///
/// # Returns
/// Paths of every file written, manifest last
pub fn export_all(
    cleaned: &CleanedDataset,
    summaries: &Summaries,
    config: &CleaningConfig,
    input_file: &Path,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("Failed to create output directory: {}", output_dir.display())
    })?;

    let mut written = Vec::new();

    let cleaned_path = output_dir.join(CLEANED_FILE);
    let mut frame = cleaned.frame.clone();
    write_csv(&mut frame, &cleaned_path)?;
    written.push(cleaned_path);

    let mut tables = Vec::new();
    for (name, mut df, ignored_rows) in summaries.tables()? {
        let file = format!("{}.csv", name);
        let path = output_dir.join(&file);
        write_csv(&mut df, &path)?;
        tables.push(TableEntry {
            name: name.to_string(),
            file,
            columns: df
                .get_column_names()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            rows: df.height(),
            ignored_rows,
        });
        written.push(path);
    }

    let issues_path = output_dir.join(ISSUES_FILE);
    export_issues_csv(&cleaned.issues, &issues_path)?;
    written.push(issues_path);

    let manifest = ExportManifest {
        metadata: RunMetadata {
            timestamp: Utc::now().to_rfc3339(),
            salescope_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: input_file.display().to_string(),
            config: config.clone(),
        },
        input_rows: cleaned.input_rows,
        cleaned_rows: cleaned.frame.height(),
        dropped_columns: cleaned.dropped_columns.clone(),
        filled_counts: cleaned.filled_counts.iter().cloned().collect(),
        missing_ratios: cleaned
            .missing_ratios
            .iter()
            .map(|(column, ratio)| MissingRatioEntry {
                column: column.clone(),
                ratio: *ratio,
            })
            .collect(),
        invalid_records: cleaned.issues.count(IssueKind::InvalidRecord),
        parse_warnings: cleaned.issues.count(IssueKind::ParseWarning),
        sale_assessed_pearson: summaries.sale_vs_assessed.pearson,
        tables,
    };

    let manifest_path = output_dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest)
        .context("Failed to serialize export manifest to JSON")?;
    std::fs::write(&manifest_path, json).with_context(|| {
        format!("Failed to write export manifest to {}", manifest_path.display())
    })?;
    written.push(manifest_path);

    Ok(written)
}
