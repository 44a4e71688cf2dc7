//! Dataset loader for delimited text files

use polars::prelude::*;
use std::path::Path;
use tracing::debug;

use super::error::{PipelineError, PipelineResult};

/// Basic shape information about a loaded dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatasetStats {
    pub rows: usize,
    pub columns: usize,
    pub memory_mb: f64,
}

impl DatasetStats {
    pub fn of(df: &DataFrame) -> Self {
        let (rows, columns) = df.shape();
        Self {
            rows,
            columns,
            memory_mb: df.estimated_size() as f64 / (1024.0 * 1024.0),
        }
    }
}

/// Pick the field separator from the file extension
fn separator_for(path: &Path) -> PipelineResult<u8> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => Ok(b','),
        "tsv" => Ok(b'\t'),
        _ => Err(PipelineError::load(
            path,
            format!(
                "Unsupported file format: '{}'. Supported formats: csv, tsv",
                extension
            ),
        )),
    }
}

fn scan(path: &Path, infer_schema_length: usize) -> PipelineResult<LazyFrame> {
    if !path.is_file() {
        return Err(PipelineError::load(path, "file does not exist"));
    }
    let separator = separator_for(path)?;

    // 0 means full table scan
    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    LazyCsvReader::new(path)
        .with_has_header(true)
        .with_separator(separator)
        .with_infer_schema_length(schema_length)
        .finish()
        .map_err(|e| PipelineError::load(path, e))
}

/// Load a delimited file into a DataFrame, inferring a primitive type per column.
///
/// # Arguments
/// * `path` - Path to a `.csv` or `.tsv` file with a header row
/// * `infer_schema_length` - Number of rows used for type inference (0 = all rows)
///
/// # Errors
/// `PipelineError::Load` when the file is absent, unreadable, malformed or
/// contains no data rows.
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> PipelineResult<DataFrame> {
    let df = scan(path, infer_schema_length)?
        .collect()
        .map_err(|e| PipelineError::load(path, e))?;

    if df.height() == 0 {
        return Err(PipelineError::load(path, "file contains zero data rows"));
    }

    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "dataset loaded"
    );

    Ok(df)
}

/// Load a dataset and report its shape and estimated memory footprint
pub fn load_dataset_with_stats(
    path: &Path,
    infer_schema_length: usize,
) -> PipelineResult<(DataFrame, DatasetStats)> {
    let df = load_dataset(path, infer_schema_length)?;
    let stats = DatasetStats::of(&df);
    Ok((df, stats))
}

/// Read only the header of a delimited file
pub fn get_column_names(path: &Path) -> PipelineResult<Vec<String>> {
    let schema = scan(path, 100)?
        .collect_schema()
        .map_err(|e| PipelineError::load(path, e))?;

    Ok(schema.iter_names().map(|s| s.to_string()).collect())
}
