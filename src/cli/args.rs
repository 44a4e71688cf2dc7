//! Command-line argument definitions using clap

use clap::Parser;
use std::path::PathBuf;

use crate::config::CleaningConfig;

/// Salescope - Clean property sales records and build summary tables for dashboards
#[derive(Parser, Debug)]
#[command(name = "salescope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input file path (CSV or TSV with a header row)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory for the cleaned table and summary tables.
    /// Defaults to the input directory with a '_report' suffix
    /// (e.g., sales.csv → sales_report/).
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// JSON configuration file. Flags given on the command line override it.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Columns to drop before analysis (comma-separated, snake_case names)
    #[arg(long, value_delimiter = ',')]
    pub drop_columns: Option<Vec<String>>,

    /// Columns whose missing values are replaced by the sentinel (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub fill_columns: Option<Vec<String>>,

    /// Placeholder category for missing values in the fill columns
    #[arg(long)]
    pub sentinel: Option<String>,

    /// Also drop non-required columns with a missing ratio above this value (0.0 to 1.0)
    #[arg(long, value_parser = validate_ratio)]
    pub missing_threshold: Option<f64>,

    /// Number of towns kept in the top-towns tables
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Number of buckets in the log sale amount histogram
    #[arg(long)]
    pub histogram_bins: Option<usize>,

    /// Number of rows to use for schema inference.
    /// Use 0 for full table scan (very slow for large files).
    #[arg(long)]
    pub infer_schema_length: Option<usize>,

    /// Print the summary without writing any output files
    #[arg(long, default_value = "false")]
    pub no_export: bool,
}

impl Cli {
    /// Get the output directory, deriving it from the input if not explicitly provided.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            let parent = self
                .input
                .parent()
                .unwrap_or_else(|| std::path::Path::new("."));
            let stem = self
                .input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output");
            parent.join(format!("{}_report", stem))
        })
    }

    /// Apply command-line overrides on top of a base configuration
    pub fn apply_overrides(&self, mut config: CleaningConfig) -> CleaningConfig {
        if let Some(cols) = &self.drop_columns {
            config.missing.columns_to_drop = cols.clone();
        }
        if let Some(cols) = &self.fill_columns {
            config.missing.columns_to_fill = cols.clone();
        }
        if let Some(sentinel) = &self.sentinel {
            config.missing.sentinel = sentinel.clone();
        }
        if self.missing_threshold.is_some() {
            config.missing.drop_threshold = self.missing_threshold;
        }
        if let Some(n) = self.top_n {
            config.top_n = n;
        }
        if let Some(bins) = self.histogram_bins {
            config.histogram_bins = bins;
        }
        if let Some(len) = self.infer_schema_length {
            config.infer_schema_length = len;
        }
        config
    }
}

/// Validator for ratio parameters
fn validate_ratio(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if !(0.0..=1.0).contains(&value) {
        Err(format!("value must be between 0.0 and 1.0, got {}", value))
    } else {
        Ok(value)
    }
}
