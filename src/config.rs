//! Run configuration, loadable from a JSON file

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pipeline::{MissingConfig, DEFAULT_HISTOGRAM_BINS, DEFAULT_TOP_N};

/// Everything a run needs besides the input path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    pub missing: MissingConfig,
    /// Rows kept in the top-towns reductions
    pub top_n: usize,
    /// Buckets in the log sale amount histogram
    pub histogram_bins: usize,
    /// Rows used for CSV schema inference (0 = full scan)
    pub infer_schema_length: usize,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            missing: MissingConfig::default(),
            top_n: DEFAULT_TOP_N,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            infer_schema_length: 10_000,
        }
    }
}

impl CleaningConfig {
    /// Read a config file. Fields absent from the file keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CleaningConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            anyhow::bail!("top_n must be at least 1");
        }
        if self.histogram_bins == 0 {
            anyhow::bail!("histogram_bins must be at least 1");
        }
        self.missing.validate()?;
        Ok(())
    }
}
