//! Required-column validation and canonical column naming

use polars::prelude::*;
use std::collections::HashMap;

use super::error::{PipelineError, PipelineResult};

/// Headers every input file must provide
pub const REQUIRED_COLUMNS: [&str; 8] = [
    "Date Recorded",
    "Town",
    "Property Type",
    "Residential Type",
    "Non Use Code",
    "Sale Amount",
    "Assessed Value",
    "Location",
];

pub const DATE_RECORDED: &str = "date_recorded";
pub const RECORDED_YEAR: &str = "recorded_year";
pub const RECORDED_MONTH: &str = "recorded_month";
pub const TOWN: &str = "town";
pub const PROPERTY_TYPE: &str = "property_type";
pub const RESIDENTIAL_TYPE: &str = "residential_type";
pub const NON_USE_CODE: &str = "non_use_code";
pub const SALE_AMOUNT: &str = "sale_amount";
pub const ASSESSED_VALUE: &str = "assessed_value";
pub const LOCATION: &str = "location";
pub const PRICE_PER_1K_ASSESSED: &str = "price_per_1k_assessed";
pub const LOG_SALE_AMOUNT: &str = "log_sale_amount";
pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";

/// Convert a header into its snake_case column name.
///
/// Runs of non-alphanumeric characters collapse into a single `_`:
/// `"Sale Amount"` → `"sale_amount"`, `"OPM remarks"` → `"opm_remarks"`.
pub fn canonical_name(header: &str) -> String {
    let mut out = String::with_capacity(header.len());
    let mut pending_sep = false;

    for ch in header.trim().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }

    out
}

/// Whether a canonical column name belongs to a required input column
pub fn is_required(canonical: &str) -> bool {
    REQUIRED_COLUMNS
        .iter()
        .any(|header| canonical_name(header) == canonical)
}

/// Check that every required column is present.
///
/// Matching is done on canonical names, so `sale amount` satisfies
/// `Sale Amount`. All missing columns are reported at once.
pub fn validate_schema(df: &DataFrame) -> PipelineResult<()> {
    let available: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let present: Vec<String> = available.iter().map(|s| canonical_name(s)).collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|header| !present.contains(&canonical_name(header)))
        .map(|header| header.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::Schema { missing, available })
    }
}

/// Look up a column that a stage cannot run without
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> PipelineResult<&'a Column> {
    df.column(name).map_err(|_| PipelineError::Schema {
        missing: vec![name.to_string()],
        available: df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect(),
    })
}

/// Rename every column to its canonical snake_case name
pub fn canonicalize_columns(df: &DataFrame) -> PipelineResult<DataFrame> {
    let mut seen: HashMap<String, String> = HashMap::new();
    let mut names = Vec::with_capacity(df.width());

    for original in df.get_column_names() {
        let canonical = canonical_name(original);
        if canonical.is_empty() {
            return Err(PipelineError::Config(format!(
                "column header '{}' has no usable characters",
                original
            )));
        }
        if let Some(first) = seen.get(&canonical) {
            return Err(PipelineError::DuplicateColumn {
                first: first.clone(),
                second: original.to_string(),
                canonical,
            });
        }
        seen.insert(canonical.clone(), original.to_string());
        names.push(canonical);
    }

    let mut out = df.clone();
    out.set_column_names(names)?;
    Ok(out)
}
