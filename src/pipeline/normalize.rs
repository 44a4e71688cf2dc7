//! Type normalization: dates, trimmed text and numeric amounts

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::debug;

use super::error::{PipelineResult, RecordIssue};
use super::schema::{
    require_column, ASSESSED_VALUE, DATE_RECORDED, RECORDED_MONTH, RECORDED_YEAR, SALE_AMOUNT,
};

/// Days between 0001-01-01 (CE day 1) and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Accepted textual date layouts, tried in order
const DATE_FORMATS: [&str; 2] = ["%m/%d/%Y", "%Y-%m-%d"];
const DATETIME_FORMATS: [&str; 3] = [
    "%m/%d/%Y %I:%M:%S %p",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Columns coerced to Float64
const MONETARY_COLUMNS: [&str; 2] = [SALE_AMOUNT, ASSESSED_VALUE];

/// Output of the type normalizer
#[derive(Debug, Clone)]
pub struct Normalized {
    pub frame: DataFrame,
    pub issues: Vec<RecordIssue>,
}

/// Normalize column types of a canonically named table.
///
/// * trims every text column (empty strings become null)
/// * parses `date_recorded` into a `Date`, unparseable text becomes null
/// * coerces `sale_amount` and `assessed_value` to Float64
/// * derives `recorded_year` and `recorded_month`
///
/// Running it on its own output returns an identical table and no issues.
pub fn normalize_types(df: &DataFrame) -> PipelineResult<Normalized> {
    let mut frame = df.clone();
    let mut issues = Vec::new();

    // Trim first so date and number parsing sees clean text
    let text_columns: Vec<Column> = frame
        .get_columns()
        .iter()
        .filter(|c| c.dtype() == &DataType::String)
        .cloned()
        .collect();
    for col in &text_columns {
        frame.with_column(trim_text_column(col)?)?;
    }

    let dates = parse_date_column(require_column(&frame, DATE_RECORDED)?, &mut issues)?;
    let (years, months) = split_year_month(&dates)?;
    frame.with_column(dates)?;
    frame.with_column(years)?;
    frame.with_column(months)?;

    for name in MONETARY_COLUMNS {
        let amounts = coerce_amount_column(require_column(&frame, name)?, &mut issues)?;
        frame.with_column(amounts)?;
    }

    debug!(issues = issues.len(), "types normalized");
    Ok(Normalized { frame, issues })
}

fn trim_text_column(col: &Column) -> PipelineResult<Column> {
    let values: Vec<Option<String>> = col
        .str()?
        .into_iter()
        .map(|v| {
            v.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .collect();
    Ok(Column::new(col.name().clone(), values))
}

/// Parse a date in any of the accepted layouts
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

pub fn date_to_epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub fn epoch_days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
}

fn parse_date_column(col: &Column, issues: &mut Vec<RecordIssue>) -> PipelineResult<Column> {
    match col.dtype() {
        DataType::Date => Ok(col.clone()),
        DataType::Datetime(_, _) => Ok(col.cast(&DataType::Date)?),
        _ => {
            let text = col.cast(&DataType::String)?;
            let days: Vec<Option<i32>> = text
                .str()?
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    let raw = v?;
                    match parse_date(raw) {
                        Some(date) => Some(date_to_epoch_days(date)),
                        None => {
                            issues.push(RecordIssue::parse_warning(
                                row,
                                DATE_RECORDED,
                                format!("unrecognized date '{}'", raw),
                            ));
                            None
                        }
                    }
                })
                .collect();
            Ok(Column::new(col.name().clone(), days).cast(&DataType::Date)?)
        }
    }
}

fn split_year_month(dates: &Column) -> PipelineResult<(Column, Column)> {
    let physical = dates.cast(&DataType::Int32)?;
    let (years, months): (Vec<Option<i32>>, Vec<Option<i32>>) = physical
        .i32()?
        .into_iter()
        .map(|days| {
            match days.and_then(epoch_days_to_date) {
                Some(date) => (Some(date.year()), Some(date.month() as i32)),
                None => (None, None),
            }
        })
        .unzip();

    Ok((
        Column::new(RECORDED_YEAR.into(), years),
        Column::new(RECORDED_MONTH.into(), months),
    ))
}

/// Parse a monetary amount such as `250000`, `1,250,000.50` or `$ 99,000`
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn coerce_amount_column(col: &Column, issues: &mut Vec<RecordIssue>) -> PipelineResult<Column> {
    let name = col.name().to_string();

    // NaN and inf are read as numbers but are not amounts
    if col.dtype().is_primitive_numeric() {
        let floats = col.cast(&DataType::Float64)?;
        let values: Vec<Option<f64>> = floats
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| {
                let v = v?;
                if v.is_finite() {
                    Some(v)
                } else {
                    issues.push(RecordIssue::parse_warning(
                        row,
                        &name,
                        format!("not a finite number: '{}'", v),
                    ));
                    None
                }
            })
            .collect();
        return Ok(Column::new(col.name().clone(), values));
    }

    let text = col.cast(&DataType::String)?;
    let values: Vec<Option<f64>> = text
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            let raw = v?;
            let parsed = parse_amount(raw);
            if parsed.is_none() {
                issues.push(RecordIssue::parse_warning(
                    row,
                    &name,
                    format!("not a number: '{}'", raw),
                ));
            }
            parsed
        })
        .collect();
    Ok(Column::new(col.name().clone(), values))
}
