//! Derived columns: price ratio, log sale amount and coordinates

use polars::prelude::*;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use super::error::{PipelineResult, RecordIssue};
use super::schema::{
    require_column, ASSESSED_VALUE, LATITUDE, LOCATION, LOG_SALE_AMOUNT, LONGITUDE,
    PRICE_PER_1K_ASSESSED, SALE_AMOUNT,
};

/// Output of the feature deriver
#[derive(Debug, Clone)]
pub struct Derived {
    pub frame: DataFrame,
    pub issues: Vec<RecordIssue>,
}

fn point_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"(?i)^\s*POINT\s*\(\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)\s+([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)\s*\)\s*$",
        )
        .expect("point pattern is a valid regex")
    })
}

/// Parse `POINT (<lon> <lat>)` into `(longitude, latitude)`.
///
/// Returns `None` unless both components parse and lie within valid
/// longitude/latitude ranges.
pub fn parse_point(text: &str) -> Option<(f64, f64)> {
    let caps = point_pattern().captures(text)?;
    let lon: f64 = caps.get(1)?.as_str().parse().ok()?;
    let lat: f64 = caps.get(2)?.as_str().parse().ok()?;

    if (-180.0..=180.0).contains(&lon) && (-90.0..=90.0).contains(&lat) {
        Some((lon, lat))
    } else {
        None
    }
}

/// `sale / (assessed / 1000)`, absent when assessed is zero or either side is absent
pub fn price_per_1k_assessed(sale: Option<f64>, assessed: Option<f64>) -> Option<f64> {
    let (sale, assessed) = (sale?, assessed?);
    if assessed == 0.0 {
        return None;
    }
    let ratio = sale / (assessed / 1000.0);
    ratio.is_finite().then_some(ratio)
}

/// `ln(1 + sale)`. Sale amounts at or below -1 have no real log and yield `None`.
pub fn log_sale_amount(sale: f64) -> Option<f64> {
    if sale <= -1.0 {
        None
    } else {
        Some(sale.ln_1p())
    }
}

/// Append `price_per_1k_assessed`, `log_sale_amount`, `latitude` and `longitude`.
///
/// Every row is kept. A sale amount at or below -1 is reported as an invalid
/// record; an unparseable location is reported as a parse warning.
pub fn derive_features(df: &DataFrame) -> PipelineResult<Derived> {
    let mut frame = df.clone();
    let mut issues = Vec::new();

    let sale = require_column(df, SALE_AMOUNT)?.cast(&DataType::Float64)?;
    let assessed = require_column(df, ASSESSED_VALUE)?.cast(&DataType::Float64)?;
    let sale = sale.f64()?;
    let assessed = assessed.f64()?;

    let ratios: Vec<Option<f64>> = sale
        .into_iter()
        .zip(assessed.into_iter())
        .map(|(s, a)| price_per_1k_assessed(s, a))
        .collect();

    let logs: Vec<Option<f64>> = sale
        .into_iter()
        .enumerate()
        .map(|(row, s)| {
            let s = s?;
            let value = log_sale_amount(s);
            if value.is_none() {
                issues.push(RecordIssue::invalid_record(
                    row,
                    SALE_AMOUNT,
                    format!("sale amount {} is not greater than -1", s),
                ));
            }
            value
        })
        .collect();

    let location = require_column(df, LOCATION)?.cast(&DataType::String)?;
    let (longitudes, latitudes): (Vec<Option<f64>>, Vec<Option<f64>>) = location
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v.map(|text| (text, parse_point(text))) {
            Some((_, Some((lon, lat)))) => (Some(lon), Some(lat)),
            Some((text, None)) => {
                issues.push(RecordIssue::parse_warning(
                    row,
                    LOCATION,
                    format!("unrecognized point geometry '{}'", text),
                ));
                (None, None)
            }
            None => (None, None),
        })
        .unzip();

    frame.with_column(Column::new(PRICE_PER_1K_ASSESSED.into(), ratios))?;
    frame.with_column(Column::new(LOG_SALE_AMOUNT.into(), logs))?;
    frame.with_column(Column::new(LATITUDE.into(), latitudes))?;
    frame.with_column(Column::new(LONGITUDE.into(), longitudes))?;

    debug!(issues = issues.len(), "features derived");
    Ok(Derived { frame, issues })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point_valid() {
        assert_eq!(parse_point("POINT (-72.925 41.305)"), Some((-72.925, 41.305)));
        assert_eq!(parse_point("POINT(-73.5 41.05)"), Some((-73.5, 41.05)));
        assert_eq!(parse_point("point (+1 -2.5)"), Some((1.0, -2.5)));
        assert_eq!(parse_point("  POINT ( 10  20 ) "), Some((10.0, 20.0)));
    }

    #[test]
    fn test_parse_point_rejects_partial_or_malformed() {
        assert_eq!(parse_point("POINT (bad)"), None);
        assert_eq!(parse_point("POINT (-72.9)"), None);
        assert_eq!(parse_point("POINT (-72.9 41.3 7)"), None);
        assert_eq!(parse_point("LINESTRING (1 2)"), None);
        assert_eq!(parse_point(""), None);
    }

    #[test]
    fn test_parse_point_rejects_out_of_range() {
        assert_eq!(parse_point("POINT (200 41)"), None);
        assert_eq!(parse_point("POINT (-72 95)"), None);
    }

    #[test]
    fn test_price_per_1k_assessed() {
        assert_eq!(
            price_per_1k_assessed(Some(500_000.0), Some(400_000.0)),
            Some(1250.0)
        );
        assert_eq!(price_per_1k_assessed(Some(150_000.0), Some(0.0)), None);
        assert_eq!(price_per_1k_assessed(None, Some(1.0)), None);
        assert_eq!(price_per_1k_assessed(Some(1.0), None), None);
    }

    #[test]
    fn test_log_sale_amount_boundary() {
        assert_eq!(log_sale_amount(0.0), Some(0.0));
        assert_eq!(log_sale_amount(-1.0), None);
        assert_eq!(log_sale_amount(-2.0), None);
        let v = log_sale_amount(-0.5).unwrap();
        assert!((v - 0.5f64.ln()).abs() < 1e-12);
    }
}
