//! Group-by reductions over the cleaned table
//!
//! Each reduction skips rows whose required fields are null and reports how
//! many rows it skipped, so consumers can judge completeness.

use polars::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

use super::error::{PipelineError, PipelineResult};
use super::schema::{
    require_column, ASSESSED_VALUE, LATITUDE, LOG_SALE_AMOUNT, LONGITUDE, PROPERTY_TYPE,
    RECORDED_YEAR, SALE_AMOUNT, TOWN,
};

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_HISTOGRAM_BINS: usize = 20;

/// Rows of a reduction plus the number of input rows it ignored
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reduction<T> {
    pub rows: Vec<T>,
    pub ignored_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TownCount {
    pub town: String,
    pub sale_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TownTotal {
    pub town: String,
    pub total_sale_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyTypeMean {
    pub property_type: String,
    pub mean_sale_amount: f64,
    pub sale_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearCount {
    pub recorded_year: i32,
    pub sale_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub bin_start: f64,
    pub bin_end: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalePair {
    pub sale_amount: f64,
    pub assessed_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TownCentroid {
    pub town: String,
    pub latitude: f64,
    pub longitude: f64,
    pub point_count: usize,
}

/// Sale amount vs assessed value pairs for scatter/correlation use
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseSummary {
    pub pairs: Vec<SalePair>,
    /// Pearson correlation over the complete pairs (None below 2 pairs or zero variance)
    pub pearson: Option<f64>,
    pub ignored_rows: usize,
}

// Column extraction helpers. Each returns an owned, cast column so the
// borrowed chunked array can outlive the lookup.

fn text_column(df: &DataFrame, name: &str) -> PipelineResult<Column> {
    Ok(require_column(df, name)?.cast(&DataType::String)?)
}

fn float_column(df: &DataFrame, name: &str) -> PipelineResult<Column> {
    Ok(require_column(df, name)?.cast(&DataType::Float64)?)
}

/// Sort `(key, value)` pairs by value descending, then key ascending
fn sort_desc_by<V: PartialOrd>(rows: &mut [(String, V)]) {
    rows.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
}

/// Towns ranked by number of sales, top `n`
pub fn top_towns_by_count(df: &DataFrame, n: usize) -> PipelineResult<Reduction<TownCount>> {
    let town = text_column(df, TOWN)?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut ignored_rows = 0;
    for t in town.str()?.into_iter() {
        match t {
            Some(t) => *counts.entry(t.to_string()).or_insert(0) += 1,
            None => ignored_rows += 1,
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    sort_desc_by(&mut ranked);
    ranked.truncate(n);

    Ok(Reduction {
        rows: ranked
            .into_iter()
            .map(|(town, sale_count)| TownCount { town, sale_count })
            .collect(),
        ignored_rows,
    })
}

/// Towns ranked by total sale amount, top `n`
pub fn top_towns_by_value(df: &DataFrame, n: usize) -> PipelineResult<Reduction<TownTotal>> {
    let town = text_column(df, TOWN)?;
    let sale = float_column(df, SALE_AMOUNT)?;

    let mut totals: HashMap<String, f64> = HashMap::new();
    let mut ignored_rows = 0;
    for (t, s) in town.str()?.into_iter().zip(sale.f64()?.into_iter()) {
        match (t, s) {
            (Some(t), Some(s)) => *totals.entry(t.to_string()).or_insert(0.0) += s,
            _ => ignored_rows += 1,
        }
    }

    let mut ranked: Vec<(String, f64)> = totals.into_iter().collect();
    sort_desc_by(&mut ranked);
    ranked.truncate(n);

    Ok(Reduction {
        rows: ranked
            .into_iter()
            .map(|(town, total_sale_amount)| TownTotal {
                town,
                total_sale_amount,
            })
            .collect(),
        ignored_rows,
    })
}

/// Mean sale amount per property type, highest mean first
pub fn mean_sale_by_property_type(df: &DataFrame) -> PipelineResult<Reduction<PropertyTypeMean>> {
    let property_type = text_column(df, PROPERTY_TYPE)?;
    let sale = float_column(df, SALE_AMOUNT)?;

    let mut sums: HashMap<String, (f64, usize)> = HashMap::new();
    let mut ignored_rows = 0;
    for (p, s) in property_type
        .str()?
        .into_iter()
        .zip(sale.f64()?.into_iter())
    {
        match (p, s) {
            (Some(p), Some(s)) => {
                let entry = sums.entry(p.to_string()).or_insert((0.0, 0));
                entry.0 += s;
                entry.1 += 1;
            }
            _ => ignored_rows += 1,
        }
    }

    let mut means: Vec<(String, f64)> = sums
        .iter()
        .map(|(k, (sum, count))| (k.clone(), sum / *count as f64))
        .collect();
    sort_desc_by(&mut means);

    Ok(Reduction {
        rows: means
            .into_iter()
            .map(|(property_type, mean_sale_amount)| {
                let sale_count = sums[&property_type].1;
                PropertyTypeMean {
                    property_type,
                    mean_sale_amount,
                    sale_count,
                }
            })
            .collect(),
        ignored_rows,
    })
}

/// Number of sales per recorded year, oldest year first
pub fn sales_by_year(df: &DataFrame) -> PipelineResult<Reduction<YearCount>> {
    let year = require_column(df, RECORDED_YEAR)?.cast(&DataType::Int32)?;

    let mut counts: HashMap<i32, usize> = HashMap::new();
    let mut ignored_rows = 0;
    for y in year.i32()?.into_iter() {
        match y {
            Some(y) => *counts.entry(y).or_insert(0) += 1,
            None => ignored_rows += 1,
        }
    }

    let mut rows: Vec<YearCount> = counts
        .into_iter()
        .map(|(recorded_year, sale_count)| YearCount {
            recorded_year,
            sale_count,
        })
        .collect();
    rows.sort_by_key(|r| r.recorded_year);

    Ok(Reduction { rows, ignored_rows })
}

/// Equal-width histogram over `log_sale_amount`.
///
/// Buckets span `[min, max]`; the maximum lands in the last bucket. A single
/// distinct value produces one bucket.
pub fn log_sale_histogram(df: &DataFrame, bins: usize) -> PipelineResult<Reduction<HistogramBin>> {
    if bins == 0 {
        return Err(PipelineError::Config(
            "histogram needs at least one bin".to_string(),
        ));
    }

    let logs = float_column(df, LOG_SALE_AMOUNT)?;
    let mut values = Vec::with_capacity(logs.len());
    let mut ignored_rows = 0;
    for v in logs.f64()?.into_iter() {
        match v {
            Some(v) if v.is_finite() => values.push(v),
            _ => ignored_rows += 1,
        }
    }

    if values.is_empty() {
        return Ok(Reduction {
            rows: Vec::new(),
            ignored_rows,
        });
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    if max == min {
        return Ok(Reduction {
            rows: vec![HistogramBin {
                bin_start: min,
                bin_end: max,
                count: values.len(),
            }],
            ignored_rows,
        });
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in &values {
        let idx = (((v - min) / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let rows = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            bin_start: min + width * i as f64,
            bin_end: if i == bins - 1 {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count,
        })
        .collect();

    Ok(Reduction { rows, ignored_rows })
}

/// Complete `(sale_amount, assessed_value)` pairs with their Pearson correlation
pub fn sale_vs_assessed(df: &DataFrame) -> PipelineResult<PairwiseSummary> {
    let sale = float_column(df, SALE_AMOUNT)?;
    let assessed = float_column(df, ASSESSED_VALUE)?;

    let mut pairs = Vec::new();
    let mut ignored_rows = 0;
    for (s, a) in sale.f64()?.into_iter().zip(assessed.f64()?.into_iter()) {
        match (s, a) {
            (Some(sale_amount), Some(assessed_value)) => pairs.push(SalePair {
                sale_amount,
                assessed_value,
            }),
            _ => ignored_rows += 1,
        }
    }

    let pearson = pearson_correlation(
        pairs.iter().map(|p| (p.sale_amount, p.assessed_value)),
    );

    Ok(PairwiseSummary {
        pairs,
        pearson,
        ignored_rows,
    })
}

/// Pearson correlation using single-pass Welford updates for numerical stability
pub fn pearson_correlation(values: impl IntoIterator<Item = (f64, f64)>) -> Option<f64> {
    let mut n = 0.0;
    let mut mean_x = 0.0;
    let mut mean_y = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    let mut cov_xy = 0.0;

    for (x, y) in values {
        n += 1.0;
        let dx = x - mean_x;
        let dy = y - mean_y;
        mean_x += dx / n;
        mean_y += dy / n;
        var_x += dx * (x - mean_x);
        var_y += dy * (y - mean_y);
        cov_xy += dx * (y - mean_y);
    }

    if n < 2.0 || var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    let r = cov_xy / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then_some(r)
}

/// Mean coordinate per town, for map plotting
pub fn town_centroids(df: &DataFrame) -> PipelineResult<Reduction<TownCentroid>> {
    let town = text_column(df, TOWN)?;
    let lat = float_column(df, LATITUDE)?;
    let lon = float_column(df, LONGITUDE)?;

    let mut sums: HashMap<String, (f64, f64, usize)> = HashMap::new();
    let mut ignored_rows = 0;
    for ((t, la), lo) in town
        .str()?
        .into_iter()
        .zip(lat.f64()?.into_iter())
        .zip(lon.f64()?.into_iter())
    {
        match (t, la, lo) {
            (Some(t), Some(la), Some(lo)) => {
                let entry = sums.entry(t.to_string()).or_insert((0.0, 0.0, 0));
                entry.0 += la;
                entry.1 += lo;
                entry.2 += 1;
            }
            _ => ignored_rows += 1,
        }
    }

    let mut rows: Vec<TownCentroid> = sums
        .into_iter()
        .map(|(town, (lat_sum, lon_sum, count))| TownCentroid {
            town,
            latitude: lat_sum / count as f64,
            longitude: lon_sum / count as f64,
            point_count: count,
        })
        .collect();
    rows.sort_by(|a, b| a.town.cmp(&b.town));

    Ok(Reduction { rows, ignored_rows })
}

/// All reductions consumed by the dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summaries {
    pub top_towns_by_count: Reduction<TownCount>,
    pub top_towns_by_value: Reduction<TownTotal>,
    pub mean_sale_by_property_type: Reduction<PropertyTypeMean>,
    pub sales_by_year: Reduction<YearCount>,
    pub log_sale_histogram: Reduction<HistogramBin>,
    pub sale_vs_assessed: PairwiseSummary,
    pub town_centroids: Reduction<TownCentroid>,
}

impl Summaries {
    pub fn compute(df: &DataFrame, top_n: usize, histogram_bins: usize) -> PipelineResult<Self> {
        Ok(Self {
            top_towns_by_count: top_towns_by_count(df, top_n)?,
            top_towns_by_value: top_towns_by_value(df, top_n)?,
            mean_sale_by_property_type: mean_sale_by_property_type(df)?,
            sales_by_year: sales_by_year(df)?,
            log_sale_histogram: log_sale_histogram(df, histogram_bins)?,
            sale_vs_assessed: sale_vs_assessed(df)?,
            town_centroids: town_centroids(df)?,
        })
    }

    /// Each reduction as a flat table: `(table name, frame, ignored rows)`
    pub fn tables(&self) -> PipelineResult<Vec<(&'static str, DataFrame, usize)>> {
        let c = &self.top_towns_by_count;
        let top_count = df! {
            "town" => c.rows.iter().map(|r| r.town.as_str()).collect::<Vec<_>>(),
            "sale_count" => c.rows.iter().map(|r| r.sale_count as u64).collect::<Vec<_>>(),
        }?;

        let v = &self.top_towns_by_value;
        let top_value = df! {
            "town" => v.rows.iter().map(|r| r.town.as_str()).collect::<Vec<_>>(),
            "total_sale_amount" => v.rows.iter().map(|r| r.total_sale_amount).collect::<Vec<_>>(),
        }?;

        let p = &self.mean_sale_by_property_type;
        let by_type = df! {
            "property_type" => p.rows.iter().map(|r| r.property_type.as_str()).collect::<Vec<_>>(),
            "mean_sale_amount" => p.rows.iter().map(|r| r.mean_sale_amount).collect::<Vec<_>>(),
            "sale_count" => p.rows.iter().map(|r| r.sale_count as u64).collect::<Vec<_>>(),
        }?;

        let y = &self.sales_by_year;
        let by_year = df! {
            "recorded_year" => y.rows.iter().map(|r| r.recorded_year).collect::<Vec<_>>(),
            "sale_count" => y.rows.iter().map(|r| r.sale_count as u64).collect::<Vec<_>>(),
        }?;

        let h = &self.log_sale_histogram;
        let histogram = df! {
            "bin_start" => h.rows.iter().map(|r| r.bin_start).collect::<Vec<_>>(),
            "bin_end" => h.rows.iter().map(|r| r.bin_end).collect::<Vec<_>>(),
            "count" => h.rows.iter().map(|r| r.count as u64).collect::<Vec<_>>(),
        }?;

        let s = &self.sale_vs_assessed;
        let scatter = df! {
            "sale_amount" => s.pairs.iter().map(|r| r.sale_amount).collect::<Vec<_>>(),
            "assessed_value" => s.pairs.iter().map(|r| r.assessed_value).collect::<Vec<_>>(),
        }?;

        let g = &self.town_centroids;
        let centroids = df! {
            "town" => g.rows.iter().map(|r| r.town.as_str()).collect::<Vec<_>>(),
            "latitude" => g.rows.iter().map(|r| r.latitude).collect::<Vec<_>>(),
            "longitude" => g.rows.iter().map(|r| r.longitude).collect::<Vec<_>>(),
            "point_count" => g.rows.iter().map(|r| r.point_count as u64).collect::<Vec<_>>(),
        }?;

        Ok(vec![
            ("top_towns_by_count", top_count, c.ignored_rows),
            ("top_towns_by_value", top_value, v.ignored_rows),
            ("mean_sale_by_property_type", by_type, p.ignored_rows),
            ("sales_by_year", by_year, y.ignored_rows),
            ("log_sale_histogram", histogram, h.ignored_rows),
            ("sale_vs_assessed", scatter, s.ignored_rows),
            ("town_centroids", centroids, g.ignored_rows),
        ])
    }
}
