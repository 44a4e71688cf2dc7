//! Shared test utilities and fixture generators
#![allow(dead_code)]

use polars::prelude::*;
use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

/// Header of a full property sales extract
pub const FULL_HEADER: &str = "Serial Number,List Year,Date Recorded,Town,Address,Assessed Value,Sale Amount,Sales Ratio,Property Type,Residential Type,Non Use Code,Assessor Remarks,OPM remarks,Location";

/// The three-row Stamford / Greenwich / Waterbury scenario
pub fn scenario_rows() -> Vec<&'static str> {
    vec![
        "1,2021,2022-05-01,Stamford,1 Main St,400000,500000,0.8,Residential,Single Family,,,,POINT (-73.5 41.05)",
        "2,2021,2021-11-15,Greenwich,2 Shore Rd,1500000,2000000,0.75,Residential,Single Family,,,,POINT (-73.63 41.03)",
        "3,2022,2023-02-20,Waterbury,3 Hill Ave,0,150000,0,Commercial,,25 - Other,,,",
    ]
}

/// Write a CSV with the given header and rows into a fresh temp directory
pub fn write_csv(header: &str, rows: &[&str]) -> (TempDir, PathBuf) {
    write_named(header, rows, "sales.csv")
}

pub fn write_named(header: &str, rows: &[&str], file_name: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(file_name);

    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{}", header).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    drop(file);

    (temp_dir, path)
}

/// The scenario written to disk
pub fn scenario_csv() -> (TempDir, PathBuf) {
    write_csv(FULL_HEADER, &scenario_rows())
}

/// A raw (loader-shaped) table with the eight required headers
pub fn create_raw_dataframe() -> DataFrame {
    df! {
        "Date Recorded" => [Some(" 05/01/2022 "), Some("2021-11-15"), Some("garbage"), None],
        "Town" => [Some(" Stamford"), Some("Greenwich "), Some("Waterbury"), Some("Hartford")],
        "Property Type" => [Some("Residential"), Some("Residential"), Some("Commercial"), None],
        "Residential Type" => [Some("Single Family"), None, None, Some("Condo")],
        "Non Use Code" => [None, Some("14 - Foreclosure"), None, None],
        "Sale Amount" => [Some(500000.0f64), Some(2000000.0), Some(-5.0), None],
        "Assessed Value" => [Some(400000.0f64), Some(1500000.0), Some(0.0), Some(100000.0)],
        "Location" => [Some("POINT (-73.5 41.05)"), Some("POINT (bad)"), None, Some("POINT (-72.68 41.76)")],
        "OPM remarks" => [None::<&str>, None, None, Some("note")],
    }
    .unwrap()
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}

/// Float values of a column
pub fn f64_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

/// String values of a column
pub fn str_values(df: &DataFrame, name: &str) -> Vec<Option<String>> {
    df.column(name)
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect()
}

/// Int32 values of a column
pub fn i32_values(df: &DataFrame, name: &str) -> Vec<Option<i32>> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Int32)
        .unwrap()
        .i32()
        .unwrap()
        .into_iter()
        .collect()
}
