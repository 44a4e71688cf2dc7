//! Integration tests for the full cleaning pipeline

use salescope::pipeline::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_three_town_scenario() {
    let (_dir, path) = scenario_csv();

    let cleaned = run_pipeline(&path, 100, &MissingConfig::default()).unwrap();
    let df = &cleaned.frame;

    assert_eq!(df.height(), 3);
    assert_eq!(cleaned.input_rows, 3);

    // Row 3 (Waterbury): assessed 0 and no location
    assert_eq!(f64_values(df, "price_per_1k_assessed")[2], None);
    assert_eq!(f64_values(df, "latitude")[2], None);
    assert_eq!(f64_values(df, "longitude")[2], None);

    assert_eq!(f64_values(df, "price_per_1k_assessed")[0], Some(1250.0));
    assert_eq!(f64_values(df, "latitude")[0], Some(41.05));
    assert_eq!(f64_values(df, "longitude")[1], Some(-73.63));

    let by_value = top_towns_by_value(df, DEFAULT_TOP_N).unwrap();
    let towns: Vec<&str> = by_value.rows.iter().map(|r| r.town.as_str()).collect();
    assert_eq!(towns, vec!["Greenwich", "Stamford", "Waterbury"]);
    assert_eq!(by_value.ignored_rows, 0);
}

#[test]
fn test_scenario_sentinels_and_drops() {
    let (_dir, path) = scenario_csv();

    let cleaned = run_pipeline(&path, 100, &MissingConfig::default()).unwrap();

    assert_missing_columns(&cleaned.frame, &["opm_remarks", "assessor_remarks"]);
    assert_eq!(
        str_values(&cleaned.frame, "residential_type")[2],
        Some("Unknown".to_string())
    );
    assert_eq!(
        str_values(&cleaned.frame, "non_use_code"),
        vec![
            Some("Unknown".to_string()),
            Some("Unknown".to_string()),
            Some("25 - Other".to_string()),
        ]
    );
    // A missing location is absent, not a parse failure
    assert!(cleaned.issues.is_empty(), "unexpected issues: {:?}", cleaned.issues);
}

#[test]
fn test_scenario_years_and_centroids() {
    let (_dir, path) = scenario_csv();
    let cleaned = run_pipeline(&path, 100, &MissingConfig::default()).unwrap();

    let years = sales_by_year(&cleaned.frame).unwrap();
    let keys: Vec<i32> = years.rows.iter().map(|r| r.recorded_year).collect();
    assert_eq!(keys, vec![2021, 2022, 2023]);

    let centroids = town_centroids(&cleaned.frame).unwrap();
    assert_eq!(centroids.rows.len(), 2);
    assert_eq!(centroids.ignored_rows, 1);
}

#[test]
fn test_bad_records_counted_not_dropped() {
    let rows = [
        "1,2021,not-a-date,Stamford,a,100,-5,0,Residential,Condo,,,,POINT (-73.5 41.05)",
        "2,2021,2021-11-15,Greenwich,b,100,200,0,Residential,Condo,,,,POINT (oops)",
        "3,2021,2021-11-16,Greenwich,c,100,300,0,Residential,Condo,,,,POINT (-73.6 41.0)",
    ];
    let (_dir, path) = write_csv(FULL_HEADER, &rows);

    let cleaned = run_pipeline(&path, 100, &MissingConfig::default()).unwrap();

    assert_eq!(cleaned.frame.height(), 3);
    assert_eq!(cleaned.issues.count(IssueKind::InvalidRecord), 1);
    assert_eq!(cleaned.issues.count(IssueKind::ParseWarning), 2);

    let by_column = cleaned.issues.by_column();
    assert_eq!(
        by_column[&("date_recorded".to_string(), IssueKind::ParseWarning)],
        1
    );
    assert_eq!(
        by_column[&("location".to_string(), IssueKind::ParseWarning)],
        1
    );

    // The histogram reports the row it could not use
    let histogram = log_sale_histogram(&cleaned.frame, 4).unwrap();
    assert_eq!(histogram.ignored_rows, 1);
    assert_eq!(histogram.rows.iter().map(|b| b.count).sum::<usize>(), 2);
}

#[test]
fn test_schema_error_aborts_before_transformation() {
    let (_dir, path) = write_csv("Town,Sale Amount", &["Stamford,1"]);

    let err = run_pipeline(&path, 100, &MissingConfig::default()).unwrap_err();

    match err {
        PipelineError::Schema { missing, .. } => assert_eq!(missing.len(), 6),
        other => panic!("expected schema error, got {:?}", other),
    }
}

#[test]
fn test_clean_dataset_leaves_input_untouched() {
    let raw = create_raw_dataframe();
    let before = raw.clone();

    let cleaned = clean_dataset(&raw, &MissingConfig::default()).unwrap();

    assert!(raw.equals_missing(&before));
    assert_has_columns(
        &cleaned.frame,
        &[
            "recorded_year",
            "recorded_month",
            "price_per_1k_assessed",
            "log_sale_amount",
            "latitude",
            "longitude",
        ],
    );
    for column in ["residential_type", "non_use_code"] {
        assert_eq!(cleaned.frame.column(column).unwrap().null_count(), 0);
    }
}

#[test]
fn test_summaries_compute_over_cleaned_table() {
    let (_dir, path) = scenario_csv();
    let cleaned = run_pipeline(&path, 100, &MissingConfig::default()).unwrap();

    let summaries = Summaries::compute(&cleaned.frame, 2, 5).unwrap();

    assert_eq!(summaries.top_towns_by_count.rows.len(), 2);
    assert_eq!(summaries.sale_vs_assessed.pairs.len(), 3);
    assert!(summaries.sale_vs_assessed.pearson.is_some());
    assert_eq!(summaries.mean_sale_by_property_type.rows[0].property_type, "Residential");
}

#[test]
fn test_nan_sale_is_counted_not_aggregated() {
    let (_dir, path) = write_csv(
        FULL_HEADER,
        &[
            "1,2022,05/01/2022,Stamford,1 Main St,100000,NaN,0,Residential,Single Family,,,,POINT (-73.5 41.05)",
            "2,2022,05/02/2022,Greenwich,2 Elm St,150000,300000,0.5,Residential,Condo,,,,POINT (-73.6 41.03)",
            "3,2022,05/03/2022,Stamford,3 Oak St,90000,200000,0.45,Residential,Condo,,,,POINT (-73.5 41.06)",
        ],
    );

    let cleaned = run_pipeline(&path, 100, &MissingConfig::default()).unwrap();
    assert_eq!(f64_values(&cleaned.frame, "sale_amount")[0], None);
    assert_eq!(f64_values(&cleaned.frame, "log_sale_amount")[0], None);
    assert_eq!(cleaned.issues.count(IssueKind::ParseWarning), 1);

    let summaries = Summaries::compute(&cleaned.frame, 10, 5).unwrap();
    let by_value = &summaries.top_towns_by_value;
    assert_eq!(by_value.rows[0].town, "Greenwich");
    assert_eq!(by_value.rows[1].town, "Stamford");
    assert!(by_value.rows.iter().all(|r| r.total_sale_amount.is_finite()));
    assert_eq!(by_value.ignored_rows, 1);
    assert_eq!(summaries.sale_vs_assessed.pairs.len(), 2);
    assert_eq!(summaries.sale_vs_assessed.ignored_rows, 1);
}

#[test]
fn test_drop_threshold_keeps_date_parts() {
    let (_dir, path) = write_csv(
        FULL_HEADER,
        &[
            "1,2022,garbage,Stamford,1 Main St,100000,250000,0.4,Residential,Condo,,,,POINT (-73.5 41.05)",
            "2,2022,garbage,Greenwich,2 Elm St,150000,300000,0.5,Residential,Condo,,,,POINT (-73.6 41.03)",
            "3,2022,05/03/2022,Stamford,3 Oak St,90000,200000,0.45,Residential,Condo,,,,POINT (-73.5 41.06)",
        ],
    );
    let config = MissingConfig {
        drop_threshold: Some(0.5),
        ..Default::default()
    };

    let cleaned = run_pipeline(&path, 100, &config).unwrap();

    assert_has_columns(&cleaned.frame, &["recorded_year", "recorded_month"]);
    assert!(!cleaned.dropped_columns.contains(&"recorded_year".to_string()));

    let summaries = Summaries::compute(&cleaned.frame, 10, 5).unwrap();
    assert_eq!(summaries.sales_by_year.rows.len(), 1);
    assert_eq!(summaries.sales_by_year.ignored_rows, 2);
}
