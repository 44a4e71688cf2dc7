//! Salescope: Property Sales Cleaning CLI
//!
//! Cleans a property sales extract and writes the summary tables consumed
//! by the dashboard.

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use salescope::cli::Cli;
use salescope::config::CleaningConfig;
use salescope::pipeline::{
    clean_dataset, load_dataset_with_stats, IssueKind, Summaries,
};
use salescope::report::{export_all, RunSummary};
use salescope::utils::{
    create_spinner, finish_with_success, finish_with_warning, init_logging, print_banner,
    print_completion, print_config, print_count, print_info, print_step_header, print_step_time,
    print_success, print_warning,
};

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let base = match &cli.config {
        Some(path) => CleaningConfig::from_json_file(path)?,
        None => CleaningConfig::default(),
    };
    let config = cli.apply_overrides(base);
    config.validate()?;

    let output_dir = cli.output_dir();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(
        &cli.input,
        &output_dir,
        &config.missing.sentinel,
        config.top_n,
        config.histogram_bins,
    );

    // Step 1: Load dataset
    print_step_header(1, "Load Dataset");
    let step_start = Instant::now();
    let spinner = create_spinner("Reading file...");
    let (raw, stats) = load_dataset_with_stats(&cli.input, config.infer_schema_length)
        .with_context(|| format!("Could not load {}", cli.input.display()))?;
    finish_with_success(&spinner, "Dataset loaded");

    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", stats.rows);
    println!("      Columns: {}", stats.columns);
    println!("      Estimated memory: {:.2} MB", stats.memory_mb);
    print_step_time(step_start.elapsed());

    // Step 2: Clean
    print_step_header(2, "Clean & Derive Features");
    let step_start = Instant::now();
    let spinner = create_spinner("Normalizing, resolving missing data, deriving features...");
    let cleaned = clean_dataset(&raw, &config.missing).context("Cleaning failed")?;
    if cleaned.issues.is_empty() {
        finish_with_success(&spinner, "Cleaning complete");
    } else {
        finish_with_warning(&spinner, "Cleaning complete with record issues");
    }

    if cleaned.dropped_columns.is_empty() {
        print_info("No columns dropped");
    } else {
        print_count(
            "column(s) dropped",
            cleaned.dropped_columns.len(),
            Some(&format!("({})", cleaned.dropped_columns.join(", "))),
        );
    }
    for (column, count) in &cleaned.filled_counts {
        print_count(
            &format!("missing value(s) in '{}'", column),
            *count,
            Some(&format!("→ '{}'", config.missing.sentinel)),
        );
    }
    let invalid = cleaned.issues.count(IssueKind::InvalidRecord);
    let warnings = cleaned.issues.count(IssueKind::ParseWarning);
    if invalid > 0 {
        print_warning(&format!("{} invalid record(s), derived fields left empty", invalid));
    }
    if warnings > 0 {
        print_warning(&format!("{} value(s) failed to parse and were left empty", warnings));
    }
    print_step_time(step_start.elapsed());

    // Step 3: Reduce
    print_step_header(3, "Summary Tables");
    let step_start = Instant::now();
    let summaries = Summaries::compute(&cleaned.frame, config.top_n, config.histogram_bins)
        .context("Failed to compute summary tables")?;
    print_success("Summary tables computed");
    print_step_time(step_start.elapsed());

    // Step 4: Export
    if cli.no_export {
        print_info("Export skipped (--no-export)");
    } else {
        print_step_header(4, "Export");
        let step_start = Instant::now();
        let spinner = create_spinner("Writing output files...");
        let written = export_all(&cleaned, &summaries, &config, &cli.input, &output_dir)?;
        finish_with_success(
            &spinner,
            &format!("Wrote {} file(s) to {}", written.len(), output_dir.display()),
        );
        print_step_time(step_start.elapsed());
    }

    let mut summary = RunSummary::new(&cleaned);
    summary.add_reductions(&summaries);
    summary.display();

    print_completion();

    Ok(())
}
