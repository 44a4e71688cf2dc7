//! Run summary report generation

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

use crate::pipeline::{CleanedDataset, IssueKind, Summaries};

/// Counts describing one cleaning run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub input_rows: usize,
    pub output_rows: usize,
    pub output_columns: usize,
    pub dropped_columns: Vec<String>,
    pub filled_cells: usize,
    pub invalid_records: usize,
    pub parse_warnings: usize,
    /// `(table, ignored rows)` for every reduction
    pub ignored_rows: Vec<(String, usize)>,
}

impl RunSummary {
    pub fn new(cleaned: &CleanedDataset) -> Self {
        Self {
            input_rows: cleaned.input_rows,
            output_rows: cleaned.frame.height(),
            output_columns: cleaned.frame.width(),
            dropped_columns: cleaned.dropped_columns.clone(),
            filled_cells: cleaned.filled_counts.iter().map(|(_, n)| n).sum(),
            invalid_records: cleaned.issues.count(IssueKind::InvalidRecord),
            parse_warnings: cleaned.issues.count(IssueKind::ParseWarning),
            ignored_rows: Vec::new(),
        }
    }

    pub fn add_reductions(&mut self, summaries: &Summaries) {
        self.ignored_rows = vec![
            (
                "top_towns_by_count".to_string(),
                summaries.top_towns_by_count.ignored_rows,
            ),
            (
                "top_towns_by_value".to_string(),
                summaries.top_towns_by_value.ignored_rows,
            ),
            (
                "mean_sale_by_property_type".to_string(),
                summaries.mean_sale_by_property_type.ignored_rows,
            ),
            (
                "sales_by_year".to_string(),
                summaries.sales_by_year.ignored_rows,
            ),
            (
                "log_sale_histogram".to_string(),
                summaries.log_sale_histogram.ignored_rows,
            ),
            (
                "sale_vs_assessed".to_string(),
                summaries.sale_vs_assessed.ignored_rows,
            ),
            (
                "town_centroids".to_string(),
                summaries.town_centroids.ignored_rows,
            ),
        ];
    }

    fn count_cell(count: usize) -> Cell {
        Cell::new(count).fg(if count == 0 { Color::White } else { Color::Yellow })
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("RUN SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("📁 Input Rows"), Cell::new(self.input_rows)]);
        table.add_row(vec![
            Cell::new("✅ Cleaned Rows"),
            Cell::new(self.output_rows)
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
        table.add_row(vec![
            Cell::new("📐 Cleaned Columns"),
            Cell::new(self.output_columns),
        ]);
        table.add_row(vec![
            Cell::new("🗑️  Dropped Columns"),
            Self::count_cell(self.dropped_columns.len()),
        ]);
        table.add_row(vec![
            Cell::new("🏷️  Sentinel-filled Cells"),
            Self::count_cell(self.filled_cells),
        ]);
        table.add_row(vec![
            Cell::new("❌ Invalid Records"),
            Cell::new(self.invalid_records).fg(if self.invalid_records == 0 {
                Color::White
            } else {
                Color::Red
            }),
        ]);
        table.add_row(vec![
            Cell::new("⚠️  Parse Warnings"),
            Self::count_cell(self.parse_warnings),
        ]);

        // Indent the table
        for line in table.to_string().lines() {
            println!("    {}", line);
        }

        if !self.ignored_rows.is_empty() {
            println!();
            println!(
                "    {} {}",
                style("📝").cyan(),
                style("ROWS IGNORED PER TABLE").white().bold()
            );
            println!("    {}", style("─".repeat(50)).dim());

            let mut ignored = Table::new();
            ignored.load_preset(UTF8_FULL_CONDENSED);
            ignored.set_header(vec![
                Cell::new("Table").add_attribute(Attribute::Bold),
                Cell::new("Ignored Rows").add_attribute(Attribute::Bold),
            ]);
            for (name, count) in &self.ignored_rows {
                ignored.add_row(vec![Cell::new(name), Self::count_cell(*count)]);
            }
            for line in ignored.to_string().lines() {
                println!("    {}", line);
            }
        }

        if !self.dropped_columns.is_empty() {
            println!();
            println!(
                "      {} {}:",
                style("Dropped Columns").yellow(),
                style(format!("({})", self.dropped_columns.len())).dim()
            );
            for column in &self.dropped_columns {
                println!("        {} {}", style("•").dim(), column);
            }
        }
    }
}
