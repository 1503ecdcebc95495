//! Export the result table to CSV and JSON.
//!
//! The CSV keeps one flat row per service so it opens cleanly in a
//! spreadsheet; the JSON adds totals and breakeven figures for scripts.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::Local;
use serde::Serialize;

use crate::domain::{CvpTable, ServiceResult};
use crate::engine::{BreakevenPoint, CvpSummary};
use crate::error::AppError;

/// Fixed trailing columns after the itemized tiers.
const TOTAL_COLUMNS: [&str; 5] = [
    "Total Revenue",
    "Total Variable Costs",
    "Fixed Costs",
    "Total Costs",
    "Profit",
];

/// Write the result table as CSV to a file.
pub fn write_results_csv(path: &Path, table: &CvpTable) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_results_csv_to(file, table)
}

/// Write the result table as CSV to any writer.
pub fn write_results_csv_to<W: Write>(out: W, table: &CvpTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);

    let mut header: Vec<&str> = vec!["Service", "Volume"];
    header.extend(table.tier_columns.iter().map(String::as_str));
    header.extend(TOTAL_COLUMNS);
    writer
        .write_record(&header)
        .map_err(|e| AppError::input(format!("Failed to write export CSV header: {e}")))?;

    for r in table.iter() {
        writer
            .write_record(csv_row(r, &table.tier_columns))
            .map_err(|e| AppError::input(format!("Failed to write export CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::input(format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

fn csv_row(r: &ServiceResult, tier_columns: &[String]) -> Vec<String> {
    let mut row = Vec::with_capacity(tier_columns.len() + 7);
    row.push(r.name.clone());
    row.push(fmt_num(r.volume));
    for tier in tier_columns {
        // Blank when this service's tier set lacks the column.
        row.push(r.revenue_for(tier).map(fmt_num).unwrap_or_default());
    }
    for v in [
        r.total_revenue,
        r.total_variable_costs,
        r.allocated_fixed_cost,
        r.total_cost,
        r.profit,
    ] {
        row.push(fmt_num(v));
    }
    row
}

fn fmt_num(v: f64) -> String {
    format!("{v:.4}")
}

/// JSON export schema.
#[derive(Debug, Serialize)]
pub struct ResultsFile<'a> {
    pub tool: &'static str,
    pub generated: String,
    pub total_fixed_costs: f64,
    pub total_profitability: f64,
    pub summary: CvpSummary,
    pub tier_columns: &'a [String],
    pub results: &'a [ServiceResult],
    pub breakeven: &'a [BreakevenPoint],
}

/// Write results, totals and breakeven points as pretty JSON.
pub fn write_results_json(
    path: &Path,
    table: &CvpTable,
    total_fixed_costs: f64,
    breakeven: &[BreakevenPoint],
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create export JSON '{}': {e}", path.display())))?;

    let doc = ResultsFile {
        tool: "cvp",
        generated: Local::now().to_rfc3339(),
        total_fixed_costs,
        total_profitability: table.total_profitability(),
        summary: CvpSummary::from_table(table),
        tier_columns: &table.tier_columns,
        results: &table.results,
        breakeven,
    };

    serde_json::to_writer_pretty(file, &doc)
        .map_err(|e| AppError::input(format!("Failed to write export JSON: {e}")))?;
    Ok(())
}
