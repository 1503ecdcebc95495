//! Formatted terminal output: run summary, result table, KPI, rankings.
//!
//! We keep formatting code in one place so:
//! - the engine stays clean and testable
//! - output changes are localized (important for snapshot tests)

use crate::domain::{CvpTable, Scenario, ServiceResult};
use crate::engine::{BreakevenPoint, CvpSummary};
use crate::io::ingest::RowError;
use crate::report::Rankings;

/// Width of every numeric column in the result table.
const NUM_WIDTH: usize = 13;

/// Format the run header (input source, dataset size, clinic totals).
pub fn format_run_summary(source: &str, scenario: &Scenario, summary: &CvpSummary, row_errors: &[RowError]) -> String {
    let mut out = String::new();

    out.push_str("=== cvp - Clinic CVP Analysis ===\n");
    out.push_str(&format!("Source: {source}\n"));
    out.push_str(&format!(
        "Services: n={} | fixed-cost pool={} | per service={}\n",
        summary.services,
        format_currency(scenario.total_fixed_costs),
        format_currency(scenario.total_fixed_costs / summary.services.max(1) as f64),
    ));
    out.push_str(&format!(
        "Revenue={} | Variable={} | Total cost={}\n",
        format_currency(summary.total_revenue),
        format_currency(summary.total_variable_costs),
        format_currency(summary.total_cost),
    ));
    out.push_str(&format!(
        "Profitable: {} | Unprofitable: {}\n",
        summary.profitable, summary.unprofitable
    ));

    if !row_errors.is_empty() {
        out.push_str(&format!("Skipped rows: {}\n", row_errors.len()));
        for err in row_errors.iter().take(10) {
            out.push_str(&format!(
                "  line {}{}: {}\n",
                err.line,
                err.service.as_deref().map(|s| format!(" ({s})")).unwrap_or_default(),
                err.message
            ));
        }
    }

    out
}

/// Format the full per-service result table.
pub fn format_results_table(table: &CvpTable, label_width: usize) -> String {
    let label_width = label_width.max(8);
    let mut out = String::new();

    let mut header = format!("{:<label_width$} {:>10}", "service", "volume");
    for tier in &table.tier_columns {
        header.push_str(&format!(" {:>NUM_WIDTH$}", truncate(tier, NUM_WIDTH)));
    }
    for title in ["revenue", "variable", "fixed", "total_cost", "profit"] {
        header.push_str(&format!(" {title:>NUM_WIDTH$}"));
    }
    out.push_str(header.trim_end());
    out.push('\n');

    let cols = table.tier_columns.len() + 5;
    let mut rule = format!("{:-<label_width$} {:-<10}", "", "");
    for _ in 0..cols {
        rule.push_str(&format!(" {:-<NUM_WIDTH$}", ""));
    }
    out.push_str(&rule);
    out.push('\n');

    for r in table.iter() {
        out.push_str(format_row(r, &table.tier_columns, label_width).trim_end());
        out.push('\n');
    }

    out
}

fn format_row(r: &ServiceResult, tier_columns: &[String], label_width: usize) -> String {
    let mut line = format!(
        "{:<label_width$} {:>10}",
        truncate(&r.name, label_width),
        format_grouped(r.volume, 0)
    );
    for tier in tier_columns {
        let cell = r.revenue_for(tier).map(|v| format_grouped(v, 2)).unwrap_or_else(|| "-".to_string());
        line.push_str(&format!(" {cell:>NUM_WIDTH$}"));
    }
    for v in [
        r.total_revenue,
        r.total_variable_costs,
        r.allocated_fixed_cost,
        r.total_cost,
        r.profit,
    ] {
        line.push_str(&format!(" {:>NUM_WIDTH$}", format_grouped(v, 2)));
    }
    line
}

/// Format the dashboard KPI line.
pub fn format_kpi(table: &CvpTable) -> String {
    format!("Total Profitability: {}", format_currency(table.total_profitability()))
}

/// Format the most/least profitable tables.
pub fn format_rankings(rankings: &Rankings, label_width: usize) -> String {
    let mut out = String::new();

    out.push_str("Most profitable:\n");
    out.push_str(&format_profit_list(&rankings.most, label_width));
    out.push('\n');

    out.push_str("Least profitable:\n");
    out.push_str(&format_profit_list(&rankings.least, label_width));

    out
}

fn format_profit_list(rows: &[ServiceResult], label_width: usize) -> String {
    let mut out = String::new();
    for (idx, r) in rows.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}. {:<label_width$} {:>16}\n",
            idx + 1,
            truncate(&r.name, label_width),
            format_currency(r.profit)
        ));
    }
    out
}

/// Format breakeven volumes per service.
pub fn format_breakeven(points: &[BreakevenPoint], label_width: usize) -> String {
    let label_width = label_width.max(8);
    let mut out = String::new();
    out.push_str(
        format!(
            "{:<label_width$} {:>12} {:>12} {:>12} {:>10} {:>10}",
            "service", "avg_price", "margin/unit", "breakeven", "volume", "headroom"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(&format!(
        "{:-<label_width$} {:-<12} {:-<12} {:-<12} {:-<10} {:-<10}\n",
        "", "", "", "", "", ""
    ));

    for p in points {
        let breakeven = p
            .breakeven_volume
            .map(|v| format_grouped(v, 1))
            .unwrap_or_else(|| "never".to_string());
        let headroom = p
            .volume_headroom()
            .map(|v| format_grouped(v, 1))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(
            format!(
                "{:<label_width$} {:>12} {:>12} {:>12} {:>10} {:>10}",
                truncate(&p.name, label_width),
                format_grouped(p.blended_price, 2),
                format_grouped(p.contribution_margin_per_unit, 2),
                breakeven,
                format_grouped(p.volume, 0),
                headroom,
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

/// Currency with thousands separators and two decimals: `$12,345.67`, `-$1,234.50`.
pub fn format_currency(v: f64) -> String {
    let body = format_grouped(v, 2);
    match body.strip_prefix('-') {
        Some(rest) => format!("-${rest}"),
        None => format!("${body}"),
    }
}

/// Fixed-decimal number with thousands separators (e.g. `1234567.8` -> `1,234,567.80`).
pub fn format_grouped(v: f64, decimals: usize) -> String {
    if !v.is_finite() {
        return v.to_string();
    }

    let digits = format!("{:.*}", decimals, v.abs());
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits.as_str(), None),
    };

    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    // Values that round to zero print without a sign.
    if v < 0.0 && digits.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

fn group_thousands(digits: &str) -> String {
    let chars: Vec<char> = digits.chars().collect();
    let mut result = String::with_capacity(chars.len() + chars.len() / 3);
    for (i, ch) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*ch);
    }
    result
}

/// Truncate to `max` chars, marking the cut with `.`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Service, SlidingFeeSchedule, Tier, TierSet};
    use crate::engine::compute;

    #[test]
    fn currency_formatting() {
        assert_eq!(format_currency(12_345.67), "$12,345.67");
        assert_eq!(format_currency(-1_234.5), "-$1,234.50");
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(-0.001), "$0.00");
        assert_eq!(format_currency(999.0), "$999.00");
        assert_eq!(format_currency(1_234_567.891), "$1,234,567.89");
    }

    #[test]
    fn grouped_numbers() {
        assert_eq!(format_grouped(1000.0, 0), "1,000");
        assert_eq!(format_grouped(123.456, 1), "123.5");
        assert_eq!(format_grouped(-100_000.0, 0), "-100,000");
    }

    #[test]
    fn truncate_marks_cut() {
        assert_eq!(truncate("Endometrial Biopsy", 10), "Endometri.");
        assert_eq!(truncate("HIB", 10), "HIB");
    }

    #[test]
    fn results_table_snapshot() {
        let services = vec![Service::new("A", 100.0, 10.0)];
        let schedule = SlidingFeeSchedule::new().with(
            "A",
            TierSet::new()
                .with("T1", Tier::new(10.0, 0.5))
                .with("T2", Tier::new(20.0, 0.5)),
        );
        let table = compute(&services, &schedule, 1000.0).unwrap();

        let txt = format_results_table(&table, 8);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("service      volume"));
        assert!(lines[2].starts_with("A               100"));
        assert!(lines[2].ends_with("-500.00"));
        assert!(lines[2].contains("1,500.00"));
        assert_eq!(format_kpi(&table), "Total Profitability: -$500.00");
    }
}
