//! ASCII bar chart of profit per service for terminal output.
//!
//! This is intentionally "dumb" (fixed-width rows), optimized for:
//! - long service lists (one row per service, so labels never collide)
//! - deterministic output (helpful for golden tests)
//!
//! Bars are drawn in input order; nothing is re-sorted by magnitude.
//!
//! Plot elements:
//! - zero axis: `|`
//! - profit: `#` to the right of the axis
//! - loss: `=` to the left of the axis

use crate::domain::CvpTable;
use crate::report::{format_currency, truncate};

/// Right-aligned value column width.
const VALUE_WIDTH: usize = 14;
const MIN_BAR_WIDTH: usize = 10;

/// Render one horizontal bar per service.
pub fn render_profit_bars(table: &CvpTable, width: usize, label_width: usize) -> String {
    if table.is_empty() {
        return "Profit per service: (no services)\n".to_string();
    }

    let label_width = label_width.max(4);
    let bar_width = width
        .saturating_sub(label_width + VALUE_WIDTH + 2)
        .max(MIN_BAR_WIDTH);

    let (lo, hi) = profit_range(table);
    let zero = map_x(0.0, lo, hi, bar_width);

    let mut out = String::new();
    out.push_str(&format!(
        "Profit per service: n={} | range=[{}, {}]\n",
        table.len(),
        format_currency(lo),
        format_currency(hi)
    ));

    for r in table.iter() {
        let mut bar = vec![' '; bar_width];
        if r.profit.is_finite() {
            let x = map_x(r.profit, lo, hi, bar_width);
            if x > zero {
                bar[zero + 1..=x].iter_mut().for_each(|c| *c = '#');
            } else if x < zero {
                bar[x..zero].iter_mut().for_each(|c| *c = '=');
            }
        }
        bar[zero] = '|';

        let line = format!(
            "{:<label_width$} {} {:>VALUE_WIDTH$}",
            truncate(&r.name, label_width),
            bar.into_iter().collect::<String>(),
            format_currency(r.profit)
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }

    out
}

/// Profit range with zero always included so the axis is visible.
fn profit_range(table: &CvpTable) -> (f64, f64) {
    let mut lo = 0.0_f64;
    let mut hi = 0.0_f64;
    for r in table.iter().filter(|r| r.profit.is_finite()) {
        lo = lo.min(r.profit);
        hi = hi.max(r.profit);
    }
    if hi - lo < 1e-12 {
        hi = lo + 1.0;
    }
    (lo, hi)
}

fn map_x(v: f64, lo: f64, hi: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((v - lo) / (hi - lo)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}
