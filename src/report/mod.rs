//! Reporting utilities: rankings and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::{CvpTable, ServiceResult};

/// Most/least profitable services (top-N each side).
#[derive(Debug, Clone)]
pub struct Rankings {
    pub most: Vec<ServiceResult>,
    pub least: Vec<ServiceResult>,
}

/// Rank services by profit. Ties keep input order.
pub fn rank_by_profit(table: &CvpTable, top_n: usize) -> Rankings {
    let mut sorted = table.results.clone();
    sorted.sort_by(|a, b| b.profit.partial_cmp(&a.profit).unwrap_or(std::cmp::Ordering::Equal));
    let most = sorted.iter().take(top_n).cloned().collect();

    let mut sorted_least = table.results.clone();
    sorted_least.sort_by(|a, b| a.profit.partial_cmp(&b.profit).unwrap_or(std::cmp::Ordering::Equal));
    let least = sorted_least.iter().take(top_n).cloned().collect();

    Rankings { most, least }
}
