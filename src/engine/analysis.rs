//! Aggregates and breakeven metrics derived from a computed table.

use serde::Serialize;

use crate::domain::{CvpTable, Scenario};
use crate::engine::CvpError;

/// Clinic-wide totals over a result table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CvpSummary {
    pub services: usize,
    pub total_revenue: f64,
    pub total_variable_costs: f64,
    pub total_fixed_costs: f64,
    pub total_cost: f64,
    pub total_profit: f64,
    pub profitable: usize,
    pub unprofitable: usize,
}

impl CvpSummary {
    pub fn from_table(table: &CvpTable) -> Self {
        let mut summary = CvpSummary {
            services: table.len(),
            total_revenue: 0.0,
            total_variable_costs: 0.0,
            total_fixed_costs: 0.0,
            total_cost: 0.0,
            total_profit: 0.0,
            profitable: 0,
            unprofitable: 0,
        };
        for r in table.iter() {
            summary.total_revenue += r.total_revenue;
            summary.total_variable_costs += r.total_variable_costs;
            summary.total_fixed_costs += r.allocated_fixed_cost;
            summary.total_cost += r.total_cost;
            summary.total_profit += r.profit;
            if r.profit >= 0.0 {
                summary.profitable += 1;
            } else {
                summary.unprofitable += 1;
            }
        }
        summary
    }
}

/// Breakeven position of one service under its blended tier price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakevenPoint {
    pub name: String,
    /// `Σ fraction × price` across the service's tiers.
    pub blended_price: f64,
    pub contribution_margin_per_unit: f64,
    /// Units needed to cover the allocated fixed cost; `None` when every unit loses money.
    pub breakeven_volume: Option<f64>,
    pub volume: f64,
}

impl BreakevenPoint {
    /// Positive when the current volume is above breakeven.
    pub fn volume_headroom(&self) -> Option<f64> {
        self.breakeven_volume.map(|b| self.volume - b)
    }
}

/// Breakeven volumes for every row of `table`, using the scenario the table was computed from.
pub fn breakeven_points(scenario: &Scenario, table: &CvpTable) -> Result<Vec<BreakevenPoint>, CvpError> {
    let mut out = Vec::with_capacity(table.len());
    for (service, result) in scenario.services.iter().zip(table.iter()) {
        let tiers = scenario
            .tiers_for(&service.name)
            .ok_or_else(|| CvpError::MissingSchedule {
                service: service.name.clone(),
            })?;

        let blended_price = tiers.blended_price();
        let margin = blended_price - service.variable_cost_per_unit;
        let breakeven_volume = if margin > 0.0 {
            Some(result.allocated_fixed_cost / margin)
        } else {
            None
        };

        out.push(BreakevenPoint {
            name: service.name.clone(),
            blended_price,
            contribution_margin_per_unit: margin,
            breakeven_volume,
            volume: service.volume,
        });
    }
    Ok(out)
}
