//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - built once per recompute as an immutable input snapshot (`Scenario`)
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::collections::HashMap;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Tier whose revenue is folded into the totals but never itemized as a column.
pub const FULL_CHARGES_TIER: &str = "Full Charges";

/// A priced clinic service.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    /// Unique key; also the key into the sliding fee schedule.
    pub name: String,
    /// Units sold/delivered over the analysis period.
    pub volume: f64,
    pub variable_cost_per_unit: f64,
}

impl Service {
    pub fn new(name: impl Into<String>, volume: f64, variable_cost_per_unit: f64) -> Self {
        Self {
            name: name.into(),
            volume,
            variable_cost_per_unit,
        }
    }
}

/// One band of a sliding fee schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tier {
    pub unit_price: f64,
    /// Share of the service volume billed at this tier, in `[0, 1]`.
    pub volume_fraction: f64,
}

impl Tier {
    pub fn new(unit_price: f64, volume_fraction: f64) -> Self {
        Self {
            unit_price,
            volume_fraction,
        }
    }
}

/// A service's tiers in insertion order.
///
/// Insertion order drives the output column order, so this is a small ordered
/// list rather than a hash map. Re-inserting an existing name replaces the tier
/// in place and keeps its position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierSet {
    tiers: Vec<(String, Tier)>,
}

impl TierSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tier. Returns the previous tier if the name existed.
    pub fn insert(&mut self, name: impl Into<String>, tier: Tier) -> Option<Tier> {
        let name = name.into();
        if let Some((_, slot)) = self.tiers.iter_mut().find(|(n, _)| *n == name) {
            return Some(std::mem::replace(slot, tier));
        }
        self.tiers.push((name, tier));
        None
    }

    pub fn with(mut self, name: impl Into<String>, tier: Tier) -> Self {
        self.insert(name, tier);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Tier> {
        self.tiers.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tier)> {
        self.tiers.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tiers.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Sum of `volume_fraction` across all tiers (expected to be 1.0).
    pub fn fraction_sum(&self) -> f64 {
        self.tiers.iter().map(|(_, t)| t.volume_fraction).sum()
    }

    /// Average revenue per unit across tiers: `Σ fraction × price`.
    pub fn blended_price(&self) -> f64 {
        self.tiers
            .iter()
            .map(|(_, t)| t.volume_fraction * t.unit_price)
            .sum()
    }
}

impl FromIterator<(String, Tier)> for TierSet {
    fn from_iter<I: IntoIterator<Item = (String, Tier)>>(iter: I) -> Self {
        let mut set = TierSet::new();
        for (name, tier) in iter {
            set.insert(name, tier);
        }
        set
    }
}

/// Per-service tier sets keyed by service name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlidingFeeSchedule {
    entries: HashMap<String, TierSet>,
}

impl SlidingFeeSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, service: impl Into<String>, tiers: TierSet) -> Option<TierSet> {
        self.entries.insert(service.into(), tiers)
    }

    pub fn with(mut self, service: impl Into<String>, tiers: TierSet) -> Self {
        self.insert(service, tiers);
        self
    }

    pub fn get(&self, service: &str) -> Option<&TierSet> {
        self.entries.get(service)
    }

    /// Entries in arbitrary order; callers needing determinism should walk the service list.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TierSet)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Revenue attributed to one itemized tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRevenue {
    pub tier: String,
    pub revenue: f64,
}

/// Engine output for a single service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResult {
    pub name: String,
    pub volume: f64,
    /// Itemized revenue per tier, in tier-set order, without "Full Charges".
    pub tier_revenue: Vec<TierRevenue>,
    pub total_revenue: f64,
    pub total_variable_costs: f64,
    pub allocated_fixed_cost: f64,
    pub total_cost: f64,
    pub profit: f64,
}

impl ServiceResult {
    pub fn revenue_for(&self, tier: &str) -> Option<f64> {
        self.tier_revenue
            .iter()
            .find(|r| r.tier == tier)
            .map(|r| r.revenue)
    }
}

/// The full result table: column order plus one row per service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvpTable {
    /// Itemized tier columns in display order ("Full Charges" removed).
    pub tier_columns: Vec<String>,
    pub results: Vec<ServiceResult>,
}

impl CvpTable {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ServiceResult> {
        self.results.iter()
    }

    /// Sum of profit over all services (the dashboard KPI).
    pub fn total_profitability(&self) -> f64 {
        self.results.iter().map(|r| r.profit).sum()
    }
}

/// An immutable input snapshot for one engine run.
///
/// Editing front-ends build a new snapshot per recompute (see the `with_*`
/// helpers) instead of mutating shared records.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub services: Vec<Service>,
    pub schedule: SlidingFeeSchedule,
    pub total_fixed_costs: f64,
}

impl Scenario {
    pub fn with_fixed_costs(&self, total_fixed_costs: f64) -> Self {
        Self {
            total_fixed_costs,
            ..self.clone()
        }
    }

    /// Copy of the snapshot with one service record replaced.
    pub fn with_service(&self, index: usize, service: Service) -> Self {
        let mut next = self.clone();
        if let Some(slot) = next.services.get_mut(index) {
            *slot = service;
        }
        next
    }

    /// Copy of the snapshot with one tier of one service replaced.
    pub fn with_tier(&self, service: &str, tier: &str, value: Tier) -> Self {
        let mut next = self.clone();
        if let Some(tiers) = next.schedule.entries.get_mut(service) {
            tiers.insert(tier, value);
        }
        next
    }

    pub fn tiers_for(&self, service: &str) -> Option<&TierSet> {
        self.schedule.get(service)
    }
}

/// How the engine decides the itemized tier columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TierOrderMode {
    /// Take the first service's tier order and require every service to match it.
    First,
    /// Follow whichever service was processed last; no consistency check.
    Last,
}

/// What to do when a service's tier fractions do not sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FractionCheck {
    /// Accept whatever the arithmetic yields.
    #[default]
    Off,
    /// Log a warning per unbalanced service and continue.
    Warn,
    /// Reject the run.
    Strict,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus `.env` defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub scenario_path: Option<PathBuf>,
    pub csv_path: Option<PathBuf>,
    /// Overrides the scenario's fixed-cost pool when set.
    pub fixed_costs: Option<f64>,

    pub tier_order: TierOrderMode,
    /// Explicit canonical tier order; wins over `tier_order` when present.
    pub tier_names: Option<Vec<String>>,
    pub fraction_check: FractionCheck,

    pub top_n: usize,
    pub plot: bool,
    pub plot_width: usize,
    pub label_width: usize,
    pub breakeven: bool,

    pub export_results: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            scenario_path: None,
            csv_path: None,
            fixed_costs: None,
            tier_order: TierOrderMode::First,
            tier_names: None,
            fraction_check: FractionCheck::Off,
            top_n: 5,
            plot: true,
            plot_width: 100,
            label_width: 28,
            breakeven: false,
            export_results: None,
            export_json: None,
        }
    }
}
