//! Command-line parsing for the clinic CVP analyzer.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the engine and presentation code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{FractionCheck, TierOrderMode};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "cvp",
    version,
    about = "Clinic Cost-Volume-Profit analysis under sliding fee schedules"
)]
pub struct Cli {
    /// Log engine details to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the analysis and print the table, KPI, rankings and profit chart.
    Analyze(AnalyzeArgs),
    /// Print only the total-profitability KPI (useful for scripting).
    Kpi(InputArgs),
    /// Write the built-in sample clinic scenario as JSON.
    Sample(SampleArgs),
    /// Launch the interactive dashboard.
    ///
    /// Edits build a fresh scenario snapshot and rerun the same engine as
    /// `cvp analyze`, rendering the KPI and a profit chart with Ratatui.
    Tui(InputArgs),
}

/// Where the scenario comes from and how the engine treats it.
#[derive(Debug, Args, Clone)]
pub struct InputArgs {
    /// Scenario JSON file (defaults to the built-in sample clinic).
    #[arg(short = 's', long, value_name = "JSON", env = "CVP_SCENARIO")]
    pub scenario: Option<PathBuf>,

    /// Long-format CSV: service,volume,variable_cost_per_unit,tier,price,percentage.
    ///
    /// Takes precedence over --scenario (including one set via CVP_SCENARIO).
    #[arg(long, value_name = "CSV")]
    pub csv: Option<PathBuf>,

    /// Total fixed costs to split evenly across services (overrides the scenario).
    #[arg(short = 'f', long, allow_negative_numbers = true)]
    pub fixed_costs: Option<f64>,

    /// How itemized tier columns are ordered and checked.
    #[arg(long, value_enum, default_value_t = TierOrderMode::First)]
    pub tier_order: TierOrderMode,

    /// Explicit canonical tier order, comma-separated (include "Full Charges" if used).
    #[arg(long, value_delimiter = ',')]
    pub tiers: Option<Vec<String>>,

    /// What to do when a service's tier fractions don't sum to 1.0.
    #[arg(long, value_enum, default_value_t = FractionCheck::Off)]
    pub check_fractions: FractionCheck,
}

/// Options for `cvp analyze`.
#[derive(Debug, Args, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Show the top-N most and least profitable services.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Disable the terminal profit chart.
    #[arg(long)]
    pub no_plot: bool,

    /// Also print breakeven volumes per service.
    #[arg(long)]
    pub breakeven: bool,

    /// Chart width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Service label width in tables and charts.
    #[arg(long, default_value_t = 28)]
    pub label_width: usize,

    /// Export the result table to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export results, totals and breakeven points to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

/// Options for `cvp sample`.
#[derive(Debug, Args)]
pub struct SampleArgs {
    /// Output path (prints to stdout when omitted).
    #[arg(short, long, value_name = "JSON")]
    pub out: Option<PathBuf>,
}
