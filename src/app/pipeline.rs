//! Shared analysis pipeline used by both CLI and TUI front-ends.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load scenario -> engine -> summary -> rankings -> breakeven
//!
//! The CLI and the TUI can then focus on presentation (printing vs widgets).

use std::fmt;
use std::path::PathBuf;

use tracing::info;

use crate::data::sample_scenario;
use crate::domain::{CvpTable, RunConfig, Scenario, TierOrderMode};
use crate::engine::{BreakevenPoint, CvpOptions, CvpSummary, TierOrder, breakeven_points, compute_scenario};
use crate::error::AppError;
use crate::io::ingest::{RowError, load_scenario_csv};
use crate::io::scenario::read_scenario_json;
use crate::report::{Rankings, rank_by_profit};

/// Where a scenario was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioSource {
    Sample,
    Json(PathBuf),
    Csv(PathBuf),
}

impl fmt::Display for ScenarioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioSource::Sample => write!(f, "built-in sample clinic"),
            ScenarioSource::Json(path) => write!(f, "{} (json)", path.display()),
            ScenarioSource::Csv(path) => write!(f, "{} (csv)", path.display()),
        }
    }
}

/// A scenario plus what the loader had to say about it.
#[derive(Debug, Clone)]
pub struct LoadedScenario {
    pub source: ScenarioSource,
    pub scenario: Scenario,
    pub row_errors: Vec<RowError>,
}

/// All computed outputs of a single analysis run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub scenario: Scenario,
    pub table: CvpTable,
    pub summary: CvpSummary,
    pub rankings: Rankings,
    pub breakeven: Vec<BreakevenPoint>,
}

/// Resolve the configured input into a scenario snapshot.
///
/// CSV wins over JSON; with neither, the built-in sample is used. A
/// `--fixed-costs` override applies to every source.
pub fn load_scenario(config: &RunConfig) -> Result<LoadedScenario, AppError> {
    if let Some(path) = &config.csv_path {
        let ingested = load_scenario_csv(path, config.fixed_costs)?;
        info!(
            rows_read = ingested.rows_read,
            rows_used = ingested.rows_used,
            skipped = ingested.row_errors.len(),
            "loaded CSV scenario"
        );
        return Ok(LoadedScenario {
            source: ScenarioSource::Csv(path.clone()),
            scenario: ingested.scenario,
            row_errors: ingested.row_errors,
        });
    }

    if let Some(path) = &config.scenario_path {
        let scenario = read_scenario_json(path, config.fixed_costs)?;
        return Ok(LoadedScenario {
            source: ScenarioSource::Json(path.clone()),
            scenario,
            row_errors: Vec::new(),
        });
    }

    let mut scenario = sample_scenario();
    if let Some(fixed) = config.fixed_costs {
        scenario = scenario.with_fixed_costs(fixed);
    }
    Ok(LoadedScenario {
        source: ScenarioSource::Sample,
        scenario,
        row_errors: Vec::new(),
    })
}

/// Translate run configuration into engine options.
pub fn engine_options(config: &RunConfig) -> CvpOptions {
    let tier_order = match (&config.tier_names, config.tier_order) {
        (Some(names), _) => TierOrder::Explicit(
            names
                .iter()
                .map(|n| n.trim())
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        (None, TierOrderMode::First) => TierOrder::FirstService,
        (None, TierOrderMode::Last) => TierOrder::LastProcessed,
    };
    CvpOptions {
        tier_order,
        fraction_check: config.fraction_check,
    }
}

/// Load the configured scenario and run the full analysis.
pub fn run_analysis(config: &RunConfig) -> Result<(LoadedScenario, RunOutput), AppError> {
    let loaded = load_scenario(config)?;
    let output = run_with_scenario(loaded.scenario.clone(), &engine_options(config), config.top_n)?;
    Ok((loaded, output))
}

/// Run the analysis over an already-built snapshot.
///
/// The TUI calls this after every edit; nothing is cached between calls.
pub fn run_with_scenario(scenario: Scenario, options: &CvpOptions, top_n: usize) -> Result<RunOutput, AppError> {
    let table = compute_scenario(&scenario, options)?;
    let summary = CvpSummary::from_table(&table);
    let rankings = rank_by_profit(&table, top_n);
    let breakeven = breakeven_points(&scenario, &table)?;

    Ok(RunOutput {
        scenario,
        table,
        summary,
        rankings,
        breakeven,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SAMPLE_FIXED_COSTS, sample_tier_names};
    use crate::domain::FractionCheck;

    #[test]
    fn sample_is_the_default_source() {
        let loaded = load_scenario(&RunConfig::default()).unwrap();
        assert_eq!(loaded.source, ScenarioSource::Sample);
        assert_eq!(loaded.scenario.total_fixed_costs, SAMPLE_FIXED_COSTS);
    }

    #[test]
    fn fixed_cost_override_applies_to_sample() {
        let config = RunConfig {
            fixed_costs: Some(0.0),
            ..RunConfig::default()
        };
        let (loaded, out) = run_analysis(&config).unwrap();
        assert_eq!(loaded.scenario.total_fixed_costs, 0.0);
        assert!(out.table.iter().all(|r| r.allocated_fixed_cost == 0.0));
    }

    #[test]
    fn explicit_tier_names_win_over_mode() {
        let config = RunConfig {
            tier_order: TierOrderMode::Last,
            tier_names: Some(vec!["A".to_string()]),
            fraction_check: FractionCheck::Warn,
            ..RunConfig::default()
        };
        let opts = engine_options(&config);
        assert_eq!(opts.tier_order, TierOrder::Explicit(vec!["A".to_string()]));
        assert_eq!(opts.fraction_check, FractionCheck::Warn);
    }

    #[test]
    fn explicit_tier_names_are_trimmed() {
        let config = RunConfig {
            tier_names: Some(
                "Slide A, Slide B , Slide C,Slide D,  Slide E,Full Charges,"
                    .split(',')
                    .map(str::to_string)
                    .collect(),
            ),
            ..RunConfig::default()
        };
        assert_eq!(engine_options(&config).tier_order, TierOrder::Explicit(sample_tier_names()));

        // The trimmed order matches the sample schedule, so the run succeeds.
        let (_, out) = run_analysis(&config).unwrap();
        assert_eq!(out.table.tier_columns.len(), 5);
    }

    #[test]
    fn sample_run_produces_full_output() {
        let config = RunConfig {
            tier_names: Some(sample_tier_names()),
            fraction_check: FractionCheck::Strict,
            top_n: 3,
            ..RunConfig::default()
        };
        let (_, out) = run_analysis(&config).unwrap();
        assert_eq!(out.table.len(), out.scenario.services.len());
        assert_eq!(out.breakeven.len(), out.table.len());
        assert_eq!(out.rankings.most.len(), 3);
        assert_eq!(out.summary.profitable + out.summary.unprofitable, out.table.len());
    }

    #[test]
    fn engine_errors_map_to_exit_code_three() {
        let mut scenario = sample_scenario();
        scenario.services.clear();
        let err = run_with_scenario(scenario, &CvpOptions::default(), 5).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn missing_json_is_an_input_error() {
        let config = RunConfig {
            scenario_path: Some(PathBuf::from("/definitely/not/here.json")),
            ..RunConfig::default()
        };
        let err = load_scenario(&config).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
