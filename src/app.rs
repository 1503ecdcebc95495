//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs the tracing subscriber
//! - runs the CVP pipeline
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{AnalyzeArgs, Command, InputArgs, SampleArgs};
use crate::domain::RunConfig;
use crate::error::AppError;
use crate::logging::{CLI_LEVEL, TUI_LEVEL, VERBOSE_LEVEL, init_tracing};

pub mod pipeline;

/// Entry point for the `cvp` binary.
pub fn run() -> Result<(), AppError> {
    // `.env` may set CVP_SCENARIO and RUST_LOG; a missing file is fine.
    let _ = dotenvy::dotenv();

    // We want `cvp` and `cvp -s clinic.json` to behave like `cvp tui ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let level = if cli.verbose { VERBOSE_LEVEL } else { CLI_LEVEL };
    match cli.command {
        Command::Analyze(args) => {
            init_tracing(level);
            handle_analyze(args)
        }
        Command::Kpi(args) => {
            init_tracing(level);
            handle_kpi(args)
        }
        Command::Sample(args) => {
            init_tracing(level);
            handle_sample(args)
        }
        Command::Tui(args) => {
            // Log lines would tear the alternate screen.
            init_tracing(if cli.verbose { level } else { TUI_LEVEL });
            handle_tui(args)
        }
    }
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let (loaded, run) = pipeline::run_analysis(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&loaded.source.to_string(), &run.scenario, &run.summary, &loaded.row_errors)
    );
    println!("{}", crate::report::format_results_table(&run.table, config.label_width));
    println!("{}\n", crate::report::format_kpi(&run.table));
    println!("{}", crate::report::format_rankings(&run.rankings, config.label_width));

    if config.breakeven {
        println!("{}", crate::report::format_breakeven(&run.breakeven, config.label_width));
    }

    if config.plot {
        let plot = crate::plot::render_profit_bars(&run.table, config.plot_width, config.label_width);
        println!("{plot}");
    }

    // Optional exports.
    if let Some(path) = &config.export_results {
        crate::io::export::write_results_csv(path, &run.table)?;
        eprintln!("Wrote {}", path.display());
    }
    if let Some(path) = &config.export_json {
        crate::io::export::write_results_json(path, &run.table, run.scenario.total_fixed_costs, &run.breakeven)?;
        eprintln!("Wrote {}", path.display());
    }

    Ok(())
}

fn handle_kpi(args: InputArgs) -> Result<(), AppError> {
    let config = run_config_from_input(&args);
    let (_, run) = pipeline::run_analysis(&config)?;
    println!("{}", crate::report::format_kpi(&run.table));
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let scenario = crate::data::sample_scenario();
    match &args.out {
        Some(path) => {
            crate::io::scenario::write_scenario_json(path, &scenario)?;
            eprintln!("Wrote {}", path.display());
        }
        None => {
            let doc = crate::io::scenario::ScenarioFile::from_scenario(&scenario);
            let json = serde_json::to_string_pretty(&doc)
                .map_err(|e| AppError::input(format!("Failed to serialize sample scenario: {e}")))?;
            println!("{json}");
        }
    }
    Ok(())
}

fn handle_tui(args: InputArgs) -> Result<(), AppError> {
    crate::tui::run(run_config_from_input(&args))
}

/// Build the pipeline configuration for `cvp analyze`.
pub fn run_config_from_args(args: &AnalyzeArgs) -> RunConfig {
    RunConfig {
        top_n: args.top,
        plot: !args.no_plot,
        plot_width: args.width,
        label_width: args.label_width,
        breakeven: args.breakeven,
        export_results: args.export.clone(),
        export_json: args.export_json.clone(),
        ..run_config_from_input(&args.input)
    }
}

/// Build the pipeline configuration from input flags only (`kpi`, `tui`).
pub fn run_config_from_input(args: &InputArgs) -> RunConfig {
    RunConfig {
        scenario_path: args.scenario.clone(),
        csv_path: args.csv.clone(),
        fixed_costs: args.fixed_costs,
        tier_order: args.tier_order,
        tier_names: args.tiers.clone(),
        fraction_check: args.check_fractions,
        ..RunConfig::default()
    }
}

/// Rewrite argv so `cvp` defaults to `cvp tui`.
///
/// Rules:
/// - `cvp`                      -> `cvp tui`
/// - `cvp -s clinic.json ...`   -> `cvp tui -s clinic.json ...`
/// - `cvp -v analyze ...`       -> unchanged (global flag before a subcommand)
/// - `cvp --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(arg1.as_str(), "-h" | "--help" | "-V" | "--version" | "help");
    if is_top_level_help_or_version {
        return argv;
    }

    if is_subcommand(&arg1) {
        return argv;
    }

    // Global flags may precede a subcommand (`cvp -v analyze`).
    if argv[1..].iter().any(|a| is_subcommand(a)) {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

fn is_subcommand(arg: &str) -> bool {
    matches!(arg, "analyze" | "kpi" | "sample" | "tui")
}
