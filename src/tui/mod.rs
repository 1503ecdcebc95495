//! Ratatui-based terminal UI.
//!
//! The dashboard lists every service with its profit, lets the user edit
//! volume, unit cost, tier prices/shares and the fixed-cost pool, and
//! re-runs the engine on a fresh scenario snapshot after each edit.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::app::pipeline::{RunOutput, ScenarioSource, engine_options, load_scenario, run_with_scenario};
use crate::domain::{RunConfig, Scenario, Service, Tier};
use crate::engine::CvpOptions;
use crate::error::AppError;
use crate::report::{format_currency, format_grouped, format_kpi, truncate};

mod plotters_chart;

use plotters_chart::ProfitBarsChart;

const VOLUME_STEP: f64 = 10.0;
const COST_STEP: f64 = 1.0;
const PRICE_STEP: f64 = 1.0;
const SHARE_STEP: f64 = 0.01;
const FIXED_COST_STEP: f64 = 1_000.0;

const DEFAULT_EXPORT: &str = "cvp_results.csv";
const DEFAULT_SAVE: &str = "cvp_scenario.json";

/// Start the TUI.
pub fn run(config: RunConfig) -> Result<(), AppError> {
    // Load and compute before touching the terminal so input errors print normally.
    let mut app = App::new(config)?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::runtime(format!("Failed to initialize terminal: {e}")))?;

    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::runtime(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::runtime(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Services,
    Fields,
}

/// An editable input of the selected service (or the clinic-wide pool).
#[derive(Debug, Clone, PartialEq)]
enum Field {
    Volume,
    UnitCost,
    TierPrice(String),
    TierShare(String),
    FixedCosts,
}

struct App {
    config: RunConfig,
    options: CvpOptions,
    source: ScenarioSource,
    baseline: Scenario,
    scenario: Scenario,
    /// Last successful run; kept on screen when an edit is rejected.
    run: RunOutput,
    stale: bool,
    focus: Focus,
    selected_service: usize,
    selected_field: usize,
    status: String,
}

impl App {
    fn new(config: RunConfig) -> Result<Self, AppError> {
        let loaded = load_scenario(&config)?;
        let options = engine_options(&config);
        let run = run_with_scenario(loaded.scenario.clone(), &options, config.top_n)?;

        let mut status = format!("Loaded {} services from {}", loaded.scenario.services.len(), loaded.source);
        if !loaded.row_errors.is_empty() {
            status.push_str(&format!(" ({} rows skipped)", loaded.row_errors.len()));
        }

        Ok(Self {
            config,
            options,
            source: loaded.source,
            baseline: loaded.scenario.clone(),
            scenario: loaded.scenario,
            run,
            stale: false,
            focus: Focus::Services,
            selected_service: 0,
            selected_field: 0,
            status,
        })
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::runtime(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::runtime(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::runtime(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => {
                self.focus = match self.focus {
                    Focus::Services => Focus::Fields,
                    Focus::Fields => Focus::Services,
                };
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Left => self.adjust_field(-1.0),
            KeyCode::Right => self.adjust_field(1.0),
            KeyCode::Char('r') => {
                let baseline = self.baseline.clone();
                self.apply(baseline, "Reset to loaded scenario".to_string());
            }
            KeyCode::Char('e') => self.export_results(),
            KeyCode::Char('s') => self.save_scenario(),
            _ => {}
        }
        false
    }

    fn move_selection(&mut self, delta: isize) {
        match self.focus {
            Focus::Services => {
                let n = self.scenario.services.len();
                self.selected_service = step_index(self.selected_service, delta, n);
                let fields = self.fields().len();
                self.selected_field = self.selected_field.min(fields.saturating_sub(1));
            }
            Focus::Fields => {
                self.selected_field = step_index(self.selected_field, delta, self.fields().len());
            }
        }
    }

    /// Editable fields for the selected service, in display order.
    fn fields(&self) -> Vec<Field> {
        let mut fields = vec![Field::Volume, Field::UnitCost];
        if let Some(tiers) = self
            .selected()
            .and_then(|service| self.scenario.tiers_for(&service.name))
        {
            for name in tiers.names() {
                fields.push(Field::TierPrice(name.to_string()));
                fields.push(Field::TierShare(name.to_string()));
            }
        }
        fields.push(Field::FixedCosts);
        fields
    }

    fn selected(&self) -> Option<&Service> {
        self.scenario.services.get(self.selected_service)
    }

    fn adjust_field(&mut self, direction: f64) {
        if self.focus != Focus::Fields {
            self.status = "Tab to the fields panel to edit values.".to_string();
            return;
        }
        let Some(service) = self.selected().cloned() else {
            return;
        };
        let fields = self.fields();
        let Some(field) = fields.get(self.selected_field) else {
            return;
        };

        let idx = self.selected_service;
        let (next, what) = match field {
            Field::Volume => {
                let volume = (service.volume + direction * VOLUME_STEP).max(0.0);
                let what = format!("{}: volume {}", service.name, format_grouped(volume, 0));
                (self.scenario.with_service(idx, Service { volume, ..service }), what)
            }
            Field::UnitCost => {
                let cost = (service.variable_cost_per_unit + direction * COST_STEP).max(0.0);
                let what = format!("{}: unit cost {}", service.name, format_currency(cost));
                let next = self.scenario.with_service(
                    idx,
                    Service {
                        variable_cost_per_unit: cost,
                        ..service
                    },
                );
                (next, what)
            }
            Field::TierPrice(tier) | Field::TierShare(tier) => {
                let Some(current) = self.tier(&service.name, tier) else {
                    return;
                };
                let (value, what) = if matches!(field, Field::TierPrice(_)) {
                    let price = (current.unit_price + direction * PRICE_STEP).max(0.0);
                    let what = format!("{}: {tier} price {}", service.name, format_currency(price));
                    (Tier::new(price, current.volume_fraction), what)
                } else {
                    // Round so repeated steps land on whole percentages.
                    let share = ((current.volume_fraction + direction * SHARE_STEP) * 100.0).round() / 100.0;
                    let share = share.clamp(0.0, 1.0);
                    let what = format!("{}: {tier} share {}%", service.name, format_grouped(share * 100.0, 0));
                    (Tier::new(current.unit_price, share), what)
                };
                (self.scenario.with_tier(&service.name, tier, value), what)
            }
            Field::FixedCosts => {
                let fixed = (self.scenario.total_fixed_costs + direction * FIXED_COST_STEP).max(0.0);
                let what = format!("fixed costs {}", format_currency(fixed));
                (self.scenario.with_fixed_costs(fixed), what)
            }
        };

        self.apply(next, what);
    }

    fn tier(&self, service: &str, tier: &str) -> Option<Tier> {
        self.scenario.tiers_for(service).and_then(|tiers| tiers.get(tier)).copied()
    }

    /// Adopt `next` as the current snapshot and recompute.
    ///
    /// A rejected snapshot is still kept so multi-step edits (e.g. moving
    /// share between two tiers) can pass through an invalid state.
    fn apply(&mut self, next: Scenario, what: String) {
        match run_with_scenario(next.clone(), &self.options, self.config.top_n) {
            Ok(run) => {
                self.run = run;
                self.stale = false;
                self.status = what;
            }
            Err(err) => {
                self.stale = true;
                self.status = format!("{what} | {err}");
            }
        }
        self.scenario = next;
    }

    fn export_results(&mut self) {
        let path = self
            .config
            .export_results
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT));
        self.status = match crate::io::export::write_results_csv(&path, &self.run.table) {
            Ok(()) => export_status(&path, self.stale),
            Err(err) => format!("Export failed: {err}"),
        };
    }

    fn save_scenario(&mut self) {
        let path = PathBuf::from(DEFAULT_SAVE);
        self.status = match crate::io::scenario::write_scenario_json(&path, &self.scenario) {
            Ok(()) => format!("Saved scenario to {}", path.display()),
            Err(err) => format!("Save failed: {err}"),
        };
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let summary = &self.run.summary;
        let kpi_color = if summary.total_profit >= 0.0 {
            Color::Green
        } else {
            Color::Red
        };

        let mut kpi = vec![
            Span::styled("cvp", Style::default().fg(Color::Cyan)),
            Span::raw(" | "),
            Span::styled(
                format_kpi(&self.run.table),
                Style::default().fg(kpi_color).add_modifier(Modifier::BOLD),
            ),
        ];
        if self.stale {
            kpi.push(Span::styled(
                "  (last valid result)",
                Style::default().fg(Color::Yellow),
            ));
        }

        let lines = vec![
            Line::from(kpi),
            Line::from(Span::styled(
                format!(
                    "source: {} | services: {} | fixed pool: {}",
                    self.source,
                    summary.services,
                    format_currency(self.scenario.total_fixed_costs),
                ),
                Style::default().fg(Color::Gray),
            )),
            Line::from(Span::styled(
                format!(
                    "revenue: {} | total cost: {} | profitable: {} | unprofitable: {}",
                    format_currency(summary.total_revenue),
                    format_currency(summary.total_cost),
                    summary.profitable,
                    summary.unprofitable,
                ),
                Style::default().fg(Color::Gray),
            )),
        ];

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);

        self.draw_services(frame, columns[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(12)])
            .split(columns[1]);

        self.draw_chart(frame, right[0]);
        self.draw_fields(frame, right[1]);
    }

    fn draw_services(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let value_width = 14usize;
        let label_width = (area.width as usize).saturating_sub(value_width + 6).max(8);

        let items: Vec<ListItem> = self
            .run
            .table
            .iter()
            .map(|r| {
                let color = if r.profit >= 0.0 { Color::Green } else { Color::Red };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{:<label_width$}", truncate(&r.name, label_width))),
                    Span::styled(
                        format!(" {:>value_width$}", format_currency(r.profit)),
                        Style::default().fg(color),
                    ),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(focus_block("Services", self.focus == Focus::Services))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.selected_service));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let title = self
            .selected()
            .map(|s| format!("Profit per service | selected: {}", s.name))
            .unwrap_or_else(|| "Profit per service".to_string());
        let block = Block::default().title(title).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let (bars, x_bounds, y_bounds) = chart_series(&self.run);
        let widget = ProfitBarsChart {
            bars: &bars,
            selected: Some(self.selected_service),
            x_bounds,
            y_bounds,
            y_label: "profit ($)",
            fmt_y: fmt_compact_currency,
        };
        frame.render_widget(widget, inner);
    }

    fn draw_fields(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(service) = self.selected() else {
            frame.render_widget(Paragraph::new("No services.").block(Block::default().borders(Borders::ALL)), area);
            return;
        };
        let tiers = self.scenario.tiers_for(&service.name);

        let items: Vec<ListItem> = self
            .fields()
            .iter()
            .map(|field| {
                let text = match field {
                    Field::Volume => format!("Volume: {}", format_grouped(service.volume, 0)),
                    Field::UnitCost => format!("Unit cost: {}", format_currency(service.variable_cost_per_unit)),
                    Field::TierPrice(tier) => format!(
                        "{tier} price: {}",
                        self.tier(&service.name, tier)
                            .map(|t| format_currency(t.unit_price))
                            .unwrap_or_else(|| "-".to_string())
                    ),
                    Field::TierShare(tier) => format!(
                        "{tier} share: {}%",
                        self.tier(&service.name, tier)
                            .map(|t| format_grouped(t.volume_fraction * 100.0, 1))
                            .unwrap_or_else(|| "-".to_string())
                    ),
                    Field::FixedCosts => format!("Fixed costs (all): {}", format_currency(self.scenario.total_fixed_costs)),
                };
                ListItem::new(text)
            })
            .collect();

        let share_sum = tiers.map(|t| t.fraction_sum() * 100.0).unwrap_or(0.0);
        let title = format!("{} | shares sum {}%", truncate(&service.name, 30), format_grouped(share_sum, 1));

        let list = List::new(items)
            .block(focus_block(&title, self.focus == Focus::Fields))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        if self.focus == Focus::Fields {
            state.select(Some(self.selected_field));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  Tab panel  ←/→ adjust  r reset  e export  s save  q quit";
        let status_color = if self.stale { Color::Red } else { Color::Yellow };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(status_color)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn focus_block(title: &str, focused: bool) -> Block<'_> {
    let style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    Block::default().title(title).borders(Borders::ALL).border_style(style)
}

/// The exported table is always the last valid run, which lags the edits when stale.
fn export_status(path: &std::path::Path, stale: bool) -> String {
    if stale {
        format!("Wrote {} (last valid result)", path.display())
    } else {
        format!("Wrote {}", path.display())
    }
}

fn step_index(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    current.saturating_add_signed(delta).min(len - 1)
}

/// Build the bar series and bounds for Plotters.
fn chart_series(run: &RunOutput) -> (Vec<(f64, f64)>, [f64; 2], [f64; 2]) {
    let bars: Vec<(f64, f64)> = run
        .table
        .iter()
        .enumerate()
        .map(|(idx, r)| (idx as f64, r.profit))
        .filter(|(_, p)| p.is_finite())
        .collect();

    let x_bounds = [-1.0, bars.len().max(1) as f64];

    let (mut y_min, mut y_max) = (0.0_f64, 0.0_f64);
    for &(_, p) in &bars {
        y_min = y_min.min(p);
        y_max = y_max.max(p);
    }
    if y_max - y_min < 1e-9 {
        y_max = y_min + 1.0;
    }
    let pad = (y_max - y_min) * 0.05;

    (bars, x_bounds, [y_min - pad, y_max + pad])
}

/// Short tick labels: `$12.3k`, `-$1.2M`.
fn fmt_compact_currency(v: f64) -> String {
    let sign = if v < 0.0 { "-" } else { "" };
    let a = v.abs();
    if a >= 1_000_000.0 {
        format!("{sign}${:.1}M", a / 1_000_000.0)
    } else if a >= 1_000.0 {
        format!("{sign}${:.1}k", a / 1_000.0)
    } else {
        format!("{sign}${a:.0}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SAMPLE_FIXED_COSTS;

    fn app() -> App {
        App::new(RunConfig::default()).unwrap()
    }

    #[test]
    fn starts_on_the_sample_scenario() {
        let app = app();
        assert_eq!(app.source, ScenarioSource::Sample);
        assert_eq!(app.run.table.len(), app.scenario.services.len());
        assert!(!app.stale);
    }

    #[test]
    fn volume_edit_recomputes_from_a_new_snapshot() {
        let mut app = app();
        app.handle_key(KeyCode::Tab);
        let before = app.run.table.results[0].profit;
        app.handle_key(KeyCode::Right);

        assert_eq!(app.scenario.services[0].volume, app.baseline.services[0].volume + VOLUME_STEP);
        // Baseline snapshot is untouched.
        assert_ne!(app.scenario, app.baseline);
        assert_ne!(app.run.table.results[0].profit, before);
    }

    #[test]
    fn edits_require_field_focus() {
        let mut app = app();
        app.handle_key(KeyCode::Right);
        assert_eq!(app.scenario, app.baseline);
    }

    #[test]
    fn values_clamp_at_zero() {
        let mut app = app();
        app.focus = Focus::Fields;
        app.selected_field = app.fields().len() - 1;
        for _ in 0..100 {
            app.handle_key(KeyCode::Left);
        }
        assert_eq!(app.scenario.total_fixed_costs, 0.0);

        app.handle_key(KeyCode::Char('r'));
        assert_eq!(app.scenario.total_fixed_costs, SAMPLE_FIXED_COSTS);
    }

    #[test]
    fn rejected_edit_keeps_last_valid_run() {
        let config = RunConfig {
            fraction_check: crate::domain::FractionCheck::Strict,
            ..RunConfig::default()
        };
        let mut app = App::new(config).unwrap();
        app.focus = Focus::Fields;
        // Volume, UnitCost, then (price, share) per tier.
        app.selected_field = 3;
        let kpi = app.run.table.total_profitability();

        app.handle_key(KeyCode::Right);
        assert!(app.stale);
        assert!(app.status.contains("sum"), "{}", app.status);
        assert_eq!(app.run.table.total_profitability(), kpi);

        app.handle_key(KeyCode::Left);
        assert!(!app.stale);
    }

    #[test]
    fn stale_export_says_it_wrote_the_last_valid_result() {
        let path = std::path::Path::new("out.csv");
        assert_eq!(export_status(path, false), "Wrote out.csv");
        assert_eq!(export_status(path, true), "Wrote out.csv (last valid result)");
    }

    #[test]
    fn stale_export_writes_last_valid_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let config = RunConfig {
            fraction_check: crate::domain::FractionCheck::Strict,
            export_results: Some(path.clone()),
            ..RunConfig::default()
        };
        let mut app = App::new(config).unwrap();
        app.focus = Focus::Fields;
        app.selected_field = 3;
        app.handle_key(KeyCode::Right);
        assert!(app.stale);

        app.handle_key(KeyCode::Char('e'));
        assert!(app.status.ends_with("(last valid result)"), "{}", app.status);
        assert!(path.exists());
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut app = app();
        app.handle_key(KeyCode::Up);
        assert_eq!(app.selected_service, 0);
        for _ in 0..500 {
            app.handle_key(KeyCode::Down);
        }
        assert_eq!(app.selected_service, app.scenario.services.len() - 1);
    }

    #[test]
    fn compact_tick_labels() {
        assert_eq!(fmt_compact_currency(12_300.0), "$12.3k");
        assert_eq!(fmt_compact_currency(-1_240_000.0), "-$1.2M");
        assert_eq!(fmt_compact_currency(42.0), "$42");
    }
}
