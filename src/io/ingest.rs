//! CSV ingest and normalization.
//!
//! This module turns a long-format fee-schedule CSV (one row per service and
//! tier) into an engine `Scenario`.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level reporting** for rows with no service/tier identity (skipped,
//!   but counted and shown)
//! - **Hard failures** for rows that would silently change revenue or cost
//!   (missing or unparseable values, conflicting service volumes)
//! - **Separation of concerns**: no CVP math here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::warn;

use crate::domain::{Scenario, Service, SlidingFeeSchedule, Tier, TierSet};
use crate::engine::CvpError;
use crate::error::AppError;

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub service: Option<String>,
    pub message: String,
}

/// Ingest output: the scenario plus bookkeeping for the run summary.
#[derive(Debug, Clone)]
pub struct IngestedScenario {
    pub scenario: Scenario,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load a long-format CSV scenario from disk.
pub fn load_scenario_csv(path: &Path, fixed_costs: Option<f64>) -> Result<IngestedScenario, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_scenario_csv(file, fixed_costs)
}

/// Parse a long-format CSV scenario from any reader.
pub fn read_scenario_csv<R: Read>(input: R, fixed_costs: Option<f64>) -> Result<IngestedScenario, AppError> {
    let total_fixed_costs =
        fixed_costs.ok_or_else(|| AppError::input("CSV scenarios need a fixed-cost pool; pass --fixed-costs."))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| AppError::input(format!("Failed to read CSV headers: {e}")))?
        .clone();
    let columns = Columns::resolve(&headers)?;

    let mut services: Vec<Service> = Vec::new();
    let mut tier_sets: HashMap<String, TierSet> = HashMap::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;
    let mut rows_used = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1 and records() is 0-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    service: None,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let row = match parse_row(&record, &columns, line)? {
            ParsedRow::Row(row) => row,
            ParsedRow::Unidentified(message) => {
                row_errors.push(RowError {
                    line,
                    service: get_field(&record, Some(columns.service)).map(str::to_string),
                    message,
                });
                continue;
            }
        };

        merge_service(&mut services, &row, line)?;

        let price = row
            .price
            .ok_or_else(|| CvpError::malformed(&row.service, &row.tier, format!("missing `price` (line {line})")))?;
        let fraction = row.percentage.ok_or_else(|| {
            CvpError::malformed(&row.service, &row.tier, format!("missing `percentage` (line {line})"))
        })?;

        let tiers = tier_sets.entry(row.service.clone()).or_default();
        if tiers.insert(row.tier.clone(), Tier::new(price, fraction)).is_some() {
            return Err(CvpError::malformed(&row.service, &row.tier, format!("duplicate tier (line {line})")).into());
        }
        rows_used += 1;
    }

    for err in &row_errors {
        warn!(line = err.line, reason = %err.message, "skipped CSV row");
    }

    if services.is_empty() {
        return Err(AppError::input("No valid service rows found in CSV."));
    }

    let mut schedule = SlidingFeeSchedule::new();
    for (service, tiers) in tier_sets {
        schedule.insert(service, tiers);
    }

    Ok(IngestedScenario {
        scenario: Scenario {
            services,
            schedule,
            total_fixed_costs,
        },
        row_errors,
        rows_read,
        rows_used,
    })
}

struct Columns {
    service: usize,
    volume: Option<usize>,
    unit_cost: Option<usize>,
    tier: usize,
    price: Option<usize>,
    percentage: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, AppError> {
        let map = build_header_map(headers);
        let find = |names: &[&str]| names.iter().find_map(|n| map.get(*n).copied());

        let service = find(&["service", "service_name", "name"])
            .ok_or_else(|| AppError::input("Missing required column: `service`"))?;
        let tier = find(&["tier", "tier_name"]).ok_or_else(|| AppError::input("Missing required column: `tier`"))?;
        let columns = Self {
            service,
            volume: find(&["volume"]),
            unit_cost: find(&["variable_cost_per_unit", "variable_cost", "unit_cost"]),
            tier,
            price: find(&["price", "unit_price"]),
            percentage: find(&["percentage", "volume_fraction", "fraction"]),
        };

        if columns.volume.is_none() {
            return Err(AppError::input("Missing required column: `volume`"));
        }
        if columns.unit_cost.is_none() {
            return Err(AppError::input("Missing required column: `variable_cost_per_unit`"));
        }
        if columns.price.is_none() {
            return Err(AppError::input("Missing required column: `price`"));
        }
        if columns.percentage.is_none() {
            return Err(AppError::input("Missing required column: `percentage`"));
        }
        Ok(columns)
    }
}

struct CsvRow {
    service: String,
    volume: Option<f64>,
    unit_cost: Option<f64>,
    tier: String,
    price: Option<f64>,
    percentage: Option<f64>,
}

enum ParsedRow {
    Row(CsvRow),
    /// No service or tier name; the row cannot belong to any schedule.
    Unidentified(String),
}

/// Rows without a service/tier identity are skipped. Once a row names both,
/// an unparseable value is fatal: dropping it would change revenue or cost.
fn parse_row(record: &StringRecord, columns: &Columns, line: usize) -> Result<ParsedRow, AppError> {
    let Some(service) = get_field(record, Some(columns.service)) else {
        return Ok(ParsedRow::Unidentified("Missing required value: `service`".to_string()));
    };
    let Some(tier) = get_field(record, Some(columns.tier)) else {
        return Ok(ParsedRow::Unidentified(format!(
            "Missing required value: `tier` for service '{service}'"
        )));
    };

    let service_value = |column: Option<usize>, name: &str| {
        parse_amount(get_field(record, column)).map_err(|e| {
            AppError::input(format!("Line {line}: {e} in `{name}` for service '{service}'."))
        })
    };
    let volume = service_value(columns.volume, "volume")?;
    let unit_cost = service_value(columns.unit_cost, "variable_cost_per_unit")?;

    let price = parse_amount(get_field(record, columns.price))
        .map_err(|e| CvpError::malformed(service, tier, format!("{e} in `price` (line {line})")))?;
    let percentage = parse_fraction(get_field(record, columns.percentage))
        .map_err(|e| CvpError::malformed(service, tier, format!("{e} in `percentage` (line {line})")))?;

    Ok(ParsedRow::Row(CsvRow {
        service: service.to_string(),
        volume,
        unit_cost,
        tier: tier.to_string(),
        price,
        percentage,
    }))
}

/// The first row of a service fixes its volume and unit cost; later rows may
/// repeat them or leave them blank.
fn merge_service(services: &mut Vec<Service>, row: &CsvRow, line: usize) -> Result<(), AppError> {
    if let Some(existing) = services.iter().find(|s| s.name == row.service) {
        let conflicts = row.volume.is_some_and(|v| v != existing.volume)
            || row.unit_cost.is_some_and(|c| c != existing.variable_cost_per_unit);
        if conflicts {
            return Err(AppError::input(format!(
                "Line {line}: service '{}' repeats with a different volume or unit cost.",
                row.service
            )));
        }
        return Ok(());
    }

    let volume = row
        .volume
        .ok_or_else(|| AppError::input(format!("Line {line}: missing `volume` for service '{}'.", row.service)))?;
    let unit_cost = row.unit_cost.ok_or_else(|| {
        AppError::input(format!(
            "Line {line}: missing `variable_cost_per_unit` for service '{}'.",
            row.service
        ))
    })?;
    services.push(Service::new(row.service.clone(), volume, unit_cost));
    Ok(())
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase().replace(' ', "_")
}

fn get_field(record: &StringRecord, idx: Option<usize>) -> Option<&str> {
    record.get(idx?).map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a money/count cell, tolerating `$` and thousands separators.
fn parse_amount(s: Option<&str>) -> Result<Option<f64>, String> {
    let Some(s) = s else { return Ok(None) };
    let cleaned: String = s.chars().filter(|c| *c != '$' && *c != ',').collect();
    parse_finite(&cleaned).map(Some).ok_or_else(|| format!("Invalid number '{s}'"))
}

/// Parse a fraction cell; `15%` and `0.15` are equivalent.
fn parse_fraction(s: Option<&str>) -> Result<Option<f64>, String> {
    let Some(s) = s else { return Ok(None) };
    let value = match s.strip_suffix('%') {
        Some(pct) => parse_finite(pct.trim()).map(|v| v / 100.0),
        None => parse_finite(s),
    };
    value.map(Some).ok_or_else(|| format!("Invalid fraction '{s}'"))
}

fn parse_finite(s: &str) -> Option<f64> {
    let v = s.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\u{feff}Service,Volume,Variable Cost Per Unit,Tier,Price,Percentage
Ear Lavage,300,5,Slide A,15,10%
Ear Lavage,,,Slide B,16,0.9
Hep A,200,$6,Slide A,\"$1,000\",0.5
Hep A,200,6,Slide B,20,0.5
";

    #[test]
    fn reads_long_format_rows() {
        let ingested = read_scenario_csv(CSV.as_bytes(), Some(500.0)).unwrap();
        let s = &ingested.scenario;

        assert_eq!(ingested.rows_read, 4);
        assert_eq!(ingested.rows_used, 4);
        assert!(ingested.row_errors.is_empty());
        assert_eq!(s.total_fixed_costs, 500.0);
        assert_eq!(s.services.len(), 2);
        assert_eq!(s.services[0], Service::new("Ear Lavage", 300.0, 5.0));

        let lavage = s.tiers_for("Ear Lavage").unwrap();
        assert!((lavage.get("Slide A").unwrap().volume_fraction - 0.10).abs() < 1e-12);
        assert_eq!(s.tiers_for("Hep A").unwrap().get("Slide A").unwrap().unit_price, 1000.0);
    }

    #[test]
    fn rows_without_identity_are_reported_not_fatal() {
        let csv = "service,volume,variable_cost_per_unit,tier,price,percentage
,1,1,Slide A,1,1
A,10,1,,2,1
A,10,1,Slide A,2,1
";
        let ingested = read_scenario_csv(csv.as_bytes(), Some(0.0)).unwrap();
        assert_eq!(ingested.rows_read, 3);
        assert_eq!(ingested.rows_used, 1);
        assert_eq!(ingested.row_errors.len(), 2);
        assert_eq!(ingested.row_errors[0].line, 2);
        assert_eq!(ingested.row_errors[1].service.as_deref(), Some("A"));
    }

    #[test]
    fn unparseable_price_fails_instead_of_dropping_the_tier() {
        let csv = "service,volume,variable_cost_per_unit,tier,price,percentage
A,100,0,Slide A,10,0.5
A,100,0,Slide B,2O,0.5
";
        let err = read_scenario_csv(csv.as_bytes(), Some(0.0)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.message().contains("Slide B"), "{}", err.message());
        assert!(err.message().contains("'2O'"), "{}", err.message());
        assert!(err.message().contains("line 3"), "{}", err.message());
    }

    #[test]
    fn unparseable_percentage_is_malformed() {
        let csv = "service,volume,variable_cost_per_unit,tier,price,percentage
A,100,0,Slide A,10,half
";
        let err = read_scenario_csv(csv.as_bytes(), Some(0.0)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.message().contains("percentage"), "{}", err.message());
    }

    #[test]
    fn unparseable_volume_is_an_input_error() {
        let csv = "service,volume,variable_cost_per_unit,tier,price,percentage
A,lots,0,Slide A,10,1
";
        let err = read_scenario_csv(csv.as_bytes(), Some(0.0)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.message().contains("volume"), "{}", err.message());
    }

    #[test]
    fn missing_percentage_is_malformed() {
        let csv = "service,volume,variable_cost_per_unit,tier,price,percentage
A,10,1,Slide A,2,
";
        let err = read_scenario_csv(csv.as_bytes(), Some(0.0)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.message().contains("percentage"));
    }

    #[test]
    fn conflicting_volume_is_rejected() {
        let csv = "service,volume,variable_cost_per_unit,tier,price,percentage
A,10,1,Slide A,2,0.5
A,11,1,Slide B,2,0.5
";
        let err = read_scenario_csv(csv.as_bytes(), Some(0.0)).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn missing_columns_and_fixed_costs() {
        let csv = "service,volume,tier,price,percentage\n";
        assert!(read_scenario_csv(csv.as_bytes(), Some(0.0)).is_err());
        assert!(read_scenario_csv(CSV.as_bytes(), None).is_err());
    }
}
