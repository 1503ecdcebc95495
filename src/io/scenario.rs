//! Read/write scenario JSON files.
//!
//! Scenario JSON is the portable representation of one set of engine inputs:
//! - the ordered service list (volume + unit variable cost)
//! - the sliding fee schedule, one ordered tier array per service
//! - the clinic's fixed-cost pool
//!
//! Tiers are arrays (not objects) so their order survives a round trip.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{Scenario, Service, SlidingFeeSchedule, Tier, TierSet};
use crate::engine::CvpError;
use crate::error::AppError;

/// On-disk scenario schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_fixed_costs: Option<f64>,
    pub services: Vec<ServiceEntry>,
    pub schedule: BTreeMap<String, Vec<TierEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceEntry {
    #[serde(alias = "service_name")]
    pub name: String,
    pub volume: f64,
    pub variable_cost_per_unit: f64,
}

/// A tier as written by hand; both numbers may be missing and are checked on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierEntry {
    pub tier: String,
    #[serde(alias = "unit_price")]
    pub price: Option<f64>,
    #[serde(alias = "volume_fraction")]
    pub percentage: Option<f64>,
}

impl ScenarioFile {
    /// Snapshot a scenario for writing. Services keep their order.
    pub fn from_scenario(scenario: &Scenario) -> Self {
        let services = scenario
            .services
            .iter()
            .map(|s| ServiceEntry {
                name: s.name.clone(),
                volume: s.volume,
                variable_cost_per_unit: s.variable_cost_per_unit,
            })
            .collect();

        let schedule = scenario
            .schedule
            .iter()
            .map(|(name, tiers)| {
                let entries = tiers
                    .iter()
                    .map(|(tier, t)| TierEntry {
                        tier: tier.to_string(),
                        price: Some(t.unit_price),
                        percentage: Some(t.volume_fraction),
                    })
                    .collect();
                (name.to_string(), entries)
            })
            .collect();

        Self {
            total_fixed_costs: Some(scenario.total_fixed_costs),
            services,
            schedule,
        }
    }

    /// Validate tier entries and build an engine snapshot.
    ///
    /// `fixed_costs` overrides the file's pool; one of the two must be present.
    pub fn into_scenario(self, fixed_costs: Option<f64>) -> Result<Scenario, AppError> {
        let total_fixed_costs = fixed_costs.or(self.total_fixed_costs).ok_or_else(|| {
            AppError::input("Scenario has no `total_fixed_costs`; pass --fixed-costs.")
        })?;

        let services = self
            .services
            .into_iter()
            .map(|s| Service::new(s.name, s.volume, s.variable_cost_per_unit))
            .collect();

        let mut schedule = SlidingFeeSchedule::new();
        for (service, entries) in self.schedule {
            let tiers = tier_set_from_entries(&service, entries)?;
            schedule.insert(service, tiers);
        }

        Ok(Scenario {
            services,
            schedule,
            total_fixed_costs,
        })
    }
}

fn tier_set_from_entries(service: &str, entries: Vec<TierEntry>) -> Result<TierSet, CvpError> {
    let mut tiers = TierSet::new();
    for entry in entries {
        let price = entry
            .price
            .ok_or_else(|| CvpError::malformed(service, &entry.tier, "missing `price`"))?;
        let fraction = entry
            .percentage
            .ok_or_else(|| CvpError::malformed(service, &entry.tier, "missing `percentage`"))?;
        if tiers.insert(entry.tier.clone(), Tier::new(price, fraction)).is_some() {
            return Err(CvpError::malformed(service, &entry.tier, "duplicate tier name"));
        }
    }
    Ok(tiers)
}

/// Read a scenario JSON file.
pub fn read_scenario_json(path: &Path, fixed_costs: Option<f64>) -> Result<Scenario, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::input(format!("Failed to open scenario JSON '{}': {e}", path.display())))?;
    let raw: ScenarioFile = serde_json::from_reader(file)
        .map_err(|e| AppError::input(format!("Invalid scenario JSON '{}': {e}", path.display())))?;
    raw.into_scenario(fixed_costs)
}

/// Write a scenario JSON file.
pub fn write_scenario_json(path: &Path, scenario: &Scenario) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::input(format!("Failed to create scenario JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &ScenarioFile::from_scenario(scenario))
        .map_err(|e| AppError::input(format!("Failed to write scenario JSON: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "total_fixed_costs": 1000,
        "services": [
            {"service_name": "Ear Lavage", "volume": 300, "variable_cost_per_unit": 5},
            {"name": "B-12", "volume": 200, "variable_cost_per_unit": 4}
        ],
        "schedule": {
            "Ear Lavage": [
                {"tier": "Slide B", "price": 16, "percentage": 0.6},
                {"tier": "Slide A", "price": 15, "percentage": 0.4}
            ],
            "B-12": [
                {"tier": "Slide B", "unit_price": 16, "volume_fraction": 0.6},
                {"tier": "Slide A", "unit_price": 15, "volume_fraction": 0.4}
            ]
        }
    }"#;

    #[test]
    fn parses_aliases_and_keeps_tier_order() {
        let raw: ScenarioFile = serde_json::from_str(DOC).unwrap();
        let scenario = raw.into_scenario(None).unwrap();

        assert_eq!(scenario.total_fixed_costs, 1000.0);
        assert_eq!(scenario.services[0].name, "Ear Lavage");
        assert_eq!(scenario.services[1].name, "B-12");
        let names: Vec<&str> = scenario.tiers_for("B-12").unwrap().names().collect();
        assert_eq!(names, vec!["Slide B", "Slide A"]);
    }

    #[test]
    fn fixed_cost_override_wins() {
        let raw: ScenarioFile = serde_json::from_str(DOC).unwrap();
        let scenario = raw.into_scenario(Some(42.0)).unwrap();
        assert_eq!(scenario.total_fixed_costs, 42.0);
    }

    #[test]
    fn missing_price_is_a_malformed_tier() {
        let doc = r#"{
            "total_fixed_costs": 1,
            "services": [{"name": "A", "volume": 1, "variable_cost_per_unit": 1}],
            "schedule": {"A": [{"tier": "Slide A", "percentage": 1.0}]}
        }"#;
        let raw: ScenarioFile = serde_json::from_str(doc).unwrap();
        let err = raw.into_scenario(None).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.message().contains("missing `price`"));
    }

    #[test]
    fn missing_fixed_costs_needs_override() {
        let doc = r#"{"services": [], "schedule": {}}"#;
        let raw: ScenarioFile = serde_json::from_str(doc).unwrap();
        assert_eq!(raw.clone().into_scenario(None).unwrap_err().exit_code(), 2);
        assert!(raw.into_scenario(Some(10.0)).is_ok());
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        let scenario = crate::data::sample_scenario();

        write_scenario_json(&path, &scenario).unwrap();
        let loaded = read_scenario_json(&path, None).unwrap();
        assert_eq!(loaded, scenario);
    }
}
