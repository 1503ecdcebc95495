//! Per-service, per-tier revenue aggregation and profit computation.
//!
//! The engine is a pure function of its inputs: it borrows the services and the
//! schedule, allocates a fresh `CvpTable`, and keeps no state between calls.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::domain::{
    CvpTable, FULL_CHARGES_TIER, FractionCheck, Scenario, Service, ServiceResult, SlidingFeeSchedule, TierRevenue,
    TierSet,
};
use crate::engine::CvpError;

/// Allowed deviation of a tier-fraction sum from 1.0 before it counts as unbalanced.
pub const FRACTION_TOLERANCE: f64 = 1e-6;

/// Where the itemized tier columns come from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TierOrder {
    /// The first service's tier order is canonical; every service must match it.
    #[default]
    FirstService,
    /// Caller-supplied canonical order (all tier names, "Full Charges" included).
    Explicit(Vec<String>),
    /// No consistency check; columns follow the last processed service.
    LastProcessed,
}

/// Engine knobs. `Default` keeps fraction sums unchecked and uses a
/// fail-fast column order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CvpOptions {
    pub tier_order: TierOrder,
    pub fraction_check: FractionCheck,
}

/// Run the engine with default options.
pub fn compute(
    services: &[Service],
    schedule: &SlidingFeeSchedule,
    total_fixed_costs: f64,
) -> Result<CvpTable, CvpError> {
    compute_with(services, schedule, total_fixed_costs, &CvpOptions::default())
}

/// Run the engine over a scenario snapshot.
pub fn compute_scenario(scenario: &Scenario, options: &CvpOptions) -> Result<CvpTable, CvpError> {
    compute_with(
        &scenario.services,
        &scenario.schedule,
        scenario.total_fixed_costs,
        options,
    )
}

/// Run the engine.
///
/// All checks happen before the first row is built, so the call either
/// returns a complete table or an error.
pub fn compute_with(
    services: &[Service],
    schedule: &SlidingFeeSchedule,
    total_fixed_costs: f64,
    options: &CvpOptions,
) -> Result<CvpTable, CvpError> {
    if services.is_empty() {
        return Err(CvpError::InvalidInput(
            "at least one service is required to split fixed costs".to_string(),
        ));
    }
    ensure_unique_names(services)?;

    let mut tier_sets = Vec::with_capacity(services.len());
    for service in services {
        let tiers = schedule
            .get(&service.name)
            .ok_or_else(|| CvpError::MissingSchedule {
                service: service.name.clone(),
            })?;
        ensure_well_formed(&service.name, tiers)?;
        check_fractions(&service.name, tiers, options.fraction_check)?;
        tier_sets.push(tiers);
    }

    let canonical = match &options.tier_order {
        TierOrder::FirstService => Some(tier_sets[0].names().map(str::to_string).collect::<Vec<_>>()),
        TierOrder::Explicit(names) => Some(names.clone()),
        TierOrder::LastProcessed => None,
    };
    if let Some(order) = &canonical {
        for (service, tiers) in services.iter().zip(&tier_sets) {
            ensure_tier_order(&service.name, tiers, order)?;
        }
    }

    // Even split: every service carries the same share regardless of size.
    let allocated_fixed_cost = total_fixed_costs / services.len() as f64;

    let mut results = Vec::with_capacity(services.len());
    let mut last_columns = Vec::new();
    for (service, tiers) in services.iter().zip(&tier_sets) {
        results.push(evaluate_service(service, tiers, allocated_fixed_cost));
        last_columns = itemized(tiers.names());
    }

    let tier_columns = match canonical {
        Some(order) => itemized(order.iter().map(String::as_str)),
        None => last_columns,
    };

    debug!(
        services = results.len(),
        columns = tier_columns.len(),
        allocated_fixed_cost,
        "computed cvp table"
    );

    Ok(CvpTable {
        tier_columns,
        results,
    })
}

fn evaluate_service(service: &Service, tiers: &TierSet, allocated_fixed_cost: f64) -> ServiceResult {
    let mut total_revenue = 0.0;
    let mut tier_revenue = Vec::with_capacity(tiers.len());

    for (name, tier) in tiers.iter() {
        let tier_volume = service.volume * tier.volume_fraction;
        let revenue = tier_volume * tier.unit_price;
        total_revenue += revenue;

        // Full Charges counts toward the total but is not itemized.
        if name != FULL_CHARGES_TIER {
            tier_revenue.push(TierRevenue {
                tier: name.to_string(),
                revenue,
            });
        }
    }

    let total_variable_costs = service.variable_cost_per_unit * service.volume;
    let total_cost = total_variable_costs + allocated_fixed_cost;

    ServiceResult {
        name: service.name.clone(),
        volume: service.volume,
        tier_revenue,
        total_revenue,
        total_variable_costs,
        allocated_fixed_cost,
        total_cost,
        profit: total_revenue - total_cost,
    }
}

fn itemized<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    names
        .filter(|n| *n != FULL_CHARGES_TIER)
        .map(str::to_string)
        .collect()
}

fn ensure_unique_names(services: &[Service]) -> Result<(), CvpError> {
    let mut seen = HashSet::with_capacity(services.len());
    for service in services {
        if !seen.insert(service.name.as_str()) {
            return Err(CvpError::InvalidInput(format!(
                "duplicate service name '{}'",
                service.name
            )));
        }
    }
    Ok(())
}

fn ensure_well_formed(service: &str, tiers: &TierSet) -> Result<(), CvpError> {
    for (name, tier) in tiers.iter() {
        if !tier.unit_price.is_finite() {
            return Err(CvpError::malformed(service, name, "unit_price is not a finite number"));
        }
        if !tier.volume_fraction.is_finite() {
            return Err(CvpError::malformed(service, name, "volume_fraction is not a finite number"));
        }
    }
    Ok(())
}

fn ensure_tier_order(service: &str, tiers: &TierSet, canonical: &[String]) -> Result<(), CvpError> {
    let found: Vec<&str> = tiers.names().collect();
    let matches = found.len() == canonical.len() && found.iter().zip(canonical).all(|(a, b)| *a == b.as_str());
    if matches {
        return Ok(());
    }

    // Name the first tier that breaks the order so the message is actionable.
    let offending = found
        .iter()
        .zip(canonical)
        .find(|(a, b)| **a != b.as_str())
        .map(|(a, _)| a.to_string())
        .or_else(|| found.get(canonical.len()).map(|s| s.to_string()))
        .or_else(|| canonical.get(found.len()).cloned())
        .unwrap_or_default();

    Err(CvpError::malformed(
        service,
        &offending,
        format!(
            "tier order [{}] differs from canonical order [{}]",
            found.join(", "),
            canonical.join(", ")
        ),
    ))
}

fn check_fractions(service: &str, tiers: &TierSet, mode: FractionCheck) -> Result<(), CvpError> {
    if mode == FractionCheck::Off {
        return Ok(());
    }
    let sum = tiers.fraction_sum();
    if (sum - 1.0).abs() <= FRACTION_TOLERANCE {
        return Ok(());
    }
    match mode {
        FractionCheck::Strict => Err(CvpError::UnbalancedFractions {
            service: service.to_string(),
            sum,
        }),
        _ => {
            warn!(service, sum, "tier fractions do not sum to 1.0");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Tier;

    fn two_tier(p1: f64, f1: f64, p2: f64, f2: f64) -> TierSet {
        TierSet::new().with("T1", Tier::new(p1, f1)).with("T2", Tier::new(p2, f2))
    }

    fn clinic_tiers(scale: f64) -> TierSet {
        TierSet::new()
            .with("Slide A", Tier::new(10.0 * scale, 0.10))
            .with("Slide B", Tier::new(20.0 * scale, 0.15))
            .with("Slide C", Tier::new(30.0 * scale, 0.25))
            .with("Slide D", Tier::new(40.0 * scale, 0.20))
            .with("Slide E", Tier::new(50.0 * scale, 0.15))
            .with(FULL_CHARGES_TIER, Tier::new(50.0 * scale, 0.15))
    }

    #[test]
    fn single_service_example() {
        let services = vec![Service::new("A", 100.0, 10.0)];
        let schedule = SlidingFeeSchedule::new().with("A", two_tier(10.0, 0.5, 20.0, 0.5));

        let table = compute(&services, &schedule, 1000.0).unwrap();
        let r = &table.results[0];
        assert_eq!(r.total_revenue, 1500.0);
        assert_eq!(r.total_variable_costs, 1000.0);
        assert_eq!(r.allocated_fixed_cost, 1000.0);
        assert_eq!(r.total_cost, 2000.0);
        assert_eq!(r.profit, -500.0);
        assert_eq!(r.revenue_for("T1"), Some(500.0));
        assert_eq!(r.revenue_for("T2"), Some(1000.0));
        assert_eq!(table.tier_columns, vec!["T1", "T2"]);
    }

    #[test]
    fn fixed_costs_split_evenly() {
        let services = vec![Service::new("A", 10.0, 1.0), Service::new("B", 1000.0, 1.0)];
        let schedule = SlidingFeeSchedule::new()
            .with("A", two_tier(5.0, 0.5, 5.0, 0.5))
            .with("B", two_tier(5.0, 0.5, 5.0, 0.5));

        let table = compute(&services, &schedule, 200.0).unwrap();
        assert!(table.iter().all(|r| r.allocated_fixed_cost == 100.0));
        let allocated: f64 = table.iter().map(|r| r.allocated_fixed_cost).sum();
        assert!((allocated - 200.0).abs() < 1e-9);
    }

    #[test]
    fn full_charges_counted_in_total_but_not_itemized() {
        let services = vec![Service::new("A", 200.0, 0.0)];
        let schedule = SlidingFeeSchedule::new().with("A", clinic_tiers(1.0));

        let table = compute(&services, &schedule, 0.0).unwrap();
        let r = &table.results[0];

        let expected: f64 = clinic_tiers(1.0)
            .iter()
            .map(|(_, t)| 200.0 * t.volume_fraction * t.unit_price)
            .sum();
        assert!((r.total_revenue - expected).abs() < 1e-9);
        assert_eq!(r.tier_revenue.len(), 5);
        assert_eq!(r.revenue_for(FULL_CHARGES_TIER), None);
        assert_eq!(
            table.tier_columns,
            vec!["Slide A", "Slide B", "Slide C", "Slide D", "Slide E"]
        );
        let itemized: f64 = r.tier_revenue.iter().map(|t| t.revenue).sum();
        assert!((r.total_revenue - itemized - 200.0 * 0.15 * 50.0).abs() < 1e-9);
    }

    #[test]
    fn profit_identity_holds_for_every_row() {
        let services = vec![
            Service::new("A", 120.0, 7.5),
            Service::new("B", 45.0, 3.0),
            Service::new("C", 980.0, 12.25),
        ];
        let schedule = SlidingFeeSchedule::new()
            .with("A", clinic_tiers(1.0))
            .with("B", clinic_tiers(0.5))
            .with("C", clinic_tiers(2.0));

        let table = compute(&services, &schedule, 12_345.0).unwrap();
        for r in table.iter() {
            assert_eq!(r.profit, r.total_revenue - (r.total_variable_costs + r.allocated_fixed_cost));
            assert_eq!(r.total_cost, r.total_variable_costs + r.allocated_fixed_cost);
        }
        let names: Vec<&str> = table.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn zero_volume_loses_only_its_fixed_share() {
        let services = vec![Service::new("A", 0.0, 10.0), Service::new("B", 10.0, 1.0)];
        let schedule = SlidingFeeSchedule::new()
            .with("A", two_tier(10.0, 0.5, 20.0, 0.5))
            .with("B", two_tier(10.0, 0.5, 20.0, 0.5));

        let table = compute(&services, &schedule, 300.0).unwrap();
        let r = &table.results[0];
        assert_eq!(r.total_revenue, 0.0);
        assert_eq!(r.total_variable_costs, 0.0);
        assert_eq!(r.profit, -r.allocated_fixed_cost);
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let services = vec![Service::new("A", 333.0, 1.1), Service::new("B", 17.0, 0.3)];
        let schedule = SlidingFeeSchedule::new()
            .with("A", clinic_tiers(1.3))
            .with("B", clinic_tiers(0.7));

        let first = compute(&services, &schedule, 9_999.99).unwrap();
        let second = compute(&services, &schedule, 9_999.99).unwrap();
        assert_eq!(first, second);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.profit.to_bits(), b.profit.to_bits());
        }
    }

    #[test]
    fn empty_services_rejected() {
        let err = compute(&[], &SlidingFeeSchedule::new(), 100.0).unwrap_err();
        assert!(matches!(err, CvpError::InvalidInput(_)));
    }

    #[test]
    fn duplicate_service_rejected() {
        let services = vec![Service::new("A", 1.0, 1.0), Service::new("A", 2.0, 1.0)];
        let schedule = SlidingFeeSchedule::new().with("A", two_tier(1.0, 0.5, 1.0, 0.5));
        let err = compute(&services, &schedule, 0.0).unwrap_err();
        assert!(matches!(err, CvpError::InvalidInput(_)));
    }

    #[test]
    fn missing_schedule_names_the_service() {
        let services = vec![Service::new("A", 1.0, 1.0), Service::new("Ghost", 1.0, 1.0)];
        let schedule = SlidingFeeSchedule::new().with("A", two_tier(1.0, 0.5, 1.0, 0.5));
        let err = compute(&services, &schedule, 0.0).unwrap_err();
        assert_eq!(
            err,
            CvpError::MissingSchedule {
                service: "Ghost".to_string()
            }
        );
    }

    #[test]
    fn non_finite_tier_is_malformed() {
        let services = vec![Service::new("A", 1.0, 1.0)];
        let schedule = SlidingFeeSchedule::new().with("A", two_tier(f64::NAN, 0.5, 1.0, 0.5));
        let err = compute(&services, &schedule, 0.0).unwrap_err();
        assert!(matches!(err, CvpError::MalformedTier { ref tier, .. } if tier == "T1"));
    }

    #[test]
    fn deviating_tier_order_fails_fast_by_default() {
        let services = vec![Service::new("A", 1.0, 1.0), Service::new("B", 1.0, 1.0)];
        let schedule = SlidingFeeSchedule::new()
            .with("A", two_tier(1.0, 0.5, 2.0, 0.5))
            .with(
                "B",
                TierSet::new().with("T2", Tier::new(2.0, 0.5)).with("T1", Tier::new(1.0, 0.5)),
            );

        let err = compute(&services, &schedule, 0.0).unwrap_err();
        assert!(matches!(err, CvpError::MalformedTier { ref service, .. } if service == "B"));
    }

    #[test]
    fn explicit_order_is_enforced() {
        let services = vec![Service::new("A", 1.0, 1.0)];
        let schedule = SlidingFeeSchedule::new().with("A", two_tier(1.0, 0.5, 2.0, 0.5));
        let options = CvpOptions {
            tier_order: TierOrder::Explicit(vec!["T1".to_string(), "T2".to_string(), "T3".to_string()]),
            ..CvpOptions::default()
        };
        let err = compute_with(&services, &schedule, 0.0, &options).unwrap_err();
        assert!(matches!(err, CvpError::MalformedTier { ref tier, .. } if tier == "T3"));
    }

    #[test]
    fn last_processed_order_follows_the_final_service() {
        let services = vec![Service::new("A", 10.0, 0.0), Service::new("B", 10.0, 0.0)];
        let schedule = SlidingFeeSchedule::new()
            .with("A", two_tier(1.0, 0.5, 2.0, 0.5))
            .with(
                "B",
                TierSet::new()
                    .with("T2", Tier::new(2.0, 0.5))
                    .with("T9", Tier::new(1.0, 0.5)),
            );
        let options = CvpOptions {
            tier_order: TierOrder::LastProcessed,
            ..CvpOptions::default()
        };

        let table = compute_with(&services, &schedule, 0.0, &options).unwrap();
        assert_eq!(table.tier_columns, vec!["T2", "T9"]);
        assert_eq!(table.results[0].revenue_for("T9"), None);
        assert_eq!(table.results[0].revenue_for("T1"), Some(5.0));
    }

    #[test]
    fn unbalanced_fractions_pass_through_by_default() {
        let services = vec![Service::new("A", 100.0, 0.0)];
        let schedule = SlidingFeeSchedule::new().with("A", two_tier(10.0, 0.5, 10.0, 0.2));

        let table = compute(&services, &schedule, 0.0).unwrap();
        assert!((table.results[0].total_revenue - 700.0).abs() < 1e-9);
    }

    #[test]
    fn strict_fraction_check_rejects_unbalanced_tiers() {
        let services = vec![Service::new("A", 100.0, 0.0)];
        let schedule = SlidingFeeSchedule::new().with("A", two_tier(10.0, 0.5, 10.0, 0.2));
        let strict = CvpOptions {
            fraction_check: FractionCheck::Strict,
            ..CvpOptions::default()
        };
        let warn = CvpOptions {
            fraction_check: FractionCheck::Warn,
            ..CvpOptions::default()
        };

        let err = compute_with(&services, &schedule, 0.0, &strict).unwrap_err();
        assert!(matches!(err, CvpError::UnbalancedFractions { ref service, .. } if service == "A"));
        assert!(compute_with(&services, &schedule, 0.0, &warn).is_ok());
    }

    #[test]
    fn negative_fixed_costs_are_accepted() {
        let services = vec![Service::new("A", 10.0, 1.0), Service::new("B", 10.0, 1.0)];
        let schedule = SlidingFeeSchedule::new()
            .with("A", two_tier(2.0, 0.5, 2.0, 0.5))
            .with("B", two_tier(2.0, 0.5, 2.0, 0.5));
        let table = compute(&services, &schedule, -50.0).unwrap();
        assert_eq!(table.results[1].allocated_fixed_cost, -25.0);
        assert_eq!(table.results[1].profit, 20.0 - (10.0 - 25.0));
    }
}
