//! Built-in sample clinic scenario.
//!
//! A 49-service community clinic billed under a six-band sliding fee schedule
//! (Slide A-E plus Full Charges). Every service uses the same patient mix; the
//! Full Charges band bills at the Slide E price.

use crate::domain::{FULL_CHARGES_TIER, Scenario, Service, SlidingFeeSchedule, Tier, TierSet};

/// Default fixed-cost pool for the sample clinic.
pub const SAMPLE_FIXED_COSTS: f64 = 60_000.0;

/// Patient-mix fraction per band, in schedule order.
pub const SAMPLE_TIER_MIX: [(&str, f64); 6] = [
    ("Slide A", 0.10),
    ("Slide B", 0.15),
    ("Slide C", 0.25),
    ("Slide D", 0.20),
    ("Slide E", 0.15),
    (FULL_CHARGES_TIER, 0.15),
];

/// `(name, volume, variable_cost_per_unit, [Slide A..E prices])`.
const SAMPLE_SERVICES: &[(&str, f64, f64, [f64; 5])] = &[
    ("UPFH Medical Fee", 1000.0, 10.0, [35.0, 45.0, 60.0, 70.0, 80.0]),
    ("UPFH Counseling", 500.0, 5.0, [20.0, 25.0, 35.0, 40.0, 50.0]),
    ("UPFH Group Counseling", 400.0, 10.0, [10.0, 15.0, 20.0, 25.0, 30.0]),
    ("UPFH Psychiatric Services", 200.0, 10.0, [40.0, 50.0, 60.0, 70.0, 80.0]),
    ("MOBILE Medical *fees waived utilizing state & local grants", 300.0, 15.0, [35.0, 45.0, 60.0, 70.0, 80.0]),
    ("Inhouse Vision Exam", 600.0, 15.0, [20.0, 30.0, 40.0, 50.0, 70.0]),
    ("Replacement Glasses", 150.0, 10.0, [5.0, 8.0, 11.0, 14.0, 17.0]),
    ("MOBILE EYE Exam", 700.0, 10.0, [5.0, 7.0, 8.0, 10.0, 15.0]),
    ("MOBILE EYE - Single Lens Glasses", 400.0, 8.0, [20.0, 30.0, 40.0, 50.0, 60.0]),
    ("MOBILE EYE - Bifocal Lens Glasses", 350.0, 12.0, [30.0, 35.0, 45.0, 55.0, 65.0]),
    ("MVHC Pharmacy Fill Fee", 450.0, 5.0, [3.0, 5.0, 7.0, 8.0, 9.0]),
    ("MA Visit - Labs outside of 7 day global", 500.0, 8.0, [20.0, 25.0, 30.0, 30.0, 35.0]),
    ("MA Visit - VACCINES", 800.0, 10.0, [20.0, 20.0, 20.0, 20.0, 20.0]),
    ("Nuvaring", 100.0, 5.0, [5.0, 6.0, 7.0, 8.0, 30.0]),
    ("Sprintec", 120.0, 4.0, [5.0, 7.0, 15.0, 20.0, 25.0]),
    ("Loestrin", 100.0, 5.0, [10.0, 11.0, 20.0, 25.0, 30.0]),
    ("Ella", 80.0, 5.0, [10.0, 11.0, 25.0, 30.0, 35.0]),
    ("Depo-Provera", 150.0, 6.0, [15.0, 20.0, 25.0, 30.0, 35.0]),
    ("Nexplanon", 90.0, 7.0, [50.0, 60.0, 100.0, 125.0, 150.0]),
    ("Mirena", 70.0, 8.0, [75.0, 85.0, 150.0, 175.0, 200.0]),
    ("Liletta", 60.0, 7.0, [75.0, 85.0, 150.0, 175.0, 200.0]),
    ("Paragard (limited supply)", 50.0, 10.0, [75.0, 85.0, 150.0, 175.0, 200.0]),
    ("IUD Removal Fee", 100.0, 8.0, [35.0, 45.0, 50.0, 55.0, 60.0]),
    ("Implanon Removal", 90.0, 7.0, [35.0, 45.0, 50.0, 55.0, 60.0]),
    ("Vaccine Administration Fee", 600.0, 5.0, [3.0, 4.0, 6.0, 7.0, 8.0]),
    ("STD Testing PLUS OFFICE VISIT", 400.0, 12.0, [85.0, 86.0, 87.0, 88.0, 89.0]),
    ("Steroid Injection - Kenalog PLUS OFFICE VISIT", 350.0, 14.0, [20.0, 25.0, 30.0, 35.0, 40.0]),
    ("Hep A", 200.0, 6.0, [45.0, 46.0, 47.0, 48.0, 49.0]),
    ("Hep B", 220.0, 6.0, [30.0, 31.0, 32.0, 33.0, 34.0]),
    ("HIB", 180.0, 5.0, [30.0, 31.0, 32.0, 33.0, 34.0]),
    ("HPV", 140.0, 8.0, [330.0, 335.0, 335.0, 335.0, 335.0]),
    ("Influenza/Flu", 700.0, 4.0, [18.0, 19.0, 20.0, 21.0, 22.0]),
    ("Child Flu", 500.0, 3.0, [18.0, 19.0, 20.0, 21.0, 22.0]),
    ("Pneumovax", 150.0, 10.0, [106.0, 107.0, 108.0, 109.0, 110.0]),
    ("Prevnar 13", 120.0, 9.0, [190.0, 191.0, 192.0, 193.0, 194.0]),
    ("Adult Menactra", 100.0, 8.0, [120.0, 121.0, 122.0, 123.0, 124.0]),
    ("MMR", 200.0, 6.0, [75.0, 76.0, 77.0, 78.0, 79.0]),
    ("TD-Tetanus", 250.0, 5.0, [35.0, 36.0, 37.0, 38.0, 39.0]),
    ("Adult TDAP (Boostrix)", 230.0, 7.0, [52.0, 53.0, 54.0, 55.0, 56.0]),
    ("Polio/PV", 180.0, 6.0, [35.0, 36.0, 37.0, 38.0, 39.0]),
    ("TB", 400.0, 5.0, [10.0, 11.0, 12.0, 13.0, 14.0]),
    ("Adult Varicella", 170.0, 9.0, [130.0, 132.0, 134.0, 133.0, 134.0]),
    ("B-12", 200.0, 4.0, [15.0, 16.0, 17.0, 18.0, 20.0]),
    ("Wedge Toe nail removal (Global 10 days)", 120.0, 10.0, [75.0, 85.0, 150.0, 175.0, 200.0]),
    ("Toe Nail Removal", 130.0, 9.0, [100.0, 105.0, 110.0, 115.0, 120.0]),
    ("Endometrial Biopsy (Same Day) Add-on cost", 90.0, 8.0, [35.0, 45.0, 60.0, 70.0, 80.0]),
    ("Endometrial Biopsy (Follow-up visit)", 80.0, 7.0, [35.0, 45.0, 60.0, 70.0, 80.0]),
    ("Ear Lavage", 300.0, 5.0, [15.0, 16.0, 17.0, 18.0, 20.0]),
    ("PT/INR - outside the 14 day window", 150.0, 6.0, [15.0, 16.0, 17.0, 18.0, 20.0]),
];

/// Build the sample scenario as a fresh snapshot.
pub fn sample_scenario() -> Scenario {
    let mut services = Vec::with_capacity(SAMPLE_SERVICES.len());
    let mut schedule = SlidingFeeSchedule::new();

    for &(name, volume, unit_cost, prices) in SAMPLE_SERVICES {
        services.push(Service::new(name, volume, unit_cost));
        schedule.insert(name, sample_tiers(prices));
    }

    Scenario {
        services,
        schedule,
        total_fixed_costs: SAMPLE_FIXED_COSTS,
    }
}

/// Canonical tier order of the sample schedule.
pub fn sample_tier_names() -> Vec<String> {
    SAMPLE_TIER_MIX.iter().map(|(name, _)| name.to_string()).collect()
}

fn sample_tiers(prices: [f64; 5]) -> TierSet {
    SAMPLE_TIER_MIX
        .iter()
        .enumerate()
        .map(|(idx, &(name, fraction))| {
            // Full Charges sits past the five slides and reuses the top price.
            let price = prices[idx.min(prices.len() - 1)];
            (name.to_string(), Tier::new(price, fraction))
        })
        .collect()
}
