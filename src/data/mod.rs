//! Built-in datasets.

pub mod sample;

pub use sample::{SAMPLE_FIXED_COSTS, sample_scenario, sample_tier_names};
