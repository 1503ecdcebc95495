//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - engine inputs (`Service`, `Tier`, `TierSet`, `SlidingFeeSchedule`, `Scenario`)
//! - engine outputs (`ServiceResult`, `CvpTable`)
//! - run configuration (`RunConfig`, `TierOrderMode`, `FractionCheck`)

pub mod types;

pub use types::*;
