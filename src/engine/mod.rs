//! CVP engine.
//!
//! Responsibilities:
//!
//! - validate the input snapshot (non-empty, unique names, schedule coverage, tier shape)
//! - compute per-tier revenue, even fixed-cost split and profit per service
//! - derive clinic totals and breakeven volumes

pub mod analysis;
pub mod cvp;
pub mod error;

pub use analysis::*;
pub use cvp::*;
pub use error::*;
