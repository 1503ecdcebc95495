//! Input/output helpers.
//!
//! - scenario JSON read/write (`scenario`)
//! - long-format CSV ingest + validation (`ingest`)
//! - result exports (CSV/JSON) (`export`)

pub mod export;
pub mod ingest;
pub mod scenario;

pub use export::*;
pub use ingest::*;
pub use scenario::*;
