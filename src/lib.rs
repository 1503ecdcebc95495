//! `clinic-cvp` library crate.
//!
//! The binary (`cvp`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the engine is reusable from other front-ends
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod engine;
pub mod error;
pub mod io;
pub mod logging;
pub mod plot;
pub mod report;
pub mod tui;
