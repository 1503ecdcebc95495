//! Terminal plotting.

pub mod ascii;

pub use ascii::render_profit_bars;
