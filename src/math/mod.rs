//! Mathematical utilities: robust location and scale estimators.

pub mod stats;

pub use stats::*;
