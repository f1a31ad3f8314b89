//! Synthetic data for exercising the calibration end to end.

pub mod sample;

pub use sample::*;
