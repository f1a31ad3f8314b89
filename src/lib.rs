//! `photocal` library crate.
//!
//! Fits the photometric zero point of an exposure from sources matched to a
//! reference catalog. The binary (`photocal`) is a thin wrapper around this
//! library so the calibration is testable without spawning processes.

pub mod app;
pub mod cli;
pub mod colorterm;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod photometry;
pub mod plot;
pub mod report;
pub mod task;
