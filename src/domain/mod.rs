//! Domain types used throughout the calibration pipeline.
//!
//! This module defines:
//!
//! - catalog rows (`ReferenceRecord`, `SourceRecord`, `SourceCatalog`)
//! - matcher output (`MatchedPair`) and the exposure it belongs to
//! - per-source calibration flags and the update channel that carries them
//! - run configuration (`CalibrationConfig`, `SelectionConfig`, `ClipConfig`)
//! - run outputs (`CalibrationResult`, `CalibrationArrays`, `CandidateResidual`, `ValidationStats`)

pub mod catalog;
pub mod config;
pub mod result;

pub use catalog::*;
pub use config::*;
pub use result::*;
