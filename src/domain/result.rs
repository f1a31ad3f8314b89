//! Outputs of a calibration run.

use serde::{Deserialize, Serialize};

use crate::domain::{FlagCounts, FlagUpdate, MatchedPair, SourceId};
use crate::photometry::PhotoCalib;

/// Per-pair magnitude arrays for the pairs used in the fit (same order as `matches`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationArrays {
    /// Instrumental magnitudes, `-2.5 log10(flux)` with no zero point applied.
    pub src_mag: Vec<f64>,
    pub src_mag_err: Vec<f64>,
    /// Reference AB magnitudes (colour-term corrected when enabled).
    pub ref_mag: Vec<f64>,
    pub ref_mag_err: Vec<f64>,
    /// Reference flux fields read: `[field]`, or `[primary, secondary]` with colour terms.
    pub ref_flux_field_list: Vec<String>,
}

/// Residual statistics of the held-out sample, `src_mag + zp - ref_mag`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationStats {
    pub n: usize,
    pub mean: f64,
    pub rms: f64,
}

/// Where a candidate ended up after reservation and clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateStatus {
    Used,
    Clipped,
    Reserved,
}

/// Post-fit residual of one candidate, `src_mag + zp - ref_mag`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateResidual {
    pub source_id: SourceId,
    pub ref_mag: f64,
    pub residual: f64,
    pub status: CandidateStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResult {
    pub zero_point: f64,
    pub zero_point_error: f64,
    pub calib: PhotoCalib,
    /// Pairs that survived clipping, in input order.
    pub matches: Vec<MatchedPair>,
    pub arrays: CalibrationArrays,
    pub counts: FlagCounts,
    /// Fit residual scatter (sample std of `src_mag + zp - ref_mag` over used pairs).
    pub sigma: f64,
    /// Number of clipping iterations run.
    pub iterations: usize,
    pub validation: Option<ValidationStats>,
    /// Every candidate, in selection order.
    pub residuals: Vec<CandidateResidual>,
    /// One entry per catalog row; applying these replaces all calibration flags.
    pub flag_updates: Vec<FlagUpdate>,
}
