//! Reporting utilities: residual rankings and formatted terminal output.

use crate::domain::{CalibrationResult, CandidateResidual};

pub mod format;

pub use format::*;

/// Candidates with the largest absolute residuals, largest first.
pub fn largest_residuals(result: &CalibrationResult, top_n: usize) -> Vec<CandidateResidual> {
    let mut sorted = result.residuals.clone();
    sorted.sort_by(|a, b| {
        b.residual
            .abs()
            .partial_cmp(&a.residual.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted.truncate(top_n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CalibrationArrays, CandidateStatus, FlagCounts};
    use crate::photometry::PhotoCalib;

    pub(crate) fn result_with(residuals: Vec<CandidateResidual>) -> CalibrationResult {
        CalibrationResult {
            zero_point: 31.0,
            zero_point_error: 0.004,
            calib: PhotoCalib::new(31.0, 0.004),
            matches: Vec::new(),
            arrays: CalibrationArrays {
                ref_flux_field_list: vec!["i_flux".to_string()],
                ..CalibrationArrays::default()
            },
            counts: FlagCounts {
                candidates: residuals.len(),
                used: residuals.iter().filter(|r| r.status == CandidateStatus::Used).count(),
                reserved: residuals
                    .iter()
                    .filter(|r| r.status == CandidateStatus::Reserved)
                    .count(),
            },
            sigma: 0.05,
            iterations: 2,
            validation: None,
            residuals,
            flag_updates: Vec::new(),
        }
    }

    pub(crate) fn residual(id: u64, ref_mag: f64, residual: f64, status: CandidateStatus) -> CandidateResidual {
        CandidateResidual {
            source_id: id,
            ref_mag,
            residual,
            status,
        }
    }

    #[test]
    fn largest_residuals_rank_by_magnitude() {
        let result = result_with(vec![
            residual(1, 17.0, 0.01, CandidateStatus::Used),
            residual(2, 18.0, -1.5, CandidateStatus::Clipped),
            residual(3, 19.0, 0.2, CandidateStatus::Reserved),
            residual(4, 20.0, -0.05, CandidateStatus::Used),
        ]);
        let top = largest_residuals(&result, 2);
        let ids: Vec<u64> = top.iter().map(|r| r.source_id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(largest_residuals(&result, 10).len(), 4);
    }
}
