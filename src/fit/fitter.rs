//! Robust zero-point fit.
//!
//! Given candidates with instrumental magnitudes `m_i` and reference magnitudes
//! `M_i`, the residuals `d_i = m_i - M_i` scatter around `-zp`. We estimate the
//! centre by iterative sigma clipping:
//!
//! - centre: median (default) or inverse-variance weighted mean of kept residuals
//! - scale: MAD-based Gaussian sigma of kept residuals, optionally capped
//! - keep every residual within `n_sigma * scale` of the centre, over the whole
//!   fit set, and repeat until the kept set stops changing or `n_iter` is reached
//!
//! The zero point is `-centre`, so that a unit instrumental flux has magnitude `zp`.
//! Its error is the standard error of the kept residuals.

use log::debug;

use crate::domain::ClipConfig;
use crate::error::PhotoCalError;
use crate::fit::selection::Candidate;
use crate::math::{mad_sigma, median, sample_std, weighted_mean};

#[derive(Debug, Clone, PartialEq)]
pub struct ZeroPointFit {
    pub zero_point: f64,
    pub zero_point_error: f64,
    /// Sample std of the kept residuals (0 with fewer than two).
    pub sigma: f64,
    /// Per fit-set candidate: survived clipping.
    pub used: Vec<bool>,
    pub iterations: usize,
}

impl ZeroPointFit {
    pub fn n_used(&self) -> usize {
        self.used.iter().filter(|&&u| u).count()
    }
}

/// Fit the zero point over `fit_set`.
pub fn fit_zero_point(fit_set: &[Candidate], clip: &ClipConfig) -> Result<ZeroPointFit, PhotoCalError> {
    // At least one survivor, whatever the config says.
    let required = clip.min_used.max(1);
    let n = fit_set.len();
    if n < required {
        return Err(PhotoCalError::insufficient("fit set", n, required));
    }

    let residuals: Vec<f64> = fit_set.iter().map(Candidate::residual).collect();
    let errors: Vec<f64> = fit_set
        .iter()
        .map(|c| combined_error(c, clip.mag_err_floor))
        .collect();

    let mut keep = vec![true; n];
    let mut iterations = 0;

    for _ in 0..clip.n_iter {
        iterations += 1;
        let (kept, kept_err) = gather(&residuals, &errors, &keep);
        if kept.len() < required {
            return Err(PhotoCalError::insufficient("sigma clipping", kept.len(), required));
        }

        let center = location(&kept, &kept_err, clip.use_median);
        let mut scale = mad_sigma(&kept, center).unwrap_or(0.0);
        if let Some(max) = clip.sigma_max {
            scale = scale.min(max);
        }
        let cut = clip.n_sigma * scale;

        let next: Vec<bool> = residuals.iter().map(|r| (r - center).abs() <= cut).collect();
        debug!(
            "clip iteration {iterations}: centre={center:.5} sigma={scale:.5} kept {} -> {}",
            kept.len(),
            next.iter().filter(|&&k| k).count()
        );

        if next == keep {
            break;
        }
        keep = next;
    }

    let (kept, kept_err) = gather(&residuals, &errors, &keep);
    if kept.len() < required {
        return Err(PhotoCalError::insufficient("sigma clipping", kept.len(), required));
    }

    let center = location(&kept, &kept_err, clip.use_median);
    let sigma = sample_std(&kept).unwrap_or(0.0);
    let zero_point_error = if kept.len() >= 2 {
        sigma / (kept.len() as f64).sqrt()
    } else {
        kept_err
            .first()
            .copied()
            .ok_or_else(|| PhotoCalError::insufficient("sigma clipping", 0, required))?
    };

    Ok(ZeroPointFit {
        zero_point: -center,
        zero_point_error,
        sigma,
        used: keep,
        iterations,
    })
}

fn combined_error(c: &Candidate, floor: f64) -> f64 {
    (c.src_mag_err * c.src_mag_err + c.ref_mag_err * c.ref_mag_err + floor * floor).sqrt()
}

fn gather(residuals: &[f64], errors: &[f64], keep: &[bool]) -> (Vec<f64>, Vec<f64>) {
    residuals
        .iter()
        .zip(errors)
        .zip(keep)
        .filter(|(_, k)| **k)
        .map(|((r, e), _)| (*r, *e))
        .unzip()
}

fn location(values: &[f64], errors: &[f64], use_median: bool) -> f64 {
    if use_median {
        return median(values).unwrap_or(f64::NAN);
    }
    // Inverse-variance weights only when every error is known.
    let weights: Vec<f64> = if errors.iter().all(|e| e.is_finite() && *e > 0.0) {
        errors.iter().map(|e| 1.0 / (e * e)).collect()
    } else {
        vec![1.0; values.len()]
    };
    weighted_mean(values, &weights).unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cand(index: usize, residual: f64) -> Candidate {
        Candidate {
            index,
            src_mag: -10.0 + residual,
            src_mag_err: 0.0,
            ref_mag: -10.0,
            ref_mag_err: 0.0,
        }
    }

    fn scattered(zp: f64, n: usize) -> Vec<Candidate> {
        // Deterministic symmetric scatter of +-0.05 mag around -zp.
        (0..n)
            .map(|i| {
                let jitter = ((i % 11) as f64 - 5.0) * 0.01;
                cand(i, -zp + jitter)
            })
            .collect()
    }

    #[test]
    fn recovers_zero_point_and_clips_outliers() {
        let mut cands = scattered(27.5, 60);
        cands.push(cand(60, -27.5 + 3.0));
        cands.push(cand(61, -27.5 - 4.0));

        let fit = fit_zero_point(&cands, &ClipConfig::default()).unwrap();
        assert_abs_diff_eq!(fit.zero_point, 27.5, epsilon = 0.01);
        assert!(!fit.used[60]);
        assert!(!fit.used[61]);
        assert_eq!(fit.n_used(), 60);
        assert!(fit.zero_point_error > 0.0 && fit.zero_point_error < 0.01);
    }

    #[test]
    fn identical_residuals_are_all_used() {
        let cands: Vec<Candidate> = (0..10).map(|i| cand(i, -25.0)).collect();
        let fit = fit_zero_point(&cands, &ClipConfig::default()).unwrap();
        assert_eq!(fit.n_used(), 10);
        assert_abs_diff_eq!(fit.zero_point, 25.0, epsilon = 1e-12);
        assert_eq!(fit.zero_point_error, 0.0);
        assert_eq!(fit.iterations, 1);
    }

    #[test]
    fn weighted_mean_mode_prefers_precise_points() {
        let mut cands = vec![cand(0, -20.0), cand(1, -21.0)];
        cands[0].src_mag_err = 0.01;
        cands[1].src_mag_err = 0.1;
        let clip = ClipConfig {
            use_median: false,
            n_sigma: 100.0,
            min_used: 2,
            ..ClipConfig::default()
        };
        let fit = fit_zero_point(&cands, &clip).unwrap();
        // weights 10000 : 100
        let expected = (20.0 * 10000.0 + 21.0 * 100.0) / 10100.0;
        assert_abs_diff_eq!(fit.zero_point, expected, epsilon = 1e-9);
    }

    #[test]
    fn too_few_candidates_is_insufficient_data() {
        let cands = scattered(25.0, 2);
        let err = fit_zero_point(&cands, &ClipConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            PhotoCalError::InsufficientData { found: 2, required: 3, .. }
        ));
    }

    #[test]
    fn too_few_survivors_is_insufficient_data() {
        // Three identical residuals give a zero MAD, so the two others are clipped.
        let cands = vec![
            cand(0, -25.0),
            cand(1, -25.0),
            cand(2, -25.0),
            cand(3, -35.0),
            cand(4, -15.0),
        ];
        let clip = ClipConfig {
            min_used: 5,
            ..ClipConfig::default()
        };
        let err = fit_zero_point(&cands, &clip).unwrap_err();
        assert!(matches!(err, PhotoCalError::InsufficientData { stage: "sigma clipping", .. }));
    }

    #[test]
    fn zero_min_used_still_needs_one_source() {
        let clip = ClipConfig {
            min_used: 0,
            ..ClipConfig::default()
        };
        let err = fit_zero_point(&[], &clip).unwrap_err();
        assert!(matches!(
            err,
            PhotoCalError::InsufficientData { stage: "fit set", found: 0, required: 1 }
        ));

        let mut single = vec![cand(0, -25.0)];
        single[0].src_mag_err = 0.03;
        let fit = fit_zero_point(&single, &clip).unwrap();
        assert_abs_diff_eq!(fit.zero_point, 25.0, epsilon = 1e-12);
        assert_abs_diff_eq!(fit.zero_point_error, 0.03, epsilon = 1e-12);
    }

    #[test]
    fn sigma_max_caps_the_clip_width() {
        let mut cands = scattered(25.0, 40);
        cands.push(cand(40, -25.0 + 0.4));
        let loose = fit_zero_point(&cands, &ClipConfig {
            n_sigma: 100.0,
            ..ClipConfig::default()
        })
        .unwrap();
        assert!(loose.used[40]);

        let capped = fit_zero_point(&cands, &ClipConfig {
            n_sigma: 100.0,
            sigma_max: Some(0.002),
            ..ClipConfig::default()
        })
        .unwrap();
        assert!(!capped.used[40]);
    }
}
