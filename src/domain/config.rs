//! Run configuration.
//!
//! A config is immutable for the duration of a run. `validate` is called by the
//! task before any selection or fitting so that a bad config never touches flags.

use serde::{Deserialize, Serialize};

use crate::colorterm::ColortermLibrary;
use crate::error::PhotoCalError;

/// Extra candidate cuts applied on top of the finite/positive flux requirement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Source flags that disqualify a pair when set.
    pub bad_flags: Vec<String>,
    /// Reject references fainter than this (AB mag, after colour terms).
    pub mag_limit: Option<f64>,
    /// Minimum instrumental signal-to-noise; needs the flux error column.
    pub min_snr: Option<f64>,
}

/// Outlier rejection parameters for the zero-point fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// Clip residuals further than `n_sigma * sigma` from the centre.
    pub n_sigma: f64,
    /// Maximum number of clipping iterations.
    pub n_iter: usize,
    /// Use the median as centre; otherwise an inverse-variance weighted mean.
    pub use_median: bool,
    /// Added in quadrature to each magnitude error (mag).
    pub mag_err_floor: f64,
    /// Upper bound on the clipping scatter (mag).
    pub sigma_max: Option<f64>,
    /// Minimum number of sources that must survive clipping.
    pub min_used: usize,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            n_sigma: 3.0,
            n_iter: 20,
            use_median: true,
            mag_err_floor: 0.0,
            sigma_max: None,
            min_used: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Instrumental flux column; its error is read from `"{flux_field}Sigma"`.
    pub flux_field: String,
    pub apply_color_terms: bool,
    pub colorterms: ColortermLibrary,
    /// Reference catalog name matched against the colorterm library globs.
    pub photo_cat_name: Option<String>,
    /// Fraction of candidates held out of the fit, in `[0, 1)`.
    pub reserve_fraction: f64,
    pub reserve_seed: u64,
    pub selection: SelectionConfig,
    pub clip: ClipConfig,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            flux_field: "base_PsfFlux_flux".to_string(),
            apply_color_terms: false,
            colorterms: ColortermLibrary::default(),
            photo_cat_name: None,
            reserve_fraction: 0.0,
            reserve_seed: 1,
            selection: SelectionConfig::default(),
            clip: ClipConfig::default(),
        }
    }
}

impl CalibrationConfig {
    /// Name of the instrumental flux error column.
    pub fn flux_err_field(&self) -> String {
        format!("{}Sigma", self.flux_field)
    }

    /// Check scalar settings. Colorterm resolution is checked by the task,
    /// since it also depends on the exposure filter.
    pub fn validate(&self) -> Result<(), PhotoCalError> {
        if self.flux_field.trim().is_empty() {
            return Err(PhotoCalError::config("flux_field must not be empty"));
        }
        if !(self.reserve_fraction.is_finite()
            && self.reserve_fraction >= 0.0
            && self.reserve_fraction < 1.0)
        {
            return Err(PhotoCalError::config(format!(
                "reserve_fraction must lie in [0, 1), got {}",
                self.reserve_fraction
            )));
        }
        if self.apply_color_terms && self.photo_cat_name.is_none() {
            return Err(PhotoCalError::config(
                "apply_color_terms is set but photo_cat_name is not",
            ));
        }

        let clip = &self.clip;
        if !(clip.n_sigma.is_finite() && clip.n_sigma > 0.0) {
            return Err(PhotoCalError::config(format!(
                "clip.n_sigma must be finite and > 0, got {}",
                clip.n_sigma
            )));
        }
        if clip.n_iter == 0 {
            return Err(PhotoCalError::config("clip.n_iter must be >= 1"));
        }
        if clip.min_used == 0 {
            return Err(PhotoCalError::config("clip.min_used must be >= 1"));
        }
        if !(clip.mag_err_floor.is_finite() && clip.mag_err_floor >= 0.0) {
            return Err(PhotoCalError::config("clip.mag_err_floor must be finite and >= 0"));
        }
        if let Some(s) = clip.sigma_max {
            if !(s.is_finite() && s > 0.0) {
                return Err(PhotoCalError::config("clip.sigma_max must be finite and > 0"));
            }
        }

        let sel = &self.selection;
        if let Some(m) = sel.mag_limit {
            if !m.is_finite() {
                return Err(PhotoCalError::config("selection.mag_limit must be finite"));
            }
        }
        if let Some(s) = sel.min_snr {
            if !(s.is_finite() && s >= 0.0) {
                return Err(PhotoCalError::config("selection.min_snr must be finite and >= 0"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(CalibrationConfig::default().validate().is_ok());
    }

    #[test]
    fn reserve_fraction_must_be_below_one() {
        for bad in [1.0, 1.5, -0.1, f64::NAN] {
            let config = CalibrationConfig {
                reserve_fraction: bad,
                ..CalibrationConfig::default()
            };
            assert!(
                matches!(config.validate(), Err(PhotoCalError::Config(_))),
                "reserve_fraction={bad} should be rejected"
            );
        }
        let edge = CalibrationConfig {
            reserve_fraction: 0.999,
            ..CalibrationConfig::default()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn color_terms_need_a_catalog_name() {
        let config = CalibrationConfig {
            apply_color_terms: true,
            ..CalibrationConfig::default()
        };
        assert!(matches!(config.validate(), Err(PhotoCalError::Config(_))));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: CalibrationConfig =
            serde_json::from_str(r#"{"reserve_fraction": 0.25, "clip": {"n_sigma": 2.5}}"#).unwrap();
        assert_eq!(config.reserve_fraction, 0.25);
        assert_eq!(config.clip.n_sigma, 2.5);
        assert_eq!(config.clip.n_iter, 20);
        assert_eq!(config.flux_field, "base_PsfFlux_flux");
        assert_eq!(config.flux_err_field(), "base_PsfFlux_fluxSigma");
    }
}
