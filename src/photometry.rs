//! Magnitude / flux conversions.
//!
//! Reference fluxes are in Jansky; instrumental fluxes are in counts. A zero point
//! `zp` maps counts to AB magnitudes as `mag = zp - 2.5 log10(counts)`.

use serde::{Deserialize, Serialize};

/// AB magnitude zero flux density (Jy).
pub const AB_FLUX_JY: f64 = 3631.0;

const POGSON: f64 = 2.5;

/// `2.5 / ln(10)`, the magnitude error of a unit fractional flux error.
pub const MAG_PER_FRAC: f64 = 1.085_736_204_758_129_6;

/// Instrumental magnitude of a flux with no zero point applied.
pub fn mag_from_flux(flux: f64) -> f64 {
    -POGSON * flux.log10()
}

pub fn ab_mag_from_flux(flux_jy: f64) -> f64 {
    -POGSON * (flux_jy / AB_FLUX_JY).log10()
}

pub fn flux_from_ab_mag(mag: f64) -> f64 {
    AB_FLUX_JY * 10f64.powf(-0.4 * mag)
}

/// Magnitude error propagated from a flux error.
pub fn mag_err_from_flux(flux: f64, flux_err: f64) -> f64 {
    MAG_PER_FRAC * (flux_err / flux).abs()
}

/// A fitted photometric zero point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotoCalib {
    pub zero_point: f64,
    pub zero_point_err: f64,
}

impl PhotoCalib {
    pub fn new(zero_point: f64, zero_point_err: f64) -> Self {
        Self {
            zero_point,
            zero_point_err,
        }
    }

    /// Calibrated magnitude of an instrumental flux. `magnitude(1.0) == zero_point`.
    pub fn magnitude(&self, flux: f64) -> f64 {
        self.zero_point + mag_from_flux(flux)
    }

    /// Magnitude error including the zero-point uncertainty.
    pub fn magnitude_err(&self, flux: f64, flux_err: f64) -> f64 {
        let m = mag_err_from_flux(flux, flux_err);
        (m * m + self.zero_point_err * self.zero_point_err).sqrt()
    }

    /// Instrumental flux that would be measured for a calibrated magnitude.
    pub fn flux(&self, mag: f64) -> f64 {
        10f64.powf(-0.4 * (mag - self.zero_point))
    }

    /// Instrumental flux of a zero-magnitude source.
    pub fn flux_mag0(&self) -> f64 {
        self.flux(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ab_zero_flux_is_zero_mag() {
        assert_relative_eq!(ab_mag_from_flux(AB_FLUX_JY), 0.0, epsilon = 1e-12);
        assert_relative_eq!(flux_from_ab_mag(ab_mag_from_flux(1.234e-5)), 1.234e-5, max_relative = 1e-12);
    }

    #[test]
    fn unit_flux_reads_zero_point() {
        let calib = PhotoCalib::new(31.3145, 0.01);
        assert_relative_eq!(calib.magnitude(1.0), 31.3145, epsilon = 1e-12);
        assert_relative_eq!(calib.magnitude(100.0), 26.3145, epsilon = 1e-12);
        assert_relative_eq!(calib.flux(26.3145), 100.0, max_relative = 1e-10);
        assert_relative_eq!(calib.flux_mag0(), 10f64.powf(0.4 * 31.3145), max_relative = 1e-12);
    }

    #[test]
    fn ten_percent_flux_error_is_about_a_tenth_mag() {
        assert_relative_eq!(mag_err_from_flux(100.0, 10.0), 0.10857362, epsilon = 1e-8);
        let calib = PhotoCalib::new(25.0, 0.0);
        assert_relative_eq!(calib.magnitude_err(100.0, 10.0), 0.10857362, epsilon = 1e-8);
    }
}
