//! Colour-term corrections from a reference photometric system to the instrument's.
//!
//! A colour term maps a reference catalog's primary-band magnitude onto the
//! instrument's filter as a quadratic in the reference colour:
//!
//! ```text
//! mag = primary + c0 + c1 * (primary - secondary) + c2 * (primary - secondary)^2
//! ```
//!
//! Terms are grouped per filter into a `ColortermDict`, and dicts are keyed by a
//! glob over reference catalog names in a `ColortermLibrary`.

pub mod library;

pub use library::*;

use serde::{Deserialize, Serialize};

use crate::domain::ReferenceRecord;
use crate::photometry::{ab_mag_from_flux, mag_err_from_flux};

/// Polynomial colour term for one filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Colorterm {
    /// Reference band the correction is anchored on.
    pub primary: String,
    /// Reference band used to form the colour.
    pub secondary: String,
    #[serde(default)]
    pub c0: f64,
    #[serde(default)]
    pub c1: f64,
    #[serde(default)]
    pub c2: f64,
}

impl Colorterm {
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>, c0: f64, c1: f64, c2: f64) -> Self {
        Self {
            primary: primary.into(),
            secondary: secondary.into(),
            c0,
            c1,
            c2,
        }
    }

    /// Apply the correction to a pair of reference magnitudes.
    pub fn transform_mags(&self, primary_mag: f64, secondary_mag: f64) -> f64 {
        let color = primary_mag - secondary_mag;
        primary_mag + self.c0 + color * (self.c1 + color * self.c2)
    }

    /// Propagate magnitude errors through `transform_mags` (first order).
    pub fn transform_mag_errs(
        &self,
        primary_mag: f64,
        secondary_mag: f64,
        primary_err: f64,
        secondary_err: f64,
    ) -> f64 {
        let color = primary_mag - secondary_mag;
        let slope = self.c1 + 2.0 * self.c2 * color;
        let dp = (1.0 + slope) * primary_err;
        let ds = slope * secondary_err;
        (dp * dp + ds * ds).sqrt()
    }

    pub fn primary_flux_field(&self) -> String {
        format!("{}_flux", self.primary)
    }

    pub fn secondary_flux_field(&self) -> String {
        format!("{}_flux", self.secondary)
    }

    /// Corrected AB magnitude (and error, 0 when unknown) of a reference record.
    ///
    /// Returns `None` when either band flux is missing, non-finite or non-positive.
    pub fn corrected_mag(&self, reference: &ReferenceRecord) -> Option<(f64, f64)> {
        let p_field = self.primary_flux_field();
        let s_field = self.secondary_flux_field();
        let p_flux = positive(reference.get(&p_field))?;
        let s_flux = positive(reference.get(&s_field))?;

        let p_mag = ab_mag_from_flux(p_flux);
        let s_mag = ab_mag_from_flux(s_flux);
        let mag = self.transform_mags(p_mag, s_mag);
        if !mag.is_finite() {
            return None;
        }

        let p_err = reference_mag_err(reference, &p_field, p_flux);
        let s_err = reference_mag_err(reference, &s_field, s_flux);
        let err = self.transform_mag_errs(p_mag, s_mag, p_err, s_err);
        Some((mag, if err.is_finite() { err } else { 0.0 }))
    }
}

/// Reference magnitude error from `"{field}Sigma"` or `"{field}Err"`, else 0.
pub fn reference_mag_err(reference: &ReferenceRecord, field: &str, flux: f64) -> f64 {
    let err = reference
        .get(&format!("{field}Sigma"))
        .or_else(|| reference.get(&format!("{field}Err")));
    match err {
        Some(e) if e.is_finite() && e >= 0.0 => mag_err_from_flux(flux, e),
        _ => 0.0,
    }
}

fn positive(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite() && *x > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photometry::flux_from_ab_mag;
    use approx::assert_abs_diff_eq;

    #[test]
    fn quadratic_term_uses_colour() {
        let ct = Colorterm::new("g", "r", 0.1, 0.2, 0.05);
        // colour = 1.0: 20 + 0.1 + 0.2 + 0.05
        assert_abs_diff_eq!(ct.transform_mags(20.0, 19.0), 20.35, epsilon = 1e-12);
    }

    #[test]
    fn zero_c2_degenerates_to_linear() {
        let ct = Colorterm::new("g", "r", -0.03, 0.1, 0.0);
        for color in [-1.0, 0.0, 0.5, 2.0] {
            assert_abs_diff_eq!(
                ct.transform_mags(18.0, 18.0 - color),
                18.0 - 0.03 + 0.1 * color,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn constant_term_shifts_reference_magnitude() {
        let reference = ReferenceRecord::new(1)
            .with_field("i_flux", flux_from_ab_mag(19.0))
            .with_field("z_flux", flux_from_ab_mag(18.7));
        let ct = Colorterm::new("i", "z", 1.0, 0.0, 0.0);
        let (mag, err) = ct.corrected_mag(&reference).unwrap();
        assert_abs_diff_eq!(mag, 20.0, epsilon = 1e-9);
        assert_eq!(err, 0.0);
    }

    #[test]
    fn missing_or_negative_secondary_flux_gives_none() {
        let ct = Colorterm::new("i", "z", 0.0, 0.1, 0.0);
        let no_secondary = ReferenceRecord::new(1).with_field("i_flux", 1e-5);
        assert!(ct.corrected_mag(&no_secondary).is_none());

        let negative = no_secondary.with_field("z_flux", -1e-5);
        assert!(ct.corrected_mag(&negative).is_none());
    }

    #[test]
    fn errors_propagate_through_linear_term() {
        let ct = Colorterm::new("g", "r", 0.0, 0.5, 0.0);
        let err = ct.transform_mag_errs(20.0, 19.5, 0.02, 0.04);
        let expected = ((1.5f64 * 0.02).powi(2) + (0.5f64 * 0.04).powi(2)).sqrt();
        assert_abs_diff_eq!(err, expected, epsilon = 1e-12);
    }
}
