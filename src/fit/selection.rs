//! Candidate selection: which matched pairs are usable for the zero-point fit.
//!
//! A pair qualifies when:
//! 1. its reference magnitude (plain or colour-term corrected) is finite, which
//!    requires every reference flux it is built from to be finite and > 0
//! 2. its instrumental flux is finite and > 0
//! 3. it passes the configured extra cuts (bad flags, magnitude limit, SNR) and
//!    the optional caller-supplied predicate
//!
//! Pairs that fail are dropped silently; bad rows are expected data-quality noise.
//! A source matched more than once only contributes its first pair.

use std::collections::HashSet;

use log::debug;

use crate::colorterm::{Colorterm, reference_mag_err};
use crate::domain::{CalibrationConfig, MatchedPair, ReferenceRecord};
use crate::error::PhotoCalError;
use crate::photometry::{ab_mag_from_flux, mag_err_from_flux, mag_from_flux};

/// Caller-supplied candidate predicate, applied after the built-in cuts.
pub type CandidateFilter = Box<dyn Fn(&MatchedPair) -> bool + Send + Sync>;

/// Default flux field of a reference catalog with no per-band columns.
pub const DEFAULT_REF_FLUX_FIELD: &str = "flux";

/// How reference magnitudes are read off a reference record.
#[derive(Debug, Clone, PartialEq)]
pub enum RefPhotometry {
    /// AB magnitude of a single flux field.
    Field(String),
    /// Colour-term corrected magnitude from the term's primary and secondary bands.
    Colorterm(Colorterm),
}

impl RefPhotometry {
    /// Flux fields this source reads, in `[primary, secondary]` order.
    pub fn flux_fields(&self) -> Vec<String> {
        match self {
            Self::Field(f) => vec![f.clone()],
            Self::Colorterm(ct) => vec![ct.primary_flux_field(), ct.secondary_flux_field()],
        }
    }

    /// Reference magnitude and error; `None` for unusable fluxes.
    pub fn ref_mag(&self, reference: &ReferenceRecord) -> Option<(f64, f64)> {
        match self {
            Self::Field(field) => {
                let flux = reference.get(field).filter(|f| f.is_finite() && *f > 0.0)?;
                let mag = ab_mag_from_flux(flux);
                mag.is_finite()
                    .then(|| (mag, reference_mag_err(reference, field, flux)))
            }
            Self::Colorterm(ct) => ct.corrected_mag(reference),
        }
    }
}

/// Pick the reference flux field for `filter`.
///
/// Tries `"{filter}_camFlux"`, then `"{filter}_flux"`, then `"flux"`; a field is
/// present if any reference record carries it.
pub fn resolve_ref_flux_field(pairs: &[MatchedPair], filter: &str) -> Result<String, PhotoCalError> {
    let options = [
        format!("{filter}_camFlux"),
        format!("{filter}_flux"),
        DEFAULT_REF_FLUX_FIELD.to_string(),
    ];
    for field in &options {
        if pairs.iter().any(|p| p.reference.has_field(field)) {
            return Ok(field.clone());
        }
    }
    Err(PhotoCalError::config(format!(
        "reference catalog has none of the flux fields {}",
        options.join(", ")
    )))
}

/// A matched pair that passed selection, with its magnitudes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Index into the matched-pair list.
    pub index: usize,
    pub src_mag: f64,
    pub src_mag_err: f64,
    pub ref_mag: f64,
    pub ref_mag_err: f64,
}

impl Candidate {
    /// `src_mag - ref_mag`; the negated centre of these is the zero point.
    pub fn residual(&self) -> f64 {
        self.src_mag - self.ref_mag
    }
}

/// Counts of pairs dropped per reason, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionStats {
    pub bad_ref_flux: usize,
    pub bad_src_flux: usize,
    pub bad_flag: usize,
    pub too_faint: usize,
    pub low_snr: usize,
    pub filtered: usize,
    pub duplicate: usize,
}

impl SelectionStats {
    pub fn total(&self) -> usize {
        self.bad_ref_flux
            + self.bad_src_flux
            + self.bad_flag
            + self.too_faint
            + self.low_snr
            + self.filtered
            + self.duplicate
    }
}

/// Select usable pairs, preserving input order.
pub fn select_candidates(
    pairs: &[MatchedPair],
    config: &CalibrationConfig,
    photometry: &RefPhotometry,
    extra: Option<&CandidateFilter>,
) -> (Vec<Candidate>, SelectionStats) {
    let flux_err_field = config.flux_err_field();
    let sel = &config.selection;
    let mut stats = SelectionStats::default();
    let mut out = Vec::with_capacity(pairs.len());
    let mut seen = HashSet::new();

    for (index, pair) in pairs.iter().enumerate() {
        let Some((ref_mag, ref_mag_err)) = photometry.ref_mag(&pair.reference) else {
            stats.bad_ref_flux += 1;
            continue;
        };

        let Some(flux) = pair
            .source
            .get(&config.flux_field)
            .filter(|f| f.is_finite() && *f > 0.0)
        else {
            stats.bad_src_flux += 1;
            continue;
        };

        if sel.bad_flags.iter().any(|name| pair.source.flag(name)) {
            stats.bad_flag += 1;
            continue;
        }

        if sel.mag_limit.is_some_and(|limit| ref_mag > limit) {
            stats.too_faint += 1;
            continue;
        }

        let flux_err = pair
            .source
            .get(&flux_err_field)
            .filter(|e| e.is_finite() && *e >= 0.0);

        if let Some(min_snr) = sel.min_snr {
            // Without an error column the SNR is unknown and the cut fails.
            let passes = match flux_err {
                Some(e) if e > 0.0 => flux / e >= min_snr,
                Some(_) => true,
                None => false,
            };
            if !passes {
                stats.low_snr += 1;
                continue;
            }
        }

        if extra.is_some_and(|f| !f(pair)) {
            stats.filtered += 1;
            continue;
        }

        if !seen.insert(pair.source.id) {
            stats.duplicate += 1;
            continue;
        }

        out.push(Candidate {
            index,
            src_mag: mag_from_flux(flux),
            src_mag_err: flux_err.map(|e| mag_err_from_flux(flux, e)).unwrap_or(0.0),
            ref_mag,
            ref_mag_err,
        });
    }

    if stats.total() > 0 {
        debug!(
            "dropped {} of {} matches before fitting (ref flux {}, src flux {}, flags {}, mag limit {}, snr {}, filter {}, duplicate {})",
            stats.total(),
            pairs.len(),
            stats.bad_ref_flux,
            stats.bad_src_flux,
            stats.bad_flag,
            stats.too_faint,
            stats.low_snr,
            stats.filtered,
            stats.duplicate,
        );
    }
    debug!("selected {} candidates from {} matches", out.len(), pairs.len());

    (out, stats)
}
