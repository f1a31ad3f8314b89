//! Photometric calibration task.
//!
//! `PhotoCalTask::run` drives one exposure through a fixed sequence of stages:
//!
//! ```text
//! Init -> SelectCandidates -> Reserve -> Fit -> AssembleResult -> Done
//! ```
//!
//! The task never mutates the caller's catalog. It returns one `FlagUpdate` per
//! catalog row in the result; `run_and_apply` is the convenience that writes them
//! back, replacing any flags left over from an earlier run.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::domain::{
    CalibrationArrays, CalibrationConfig, CalibrationResult, CandidateResidual, CandidateStatus,
    Exposure, FlagCounts, FlagUpdate, MatchedPair, SourceCatalog, SourceFlags, SourceId,
    ValidationStats,
};
use crate::error::PhotoCalError;
use crate::fit::{
    Candidate, CandidateFilter, RefPhotometry, fit_zero_point, partition, reservation_seed,
    resolve_ref_flux_field, select_candidates,
};
use crate::math::{mean, rms};
use crate::photometry::PhotoCalib;

/// Supplier of matched pairs for an exposure.
///
/// Reference loading and astrometric matching live behind this seam; the task
/// only consumes their output.
pub trait MatchSource {
    fn matched_pairs(
        &self,
        exposure: &Exposure,
        catalog: &SourceCatalog,
    ) -> Result<Vec<MatchedPair>, PhotoCalError>;
}

/// Matches produced ahead of time (e.g. read from disk).
#[derive(Debug, Clone, Default)]
pub struct PrecomputedMatches {
    pub pairs: Vec<MatchedPair>,
}

impl PrecomputedMatches {
    pub fn new(pairs: Vec<MatchedPair>) -> Self {
        Self { pairs }
    }
}

impl MatchSource for PrecomputedMatches {
    fn matched_pairs(
        &self,
        _exposure: &Exposure,
        _catalog: &SourceCatalog,
    ) -> Result<Vec<MatchedPair>, PhotoCalError> {
        Ok(self.pairs.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    SelectCandidates,
    Reserve,
    Fit,
    AssembleResult,
    Done,
}

impl Stage {
    /// Stage name as it appears in errors and logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::SelectCandidates => "candidate selection",
            Self::Reserve => "reservation",
            Self::Fit => "fit",
            Self::AssembleResult => "result assembly",
            Self::Done => "done",
        }
    }
}

pub struct PhotoCalTask {
    config: CalibrationConfig,
    candidate_filter: Option<CandidateFilter>,
}

impl std::fmt::Debug for PhotoCalTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoCalTask")
            .field("config", &self.config)
            .field("candidate_filter", &self.candidate_filter.is_some())
            .finish()
    }
}

impl PhotoCalTask {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            candidate_filter: None,
        }
    }

    /// Add a candidate predicate applied after the configured cuts.
    pub fn with_candidate_filter(
        mut self,
        filter: impl Fn(&MatchedPair) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.candidate_filter = Some(Box::new(filter));
        self
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Calibrate one exposure, fetching matches from `matches`.
    pub fn run(
        &self,
        exposure: &Exposure,
        catalog: &SourceCatalog,
        matches: &dyn MatchSource,
    ) -> Result<CalibrationResult, PhotoCalError> {
        // Config errors must surface before any matching work.
        self.config.validate()?;
        let pairs = matches.matched_pairs(exposure, catalog)?;
        self.run_pairs(exposure, catalog, &pairs)
    }

    /// `run`, then write the resulting flags onto `catalog`.
    ///
    /// On error the catalog is left untouched.
    pub fn run_and_apply(
        &self,
        exposure: &Exposure,
        catalog: &mut SourceCatalog,
        matches: &dyn MatchSource,
    ) -> Result<CalibrationResult, PhotoCalError> {
        let result = self.run(exposure, catalog, matches)?;
        let missing = catalog.apply_flag_updates(&result.flag_updates);
        if missing > 0 {
            warn!("{missing} flag updates had no matching catalog row");
        }
        Ok(result)
    }

    /// Calibrate one exposure from an already matched list of pairs.
    pub fn run_pairs(
        &self,
        exposure: &Exposure,
        catalog: &SourceCatalog,
        pairs: &[MatchedPair],
    ) -> Result<CalibrationResult, PhotoCalError> {
        let mut stage = Stage::Init;
        self.config.validate()?;
        if pairs.is_empty() {
            // Colour-term misconfiguration is still reported as such.
            if self.config.apply_color_terms {
                self.resolve_photometry(exposure, pairs)?;
            }
            advance(&mut stage, Stage::SelectCandidates);
            return Err(PhotoCalError::insufficient(stage.label(), 0, self.config.clip.min_used));
        }
        let photometry = self.resolve_photometry(exposure, pairs)?;
        debug!(
            "calibrating filter {} with reference fields {:?}",
            exposure.filter,
            photometry.flux_fields()
        );

        advance(&mut stage, Stage::SelectCandidates);
        let (candidates, _) =
            select_candidates(pairs, &self.config, &photometry, self.candidate_filter.as_ref());
        if candidates.is_empty() {
            return Err(PhotoCalError::insufficient(stage.label(), 0, self.config.clip.min_used));
        }

        advance(&mut stage, Stage::Reserve);
        let seed = reservation_seed(self.config.reserve_seed, exposure.id);
        let reservation = partition(&candidates, self.config.reserve_fraction, seed);

        advance(&mut stage, Stage::Fit);
        let fit = fit_zero_point(&reservation.fit, &self.config.clip)?;

        advance(&mut stage, Stage::AssembleResult);
        let used: Vec<&Candidate> = reservation
            .fit
            .iter()
            .zip(&fit.used)
            .filter_map(|(c, &u)| u.then_some(c))
            .collect();

        let mut flags: HashMap<SourceId, SourceFlags> = HashMap::with_capacity(candidates.len());
        for c in &candidates {
            flags.entry(pairs[c.index].source.id).or_default().candidate = true;
        }
        for c in &reservation.reserved {
            flags.entry(pairs[c.index].source.id).or_default().reserved = true;
        }
        for c in &used {
            flags.entry(pairs[c.index].source.id).or_default().used = true;
        }
        let flag_updates = build_flag_updates(catalog, &flags);

        let arrays = CalibrationArrays {
            src_mag: used.iter().map(|c| c.src_mag).collect(),
            src_mag_err: used.iter().map(|c| c.src_mag_err).collect(),
            ref_mag: used.iter().map(|c| c.ref_mag).collect(),
            ref_mag_err: used.iter().map(|c| c.ref_mag_err).collect(),
            ref_flux_field_list: photometry.flux_fields(),
        };
        let matches: Vec<MatchedPair> = used.iter().map(|c| pairs[c.index].clone()).collect();
        let validation = validation_stats(&reservation.reserved, fit.zero_point);
        let residuals = candidates
            .iter()
            .map(|c| {
                let source_id = pairs[c.index].source.id;
                let status = match flags.get(&source_id) {
                    Some(f) if f.reserved => CandidateStatus::Reserved,
                    Some(f) if f.used => CandidateStatus::Used,
                    _ => CandidateStatus::Clipped,
                };
                CandidateResidual {
                    source_id,
                    ref_mag: c.ref_mag,
                    residual: c.src_mag + fit.zero_point - c.ref_mag,
                    status,
                }
            })
            .collect();

        let counts = FlagCounts {
            candidates: candidates.len(),
            used: used.len(),
            reserved: reservation.reserved.len(),
        };
        info!(
            "filter {}: {} matches, {} candidates, {} reserved, {} used; zero point {:.4} +/- {:.4} mag",
            exposure.filter,
            pairs.len(),
            counts.candidates,
            counts.reserved,
            counts.used,
            fit.zero_point,
            fit.zero_point_error
        );
        if let Some(v) = validation {
            info!("reserved sample: n={} mean={:.4} rms={:.4}", v.n, v.mean, v.rms);
        }

        advance(&mut stage, Stage::Done);
        Ok(CalibrationResult {
            zero_point: fit.zero_point,
            zero_point_error: fit.zero_point_error,
            calib: PhotoCalib::new(fit.zero_point, fit.zero_point_error),
            matches,
            arrays,
            counts,
            sigma: fit.sigma,
            iterations: fit.iterations,
            validation,
            residuals,
            flag_updates,
        })
    }

    /// Decide how reference magnitudes are read for this exposure.
    pub fn resolve_photometry(
        &self,
        exposure: &Exposure,
        pairs: &[MatchedPair],
    ) -> Result<RefPhotometry, PhotoCalError> {
        if self.config.apply_color_terms {
            let name = self.config.photo_cat_name.as_deref().ok_or_else(|| {
                PhotoCalError::config("apply_color_terms is set but photo_cat_name is not")
            })?;
            let term = self.config.colorterms.resolve(name, &exposure.filter)?;
            return Ok(RefPhotometry::Colorterm(term.clone()));
        }
        resolve_ref_flux_field(pairs, &exposure.filter).map(RefPhotometry::Field)
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!("{} -> {}", stage.label(), next.label());
    *stage = next;
}

/// One update per catalog row, in catalog order; unmatched rows get cleared flags.
fn build_flag_updates(catalog: &SourceCatalog, flags: &HashMap<SourceId, SourceFlags>) -> Vec<FlagUpdate> {
    let updates: Vec<FlagUpdate> = catalog
        .ids()
        .map(|source_id| FlagUpdate {
            source_id,
            flags: flags.get(&source_id).copied().unwrap_or_default(),
        })
        .collect();

    let known = updates.iter().filter(|u| u.flags.candidate).count();
    if known < flags.len() {
        warn!(
            "{} candidate sources are not rows of the source catalog",
            flags.len() - known
        );
    }
    updates
}

fn validation_stats(reserved: &[Candidate], zero_point: f64) -> Option<ValidationStats> {
    if reserved.is_empty() {
        return None;
    }
    let diffs: Vec<f64> = reserved.iter().map(|c| c.src_mag + zero_point - c.ref_mag).collect();
    Some(ValidationStats {
        n: diffs.len(),
        mean: mean(&diffs)?,
        rms: rms(&diffs)?,
    })
}
