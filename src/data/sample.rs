//! Synthetic matched catalogs with a known zero point.
//!
//! Each simulated star gets a reference AB magnitude drawn uniformly in
//! `[mag_min, mag_max]` and a colour drawn from a normal distribution. Its
//! instrumental magnitude is `ref_mag - zero_point + scatter * z`, plus a gross
//! jump of at least `outlier_mag` (random sign) with probability `outlier_prob`.
//! A fraction of rows get unusable fluxes (NaN, negative, or zero reference flux)
//! to exercise candidate selection.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use serde::{Deserialize, Serialize};

use crate::domain::{Exposure, MatchedPair, ReferenceRecord, SourceCatalog, SourceId, SourceRecord};
use crate::error::PhotoCalError;
use crate::photometry::{MAG_PER_FRAC, flux_from_ab_mag};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of matched pairs.
    pub count: usize,
    /// Extra catalog rows with no reference match.
    pub unmatched: usize,
    pub zero_point: f64,
    /// Gaussian magnitude scatter of the instrumental measurements.
    pub scatter: f64,
    pub outlier_prob: f64,
    /// Minimum size of a gross outlier (mag).
    pub outlier_mag: f64,
    /// Probability that a row carries an unusable flux.
    pub bad_flux_prob: f64,
    pub mag_min: f64,
    pub mag_max: f64,
    pub color_mean: f64,
    pub color_sigma: f64,
    pub filter: String,
    /// Second reference band, for colour terms.
    pub secondary_filter: String,
    pub flux_field: String,
    pub exposure_id: Option<u64>,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            count: 200,
            unmatched: 0,
            zero_point: 31.0,
            scatter: 0.05,
            outlier_prob: 0.05,
            outlier_mag: 1.0,
            bad_flux_prob: 0.0,
            mag_min: 16.0,
            mag_max: 21.0,
            color_mean: 0.3,
            color_sigma: 0.2,
            filter: "i".to_string(),
            secondary_filter: "z".to_string(),
            flux_field: "base_PsfFlux_flux".to_string(),
            exposure_id: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedMatches {
    pub exposure: Exposure,
    pub catalog: SourceCatalog,
    pub pairs: Vec<MatchedPair>,
    /// Sources given a gross outlier jump.
    pub outliers: Vec<SourceId>,
    /// Sources given an unusable flux.
    pub bad_rows: Vec<SourceId>,
}

pub fn simulate_matches(config: &SimulationConfig) -> Result<SimulatedMatches, PhotoCalError> {
    if config.count == 0 {
        return Err(PhotoCalError::config("simulation count must be > 0"));
    }
    if !(config.scatter.is_finite() && config.scatter >= 0.0) {
        return Err(PhotoCalError::config("simulation scatter must be finite and >= 0"));
    }
    for (name, p) in [
        ("outlier_prob", config.outlier_prob),
        ("bad_flux_prob", config.bad_flux_prob),
    ] {
        if !(0.0..=1.0).contains(&p) {
            return Err(PhotoCalError::config(format!("simulation {name} must lie in [0, 1]")));
        }
    }
    if !(config.mag_min.is_finite() && config.mag_max.is_finite() && config.mag_max > config.mag_min) {
        return Err(PhotoCalError::config("invalid simulation magnitude range"));
    }

    let mut rng = StdRng::seed_from_u64(sample_seed(config));
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| PhotoCalError::config(format!("noise distribution error: {e}")))?;

    let primary_field = format!("{}_flux", config.filter);
    let secondary_field = format!("{}_flux", config.secondary_filter);
    let flux_err_field = format!("{}Sigma", config.flux_field);

    let mut sources = Vec::with_capacity(config.count + config.unmatched);
    let mut pairs = Vec::with_capacity(config.count);
    let mut outliers = Vec::new();
    let mut bad_rows = Vec::new();

    for i in 0..config.count {
        let id = i as SourceId + 1;
        let ref_mag = rng.gen_range(config.mag_min..config.mag_max);
        let color = config.color_mean + config.color_sigma * normal.sample(&mut rng);

        let mut inst_mag = ref_mag - config.zero_point + config.scatter * normal.sample(&mut rng);
        let roll: f64 = rng.r#gen();
        if roll < config.outlier_prob {
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            inst_mag += sign * config.outlier_mag * (1.0 + rng.r#gen::<f64>());
            outliers.push(id);
        }

        let mut inst_flux = 10f64.powf(-0.4 * inst_mag);
        let inst_flux_err = inst_flux * config.scatter / MAG_PER_FRAC;
        let mut ref_flux = flux_from_ab_mag(ref_mag);

        let roll: f64 = rng.r#gen();
        if roll < config.bad_flux_prob {
            match rng.gen_range(0..3) {
                0 => inst_flux = f64::NAN,
                1 => inst_flux = -inst_flux,
                _ => ref_flux = 0.0,
            }
            bad_rows.push(id);
        }

        let source = SourceRecord::new(id)
            .with_field(config.flux_field.clone(), inst_flux)
            .with_field(flux_err_field.clone(), inst_flux_err);
        let reference = ReferenceRecord::new(1_000_000 + id)
            .with_field(primary_field.clone(), ref_flux)
            .with_field(secondary_field.clone(), flux_from_ab_mag(ref_mag - color));

        sources.push(source.clone());
        pairs.push(MatchedPair {
            reference,
            source,
            distance: rng.gen_range(0.0..0.5),
        });
    }

    for j in 0..config.unmatched {
        let id = (config.count + j) as SourceId + 1;
        let inst_mag = rng.gen_range(config.mag_min..config.mag_max) - config.zero_point;
        sources.push(SourceRecord::new(id).with_field(config.flux_field.clone(), 10f64.powf(-0.4 * inst_mag)));
    }

    let exposure = Exposure {
        id: config.exposure_id,
        filter: config.filter.clone(),
    };

    Ok(SimulatedMatches {
        exposure,
        catalog: SourceCatalog::new(sources),
        pairs,
        outliers,
        bad_rows,
    })
}

fn sample_seed(config: &SimulationConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    config.seed.hash(&mut hasher);
    config.count.hash(&mut hasher);
    config.unmatched.hash(&mut hasher);
    config.zero_point.to_bits().hash(&mut hasher);
    config.scatter.to_bits().hash(&mut hasher);
    config.outlier_prob.to_bits().hash(&mut hasher);
    config.outlier_mag.to_bits().hash(&mut hasher);
    config.bad_flux_prob.to_bits().hash(&mut hasher);
    config.mag_min.to_bits().hash(&mut hasher);
    config.mag_max.to_bits().hash(&mut hasher);
    config.filter.hash(&mut hasher);
    hasher.finish()
}
