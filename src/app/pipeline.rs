//! Shared calibration pipeline: bundle -> link resolution -> task -> flagged catalog.

use crate::domain::{CalibrationConfig, CalibrationResult};
use crate::error::PhotoCalError;
use crate::io::{IngestedMatches, MatchBundle};
use crate::task::{PhotoCalTask, PrecomputedMatches};

/// All computed outputs of a single `photocal fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// The ingested bundle; its catalog carries the calibration flags of this run.
    pub ingested: IngestedMatches,
    pub result: CalibrationResult,
}

pub fn run_calibration(config: &CalibrationConfig, bundle: MatchBundle) -> Result<RunOutput, PhotoCalError> {
    let mut ingested = bundle.resolve();
    let task = PhotoCalTask::new(config.clone());
    let matches = PrecomputedMatches::new(ingested.pairs.clone());
    let result = task.run_and_apply(&ingested.exposure, &mut ingested.catalog, &matches)?;
    Ok(RunOutput { ingested, result })
}
