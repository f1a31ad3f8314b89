//! Matched-catalog bundles on disk.
//!
//! A bundle is the JSON hand-off from an external reference loader and matcher:
//! the exposure, the detected-source catalog, the reference rows, and the match
//! links between them. Links are resolved into `MatchedPair`s here; links that
//! point at unknown rows are reported and skipped, not fatal.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::colorterm::ColortermLibrary;
use crate::domain::{Exposure, MatchedPair, ReferenceRecord, SourceCatalog, SourceId, SourceRecord};
use crate::error::PhotoCalError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchLink {
    pub reference_id: u64,
    pub source_id: SourceId,
    #[serde(default)]
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchBundle {
    pub exposure: Exposure,
    pub sources: Vec<SourceRecord>,
    pub references: Vec<ReferenceRecord>,
    pub matches: Vec<MatchLink>,
}

/// A link that could not be resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkError {
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct IngestedMatches {
    pub exposure: Exposure,
    pub catalog: SourceCatalog,
    pub pairs: Vec<MatchedPair>,
    pub link_errors: Vec<LinkError>,
}

impl MatchBundle {
    /// Build a bundle from in-memory pairs.
    ///
    /// JSON has no NaN/inf, so non-finite columns are dropped; a missing flux
    /// column is just as unusable for calibration.
    pub fn from_pairs(exposure: Exposure, catalog: &SourceCatalog, pairs: &[MatchedPair]) -> Self {
        let mut references: Vec<ReferenceRecord> = Vec::with_capacity(pairs.len());
        let mut seen = HashSet::new();
        let mut matches = Vec::with_capacity(pairs.len());
        for p in pairs {
            if seen.insert(p.reference.id) {
                references.push(finite_reference(&p.reference));
            }
            matches.push(MatchLink {
                reference_id: p.reference.id,
                source_id: p.source.id,
                distance: p.distance,
            });
        }

        Self {
            exposure,
            sources: catalog.sources.iter().map(finite_source).collect(),
            references,
            matches,
        }
    }

    /// Resolve links into matched pairs, in link order.
    pub fn resolve(self) -> IngestedMatches {
        let sources: HashMap<SourceId, &SourceRecord> = self.sources.iter().map(|s| (s.id, s)).collect();
        let references: HashMap<u64, &ReferenceRecord> =
            self.references.iter().map(|r| (r.id, r)).collect();

        let mut pairs = Vec::with_capacity(self.matches.len());
        let mut link_errors = Vec::new();
        for (index, link) in self.matches.iter().enumerate() {
            let Some(source) = sources.get(&link.source_id) else {
                link_errors.push(LinkError {
                    index,
                    message: format!("unknown source id {}", link.source_id),
                });
                continue;
            };
            let Some(reference) = references.get(&link.reference_id) else {
                link_errors.push(LinkError {
                    index,
                    message: format!("unknown reference id {}", link.reference_id),
                });
                continue;
            };
            pairs.push(MatchedPair {
                reference: (*reference).clone(),
                source: (*source).clone(),
                distance: link.distance,
            });
        }

        if !link_errors.is_empty() {
            warn!("{} of {} match links could not be resolved", link_errors.len(), self.matches.len());
        }

        IngestedMatches {
            exposure: self.exposure,
            catalog: SourceCatalog::new(self.sources),
            pairs,
            link_errors,
        }
    }
}

fn finite_source(s: &SourceRecord) -> SourceRecord {
    SourceRecord {
        fields: s.fields.iter().filter(|(_, v)| v.is_finite()).map(|(k, v)| (k.clone(), *v)).collect(),
        ..s.clone()
    }
}

fn finite_reference(r: &ReferenceRecord) -> ReferenceRecord {
    ReferenceRecord {
        id: r.id,
        fields: r.fields.iter().filter(|(_, v)| v.is_finite()).map(|(k, v)| (k.clone(), *v)).collect(),
    }
}

pub fn read_match_bundle(path: &Path) -> Result<MatchBundle, PhotoCalError> {
    let file = File::open(path)
        .map_err(|e| PhotoCalError::Io(format!("failed to open match bundle '{}': {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| PhotoCalError::Parse(format!("invalid match bundle '{}': {e}", path.display())))
}

pub fn write_match_bundle(path: &Path, bundle: &MatchBundle) -> Result<(), PhotoCalError> {
    let file = File::create(path)
        .map_err(|e| PhotoCalError::Io(format!("failed to create match bundle '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, bundle)
        .map_err(|e| PhotoCalError::Io(format!("failed to write match bundle: {e}")))
}

pub fn read_colorterm_library(path: &Path) -> Result<ColortermLibrary, PhotoCalError> {
    let file = File::open(path).map_err(|e| {
        PhotoCalError::Io(format!("failed to open colorterm library '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| PhotoCalError::Parse(format!("invalid colorterm library '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{SimulationConfig, simulate_matches};

    #[test]
    fn bundle_resolves_links_in_order() {
        let json = r#"{
            "exposure": {"id": 5, "filter": "r"},
            "sources": [
                {"id": 1, "fields": {"base_PsfFlux_flux": 1000.0}},
                {"id": 2, "fields": {"base_PsfFlux_flux": 2000.0}, "flags": {"flag_edge": true}}
            ],
            "references": [{"id": 10, "fields": {"r_flux": 1e-5}}, {"id": 11, "fields": {"r_flux": 2e-5}}],
            "matches": [
                {"reference_id": 11, "source_id": 2, "distance": 0.1},
                {"reference_id": 10, "source_id": 1},
                {"reference_id": 99, "source_id": 1}
            ]
        }"#;
        let bundle: MatchBundle = serde_json::from_str(json).unwrap();
        let ingested = bundle.resolve();
        assert_eq!(ingested.exposure.id, Some(5));
        assert_eq!(ingested.pairs.len(), 2);
        assert_eq!(ingested.pairs[0].source.id, 2);
        assert!(ingested.pairs[0].source.flag("flag_edge"));
        assert_eq!(ingested.pairs[1].distance, 0.0);
        assert_eq!(ingested.link_errors.len(), 1);
        assert_eq!(ingested.link_errors[0].index, 2);
        assert_eq!(ingested.catalog.len(), 2);
    }

    #[test]
    fn simulated_bundle_survives_json_with_bad_rows() {
        let sim = simulate_matches(&SimulationConfig {
            count: 40,
            bad_flux_prob: 0.3,
            ..SimulationConfig::default()
        })
        .unwrap();
        let bundle = MatchBundle::from_pairs(sim.exposure.clone(), &sim.catalog, &sim.pairs);
        let json = serde_json::to_string(&bundle).unwrap();
        let back: MatchBundle = serde_json::from_str(&json).unwrap();
        let ingested = back.resolve();
        assert_eq!(ingested.pairs.len(), 40);
        assert!(ingested.link_errors.is_empty());
        for p in &ingested.pairs {
            assert!(p.source.fields.values().all(|v| v.is_finite()));
        }
    }
}
