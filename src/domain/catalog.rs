//! Catalog rows and matcher output.
//!
//! Columns are kept as name -> value maps because reference catalogs differ in
//! which flux fields they carry (`g_flux`, `r_camFlux`, ...) and the field to use
//! is only known once the exposure filter and config are resolved.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

pub type SourceId = u64;

/// Schema name of the candidate flag column.
pub const CANDIDATE_FLAG: &str = "calib_photometryCandidate";
/// Schema name of the used flag column.
pub const USED_FLAG: &str = "calib_photometryUsed";
/// Schema name of the reserved flag column.
pub const RESERVED_FLAG: &str = "calib_photometryReserved";

/// One row of the reference catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    pub id: u64,
    #[serde(default)]
    pub fields: BTreeMap<String, f64>,
}

impl ReferenceRecord {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: f64) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

/// Calibration flags written per source row.
///
/// Invariants: `used => candidate`, `reserved => candidate`, never `used && reserved`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFlags {
    pub candidate: bool,
    pub used: bool,
    pub reserved: bool,
}

impl SourceFlags {
    pub fn is_consistent(&self) -> bool {
        (!self.used || self.candidate)
            && (!self.reserved || self.candidate)
            && !(self.used && self.reserved)
    }

    /// Look up a flag by its schema column name.
    pub fn get(&self, name: &str) -> Option<bool> {
        match name {
            CANDIDATE_FLAG => Some(self.candidate),
            USED_FLAG => Some(self.used),
            RESERVED_FLAG => Some(self.reserved),
            _ => None,
        }
    }
}

/// One row of the detected-source catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: SourceId,
    /// Measurement columns (`base_PsfFlux_flux`, `base_PsfFlux_fluxSigma`, ...).
    #[serde(default)]
    pub fields: BTreeMap<String, f64>,
    /// Measurement quality flags (`base_PixelFlags_flag_saturated`, ...).
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    /// Photometric calibration flags.
    #[serde(default)]
    pub calib: SourceFlags,
}

impl SourceRecord {
    pub fn new(id: SourceId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: f64) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn with_flag(mut self, name: impl Into<String>, value: bool) -> Self {
        self.flags.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }

    /// Look up a boolean flag, falling back to the calibration flags.
    ///
    /// Missing flags read as `false`.
    pub fn flag(&self, name: &str) -> bool {
        self.calib
            .get(name)
            .or_else(|| self.flags.get(name).copied())
            .unwrap_or(false)
    }
}

/// One update on the flag output channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagUpdate {
    pub source_id: SourceId,
    pub flags: SourceFlags,
}

/// Flag totals over a catalog or update list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlagCounts {
    pub candidates: usize,
    pub used: usize,
    pub reserved: usize,
}

impl FlagCounts {
    pub fn tally<'a>(flags: impl IntoIterator<Item = &'a SourceFlags>) -> Self {
        let mut out = Self::default();
        for f in flags {
            out.candidates += usize::from(f.candidate);
            out.used += usize::from(f.used);
            out.reserved += usize::from(f.reserved);
        }
        out
    }
}

/// The caller-owned detected-source catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceCatalog {
    pub sources: Vec<SourceRecord>,
}

impl SourceCatalog {
    pub fn new(sources: Vec<SourceRecord>) -> Self {
        Self { sources }
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = SourceId> + '_ {
        self.sources.iter().map(|s| s.id)
    }

    /// Reset every row's calibration flags, then apply `updates`.
    ///
    /// Returns the number of updates whose id was not found in the catalog.
    pub fn apply_flag_updates(&mut self, updates: &[FlagUpdate]) -> usize {
        let index: HashMap<SourceId, usize> = self
            .sources
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id, i))
            .collect();

        for source in &mut self.sources {
            source.calib = SourceFlags::default();
        }

        let mut missing = 0;
        for update in updates {
            match index.get(&update.source_id) {
                Some(&i) => self.sources[i].calib = update.flags,
                None => missing += 1,
            }
        }
        missing
    }

    pub fn flag_counts(&self) -> FlagCounts {
        FlagCounts::tally(self.sources.iter().map(|s| &s.calib))
    }
}

/// A (reference, source) pair produced by an external astrometric matcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub reference: ReferenceRecord,
    pub source: SourceRecord,
    /// Match distance; its units are the matcher's business.
    pub distance: f64,
}

/// What the calibration needs to know about the exposure being calibrated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exposure {
    /// Exposure identifier; mixed into the reservation seed when present.
    #[serde(default)]
    pub id: Option<u64>,
    /// Filter name (`g`, `r`, `i`, ...).
    pub filter: String,
}

impl Exposure {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            id: None,
            filter: filter.into(),
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_consistency_rules() {
        let ok = SourceFlags {
            candidate: true,
            used: true,
            reserved: false,
        };
        assert!(ok.is_consistent());
        assert!(SourceFlags::default().is_consistent());

        let used_not_candidate = SourceFlags {
            candidate: false,
            used: true,
            reserved: false,
        };
        assert!(!used_not_candidate.is_consistent());

        let both = SourceFlags {
            candidate: true,
            used: true,
            reserved: true,
        };
        assert!(!both.is_consistent());
    }

    #[test]
    fn apply_flag_updates_resets_stale_flags() {
        let stale = SourceFlags {
            candidate: true,
            used: true,
            reserved: false,
        };
        let mut cat = SourceCatalog::new(vec![SourceRecord::new(1), SourceRecord::new(2)]);
        cat.sources[0].calib = stale;
        cat.sources[1].calib = stale;

        let fresh = SourceFlags {
            candidate: true,
            used: false,
            reserved: true,
        };
        let missing = cat.apply_flag_updates(&[
            FlagUpdate {
                source_id: 2,
                flags: fresh,
            },
            FlagUpdate {
                source_id: 99,
                flags: fresh,
            },
        ]);

        assert_eq!(missing, 1);
        assert_eq!(cat.sources[0].calib, SourceFlags::default());
        assert_eq!(cat.sources[1].calib, fresh);
        assert_eq!(
            cat.flag_counts(),
            FlagCounts {
                candidates: 1,
                used: 0,
                reserved: 1
            }
        );
    }

    #[test]
    fn source_flag_lookup_covers_calibration_columns() {
        let mut src = SourceRecord::new(7).with_flag("base_PixelFlags_flag_saturated", true);
        src.calib.reserved = true;
        assert!(src.flag("base_PixelFlags_flag_saturated"));
        assert!(src.flag(RESERVED_FLAG));
        assert!(!src.flag(USED_FLAG));
        assert!(!src.flag("no_such_flag"));
    }
}
