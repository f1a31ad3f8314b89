//! Glob-keyed colour-term library.
//!
//! The library is an ordered list of `(pattern, dict)` entries. Resolution runs
//! one pass over the list, matching the reference catalog name against every
//! pattern, and requires exactly one hit; it never depends on map iteration order.

use std::collections::BTreeMap;

use glob::Pattern;
use serde::{Deserialize, Serialize};

use super::Colorterm;
use crate::error::PhotoCalError;

/// Colour terms for one reference catalog, keyed by filter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColortermDict {
    pub terms: BTreeMap<String, Colorterm>,
}

impl ColortermDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_term(mut self, filter: impl Into<String>, term: Colorterm) -> Self {
        self.terms.insert(filter.into(), term);
        self
    }

    pub fn get(&self, filter: &str) -> Option<&Colorterm> {
        self.terms.get(filter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColortermLibraryEntry {
    /// Shell-style glob over reference catalog names (`sdss*`).
    pub pattern: String,
    pub terms: ColortermDict,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColortermLibrary {
    pub entries: Vec<ColortermLibraryEntry>,
}

impl ColortermLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, pattern: impl Into<String>, terms: ColortermDict) -> Self {
        self.entries.push(ColortermLibraryEntry {
            pattern: pattern.into(),
            terms,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the single entry whose pattern matches `photo_cat_name`.
    pub fn find_dict(&self, photo_cat_name: &str) -> Result<&ColortermLibraryEntry, PhotoCalError> {
        let mut matched: Vec<&ColortermLibraryEntry> = Vec::new();
        for entry in &self.entries {
            let pattern = Pattern::new(&entry.pattern).map_err(|e| {
                PhotoCalError::config(format!(
                    "invalid colorterm library pattern {:?}: {e}",
                    entry.pattern
                ))
            })?;
            if pattern.matches(photo_cat_name) {
                matched.push(entry);
            }
        }

        match matched.as_slice() {
            [entry] => Ok(entry),
            [] => Err(PhotoCalError::config(format!(
                "no colorterm library pattern matches photo_cat_name {photo_cat_name:?}"
            ))),
            many => {
                let names: Vec<&str> = many.iter().map(|e| e.pattern.as_str()).collect();
                Err(PhotoCalError::config(format!(
                    "multiple colorterm library patterns match photo_cat_name {photo_cat_name:?}: {}",
                    names.join(", ")
                )))
            }
        }
    }

    /// Resolve the colour term for `filter` in the catalog matching `photo_cat_name`.
    pub fn resolve(&self, photo_cat_name: &str, filter: &str) -> Result<&Colorterm, PhotoCalError> {
        let entry = self.find_dict(photo_cat_name)?;
        entry.terms.get(filter).ok_or_else(|| {
            PhotoCalError::config(format!(
                "colorterm library entry {:?} has no term for filter {filter:?}",
                entry.pattern
            ))
        })
    }
}
