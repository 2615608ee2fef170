// Catalog of historical cantus firmus melodies, one per church mode.
//
// Each mode name ("dorian", "phrygian", ...) maps to a fixed reference melody
// from Fux's Gradus ad Parnassum. The catalog is loaded from JSON with pitch
// names in scientific notation and resolved through a `NoteTable`:
//
//   {"melodies": {"dorian": ["D4", "F4", "E4", ...]}}
//
// `default_catalog()` embeds `data/cantus_firmi.json` at compile time. Load it
// once at startup and hand out references; the catalog is read-only after
// construction.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::CatalogError;
use crate::note_table::NoteTable;
use crate::voice::Voice;

/// The on-disk JSON structure.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    melodies: BTreeMap<String, Vec<String>>,
}

/// Mode name -> reference melody.
#[derive(Debug, Clone)]
pub struct CantusFirmusCatalog {
    melodies: BTreeMap<String, Voice>,
}

impl CantusFirmusCatalog {
    /// Parse a catalog from a JSON string, resolving every pitch name.
    pub fn from_json(json: &str, table: &NoteTable) -> Result<Self, CatalogError> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut melodies = BTreeMap::new();
        for (mode, names) in file.melodies {
            let pitches = names
                .iter()
                .map(|name| table.parse(name))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|source| CatalogError::Pitch {
                    mode: mode.clone(),
                    source,
                })?;
            melodies.insert(mode, Voice::new(pitches));
        }
        Ok(CantusFirmusCatalog { melodies })
    }

    /// The reference melody for a mode.
    pub fn get(&self, mode: &str) -> Result<&Voice, CatalogError> {
        self.melodies
            .get(mode)
            .ok_or_else(|| CatalogError::UnknownMode(mode.to_string()))
    }

    /// Mode names in alphabetical order.
    pub fn modes(&self) -> impl Iterator<Item = &str> {
        self.melodies.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.melodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.melodies.is_empty()
    }
}

/// Load the catalog embedded at compile time.
///
/// Panics if the embedded JSON is malformed, which a unit test rules out.
pub fn default_catalog(table: &NoteTable) -> CantusFirmusCatalog {
    let json = include_str!("../data/cantus_firmi.json");
    let catalog = CantusFirmusCatalog::from_json(json, table);
    catalog.expect("embedded cantus firmus catalog is valid")
}
