// Error types for pitch construction and catalog loading.
//
// Every `PitchError` variant is a flavour of "invalid pitch spec": the caller
// handed over a combination of name, octave and number that does not resolve
// to exactly one note in 0..=127. These are construction-time mistakes and
// are returned immediately, never collected.

use thiserror::Error;

/// Failure to resolve a pitch from its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PitchError {
    #[error("pitch needs a name and octave or a note number, got neither")]
    Missing,
    #[error("pitch given both a name/octave and a note number")]
    Ambiguous,
    #[error("pitch name and octave must be supplied together")]
    Incomplete,
    #[error("no note named '{name}' in octave {octave}")]
    UnknownName { name: String, octave: i8 },
    #[error("note number {0} is outside 0..=127")]
    OutOfRange(i32),
    #[error("cannot parse '{0}' as a pitch (expected e.g. \"C#4\")")]
    Unparseable(String),
}

/// Failure to load or query the cantus firmus catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no cantus firmus for mode '{0}'")]
    UnknownMode(String),
    #[error("malformed cantus firmus catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("bad pitch in cantus firmus '{mode}': {source}")]
    Pitch {
        mode: String,
        #[source]
        source: PitchError,
    },
}
