// Pitch and melody data for the Gradus counterpoint checker.
//
// Provides the note-level vocabulary shared by `gradus_counterpoint`: absolute
// pitches, voices (ordered pitch sequences), the MIDI-style note-name table,
// and the catalog of historical cantus firmus melodies. No rule logic lives
// here.
//
// Architecture:
// - `note_table.rs`: `NoteTable`, the (name, octave) <-> note-number lookup
// - `pitch.rs`: `Pitch` newtype and `PitchSpec` (the loosely-typed input form)
// - `voice.rs`: `Voice`, an immutable pitch sequence with a cached number view
// - `cantus_firmi.rs`: `CantusFirmusCatalog`, one reference melody per mode
// - `error.rs`: `PitchError`, `CatalogError`
//
// Lookup tables are plain values, not globals: build a `NoteTable` once at
// startup and pass it to whatever needs to resolve names. The cantus firmus
// catalog is loaded from JSON via `CantusFirmusCatalog::from_json()`;
// `default_catalog()` embeds `data/cantus_firmi.json` at compile time.

pub mod cantus_firmi;
pub mod error;
pub mod note_table;
pub mod pitch;
pub mod voice;

pub use cantus_firmi::{CantusFirmusCatalog, default_catalog};
pub use error::{CatalogError, PitchError};
pub use note_table::{NoteEntry, NoteTable};
pub use pitch::{Pitch, PitchSpec};
pub use voice::Voice;
