// MIDI-style note-name lookup table.
//
// Maps (name, octave) pairs to absolute note numbers 0..=127. Numbers are
// assigned by walking octaves -1 through 9 and, within each octave, the
// twelve sharp-spelled names C, C#, D, ... B. Octave -1 therefore spans
// 0-11, octave 0 spans 12-23, and so on up to G9 = 127, the last note
// that fits; G#9 through B9 are absent from the table.
//
// Fixed points used as a self-check: D0 = 14, B3 = 59, C4 = 60 (middle C),
// G9 = 127.
//
// The table is an ordinary value. Build it once with `NoteTable::new()` and
// share it by reference; `Pitch::from_name` and the catalog loader take it as
// an argument rather than reaching for a global.

use crate::error::PitchError;
use crate::pitch::Pitch;

/// The twelve chromatic names in ascending order, sharps only.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

pub const LOWEST_OCTAVE: i8 = -1;
pub const HIGHEST_OCTAVE: i8 = 9;
pub const HIGHEST_NOTE: u8 = 127;

/// One row of the lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEntry {
    pub number: u8,
    pub name: &'static str,
    pub octave: i8,
}

/// Immutable (name, octave) <-> number lookup.
#[derive(Debug, Clone)]
pub struct NoteTable {
    /// Indexed by note number.
    entries: Vec<NoteEntry>,
}

impl NoteTable {
    pub fn new() -> Self {
        let names = (LOWEST_OCTAVE..=HIGHEST_OCTAVE)
            .flat_map(|octave| NOTE_NAMES.iter().map(move |&name| (name, octave)));
        let entries = (0..=HIGHEST_NOTE)
            .zip(names)
            .map(|(number, (name, octave))| NoteEntry {
                number,
                name,
                octave,
            })
            .collect();
        NoteTable { entries }
    }

    /// All entries in note-number order.
    pub fn entries(&self) -> &[NoteEntry] {
        &self.entries
    }

    /// Note number for a name in a given octave, or None if the pair is not
    /// in the table (unknown name, octave out of range, or above G9).
    pub fn number_of(&self, name: &str, octave: i8) -> Option<u8> {
        self.entries
            .iter()
            .find(|e| e.name == name && e.octave == octave)
            .map(|e| e.number)
    }

    /// Name and octave for a note number.
    pub fn name_of(&self, number: u8) -> Option<(&'static str, i8)> {
        let entry = self.entries.get(number as usize)?;
        Some((entry.name, entry.octave))
    }

    /// Parse scientific pitch notation such as `"D4"`, `"C#5"` or `"C-1"`.
    pub fn parse(&self, text: &str) -> Result<Pitch, PitchError> {
        let text = text.trim();
        let split = text
            .find(|c: char| c == '-' || c.is_ascii_digit())
            .ok_or_else(|| PitchError::Unparseable(text.to_string()))?;
        let (name, octave) = text.split_at(split);
        let Ok(octave) = octave.parse::<i8>() else {
            return Err(PitchError::Unparseable(text.to_string()));
        };
        Pitch::from_name(self, name, octave)
    }
}

impl Default for NoteTable {
    fn default() -> Self {
        NoteTable::new()
    }
}
