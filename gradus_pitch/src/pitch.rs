// Absolute pitch representation.
//
// A `Pitch` is a MIDI-style note number in 0..=127, immutable once built.
// Equality and ordering are by number, so `Pitch` values sort low-to-high
// and compare directly with the matrix entries in an arrangement.
//
// Construction comes in two forms: by (name, octave) through a `NoteTable`,
// or directly by number. `PitchSpec` is the loose input form where any of the
// three fields may be present; `Pitch::from_spec` accepts exactly one of
// {name + octave, number} and rejects everything else.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PitchError;
use crate::note_table::{HIGHEST_NOTE, NOTE_NAMES, NoteTable};

/// A single note as an absolute note number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub struct Pitch(u8);

/// Unresolved pitch input: a name and octave, or a number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub octave: Option<i8>,
    #[serde(default)]
    pub number: Option<i32>,
}

impl PitchSpec {
    pub fn named(name: &str, octave: i8) -> Self {
        PitchSpec {
            name: Some(name.to_string()),
            octave: Some(octave),
            number: None,
        }
    }

    pub fn numbered(number: i32) -> Self {
        PitchSpec {
            number: Some(number),
            ..PitchSpec::default()
        }
    }
}

impl Pitch {
    /// Build a pitch from an absolute note number.
    pub fn from_number(number: i32) -> Result<Self, PitchError> {
        u8::try_from(number)
            .ok()
            .filter(|&n| n <= HIGHEST_NOTE)
            .map(Pitch)
            .ok_or(PitchError::OutOfRange(number))
    }

    /// Build a pitch from a note name (sharp spelling) and octave.
    pub fn from_name(table: &NoteTable, name: &str, octave: i8) -> Result<Self, PitchError> {
        match table.number_of(name, octave) {
            Some(number) => Ok(Pitch(number)),
            None => Err(PitchError::UnknownName {
                name: name.to_string(),
                octave,
            }),
        }
    }

    /// Resolve a `PitchSpec`. Exactly one of {name + octave, number} must be
    /// present.
    pub fn from_spec(table: &NoteTable, spec: &PitchSpec) -> Result<Self, PitchError> {
        match (spec.name.as_deref(), spec.octave, spec.number) {
            (None, None, Some(number)) => Pitch::from_number(number),
            (Some(name), Some(octave), None) => Pitch::from_name(table, name, octave),
            (None, None, None) => Err(PitchError::Missing),
            (Some(_), None, None) | (None, Some(_), None) => Err(PitchError::Incomplete),
            _ => Err(PitchError::Ambiguous),
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Pitch class 0-11 (C = 0).
    pub fn pitch_class(self) -> u8 {
        self.0 % 12
    }

    /// Octave in scientific notation (middle C is in octave 4).
    pub fn octave(self) -> i8 {
        (self.0 / 12) as i8 - 1
    }
}

impl TryFrom<u8> for Pitch {
    type Error = PitchError;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Pitch::from_number(number as i32)
    }
}

impl From<Pitch> for u8 {
    fn from(pitch: Pitch) -> u8 {
        pitch.0
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = NOTE_NAMES[self.pitch_class() as usize];
        write!(f, "{name}{}", self.octave())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_and_number_agree() {
        let table = NoteTable::new();
        let by_name = Pitch::from_name(&table, "C", 4).unwrap();
        let by_number = Pitch::from_number(60).unwrap();
        assert_eq!(by_name, by_number);
        assert_eq!(by_name.to_string(), "C4");
    }

    #[test]
    fn test_number_out_of_range() {
        assert_eq!(Pitch::from_number(128), Err(PitchError::OutOfRange(128)));
        assert_eq!(Pitch::from_number(-1), Err(PitchError::OutOfRange(-1)));
        assert!(Pitch::from_number(0).is_ok());
        assert!(Pitch::from_number(127).is_ok());
    }

    #[test]
    fn test_spec_requires_exactly_one_form() {
        let table = NoteTable::new();
        assert_eq!(
            Pitch::from_spec(&table, &PitchSpec::default()),
            Err(PitchError::Missing)
        );
        let both = PitchSpec {
            number: Some(62),
            ..PitchSpec::named("D", 4)
        };
        assert_eq!(Pitch::from_spec(&table, &both), Err(PitchError::Ambiguous));
        let name_only = PitchSpec {
            name: Some("D".into()),
            ..PitchSpec::default()
        };
        assert_eq!(
            Pitch::from_spec(&table, &name_only),
            Err(PitchError::Incomplete)
        );
        let by_name = Pitch::from_spec(&table, &PitchSpec::named("D", 4));
        assert_eq!(by_name.unwrap().number(), 62);
        let by_number = Pitch::from_spec(&table, &PitchSpec::numbered(62));
        assert_eq!(by_number.unwrap().number(), 62);
    }

    #[test]
    fn test_ordering_is_by_number() {
        let table = NoteTable::new();
        let b3 = table.parse("B3").unwrap();
        let c4 = table.parse("C4").unwrap();
        assert!(b3 < c4);
        assert_eq!(b3.pitch_class(), 11);
        assert_eq!(b3.octave(), 3);
    }

    #[test]
    fn test_display_matches_table() {
        let table = NoteTable::new();
        for entry in table.entries() {
            let pitch = Pitch::from_number(entry.number as i32).unwrap();
            let expected = format!("{}{}", entry.name, entry.octave);
            assert_eq!(pitch.to_string(), expected);
        }
    }

    #[test]
    fn test_serde_rejects_out_of_range() {
        let pitch: Pitch = serde_json::from_str("62").unwrap();
        assert_eq!(pitch.number(), 62);
        assert!(serde_json::from_str::<Pitch>("200").is_err());
        let json = r#"{"name": "A", "octave": 4}"#;
        let spec: PitchSpec = serde_json::from_str(json).unwrap();
        let pitch = Pitch::from_spec(&NoteTable::new(), &spec).unwrap();
        assert_eq!(pitch.number(), 69);
    }
}
