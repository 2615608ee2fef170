// A single melodic line.
//
// `Voice` is an ordered, fixed-length sequence of pitches. The note-number
// view used by the arrangement matrix is derived on first request and cached
// for the voice's lifetime; since a voice never changes after construction
// the cache never needs invalidating.

use std::sync::OnceLock;

use crate::error::PitchError;
use crate::note_table::NoteTable;
use crate::pitch::Pitch;

#[derive(Debug, Clone, Default)]
pub struct Voice {
    pitches: Vec<Pitch>,
    note_numbers: OnceLock<Vec<u8>>,
}

impl Voice {
    pub fn new(pitches: Vec<Pitch>) -> Self {
        Voice {
            pitches,
            note_numbers: OnceLock::new(),
        }
    }

    /// Parse a whitespace-separated line of scientific pitch names, e.g.
    /// `"D4 F4 E4 D4"`.
    pub fn parse(table: &NoteTable, text: &str) -> Result<Self, PitchError> {
        text.split_whitespace()
            .map(|token| table.parse(token))
            .collect::<Result<Vec<_>, _>>()
            .map(Voice::new)
    }

    pub fn pitches(&self) -> &[Pitch] {
        &self.pitches
    }

    pub fn len(&self) -> usize {
        self.pitches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pitches.is_empty()
    }

    /// Note numbers in time order.
    pub fn note_numbers(&self) -> &[u8] {
        let numbers = || self.pitches.iter().map(|p| p.number()).collect();
        self.note_numbers.get_or_init(numbers)
    }
}

impl PartialEq for Voice {
    fn eq(&self, other: &Self) -> bool {
        self.pitches == other.pitches
    }
}

impl Eq for Voice {}

impl FromIterator<Pitch> for Voice {
    fn from_iter<I: IntoIterator<Item = Pitch>>(iter: I) -> Self {
        Voice::new(iter.into_iter().collect())
    }
}
