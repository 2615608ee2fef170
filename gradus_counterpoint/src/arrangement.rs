// The arrangement matrix and the validation loop.
//
// An `Arrangement` is a (voice count) x (time steps) grid of note numbers.
// Rows are voices, with row 0 conventionally the lowest; columns are time
// steps, `cantus firmus length * steps_per_bar` of them. One row holds the
// cantus firmus from construction onward and is locked. Every other row is
// written exactly once through `insert_voice`.
//
// `validate()` applies every hard rule of the species to every relevant
// voice subset at every time step:
// - a rule with arity k is evaluated for each k-combination of voice rows,
//   in lexicographic order (0,1), (0,2), (1,2), ...
// - a rule with no declared arity is evaluated once per step and receives the
//   full ordered tuple of voice rows
// The matrix is read-only during validation and every evaluation writes only
// its own outcome, so the job list runs on rayon and is merged back in job
// order. Evaluation errors are stored as outcomes rather than aborting the
// pass.
//
// See also: `rule.rs` for the per-call argument checks, `result.rs` for the
// outcome collection, `species.rs` for the rule lists.

use gradus_pitch::{Pitch, Voice};
use rayon::prelude::*;
use tracing::{debug, debug_span, trace, warn};

use crate::error::{ArrangementError, RuleError};
use crate::result::{ArrangementResult, RuleOutcome};
use crate::species::{NamedRule, SpeciesDefinition};

/// Voice x time-step note matrix for one exercise.
#[derive(Debug, Clone)]
pub struct Arrangement<'s> {
    species: &'s SpeciesDefinition,
    /// One row per voice; `None` until the voice is inserted.
    rows: Vec<Option<Vec<u8>>>,
    cantus_firmus_row: usize,
    time_steps: usize,
}

impl<'s> Arrangement<'s> {
    /// Allocate the matrix and write the cantus firmus into its row. With
    /// more than one step per bar, each cantus firmus note is held for the
    /// whole bar.
    pub fn new(
        species: &'s SpeciesDefinition,
        cantus_firmus: &Voice,
        cantus_firmus_row: usize,
    ) -> Result<Self, ArrangementError> {
        let voice_count = species.voice_count();
        if cantus_firmus_row >= voice_count {
            return Err(ArrangementError::VoiceOutOfRange {
                row: cantus_firmus_row,
                voice_count,
            });
        }
        let steps_per_bar = species.steps_per_bar();
        let held: Vec<u8> = cantus_firmus
            .note_numbers()
            .iter()
            .flat_map(|&note| std::iter::repeat_n(note, steps_per_bar))
            .collect();

        let mut rows = vec![None; voice_count];
        let time_steps = held.len();
        rows[cantus_firmus_row] = Some(held);
        Ok(Arrangement {
            species,
            rows,
            cantus_firmus_row,
            time_steps,
        })
    }

    /// Write a voice into an empty, non-cantus-firmus row. The voice must
    /// supply one note per time step.
    pub fn insert_voice(&mut self, row: usize, voice: &Voice) -> Result<(), ArrangementError> {
        if row == self.cantus_firmus_row {
            return Err(ArrangementError::RowLocked { row });
        }
        let voice_count = self.rows.len();
        let slot = self
            .rows
            .get_mut(row)
            .ok_or(ArrangementError::VoiceOutOfRange { row, voice_count })?;
        if slot.is_some() {
            return Err(ArrangementError::VoiceAlreadyInserted { row });
        }
        if voice.len() != self.time_steps {
            return Err(ArrangementError::VoiceLengthMismatch {
                row,
                expected: self.time_steps,
                found: voice.len(),
            });
        }
        *slot = Some(voice.note_numbers().to_vec());
        Ok(())
    }

    pub fn species(&self) -> &'s SpeciesDefinition {
        self.species
    }

    pub fn voice_count(&self) -> usize {
        self.rows.len()
    }

    pub fn time_steps(&self) -> usize {
        self.time_steps
    }

    pub fn cantus_firmus_row(&self) -> usize {
        self.cantus_firmus_row
    }

    /// The note at (voice, time step), or None if the row is unset or either
    /// index is out of range.
    pub fn note(&self, voice: usize, time_step: usize) -> Option<u8> {
        self.rows.get(voice)?.as_ref()?.get(time_step).copied()
    }

    pub(crate) fn require_note(&self, voice: usize, time_step: usize) -> Result<u8, RuleError> {
        let voice_count = self.rows.len();
        let Some(slot) = self.rows.get(voice) else {
            return Err(RuleError::VoiceOutOfRange { voice, voice_count });
        };
        let Some(row) = slot else {
            return Err(RuleError::VoiceNotInserted { voice });
        };
        match row.get(time_step) {
            Some(&note) => Ok(note),
            None => Err(RuleError::TimeStepOutOfRange {
                time_step,
                time_steps: self.time_steps,
            }),
        }
    }

    /// Rows that still need a voice.
    pub fn missing_rows(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.rows.iter().all(Option::is_some)
    }

    /// Check every hard rule of the species.
    pub fn validate(&self) -> Result<ArrangementResult, ArrangementError> {
        self.run(self.species.rules(), "rules")
    }

    /// Check every soft preference of the species. Failures here are advice,
    /// not errors in the counterpoint.
    pub fn evaluate_preferences(&self) -> Result<ArrangementResult, ArrangementError> {
        self.run(self.species.preferences(), "preferences")
    }

    fn run(
        &self,
        rules: &[NamedRule],
        kind: &'static str,
    ) -> Result<ArrangementResult, ArrangementError> {
        let missing = self.missing_rows();
        if !missing.is_empty() {
            return Err(ArrangementError::IncompleteArrangement { missing });
        }

        let voice_count = self.voice_count();
        let all_voices: Vec<usize> = (0..voice_count).collect();
        let mut subsets_by_rule = Vec::with_capacity(rules.len());
        for named in rules {
            let subsets = match named.rule.arity() {
                None => vec![all_voices.clone()],
                Some(arity) => combinations(voice_count, arity),
            };
            if subsets.is_empty() {
                warn!(
                    rule = %named.description,
                    arity = ?named.rule.arity(),
                    voice_count,
                    "rule needs more voices than the arrangement has and will never be evaluated"
                );
            }
            subsets_by_rule.push(subsets);
        }

        let mut jobs: Vec<(usize, &NamedRule, &[usize])> = Vec::new();
        for time_step in 0..self.time_steps {
            for (named, subsets) in rules.iter().zip(&subsets_by_rule) {
                for voices in subsets {
                    jobs.push((time_step, named, voices.as_slice()));
                }
            }
        }

        let _span = debug_span!(
            "validate",
            species = %self.species.name(),
            kind,
            rules = rules.len(),
            jobs = jobs.len()
        )
        .entered();

        let outcomes: Vec<(usize, RuleOutcome)> = jobs
            .par_iter()
            .map(|&(time_step, named, voices)| {
                let outcome = RuleOutcome {
                    description: named.description.clone(),
                    voices: voices.to_vec(),
                    outcome: named.rule.evaluate(self, voices, time_step),
                };
                (time_step, outcome)
            })
            .collect();

        let mut result = ArrangementResult::default();
        for (time_step, outcome) in outcomes {
            match &outcome.outcome {
                Ok(true) => {}
                Ok(false) => trace!(
                    time_step,
                    voices = ?outcome.voices,
                    rule = %outcome.description,
                    "rule failed"
                ),
                Err(err) => warn!(
                    time_step,
                    voices = ?outcome.voices,
                    rule = %outcome.description,
                    error = %err,
                    "rule could not be evaluated"
                ),
            }
            result.record(time_step, outcome);
        }

        if result.is_empty() {
            warn!("validation evaluated no rules");
        }
        debug!(
            passed = result.passed(),
            outcomes = result.outcome_count(),
            failures = result.failures().count(),
            "validation finished"
        );
        Ok(result)
    }

    /// Compact text rendering of the matrix for debugging, one row per
    /// voice, lowest row last.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for (index, row) in self.rows.iter().enumerate().rev() {
            let label = if index == self.cantus_firmus_row {
                "c.f."
            } else {
                ""
            };
            out.push_str(&format!("{index:>3} {label:>4}:"));
            match row {
                Some(notes) => {
                    for &note in notes {
                        let name = match Pitch::try_from(note) {
                            Ok(pitch) => pitch.to_string(),
                            Err(_) => "??".to_string(),
                        };
                        out.push_str(&format!(" {name:<4}"));
                    }
                }
                None => out.push_str(" (empty)"),
            }
            out.push('\n');
        }
        out
    }
}

/// All k-element subsets of 0..n in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k > n {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut current: Vec<usize> = (0..k).collect();
    loop {
        out.push(current.clone());
        // Rightmost position that can still advance.
        let Some(i) = (0..k).rev().find(|&i| current[i] < n - k + i) else {
            break;
        };
        current[i] += 1;
        let base = current[i];
        for (offset, slot) in current[i + 1..].iter_mut().enumerate() {
            *slot = base + offset + 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Predicate;
    use crate::rule::Rule;

    fn voice(numbers: &[u8]) -> Voice {
        let pitches = numbers.iter().map(|&n| Pitch::try_from(n));
        pitches.collect::<Result<_, _>>().unwrap()
    }

    #[test]
    fn test_combinations() {
        let pairs = combinations(3, 2);
        assert_eq!(pairs, vec![vec![0, 1], vec![0, 2], vec![1, 2]]);
        assert_eq!(combinations(3, 3), vec![vec![0, 1, 2]]);
        assert_eq!(combinations(2, 1), vec![vec![0], vec![1]]);
        assert_eq!(combinations(2, 0), vec![Vec::<usize>::new()]);
        assert!(combinations(2, 3).is_empty());
        assert_eq!(combinations(5, 2).len(), 10);
    }

    #[test]
    fn test_cantus_firmus_row_is_locked() {
        let species = SpeciesDefinition::new("test", 2, 1).unwrap();
        let mut arr = Arrangement::new(&species, &voice(&[62, 65]), 0).unwrap();
        assert_eq!(
            arr.insert_voice(0, &voice(&[69, 69])),
            Err(ArrangementError::RowLocked { row: 0 })
        );
        assert_eq!(arr.note(0, 1), Some(65));
    }

    #[test]
    fn test_rows_are_write_once() {
        let species = SpeciesDefinition::new("test", 3, 1).unwrap();
        let mut arr = Arrangement::new(&species, &voice(&[62, 65]), 1).unwrap();
        arr.insert_voice(0, &voice(&[50, 53])).unwrap();
        assert_eq!(
            arr.insert_voice(0, &voice(&[55, 57])),
            Err(ArrangementError::VoiceAlreadyInserted { row: 0 })
        );
        assert_eq!(
            arr.insert_voice(3, &voice(&[55, 57])),
            Err(ArrangementError::VoiceOutOfRange {
                row: 3,
                voice_count: 3
            })
        );
        assert_eq!(
            arr.insert_voice(2, &voice(&[69])),
            Err(ArrangementError::VoiceLengthMismatch {
                row: 2,
                expected: 2,
                found: 1
            })
        );
        assert_eq!(arr.missing_rows(), vec![2]);
        assert!(!arr.is_complete());
    }

    #[test]
    fn test_cantus_firmus_row_out_of_range() {
        let species = SpeciesDefinition::new("test", 2, 1).unwrap();
        assert!(matches!(
            Arrangement::new(&species, &voice(&[60]), 2),
            Err(ArrangementError::VoiceOutOfRange { row: 2, .. })
        ));
    }

    #[test]
    fn test_steps_per_bar_holds_cantus_firmus() {
        let species = SpeciesDefinition::new("second", 2, 2).unwrap();
        let cantus_firmus = voice(&[62, 65, 64]);
        let mut arr = Arrangement::new(&species, &cantus_firmus, 0).unwrap();
        assert_eq!(arr.time_steps(), 6);
        let held: Vec<u8> = (0..6).map(|t| arr.note(0, t).unwrap()).collect();
        assert_eq!(held, vec![62, 62, 65, 65, 64, 64]);
        let upper = voice(&[69, 67, 69, 72, 71, 69]);
        arr.insert_voice(1, &upper).unwrap();
        assert!(arr.is_complete());
    }

    #[test]
    fn test_validate_requires_every_row() {
        let species = SpeciesDefinition::new("test", 3, 1)
            .unwrap()
            .with_rule("no unison", !Rule::is(Predicate::Unison))
            .unwrap();
        let mut arr = Arrangement::new(&species, &voice(&[60]), 0).unwrap();
        arr.insert_voice(2, &voice(&[67])).unwrap();
        assert_eq!(
            arr.validate(),
            Err(ArrangementError::IncompleteArrangement { missing: vec![1] })
        );
    }

    #[test]
    fn test_validate_enumerates_voice_subsets() {
        let species = SpeciesDefinition::new("trio", 3, 1)
            .unwrap()
            .with_rule("no unison", !Rule::is(Predicate::Unison))
            .unwrap()
            .with_rule(
                "no repeats",
                !Rule::is(Predicate::NoteRepeated { times_used: 2 }),
            )
            .unwrap()
            .with_rule("not last", !Rule::is(Predicate::LastHarmony))
            .unwrap();
        let mut arr = Arrangement::new(&species, &voice(&[48, 50]), 0).unwrap();
        arr.insert_voice(1, &voice(&[55, 57])).unwrap();
        arr.insert_voice(2, &voice(&[64, 62])).unwrap();

        let result = arr.validate().unwrap();
        assert_eq!(result.len(), 2);
        let step = result.get(0).unwrap();
        let keys: Vec<(&str, &[usize])> = step
            .outcomes()
            .iter()
            .map(|o| (o.description.as_str(), o.voices.as_slice()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("no unison", &[0, 1][..]),
                ("no unison", &[0, 2][..]),
                ("no unison", &[1, 2][..]),
                ("no repeats", &[0][..]),
                ("no repeats", &[1][..]),
                ("no repeats", &[2][..]),
                ("not last", &[0, 1, 2][..]),
            ]
        );
        assert!(step.passed());
        // Only the positional rule fails, once, at the final step.
        assert!(!result.passed());
        let failures: Vec<(usize, &str)> = result
            .failures()
            .map(|(t, o)| (t, o.description.as_str()))
            .collect();
        assert_eq!(failures, vec![(1, "not last")]);
    }

    #[test]
    fn test_rule_errors_are_collected_not_fatal() {
        let species = SpeciesDefinition::new("test", 2, 1)
            .unwrap()
            .with_rule("broken", Rule::custom("broken", Some(2), |_, _, _| None))
            .unwrap()
            .with_rule("no unison", !Rule::is(Predicate::Unison))
            .unwrap();
        let mut arr = Arrangement::new(&species, &voice(&[60, 62]), 0).unwrap();
        arr.insert_voice(1, &voice(&[67, 69])).unwrap();

        let result = arr.validate().unwrap();
        assert!(!result.passed());
        assert_eq!(result.errors().count(), 2);
        assert_eq!(result.failures().count(), 0);
        for step in result.steps() {
            assert!(step.outcome("no unison", &[0, 1]).unwrap().passed());
        }
    }

    #[test]
    fn test_oversized_arity_is_never_evaluated() {
        let species = SpeciesDefinition::new("solo", 1, 1)
            .unwrap()
            .with_rule("octave", Rule::is(Predicate::Octave))
            .unwrap();
        let arr = Arrangement::new(&species, &voice(&[60, 62]), 0).unwrap();
        assert!(arr.validate().unwrap().is_empty());
    }

    #[test]
    fn test_preferences_run_separately() {
        let species = SpeciesDefinition::new("test", 2, 1)
            .unwrap()
            .with_preference("imperfect", Rule::is(Predicate::ImperfectConsonance))
            .unwrap();
        let mut arr = Arrangement::new(&species, &voice(&[60, 62]), 0).unwrap();
        arr.insert_voice(1, &voice(&[64, 69])).unwrap();
        assert!(arr.validate().unwrap().is_empty());
        let prefs = arr.evaluate_preferences().unwrap();
        assert!(!prefs.passed());
        assert_eq!(prefs.failures().count(), 1); // the fifth at step 1
    }

    #[test]
    fn test_summary() {
        let species = SpeciesDefinition::new("test", 2, 1).unwrap();
        let arr = Arrangement::new(&species, &voice(&[62, 65]), 0).unwrap();
        let summary = arr.summary();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("(empty)"));
        assert!(lines[1].contains("c.f."));
        assert!(lines[1].contains("D4"));
        assert!(lines[1].contains("F4"));
    }
}
