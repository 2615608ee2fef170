// Leaf predicates: the built-in rule catalog.
//
// Every leaf answers one yes/no question about the arrangement at a time
// step. They come in five groups:
//
// - Harmonic interval (arity 2): works on `(upper - lower) % 12` of the two
//   selected voices, where upper/lower are by pitch, not row. Unison and
//   octave are split out because the mod-12 class cannot tell them apart.
// - Motion (arity 2): compares each voice's step-to-step delta. At time step
//   0 there is no previous step, so every motion predicate is false.
// - Repetition (arity 1): the voice holds one note for the last N steps.
// - Position (no arity): first, last and second-last time step.
// - Role (no arity): whether the cantus firmus sits in row 0, the lowest
//   voice.
//
// The enum is serde-tagged so species files can name leaves directly, e.g.
// `"octave"` or `{"specific_interval": {"semitones": 9}}`.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::arrangement::Arrangement;
use crate::error::RuleError;

/// The leaf classifiers available to rule expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Minor/major third or sixth: interval class 3, 4, 8 or 9.
    ImperfectConsonance,
    /// Unison/octave or fifth: interval class 0 or 7.
    PerfectInterval,
    /// Interval class equals `semitones`.
    SpecificInterval { semitones: u8 },
    /// Seconds and sevenths, optionally the perfect fourth and the tritone.
    DissonantInterval {
        #[serde(default = "enabled")]
        fourths: bool,
        #[serde(default = "enabled")]
        tritones: bool,
    },
    /// Both voices on the very same note.
    Unison,
    /// Different notes a whole number of octaves apart.
    Octave,
    DirectMotion,
    ObliqueMotion,
    ContraryMotion,
    /// Contrary motion closing in: the lower voice rises and the upper voice
    /// falls, without the voices swapping order.
    InwardMotion,
    /// The voice has sounded the same note for the last `times_used` steps,
    /// the current one included.
    NoteRepeated { times_used: usize },
    FirstHarmony,
    LastHarmony,
    SecondLastHarmony,
    CantusFirmusInLowerVoice,
}

fn enabled() -> bool {
    true
}

impl Predicate {
    /// All four dissonance flavours on, as in strict first species.
    pub fn dissonant() -> Predicate {
        Predicate::DissonantInterval {
            fourths: true,
            tritones: true,
        }
    }

    pub fn arity(&self) -> Option<usize> {
        match self {
            Predicate::ImperfectConsonance
            | Predicate::PerfectInterval
            | Predicate::SpecificInterval { .. }
            | Predicate::DissonantInterval { .. }
            | Predicate::Unison
            | Predicate::Octave
            | Predicate::DirectMotion
            | Predicate::ObliqueMotion
            | Predicate::ContraryMotion
            | Predicate::InwardMotion => Some(2),
            Predicate::NoteRepeated { .. } => Some(1),
            Predicate::FirstHarmony
            | Predicate::LastHarmony
            | Predicate::SecondLastHarmony
            | Predicate::CantusFirmusInLowerVoice => None,
        }
    }

    /// Evaluate the leaf. Callers normally go through `Rule::evaluate`, which
    /// has already checked arity and ranges.
    pub fn holds(
        &self,
        arrangement: &Arrangement<'_>,
        voices: &[usize],
        time_step: usize,
    ) -> Result<bool, RuleError> {
        let held = match *self {
            Predicate::ImperfectConsonance => {
                let class = pair_interval(arrangement, voices, time_step)?;
                matches!(class, 3 | 4 | 8 | 9)
            }
            Predicate::PerfectInterval => {
                let class = pair_interval(arrangement, voices, time_step)?;
                matches!(class, 0 | 7)
            }
            Predicate::SpecificInterval { semitones } => {
                pair_interval(arrangement, voices, time_step)? == semitones
            }
            Predicate::DissonantInterval { fourths, tritones } => {
                let class = pair_interval(arrangement, voices, time_step)?;
                matches!(class, 1 | 2 | 10 | 11)
                    || (fourths && class == 5)
                    || (tritones && class == 6)
            }
            Predicate::Unison => {
                let (a, b) = pair_notes(arrangement, voices, time_step)?;
                a == b
            }
            Predicate::Octave => {
                let (a, b) = pair_notes(arrangement, voices, time_step)?;
                a != b && a.abs_diff(b) % 12 == 0
            }
            Predicate::DirectMotion => {
                motion(arrangement, voices, time_step)? == Some(Ordering::Greater)
            }
            Predicate::ObliqueMotion => {
                motion(arrangement, voices, time_step)? == Some(Ordering::Equal)
            }
            Predicate::ContraryMotion => {
                motion(arrangement, voices, time_step)? == Some(Ordering::Less)
            }
            Predicate::InwardMotion => inward_motion(arrangement, voices, time_step)?,
            Predicate::NoteRepeated { times_used } => {
                note_repeated(arrangement, voices, time_step, times_used)?
            }
            Predicate::FirstHarmony => time_step == 0,
            Predicate::LastHarmony => time_step + 1 == arrangement.time_steps(),
            Predicate::SecondLastHarmony => time_step + 2 == arrangement.time_steps(),
            Predicate::CantusFirmusInLowerVoice => arrangement.cantus_firmus_row() == 0,
        };
        Ok(held)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::ImperfectConsonance => write!(f, "imperfect_consonance"),
            Predicate::PerfectInterval => write!(f, "perfect_interval"),
            Predicate::SpecificInterval { semitones } => {
                write!(f, "specific_interval({semitones})")
            }
            Predicate::DissonantInterval { fourths, tritones } => {
                write!(f, "dissonant_interval(fourths={fourths}, ")?;
                write!(f, "tritones={tritones})")
            }
            Predicate::Unison => write!(f, "unison"),
            Predicate::Octave => write!(f, "octave"),
            Predicate::DirectMotion => write!(f, "direct_motion"),
            Predicate::ObliqueMotion => write!(f, "oblique_motion"),
            Predicate::ContraryMotion => write!(f, "contrary_motion"),
            Predicate::InwardMotion => write!(f, "inward_motion"),
            Predicate::NoteRepeated { times_used } => write!(f, "note_repeated({times_used})"),
            Predicate::FirstHarmony => write!(f, "first_harmony"),
            Predicate::LastHarmony => write!(f, "last_harmony"),
            Predicate::SecondLastHarmony => write!(f, "second_last_harmony"),
            Predicate::CantusFirmusInLowerVoice => write!(f, "cantus_firmus_in_lower_voice"),
        }
    }
}

/// Interval class (0-11) between two simultaneous notes, measured upward
/// from the lower one.
pub fn interval_class(a: u8, b: u8) -> u8 {
    a.abs_diff(b) % 12
}

/// Signed melodic step of one voice from `prev` to `cur`.
pub fn melodic_delta(prev: u8, cur: u8) -> i16 {
    cur as i16 - prev as i16
}

fn expect_voices<const N: usize>(voices: &[usize]) -> Result<[usize; N], RuleError> {
    match voices.try_into() {
        Ok(tuple) => Ok(tuple),
        Err(_) => Err(RuleError::Arity {
            expected: N,
            found: voices.len(),
        }),
    }
}

fn pair_notes(
    arrangement: &Arrangement<'_>,
    voices: &[usize],
    time_step: usize,
) -> Result<(u8, u8), RuleError> {
    let [a, b] = expect_voices::<2>(voices)?;
    Ok((
        arrangement.require_note(a, time_step)?,
        arrangement.require_note(b, time_step)?,
    ))
}

fn pair_interval(
    arrangement: &Arrangement<'_>,
    voices: &[usize],
    time_step: usize,
) -> Result<u8, RuleError> {
    let (a, b) = pair_notes(arrangement, voices, time_step)?;
    Ok(interval_class(a, b))
}

/// Per-voice deltas into `time_step`, or None at the first step.
fn pair_deltas(
    arrangement: &Arrangement<'_>,
    voices: &[usize],
    time_step: usize,
) -> Result<Option<(i16, i16)>, RuleError> {
    let (cur_a, cur_b) = pair_notes(arrangement, voices, time_step)?;
    if time_step == 0 {
        return Ok(None);
    }
    let (prev_a, prev_b) = pair_notes(arrangement, voices, time_step - 1)?;
    let delta_a = melodic_delta(prev_a, cur_a);
    let delta_b = melodic_delta(prev_b, cur_b);
    Ok(Some((delta_a, delta_b)))
}

/// Sign of the product of the two deltas, or None at the first step.
fn motion(
    arrangement: &Arrangement<'_>,
    voices: &[usize],
    time_step: usize,
) -> Result<Option<Ordering>, RuleError> {
    let deltas = pair_deltas(arrangement, voices, time_step)?;
    Ok(deltas.map(|(da, db)| (da * db).cmp(&0)))
}

fn inward_motion(
    arrangement: &Arrangement<'_>,
    voices: &[usize],
    time_step: usize,
) -> Result<bool, RuleError> {
    let Some((delta_a, delta_b)) = pair_deltas(arrangement, voices, time_step)? else {
        return Ok(false);
    };
    let (prev_a, prev_b) = pair_notes(arrangement, voices, time_step - 1)?;
    let (cur_a, cur_b) = pair_notes(arrangement, voices, time_step)?;

    // The same voice must be strictly lower on both steps.
    let (lower_delta, upper_delta) = if prev_a < prev_b && cur_a < cur_b {
        (delta_a, delta_b)
    } else if prev_a > prev_b && cur_a > cur_b {
        (delta_b, delta_a)
    } else {
        return Ok(false);
    };
    Ok(lower_delta > 0 && upper_delta < 0)
}

fn note_repeated(
    arrangement: &Arrangement<'_>,
    voices: &[usize],
    time_step: usize,
    times_used: usize,
) -> Result<bool, RuleError> {
    let [voice] = expect_voices::<1>(voices)?;
    let current = arrangement.require_note(voice, time_step)?;
    if time_step + 1 < times_used {
        return Ok(false);
    }
    let start = time_step + 1 - times_used;
    for step in start..time_step {
        if arrangement.require_note(voice, step)? != current {
            return Ok(false);
        }
    }
    Ok(true)
}
