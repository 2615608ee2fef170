// Error types for rule composition, evaluation and arrangement building.
//
// Two families:
// - Construction-time (`ArityMismatch`, `ExprError`, `SpeciesError`,
//   `ArrangementError`): returned straight to the caller, who made a mistake
//   wiring things up.
// - Evaluation-time (`RuleError`): raised while a rule runs against one
//   (voice subset, time step). `Arrangement::validate` stores these next to
//   the pass/fail outcomes instead of aborting, so one broken rule cannot
//   hide the report for the rest.

use serde::Serialize;
use thiserror::Error;

/// Two rules with different declared arities were combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot combine a rule over {left} voices with a rule over {right} voices")]
pub struct ArityMismatch {
    pub left: usize,
    pub right: usize,
}

/// Failure to compile a `RuleExpr` into a `Rule`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error(transparent)]
    Arity(#[from] ArityMismatch),
    #[error("'{0}' needs at least one operand")]
    NoOperands(&'static str),
}

/// A rule could not produce a boolean for the inputs it was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
pub enum RuleError {
    #[error("rule expects {expected} voices, got {found}")]
    Arity { expected: usize, found: usize },
    #[error("voice {voice} out of range (arrangement has {voice_count} voices)")]
    VoiceOutOfRange { voice: usize, voice_count: usize },
    #[error("time step {time_step} out of range (arrangement has {time_steps} steps)")]
    TimeStepOutOfRange { time_step: usize, time_steps: usize },
    #[error("voice {voice} has not been inserted")]
    VoiceNotInserted { voice: usize },
    #[error("rule '{rule}' produced no boolean result")]
    InvalidResult { rule: String },
}

/// Failure to build or validate an arrangement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArrangementError {
    #[error("row {row} holds the cantus firmus and cannot be overwritten")]
    RowLocked { row: usize },
    #[error("row {row} out of range (arrangement has {voice_count} voices)")]
    VoiceOutOfRange { row: usize, voice_count: usize },
    #[error("row {row} already holds a voice")]
    VoiceAlreadyInserted { row: usize },
    #[error("voice for row {row} has {found} notes, expected {expected}")]
    VoiceLengthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("rows {missing:?} have no voice yet")]
    IncompleteArrangement { missing: Vec<usize> },
}

/// Failure to build a species definition.
#[derive(Debug, Error)]
pub enum SpeciesError {
    #[error("malformed species definition: {0}")]
    Json(#[from] serde_json::Error),
    #[error("rule '{description}': {source}")]
    Rule {
        description: String,
        #[source]
        source: ExprError,
    },
    #[error("duplicate rule description '{0}'")]
    DuplicateRule(String),
    #[error("a species needs at least one voice")]
    NoVoices,
    #[error("steps per bar must be at least 1")]
    ZeroStepsPerBar,
}
