// Gradus: species counterpoint rule checker.
//
// Validates a multi-voice arrangement (one fixed cantus firmus plus added
// voices) against a named set of species-counterpoint rules after Fux, and
// reports which rules pass or fail for every voice combination at every time
// step. The checker never writes music; it only judges what it is given.
//
// Architecture:
// - rule.rs: `Rule`, a closed combinator tree (leaf / and / or / xor / not)
//   with arity unified once at construction; `RuleExpr` is its JSON form
// - catalog.rs: `Predicate`, the leaf classifiers (harmonic intervals,
//   motion types, repetition, position in the piece, cantus firmus role)
// - species.rs: `SpeciesDefinition`, a data-driven bundle of voice count,
//   steps per bar, hard rules and soft preferences
// - arrangement.rs: `Arrangement`, the voice x time-step note matrix and the
//   validation loop (rules x voice subsets x time steps, run on rayon)
// - result.rs: `StepResult` / `ArrangementResult`, keyed outcome collection
// - error.rs: construction-time and evaluation-time error types
//
// Pitches, voices, the note-name table and the cantus firmus catalog come
// from `gradus_pitch`.
//
// Validation is a pure read of a fully populated matrix, so re-running it on
// an unchanged arrangement always yields an identical result.

pub mod arrangement;
pub mod catalog;
pub mod error;
pub mod result;
pub mod rule;
pub mod species;

pub use arrangement::Arrangement;
pub use catalog::Predicate;
pub use error::{ArityMismatch, ArrangementError, ExprError, RuleError, SpeciesError};
pub use result::{ArrangementResult, RuleOutcome, StepResult};
pub use rule::{Rule, RuleExpr};
pub use species::{NamedRule, SpeciesDefinition};
