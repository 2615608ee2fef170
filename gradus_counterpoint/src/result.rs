// Outcome collection for a validation pass.
//
// `ArrangementResult` maps time step -> `StepResult`; each `StepResult` holds
// one `RuleOutcome` per (rule description, voice subset) evaluated at that
// step, in the order the species lists its rules and, within a rule, in
// lexicographic voice-subset order. Storage is a `BTreeMap`, so two passes
// over the same arrangement compare equal.
//
// An outcome is `Ok(true)` (passed), `Ok(false)` (the rule judged the music
// and it failed) or `Err(RuleError)` (the rule could not be evaluated).
// Only `Ok(true)` counts as passing. A result with no outcomes at all means
// nothing was checked, which is usually a configuration bug (no rules, or
// no voice subset matched any rule's arity).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::error::RuleError;

/// The outcome of one rule for one voice subset at one time step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleOutcome {
    pub description: String,
    pub voices: Vec<usize>,
    pub outcome: Result<bool, RuleError>,
}

impl RuleOutcome {
    pub fn passed(&self) -> bool {
        matches!(self.outcome, Ok(true))
    }

    /// The rule ran and returned false.
    pub fn failed(&self) -> bool {
        matches!(self.outcome, Ok(false))
    }

    pub fn error(&self) -> Option<&RuleError> {
        self.outcome.as_ref().err()
    }
}

/// All outcomes recorded at one time step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    time_step: usize,
    outcomes: Vec<RuleOutcome>,
}

impl StepResult {
    pub fn new(time_step: usize) -> Self {
        StepResult {
            time_step,
            outcomes: Vec::new(),
        }
    }

    pub fn push(&mut self, outcome: RuleOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn time_step(&self) -> usize {
        self.time_step
    }

    pub fn outcomes(&self) -> &[RuleOutcome] {
        &self.outcomes
    }

    /// True iff every outcome at this step passed.
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(RuleOutcome::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|o| o.failed())
    }

    pub fn errors(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.outcomes.iter().filter(|o| o.error().is_some())
    }

    /// The outcome for one rule and voice subset, if it was evaluated here.
    pub fn outcome(&self, description: &str, voices: &[usize]) -> Option<&RuleOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.description == description && o.voices == voices)
    }
}

/// Every outcome of a validation pass, keyed by time step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArrangementResult {
    steps: BTreeMap<usize, StepResult>,
}

impl ArrangementResult {
    /// Append an outcome under its time step.
    pub fn record(&mut self, time_step: usize, outcome: RuleOutcome) {
        self.steps
            .entry(time_step)
            .or_insert_with(|| StepResult::new(time_step))
            .push(outcome);
    }

    /// True iff every step passed. Vacuously true when empty; check
    /// `is_empty()` as well when that matters.
    pub fn passed(&self) -> bool {
        self.steps.values().all(StepResult::passed)
    }

    pub fn get(&self, time_step: usize) -> Option<&StepResult> {
        self.steps.get(&time_step)
    }

    /// No rule was evaluated at any step.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of time steps with at least one outcome.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn outcome_count(&self) -> usize {
        self.steps.values().map(|s| s.outcomes.len()).sum()
    }

    pub fn steps(&self) -> impl Iterator<Item = &StepResult> {
        self.steps.values()
    }

    /// (time step, outcome) for every rule that returned false.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &RuleOutcome)> {
        self.steps
            .values()
            .flat_map(|s| s.failures().map(move |o| (s.time_step, o)))
    }

    /// (time step, outcome) for every rule that could not be evaluated.
    pub fn errors(&self) -> impl Iterator<Item = (usize, &RuleOutcome)> {
        self.steps
            .values()
            .flat_map(|s| s.errors().map(move |o| (s.time_step, o)))
    }

    /// Descriptions of rules that did not pass somewhere.
    pub fn failed_descriptions(&self) -> BTreeSet<&str> {
        self.steps
            .values()
            .flat_map(|s| s.outcomes.iter())
            .filter(|o| !o.passed())
            .map(|o| o.description.as_str())
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for ArrangementResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "no rules were evaluated");
        }
        if self.passed() {
            let count = self.outcome_count();
            return writeln!(f, "all {count} checks passed over {} steps", self.len());
        }
        for step in self.steps() {
            for outcome in step.outcomes().iter().filter(|o| !o.passed()) {
                write!(
                    f,
                    "step {:>3} voices {:?}: {}",
                    step.time_step, outcome.voices, outcome.description
                )?;
                match outcome.error() {
                    Some(err) => writeln!(f, " (error: {err})")?,
                    None => writeln!(f)?,
                }
            }
        }
        Ok(())
    }
}
