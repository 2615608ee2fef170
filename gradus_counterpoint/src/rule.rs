// Rule abstraction and boolean composition.
//
// A `Rule` is a pure predicate over (arrangement, voice subset, time step)
// with a declared arity: the number of voice indices it must be handed, or
// `None` when it does not look at particular voices (e.g. "is this the first
// step?"). Rules form a closed combinator tree:
//
//   Leaf(Predicate) | Custom(closure) | And(l, r) | Or(l, r) | Xor(l, r) | Not(r)
//
// Arity is unified when a node is built, never at evaluation time:
// - both unspecified -> unspecified
// - one specified    -> that one
// - both equal       -> that value
// - both different   -> `ArityMismatch`
// `Not` keeps its operand's arity.
//
// Every compound rule in a species definition is expressed through this
// algebra. `RuleExpr` is the serde form used in species JSON files; see
// `species.rs` for how it is loaded and `catalog.rs` for the leaves.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::arrangement::Arrangement;
use crate::catalog::Predicate;
use crate::error::{ArityMismatch, ExprError, RuleError};

/// Signature of a caller-supplied leaf. Returning `None` means the logic had
/// no answer, which is reported as `RuleError::InvalidResult`.
pub type CustomLogic = dyn Fn(&Arrangement<'_>, &[usize], usize) -> Option<bool> + Send + Sync;

/// A named caller-supplied leaf predicate.
#[derive(Clone)]
pub struct CustomPredicate {
    name: String,
    logic: Arc<CustomLogic>,
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPredicate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
enum RuleNode {
    Leaf(Predicate),
    Custom(CustomPredicate),
    And(Box<Rule>, Box<Rule>),
    Or(Box<Rule>, Box<Rule>),
    Xor(Box<Rule>, Box<Rule>),
    Not(Box<Rule>),
}

/// A composable predicate with a cached arity.
#[derive(Debug, Clone)]
pub struct Rule {
    node: RuleNode,
    arity: Option<usize>,
}

/// Unify the arities of two operands.
pub fn combine_arity(
    left: Option<usize>,
    right: Option<usize>,
) -> Result<Option<usize>, ArityMismatch> {
    match (left, right) {
        (Some(l), Some(r)) if l != r => Err(ArityMismatch { left: l, right: r }),
        (Some(a), _) | (None, Some(a)) => Ok(Some(a)),
        (None, None) => Ok(None),
    }
}

impl Rule {
    /// A leaf rule from the built-in catalog.
    pub fn is(predicate: Predicate) -> Rule {
        Rule {
            arity: predicate.arity(),
            node: RuleNode::Leaf(predicate),
        }
    }

    /// A leaf rule backed by arbitrary logic.
    pub fn custom<F>(name: impl Into<String>, arity: Option<usize>, logic: F) -> Rule
    where
        F: Fn(&Arrangement<'_>, &[usize], usize) -> Option<bool> + Send + Sync + 'static,
    {
        Rule {
            node: RuleNode::Custom(CustomPredicate {
                name: name.into(),
                logic: Arc::new(logic),
            }),
            arity,
        }
    }

    pub fn arity(&self) -> Option<usize> {
        self.arity
    }

    pub fn and(self, other: Rule) -> Result<Rule, ArityMismatch> {
        self.join(other, RuleNode::And)
    }

    pub fn or(self, other: Rule) -> Result<Rule, ArityMismatch> {
        self.join(other, RuleNode::Or)
    }

    pub fn xor(self, other: Rule) -> Result<Rule, ArityMismatch> {
        self.join(other, RuleNode::Xor)
    }

    fn join(
        self,
        other: Rule,
        node: fn(Box<Rule>, Box<Rule>) -> RuleNode,
    ) -> Result<Rule, ArityMismatch> {
        let arity = combine_arity(self.arity, other.arity)?;
        Ok(Rule {
            node: node(Box::new(self), Box::new(other)),
            arity,
        })
    }

    /// Evaluate the rule for one voice subset at one time step.
    ///
    /// Checks the inputs before running any logic: the subset length must
    /// match a declared arity, every voice index must exist, and the time
    /// step must lie inside the arrangement.
    pub fn evaluate(
        &self,
        arrangement: &Arrangement<'_>,
        voices: &[usize],
        time_step: usize,
    ) -> Result<bool, RuleError> {
        if let Some(expected) = self.arity.filter(|&n| n != voices.len()) {
            return Err(RuleError::Arity {
                expected,
                found: voices.len(),
            });
        }
        let voice_count = arrangement.voice_count();
        if let Some(&voice) = voices.iter().find(|&&v| v >= voice_count) {
            return Err(RuleError::VoiceOutOfRange { voice, voice_count });
        }
        if time_step >= arrangement.time_steps() {
            return Err(RuleError::TimeStepOutOfRange {
                time_step,
                time_steps: arrangement.time_steps(),
            });
        }
        self.apply(arrangement, voices, time_step)
    }

    fn apply(
        &self,
        arrangement: &Arrangement<'_>,
        voices: &[usize],
        time_step: usize,
    ) -> Result<bool, RuleError> {
        let eval = |rule: &Rule| rule.apply(arrangement, voices, time_step);
        match &self.node {
            RuleNode::Leaf(predicate) => predicate.holds(arrangement, voices, time_step),
            RuleNode::Custom(custom) => {
                let answer = (custom.logic)(arrangement, voices, time_step);
                answer.ok_or_else(|| RuleError::InvalidResult {
                    rule: custom.name.clone(),
                })
            }
            RuleNode::And(l, r) => Ok(eval(l)? && eval(r)?),
            RuleNode::Or(l, r) => Ok(eval(l)? || eval(r)?),
            RuleNode::Xor(l, r) => Ok(eval(l)? != eval(r)?),
            RuleNode::Not(inner) => Ok(!eval(inner)?),
        }
    }
}

impl std::ops::Not for Rule {
    type Output = Rule;

    fn not(self) -> Rule {
        Rule {
            arity: self.arity,
            node: RuleNode::Not(Box::new(self)),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            RuleNode::Leaf(predicate) => write!(f, "{predicate}"),
            RuleNode::Custom(custom) => write!(f, "{}", custom.name),
            RuleNode::And(l, r) => write!(f, "({l} and {r})"),
            RuleNode::Or(l, r) => write!(f, "({l} or {r})"),
            RuleNode::Xor(l, r) => write!(f, "({l} xor {r})"),
            RuleNode::Not(inner) => write!(f, "not {inner}"),
        }
    }
}

/// Serializable rule expression, as written in species JSON files.
///
/// ```json
/// {"not": {"and": [{"is": "direct_motion"}, {"is": "perfect_interval"}]}}
/// ```
///
/// `and` / `or` take one or more operands and fold left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleExpr {
    Is(Predicate),
    Not(Box<RuleExpr>),
    And(Vec<RuleExpr>),
    Or(Vec<RuleExpr>),
    Xor(Box<RuleExpr>, Box<RuleExpr>),
}

impl RuleExpr {
    /// Build the rule tree, unifying arities along the way.
    pub fn compile(&self) -> Result<Rule, ExprError> {
        match self {
            RuleExpr::Is(predicate) => Ok(Rule::is(predicate.clone())),
            RuleExpr::Not(inner) => Ok(!inner.compile()?),
            RuleExpr::And(operands) => fold(operands, "and", Rule::and),
            RuleExpr::Or(operands) => fold(operands, "or", Rule::or),
            RuleExpr::Xor(l, r) => Ok(l.compile()?.xor(r.compile()?)?),
        }
    }
}

fn fold(
    operands: &[RuleExpr],
    name: &'static str,
    join: fn(Rule, Rule) -> Result<Rule, ArityMismatch>,
) -> Result<Rule, ExprError> {
    let (first, rest) = operands.split_first().ok_or(ExprError::NoOperands(name))?;
    let mut rule = first.compile()?;
    for expr in rest {
        rule = join(rule, expr.compile()?)?;
    }
    Ok(rule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::species::SpeciesDefinition;
    use gradus_pitch::{Pitch, Voice};

    fn voice(numbers: &[u8]) -> Voice {
        let pitches = numbers.iter().map(|&n| Pitch::try_from(n));
        pitches.collect::<Result<_, _>>().unwrap()
    }

    fn two_voice_species() -> SpeciesDefinition {
        SpeciesDefinition::new("test", 2, 1).unwrap()
    }

    fn arrangement<'s>(
        species: &'s SpeciesDefinition,
        lower: &[u8],
        upper: &[u8],
    ) -> Arrangement<'s> {
        let mut arr = Arrangement::new(species, &voice(lower), 0).unwrap();
        arr.insert_voice(1, &voice(upper)).unwrap();
        arr
    }

    #[test]
    fn test_combine_arity_table() {
        assert_eq!(combine_arity(None, None), Ok(None));
        assert_eq!(combine_arity(Some(2), None), Ok(Some(2)));
        assert_eq!(combine_arity(None, Some(1)), Ok(Some(1)));
        assert_eq!(combine_arity(Some(2), Some(2)), Ok(Some(2)));
        assert_eq!(
            combine_arity(Some(1), Some(2)),
            Err(ArityMismatch { left: 1, right: 2 })
        );
    }

    #[test]
    fn test_mismatch_caught_at_composition() {
        let repeated = Rule::is(Predicate::NoteRepeated { times_used: 2 });
        let octave = Rule::is(Predicate::Octave);
        assert!(repeated.clone().and(octave.clone()).is_err());
        assert!(repeated.clone().or(octave.clone()).is_err());
        assert!(repeated.xor(octave).is_err());
    }

    #[test]
    fn test_unspecified_arity_adopts_other() {
        let rule = Rule::is(Predicate::FirstHarmony)
            .and(Rule::is(Predicate::NoteRepeated { times_used: 2 }))
            .unwrap();
        assert_eq!(rule.arity(), Some(1));
        assert_eq!((!rule).arity(), Some(1));
        assert_eq!(Rule::is(Predicate::LastHarmony).arity(), None);
    }

    #[test]
    fn test_evaluate_checks_inputs() {
        let species = two_voice_species();
        let arr = arrangement(&species, &[60, 62], &[67, 69]);
        let octave = Rule::is(Predicate::Octave);
        assert_eq!(
            octave.evaluate(&arr, &[0], 0),
            Err(RuleError::Arity {
                expected: 2,
                found: 1
            })
        );
        assert_eq!(
            octave.evaluate(&arr, &[0, 5], 0),
            Err(RuleError::VoiceOutOfRange {
                voice: 5,
                voice_count: 2
            })
        );
        assert_eq!(
            octave.evaluate(&arr, &[0, 1], 2),
            Err(RuleError::TimeStepOutOfRange {
                time_step: 2,
                time_steps: 2
            })
        );
    }

    #[test]
    fn test_boolean_combinators() {
        let species = two_voice_species();
        // Step 0: perfect fifth. Step 1: perfect fifth, both voices up a tone.
        let arr = arrangement(&species, &[60, 62], &[67, 69]);
        let direct = Rule::is(Predicate::DirectMotion);
        let perfect = Rule::is(Predicate::PerfectInterval);

        let parallel = direct.clone().and(perfect.clone()).unwrap();
        assert_eq!(parallel.evaluate(&arr, &[0, 1], 0), Ok(false));
        assert_eq!(parallel.evaluate(&arr, &[0, 1], 1), Ok(true));

        let either = direct.clone().or(perfect.clone()).unwrap();
        assert_eq!(either.evaluate(&arr, &[0, 1], 0), Ok(true));

        let exclusive = direct.xor(perfect).unwrap();
        assert_eq!(exclusive.evaluate(&arr, &[0, 1], 0), Ok(true));
        assert_eq!(exclusive.evaluate(&arr, &[0, 1], 1), Ok(false));

        assert_eq!((!parallel).evaluate(&arr, &[0, 1], 1), Ok(false));
    }

    #[test]
    fn test_and_short_circuits() {
        let species = two_voice_species();
        let arr = arrangement(&species, &[60], &[67]);
        let broken = Rule::custom("broken", Some(2), |_, _, _| None);
        let never = Rule::custom("never", Some(2), |_, _, _| Some(false));

        // The right operand is never reached, so its error never surfaces.
        let guarded = never.clone().and(broken.clone()).unwrap();
        assert_eq!(guarded.evaluate(&arr, &[0, 1], 0), Ok(false));

        let exposed = broken.and(never).unwrap();
        assert_eq!(
            exposed.evaluate(&arr, &[0, 1], 0),
            Err(RuleError::InvalidResult {
                rule: "broken".into()
            })
        );
    }

    #[test]
    fn test_custom_rule_sees_arrangement() {
        let species = two_voice_species();
        let arr = arrangement(&species, &[48, 50], &[72, 74]);
        let wide = Rule::custom("wider than two octaves", Some(2), |arr, voices, step| {
            let a = arr.note(voices[0], step)?;
            let b = arr.note(voices[1], step)?;
            Some(a.abs_diff(b) >= 24)
        });
        assert_eq!(wide.evaluate(&arr, &[0, 1], 1), Ok(true));
        assert_eq!(wide.to_string(), "wider than two octaves");
    }

    #[test]
    fn test_display_renders_tree() {
        let direct = Rule::is(Predicate::DirectMotion);
        let rule = !direct.and(Rule::is(Predicate::PerfectInterval)).unwrap();
        let rendered = rule.to_string();
        assert_eq!(rendered, "not (direct_motion and perfect_interval)");
    }

    #[test]
    fn test_expr_compiles_from_json() {
        let json = r#"{"or": [
            {"not": {"is": "last_harmony"}},
            {"is": "octave"}
        ]}"#;
        let expr: RuleExpr = serde_json::from_str(json).unwrap();
        let rule = expr.compile().unwrap();
        assert_eq!(rule.arity(), Some(2));
        assert_eq!(rule.to_string(), "(not last_harmony or octave)");
    }

    #[test]
    fn test_expr_reports_mismatch_and_empty() {
        let json = r#"{"and": [
            {"is": "unison"},
            {"is": {"note_repeated": {"times_used": 3}}}
        ]}"#;
        let mixed: RuleExpr = serde_json::from_str(json).unwrap();
        assert_eq!(
            mixed.compile().unwrap_err(),
            ExprError::Arity(ArityMismatch { left: 2, right: 1 })
        );

        let empty = RuleExpr::Or(Vec::new());
        assert_eq!(empty.compile().unwrap_err(), ExprError::NoOperands("or"));
    }

    #[test]
    fn test_xor_expr_takes_pair() {
        let json = r#"{"xor": [{"is": "unison"}, {"is": "octave"}]}"#;
        let expr: RuleExpr = serde_json::from_str(json).unwrap();
        let rule = expr.compile().unwrap();
        assert_eq!(rule.to_string(), "(unison xor octave)");
    }
}
