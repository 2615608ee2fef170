// Species definitions: data-driven rule bundles.
//
// A `SpeciesDefinition` describes one exercise type: how many voices it
// needs, how many time steps each cantus firmus note spans (1 for first
// species, 2 for second, ...), the hard rules a valid arrangement must pass,
// and the soft preferences that are reported but do not make it invalid.
// Species differ only in this data; there is no per-species code.
//
// Definitions are built either in code (`new` + `with_rule`) or from JSON via
// `from_json()`, where each rule is a `RuleExpr`:
//
//   {
//     "name": "first_species_two_voices",
//     "voice_count": 2,
//     "steps_per_bar": 1,
//     "rules": [{"description": "...", "rule": {"is": "octave"}}],
//     "preferences": []
//   }
//
// Rules keep their file order, which is also the order outcomes are reported
// in. Descriptions are the keys of the result collection and must be unique
// within each list.
//
// See also: `rule.rs` for `RuleExpr`, `arrangement.rs` for the validation
// loop that consumes a definition.

use serde::Deserialize;

use crate::error::SpeciesError;
use crate::rule::{Rule, RuleExpr};

/// A rule together with the human-readable description it is reported under.
#[derive(Debug, Clone)]
pub struct NamedRule {
    pub description: String,
    pub rule: Rule,
}

/// Static description of a counterpoint species.
#[derive(Debug, Clone)]
pub struct SpeciesDefinition {
    name: String,
    voice_count: usize,
    steps_per_bar: usize,
    rules: Vec<NamedRule>,
    preferences: Vec<NamedRule>,
}

/// The top-level JSON structure for a species file.
#[derive(Debug, Deserialize)]
struct SpeciesFile {
    name: String,
    voice_count: usize,
    #[serde(default = "one")]
    steps_per_bar: usize,
    rules: Vec<RuleEntry>,
    #[serde(default)]
    preferences: Vec<RuleEntry>,
}

#[derive(Debug, Deserialize)]
struct RuleEntry {
    description: String,
    rule: RuleExpr,
}

fn one() -> usize {
    1
}

impl SpeciesDefinition {
    /// An empty definition with no rules or preferences.
    pub fn new(
        name: impl Into<String>,
        voice_count: usize,
        steps_per_bar: usize,
    ) -> Result<Self, SpeciesError> {
        if voice_count == 0 {
            return Err(SpeciesError::NoVoices);
        }
        if steps_per_bar == 0 {
            return Err(SpeciesError::ZeroStepsPerBar);
        }
        Ok(SpeciesDefinition {
            name: name.into(),
            voice_count,
            steps_per_bar,
            rules: Vec::new(),
            preferences: Vec::new(),
        })
    }

    /// Add a hard rule.
    pub fn with_rule(
        mut self,
        description: impl Into<String>,
        rule: Rule,
    ) -> Result<Self, SpeciesError> {
        push_unique(&mut self.rules, description.into(), rule)?;
        Ok(self)
    }

    /// Add a soft preference.
    pub fn with_preference(
        mut self,
        description: impl Into<String>,
        rule: Rule,
    ) -> Result<Self, SpeciesError> {
        push_unique(&mut self.preferences, description.into(), rule)?;
        Ok(self)
    }

    /// Parse a definition from a JSON string, compiling every rule.
    pub fn from_json(json: &str) -> Result<Self, SpeciesError> {
        let file: SpeciesFile = serde_json::from_str(json)?;
        let mut species = SpeciesDefinition::new(file.name, file.voice_count, file.steps_per_bar)?;
        for entry in file.rules {
            let rule = compile_entry(&entry)?;
            species = species.with_rule(entry.description, rule)?;
        }
        for entry in file.preferences {
            let rule = compile_entry(&entry)?;
            species = species.with_preference(entry.description, rule)?;
        }
        Ok(species)
    }

    /// Fux's first species (note against note) for two voices, embedded at
    /// compile time from `data/first_species_two_voices.json`.
    ///
    /// Panics if the embedded JSON is malformed, which a unit test rules out.
    pub fn first_species_two_voices() -> Self {
        let json = include_str!("../data/first_species_two_voices.json");
        let species = SpeciesDefinition::from_json(json);
        species.expect("embedded first species definition is valid")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn voice_count(&self) -> usize {
        self.voice_count
    }

    pub fn steps_per_bar(&self) -> usize {
        self.steps_per_bar
    }

    /// Hard rules in definition order.
    pub fn rules(&self) -> &[NamedRule] {
        &self.rules
    }

    /// Soft preferences in definition order.
    pub fn preferences(&self) -> &[NamedRule] {
        &self.preferences
    }

    /// Look up a hard rule or preference by its description.
    pub fn rule(&self, description: &str) -> Option<&Rule> {
        self.rules
            .iter()
            .chain(&self.preferences)
            .find(|named| named.description == description)
            .map(|named| &named.rule)
    }
}

fn compile_entry(entry: &RuleEntry) -> Result<Rule, SpeciesError> {
    match entry.rule.compile() {
        Ok(rule) => Ok(rule),
        Err(source) => Err(SpeciesError::Rule {
            description: entry.description.clone(),
            source,
        }),
    }
}

fn push_unique(
    list: &mut Vec<NamedRule>,
    description: String,
    rule: Rule,
) -> Result<(), SpeciesError> {
    if list.iter().any(|named| named.description == description) {
        return Err(SpeciesError::DuplicateRule(description));
    }
    list.push(NamedRule { description, rule });
    Ok(())
}
