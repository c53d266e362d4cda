//! Section pattern definitions and the compiled pattern registry
//!
//! A [`SectionPattern`] is the declarative form a rule arrives in, either
//! from a JSONL rule file or built in code. The [`PatternRegistry`] compiles
//! each rule into a match engine and keeps the bookkeeping the rest of the
//! pipeline needs: the set of known titles and the declared parent candidates
//! per title.
//!
//! Rule records look like:
//!
//! ```text
//! {"section_title": "past_medical_history", "pattern": "pmh:"}
//! {"section_title": "past_medical_history",
//!  "pattern": [{"LOWER": "past", "OP": "?"}, {"LOWER": "medical"}, {"LOWER": "history"}],
//!  "parents": ["assessment_and_plan"]}
//! ```

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::section::matching::{CandidateMatch, MatchEngine, PhraseMatcher, TokenMatcher};
use crate::section::token::Document;

/// A declarative section rule: a normalized title plus a matcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionPattern {
    pub section_title: String,
    pub pattern: PatternMatcher,
    /// Titles that may claim this section as a child during parent resolution
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

impl SectionPattern {
    /// Convenience constructor for an exact-phrase rule
    pub fn exact(section_title: impl Into<String>, phrase: impl Into<String>) -> Self {
        Self {
            section_title: section_title.into(),
            pattern: PatternMatcher::Exact(phrase.into()),
            parents: Vec::new(),
        }
    }

    /// Convenience constructor for a structured token-constraint rule
    pub fn structured(
        section_title: impl Into<String>,
        constraints: Vec<TokenConstraint>,
    ) -> Self {
        Self {
            section_title: section_title.into(),
            pattern: PatternMatcher::Structured(constraints),
            parents: Vec::new(),
        }
    }

    pub fn with_parents(mut self, parents: Vec<String>) -> Self {
        self.parents = parents;
        self
    }
}

/// The matcher half of a rule: an exact phrase or a constraint sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternMatcher {
    Exact(String),
    Structured(Vec<TokenConstraint>),
}

/// A predicate on a single token within a structured pattern.
///
/// All present fields must hold for the token to satisfy the constraint.
/// Field names mirror the JSONL rule format.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConstraint {
    #[serde(rename = "LOWER", default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<String>,
    #[serde(rename = "TEXT", default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(rename = "REGEX", default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(rename = "IS_DIGIT", default, skip_serializing_if = "Option::is_none")]
    pub is_digit: Option<bool>,
    #[serde(rename = "IS_ALPHA", default, skip_serializing_if = "Option::is_none")]
    pub is_alpha: Option<bool>,
    #[serde(rename = "IS_PUNCT", default, skip_serializing_if = "Option::is_none")]
    pub is_punct: Option<bool>,
    #[serde(rename = "OP", default, skip_serializing_if = "Option::is_none")]
    pub op: Option<Quantifier>,
}

impl TokenConstraint {
    pub fn lower(value: impl Into<String>) -> Self {
        Self {
            lower: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn with_op(mut self, op: Quantifier) -> Self {
        self.op = Some(op);
        self
    }
}

/// How many tokens a constraint may consume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantifier {
    #[serde(rename = "?")]
    ZeroOrOne,
    #[serde(rename = "*")]
    ZeroOrMore,
    #[serde(rename = "+")]
    OneOrMore,
}

/// Errors raised while compiling rules into match engines
#[derive(Debug)]
pub enum PatternError {
    /// A REGEX constraint failed to compile
    BadRegex { pattern: String, message: String },
}

impl fmt::Display for PatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternError::BadRegex { pattern, message } => {
                write!(f, "Invalid REGEX constraint '{}': {}", pattern, message)
            }
        }
    }
}

impl std::error::Error for PatternError {}

/// Compiled rule set: engines plus title and parent bookkeeping
#[derive(Default)]
pub struct PatternRegistry {
    patterns: Vec<SectionPattern>,
    engines: Vec<Box<dyn MatchEngine>>,
    titles: BTreeSet<String>,
    parent_map: HashMap<String, BTreeSet<String>>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and register a batch of rules.
    ///
    /// Parent declarations accumulate per title across all rules sharing
    /// that title.
    pub fn add(&mut self, patterns: Vec<SectionPattern>) -> Result<(), PatternError> {
        for pattern in patterns {
            let engine: Box<dyn MatchEngine> = match &pattern.pattern {
                PatternMatcher::Exact(phrase) => {
                    Box::new(PhraseMatcher::new(&pattern.section_title, phrase))
                }
                PatternMatcher::Structured(constraints) => Box::new(TokenMatcher::compile(
                    &pattern.section_title,
                    constraints,
                )?),
            };
            self.engines.push(engine);
            self.titles.insert(pattern.section_title.clone());
            if !pattern.parents.is_empty() {
                self.parent_map
                    .entry(pattern.section_title.clone())
                    .or_default()
                    .extend(pattern.parents.iter().cloned());
            }
            self.patterns.push(pattern);
        }
        Ok(())
    }

    /// The declarative rules in registration order
    pub fn patterns(&self) -> &[SectionPattern] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// All known section titles, sorted
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.titles.iter().map(|s| s.as_str())
    }

    /// Declared parent candidates for a title, if any rule declared them
    pub fn parents_for(&self, title: &str) -> Option<&BTreeSet<String>> {
        self.parent_map.get(title)
    }

    /// Run every compiled engine over the document and collect all raw
    /// candidate matches, in engine registration order
    pub fn find_matches(&self, doc: &Document) -> Vec<CandidateMatch> {
        let mut matches = Vec::new();
        for engine in &self.engines {
            matches.extend(engine.find_matches(doc));
        }
        matches
    }
}

impl fmt::Debug for PatternRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternRegistry")
            .field("patterns", &self.patterns.len())
            .field("titles", &self.titles)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::lexing;

    #[test]
    fn test_exact_rule_round_trips_through_json() {
        let raw = r#"{"section_title": "past_medical_history", "pattern": "pmh:"}"#;
        let pattern: SectionPattern = serde_json::from_str(raw).unwrap();
        assert_eq!(pattern.section_title, "past_medical_history");
        assert_eq!(pattern.pattern, PatternMatcher::Exact("pmh:".to_string()));
        assert!(pattern.parents.is_empty());
    }

    #[test]
    fn test_structured_rule_parses_constraints() {
        let raw = r#"{"section_title": "past_medical_history",
                      "pattern": [{"LOWER": "past", "OP": "?"}, {"LOWER": "medical"},
                                  {"LOWER": "history"}, {"LOWER": ":"}]}"#;
        let pattern: SectionPattern = serde_json::from_str(raw).unwrap();
        match &pattern.pattern {
            PatternMatcher::Structured(constraints) => {
                assert_eq!(constraints.len(), 4);
                assert_eq!(constraints[0].lower.as_deref(), Some("past"));
                assert_eq!(constraints[0].op, Some(Quantifier::ZeroOrOne));
                assert_eq!(constraints[1].op, None);
            }
            other => panic!("expected structured pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_constraint_field_rejected() {
        let raw = r#"{"section_title": "x", "pattern": [{"SHAPE": "Xxx"}]}"#;
        assert!(serde_json::from_str::<SectionPattern>(raw).is_err());
    }

    #[test]
    fn test_registry_tracks_titles_and_parents() {
        let mut registry = PatternRegistry::new();
        registry
            .add(vec![
                SectionPattern::exact("past_medical_history", "Past Medical History:"),
                SectionPattern::exact("explanation", "Explanation:")
                    .with_parents(vec!["past_medical_history".to_string()]),
                SectionPattern::exact("explanation", "Reason:")
                    .with_parents(vec!["allergy".to_string()]),
            ])
            .unwrap();

        let titles: Vec<&str> = registry.titles().collect();
        assert_eq!(titles, vec!["explanation", "past_medical_history"]);

        let parents = registry.parents_for("explanation").unwrap();
        assert!(parents.contains("past_medical_history"));
        assert!(parents.contains("allergy"));
        assert!(registry.parents_for("past_medical_history").is_none());
    }

    #[test]
    fn test_registry_bad_regex_is_an_error() {
        let mut registry = PatternRegistry::new();
        let constraint = TokenConstraint {
            regex: Some("[unclosed".to_string()),
            ..TokenConstraint::default()
        };
        let result = registry.add(vec![SectionPattern::structured("broken", vec![constraint])]);
        assert!(matches!(result, Err(PatternError::BadRegex { .. })));
    }

    #[test]
    fn test_registry_find_matches_runs_all_engines() {
        let mut registry = PatternRegistry::new();
        registry
            .add(vec![
                SectionPattern::exact("past_medical_history", "pmh:"),
                SectionPattern::exact("chief_complaint", "cc:"),
            ])
            .unwrap();
        let doc = lexing::document("cc: cough. pmh: asthma");
        let matches = registry.find_matches(&doc);
        assert_eq!(matches.len(), 2);
        let titles: Vec<&str> = matches.iter().map(|m| m.title.as_str()).collect();
        // Registration order, not document order
        assert_eq!(titles, vec!["past_medical_history", "chief_complaint"]);
    }
}
