//! Match engines for section header detection
//!
//! Two engines implement the [`MatchEngine`] trait:
//!
//! - [`PhraseMatcher`] matches an exact phrase case-insensitively by
//!   comparing token sequences
//! - [`TokenMatcher`] matches a sequence of token constraints, with optional
//!   per-constraint quantifiers
//!
//! Both produce [`CandidateMatch`] values in token coordinates. Candidates
//! from all engines are aggregated by the registry and then narrowed by the
//! line filters in this module before overlap resolution.

use std::collections::BTreeSet;
use std::ops::Range;

use regex::Regex;

use crate::section::lexing;
use crate::section::pattern::{PatternError, Quantifier, TokenConstraint};
use crate::section::token::{Document, Token};

/// A raw header candidate: a title and a half-open token range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMatch {
    pub title: String,
    pub start: usize,
    pub end: usize,
}

impl CandidateMatch {
    pub fn new(title: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            title: title.into(),
            start,
            end,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn token_range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Check if two candidates overlap (half-open interval intersection)
    pub fn overlaps(&self, other: &CandidateMatch) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A compiled rule that can scan a document for header candidates
pub trait MatchEngine: Send + Sync {
    fn find_matches(&self, doc: &Document) -> Vec<CandidateMatch>;
}

/// Case-insensitive exact-phrase engine.
///
/// The phrase is tokenized with the same lexer as documents, so `"pmh:"`
/// matches the two-token sequence `pmh`, `:` regardless of spacing in the
/// source.
pub struct PhraseMatcher {
    title: String,
    phrase: Vec<String>,
}

impl PhraseMatcher {
    pub fn new(title: &str, phrase: &str) -> Self {
        let phrase = lexing::document(phrase)
            .tokens()
            .iter()
            .map(Token::lower)
            .collect();
        Self {
            title: title.to_string(),
            phrase,
        }
    }
}

impl MatchEngine for PhraseMatcher {
    fn find_matches(&self, doc: &Document) -> Vec<CandidateMatch> {
        let mut matches = Vec::new();
        if self.phrase.is_empty() || doc.len() < self.phrase.len() {
            return matches;
        }
        let lowered: Vec<String> = doc.tokens().iter().map(Token::lower).collect();
        for start in 0..=doc.len() - self.phrase.len() {
            if lowered[start..start + self.phrase.len()] == self.phrase[..] {
                matches.push(CandidateMatch::new(
                    &self.title,
                    start,
                    start + self.phrase.len(),
                ));
            }
        }
        matches
    }
}

/// One constraint with its regex compiled ahead of matching
struct CompiledConstraint {
    lower: Option<String>,
    text: Option<String>,
    regex: Option<Regex>,
    is_digit: Option<bool>,
    is_alpha: Option<bool>,
    is_punct: Option<bool>,
    op: Option<Quantifier>,
}

impl CompiledConstraint {
    fn compile(constraint: &TokenConstraint) -> Result<Self, PatternError> {
        let regex = match &constraint.regex {
            Some(pattern) => Some(Regex::new(pattern).map_err(|e| PatternError::BadRegex {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?),
            None => None,
        };
        Ok(Self {
            lower: constraint.lower.clone(),
            text: constraint.text.clone(),
            regex,
            is_digit: constraint.is_digit,
            is_alpha: constraint.is_alpha,
            is_punct: constraint.is_punct,
            op: constraint.op,
        })
    }

    fn accepts(&self, token: &Token) -> bool {
        if let Some(lower) = &self.lower {
            if token.lower() != *lower {
                return false;
            }
        }
        if let Some(text) = &self.text {
            if token.text != *text {
                return false;
            }
        }
        if let Some(regex) = &self.regex {
            if !regex.is_match(&token.text) {
                return false;
            }
        }
        if let Some(expected) = self.is_digit {
            let actual = token.text.chars().all(|c| c.is_ascii_digit());
            if actual != expected {
                return false;
            }
        }
        if let Some(expected) = self.is_alpha {
            let actual = token.text.chars().all(char::is_alphabetic);
            if actual != expected {
                return false;
            }
        }
        if let Some(expected) = self.is_punct {
            let actual = token.text.chars().all(|c| c.is_ascii_punctuation());
            if actual != expected {
                return false;
            }
        }
        true
    }
}

/// Constraint-sequence engine with `?`, `*`, and `+` quantifiers.
///
/// Emits every distinct non-empty match end per start position, so an
/// optional leading constraint yields both the short and the long candidate.
/// Overlap resolution downstream keeps the longest.
pub struct TokenMatcher {
    title: String,
    constraints: Vec<CompiledConstraint>,
}

impl TokenMatcher {
    pub fn compile(title: &str, constraints: &[TokenConstraint]) -> Result<Self, PatternError> {
        let constraints = constraints
            .iter()
            .map(CompiledConstraint::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            title: title.to_string(),
            constraints,
        })
    }

    /// All distinct end positions for matches beginning at `start`
    fn ends_from(&self, doc: &Document, start: usize) -> BTreeSet<usize> {
        let tokens = doc.tokens();
        let mut ends = BTreeSet::new();
        let mut worklist = vec![(0usize, start)];
        let mut visited = BTreeSet::new();

        while let Some((ci, ti)) = worklist.pop() {
            if !visited.insert((ci, ti)) {
                continue;
            }
            if ci == self.constraints.len() {
                if ti > start {
                    ends.insert(ti);
                }
                continue;
            }
            let constraint = &self.constraints[ci];
            let accepts = ti < tokens.len() && constraint.accepts(&tokens[ti]);
            match constraint.op {
                None => {
                    if accepts {
                        worklist.push((ci + 1, ti + 1));
                    }
                }
                Some(Quantifier::ZeroOrOne) => {
                    worklist.push((ci + 1, ti));
                    if accepts {
                        worklist.push((ci + 1, ti + 1));
                    }
                }
                Some(Quantifier::ZeroOrMore) => {
                    worklist.push((ci + 1, ti));
                    if accepts {
                        worklist.push((ci, ti + 1));
                    }
                }
                Some(Quantifier::OneOrMore) => {
                    if accepts {
                        worklist.push((ci + 1, ti + 1));
                        worklist.push((ci, ti + 1));
                    }
                }
            }
        }
        ends
    }
}

impl MatchEngine for TokenMatcher {
    fn find_matches(&self, doc: &Document) -> Vec<CandidateMatch> {
        let mut matches = Vec::new();
        if self.constraints.is_empty() {
            return matches;
        }
        for start in 0..doc.len() {
            for end in self.ends_from(doc, start) {
                matches.push(CandidateMatch::new(&self.title, start, end));
            }
        }
        matches
    }
}

/// True when only whitespace precedes the candidate on its line
pub fn begins_line(doc: &Document, candidate: &CandidateMatch) -> bool {
    let span = doc.byte_span(&candidate.token_range());
    let line_start = doc.line_start_before(span.start);
    doc.text()[line_start..span.start]
        .chars()
        .all(char::is_whitespace)
}

/// True when only whitespace follows the candidate on its line
pub fn ends_line(doc: &Document, candidate: &CandidateMatch) -> bool {
    let span = doc.byte_span(&candidate.token_range());
    let line_end = doc.line_end_after(span.end);
    doc.text()[span.end..line_end]
        .chars()
        .all(char::is_whitespace)
}
