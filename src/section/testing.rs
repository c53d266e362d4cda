//! Test factories shared by unit and integration tests

use crate::section::lexing;
use crate::section::matching::CandidateMatch;
use crate::section::pattern::SectionPattern;
use crate::section::sectionizer::{PatternSource, Sectionizer, SectionizerConfig};
use crate::section::token::Document;

/// Tokenize text into a document
pub fn doc(text: &str) -> Document {
    lexing::document(text)
}

/// Build a header candidate over a token range
pub fn candidate(title: &str, start: usize, end: usize) -> CandidateMatch {
    CandidateMatch::new(title, start, end)
}

/// Build a sectionizer over inline exact-phrase rules
pub fn exact_sectionizer(rules: &[(&str, &str)]) -> Sectionizer {
    let patterns = rules
        .iter()
        .map(|(title, phrase)| SectionPattern::exact(*title, *phrase))
        .collect();
    Sectionizer::new(SectionizerConfig {
        patterns: PatternSource::Inline(patterns),
        ..SectionizerConfig::default()
    })
    .expect("inline exact rules always compile")
}
