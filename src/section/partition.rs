//! Partitioning a document into sections
//!
//! Given the pruned header matches, [`partition`] carves the document's
//! token range into [`Section`] values. Two body policies exist:
//!
//! - Without `max_scope`, each section runs from its header to the next
//!   header (the last runs to the end of the document), so sections tile
//!   the document exactly
//! - With `max_scope`, every section's body is the header plus at most
//!   `max_scope` following tokens. Bodies may then leave gaps between
//!   sections and may overlap a later header
//!
//! [`Segmentation`] flattens the section list into a per-token assignment
//! table. Assignments are written in section order, so where bodies overlap
//! the later section owns the token.

use std::ops::Range;

use serde::Serialize;

use crate::section::matching::CandidateMatch;
use crate::section::pattern::PatternRegistry;

/// One detected section in token coordinates.
///
/// The leading preamble of a document that starts with prose rather than a
/// header is represented as a section with no title and no header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub title: Option<String>,
    pub header: Option<Range<usize>>,
    pub parent_title: Option<String>,
    pub body: Range<usize>,
}

impl Section {
    fn untitled(body: Range<usize>) -> Self {
        Self {
            title: None,
            header: None,
            parent_title: None,
            body,
        }
    }

    fn titled(title: &str, header: Range<usize>, body: Range<usize>) -> Self {
        Self {
            title: Some(title.to_string()),
            header: Some(header),
            parent_title: None,
            body,
        }
    }
}

/// Carve `0..doc_len` into sections from pruned, sorted, disjoint matches
pub fn partition(
    doc_len: usize,
    matches: &[CandidateMatch],
    max_scope: Option<usize>,
) -> Vec<Section> {
    if matches.is_empty() {
        return vec![Section::untitled(0..doc_len)];
    }

    let mut sections = Vec::with_capacity(matches.len() + 1);
    if matches[0].start != 0 {
        sections.push(Section::untitled(0..matches[0].start));
    }

    for (i, m) in matches.iter().enumerate() {
        let body_end = match max_scope {
            Some(scope) => (m.end + scope).min(doc_len),
            None => match matches.get(i + 1) {
                Some(next) => next.start,
                None => doc_len,
            },
        };
        sections.push(Section::titled(&m.title, m.start..m.end, m.start..body_end));
    }

    sections
}

/// Resolve `parent_title` for every section whose title declared parent
/// candidates: the nearest preceding section whose title is a candidate
pub fn resolve_parents(sections: &mut [Section], registry: &PatternRegistry) {
    for i in 0..sections.len() {
        let candidates = match sections[i]
            .title
            .as_deref()
            .and_then(|title| registry.parents_for(title))
        {
            Some(candidates) => candidates,
            None => continue,
        };
        for j in (0..i).rev() {
            if let Some(earlier) = sections[j].title.as_deref() {
                if candidates.contains(earlier) {
                    let parent = earlier.to_string();
                    sections[i].parent_title = Some(parent);
                    break;
                }
            }
        }
    }
}

/// A section list flattened into per-token ownership
#[derive(Debug, Clone, Serialize)]
pub struct Segmentation {
    doc_len: usize,
    sections: Vec<Section>,
    assignments: Vec<Option<usize>>,
}

impl Segmentation {
    pub fn new(doc_len: usize, sections: Vec<Section>) -> Self {
        let mut assignments = vec![None; doc_len];
        for (idx, section) in sections.iter().enumerate() {
            for token in section.body.clone() {
                assignments[token] = Some(idx);
            }
        }
        Self {
            doc_len,
            sections,
            assignments,
        }
    }

    pub fn doc_len(&self) -> usize {
        self.doc_len
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn titles(&self) -> Vec<Option<&str>> {
        self.sections.iter().map(|s| s.title.as_deref()).collect()
    }

    pub fn headers(&self) -> Vec<Option<Range<usize>>> {
        self.sections.iter().map(|s| s.header.clone()).collect()
    }

    pub fn bodies(&self) -> Vec<Range<usize>> {
        self.sections.iter().map(|s| s.body.clone()).collect()
    }

    /// The section owning a token, if any section's body covers it
    pub fn section_at(&self, token: usize) -> Option<&Section> {
        let idx = (*self.assignments.get(token)?)?;
        Some(&self.sections[idx])
    }

    /// Title of the section owning a token. `None` for untitled sections,
    /// unassigned tokens, and out-of-range indices alike
    pub fn title_at(&self, token: usize) -> Option<&str> {
        self.section_at(token)?.title.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::pattern::{PatternRegistry, SectionPattern};

    fn m(title: &str, start: usize, end: usize) -> CandidateMatch {
        CandidateMatch::new(title, start, end)
    }

    #[test]
    fn test_no_matches_single_untitled_section() {
        let sections = partition(5, &[], None);
        assert_eq!(sections, vec![Section::untitled(0..5)]);
    }

    #[test]
    fn test_no_matches_empty_document() {
        let sections = partition(0, &[], None);
        assert_eq!(sections, vec![Section::untitled(0..0)]);
    }

    #[test]
    fn test_bodies_run_to_next_header() {
        let matches = vec![m("pmh", 0, 2), m("allergy", 6, 8)];
        let sections = partition(10, &matches, None);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].body, 0..6);
        assert_eq!(sections[0].header, Some(0..2));
        assert_eq!(sections[1].body, 6..10);
    }

    #[test]
    fn test_leading_prose_becomes_untitled_section() {
        let matches = vec![m("pmh", 3, 5)];
        let sections = partition(8, &matches, None);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0], Section::untitled(0..3));
        assert_eq!(sections[1].title.as_deref(), Some("pmh"));
        assert_eq!(sections[1].body, 3..8);
    }

    #[test]
    fn test_max_scope_windows_and_gaps() {
        let matches = vec![m("pmh", 0, 2), m("allergy", 10, 12)];
        let sections = partition(20, &matches, Some(3));
        assert_eq!(sections[0].body, 0..5);
        assert_eq!(sections[1].body, 10..15);

        let seg = Segmentation::new(20, sections);
        assert_eq!(seg.title_at(4), Some("pmh"));
        // Tokens between the scope window and the next header are unowned
        assert_eq!(seg.title_at(5), None);
        assert!(seg.section_at(5).is_none());
        assert_eq!(seg.title_at(10), Some("allergy"));
    }

    #[test]
    fn test_max_scope_clamped_at_document_end() {
        let matches = vec![m("pmh", 0, 2)];
        let sections = partition(3, &matches, Some(10));
        assert_eq!(sections[0].body, 0..3);
    }

    #[test]
    fn test_overlapping_bodies_later_section_wins() {
        // A large scope window reaches past the next header
        let matches = vec![m("pmh", 0, 2), m("allergy", 4, 6)];
        let sections = partition(10, &matches, Some(5));
        assert_eq!(sections[0].body, 0..7);
        assert_eq!(sections[1].body, 4..10);

        let seg = Segmentation::new(10, sections);
        assert_eq!(seg.title_at(3), Some("pmh"));
        assert_eq!(seg.title_at(4), Some("allergy"));
        assert_eq!(seg.title_at(6), Some("allergy"));
    }

    #[test]
    fn test_parent_resolution_nearest_preceding() {
        let mut registry = PatternRegistry::new();
        registry
            .add(vec![
                SectionPattern::exact("past_medical_history", "Past Medical History:"),
                SectionPattern::exact("allergy", "Allergies:"),
                SectionPattern::exact("explanation", "Explanation:").with_parents(vec![
                    "past_medical_history".to_string(),
                    "allergy".to_string(),
                ]),
            ])
            .unwrap();

        let matches = vec![
            m("past_medical_history", 0, 2),
            m("explanation", 4, 5),
            m("allergy", 8, 9),
            m("explanation", 12, 13),
        ];
        let mut sections = partition(16, &matches, None);
        resolve_parents(&mut sections, &registry);

        assert_eq!(sections[0].parent_title, None);
        assert_eq!(
            sections[1].parent_title.as_deref(),
            Some("past_medical_history")
        );
        assert_eq!(sections[2].parent_title, None);
        assert_eq!(sections[3].parent_title.as_deref(), Some("allergy"));
    }

    #[test]
    fn test_parent_resolution_no_candidate_present() {
        let mut registry = PatternRegistry::new();
        registry
            .add(vec![SectionPattern::exact("explanation", "Explanation:")
                .with_parents(vec!["past_medical_history".to_string()])])
            .unwrap();

        let matches = vec![m("explanation", 0, 1)];
        let mut sections = partition(4, &matches, None);
        resolve_parents(&mut sections, &registry);
        assert_eq!(sections[0].parent_title, None);
    }

    #[test]
    fn test_segmentation_tiling_without_max_scope() {
        let matches = vec![m("a", 2, 3), m("b", 6, 7)];
        let sections = partition(10, &matches, None);
        let seg = Segmentation::new(10, sections);
        for token in 0..10 {
            assert!(seg.section_at(token).is_some());
        }
        assert_eq!(seg.title_at(0), None);
        assert_eq!(seg.title_at(5), Some("a"));
        assert_eq!(seg.title_at(9), Some("b"));
    }
}
