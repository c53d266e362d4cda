//! Overlap resolution for header candidates
//!
//! Multiple rules routinely fire over the same tokens (an optional-prefix
//! pattern emits both its short and long form, and exact rules for related
//! titles can collide). [`prune_overlapping_matches`] reduces the candidate
//! set to pairwise non-overlapping matches by repeatedly sweeping the sorted
//! list and keeping the longer of each overlapping pair, until a sweep
//! removes nothing.
//!
//! The sweep is deliberately local: when a pair overlaps, the survivor is
//! committed and the scan restarts from the following candidate, so a chain
//! of overlaps is only fully resolved across sweeps. The fixed-point loop
//! makes the final result stable and deterministic.

use std::collections::VecDeque;

use crate::section::matching::CandidateMatch;

/// Prune overlapping candidates, keeping the longest span of each
/// overlapping pair. Ties keep the candidate that sorts first by
/// `(start, end)`.
pub fn prune_overlapping_matches(mut matches: Vec<CandidateMatch>) -> Vec<CandidateMatch> {
    matches.sort_by(|a, b| (a.start, a.end).cmp(&(b.start, b.end)));
    loop {
        let before = matches.len();
        matches = prune_pass(matches);
        if matches.len() == before {
            return matches;
        }
    }
}

/// One sweep over a sorted candidate list
fn prune_pass(matches: Vec<CandidateMatch>) -> Vec<CandidateMatch> {
    let mut unpruned: VecDeque<CandidateMatch> = matches.into();
    let mut pruned = Vec::new();

    let mut current = match unpruned.pop_front() {
        Some(m) => m,
        None => return pruned,
    };

    loop {
        let next = match unpruned.pop_front() {
            Some(m) => m,
            None => {
                pruned.push(current);
                break;
            }
        };

        if current.overlaps(&next) {
            // Keep the longer span; on equal lengths the earlier one wins
            let survivor = if next.len() > current.len() {
                next
            } else {
                current
            };
            pruned.push(survivor);
            current = match unpruned.pop_front() {
                Some(m) => m,
                None => break,
            };
        } else {
            pruned.push(current);
            current = next;
        }
    }

    pruned
}
