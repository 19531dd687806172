//! Candidate deduplication.
//!
//! Identity is the lowercased `(email, company)` pair taken literally: two
//! candidates without an email at the same company are the same identity,
//! so only the first of them survives.

use std::collections::HashSet;

use leadscout_shared::CandidateRecord;

/// Identity key of a candidate.
pub fn identity_key(candidate: &CandidateRecord) -> (Option<String>, String) {
    (
        candidate.email.as_ref().map(|e| e.to_lowercase()),
        candidate.company.to_lowercase(),
    )
}

/// Drop candidates whose identity was already seen, keeping first-seen order.
pub fn deduplicate(candidates: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    let mut seen = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|c| seen.insert(identity_key(c)))
        .collect()
}
