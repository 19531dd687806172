//! Candidate scoring: the [`Scorer`] capability and a keyword heuristic.

use async_trait::async_trait;
use leadscout_shared::{CandidateRecord, Result, TargetingCriteria};

/// Rates how well a candidate fits a targeting profile.
///
/// Scores are nominally in `[0, 100]`. Callers clamp whatever comes back and
/// substitute a neutral score when this fails.
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, candidate: &CandidateRecord, criteria: &TargetingCriteria)
    -> Result<f64>;
}

// Weights sum to 100.
const TITLE_WEIGHT: f64 = 40.0;
const INDUSTRY_WEIGHT: f64 = 25.0;
const SIZE_WEIGHT: f64 = 15.0;
const LOCATION_WEIGHT: f64 = 10.0;
const RELEVANCE_WEIGHT: f64 = 10.0;

/// Offline scorer that awards weighted points per matching criterion.
///
/// A criterion the profile leaves unset awards its full weight; a set
/// criterion the candidate has no data for awards nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScorer;

impl HeuristicScorer {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous scoring used by the trait impl.
    pub fn evaluate(&self, candidate: &CandidateRecord, criteria: &TargetingCriteria) -> f64 {
        title_points(candidate, criteria)
            + industry_points(candidate, criteria)
            + size_points(candidate, criteria)
            + location_points(candidate, criteria)
            + relevance_points(candidate, criteria)
    }
}

#[async_trait]
impl Scorer for HeuristicScorer {
    async fn score(
        &self,
        candidate: &CandidateRecord,
        criteria: &TargetingCriteria,
    ) -> Result<f64> {
        Ok(self.evaluate(candidate, criteria))
    }
}

fn title_points(candidate: &CandidateRecord, criteria: &TargetingCriteria) -> f64 {
    if criteria.job_titles.is_empty() {
        return TITLE_WEIGHT;
    }
    let Some(title) = candidate.job_title.as_deref().map(str::to_lowercase) else {
        return 0.0;
    };
    let hit = criteria.job_titles.iter().any(|want| {
        let want = want.to_lowercase();
        !want.is_empty() && (title.contains(&want) || want.contains(&title))
    });
    if hit { TITLE_WEIGHT } else { 0.0 }
}

fn industry_points(candidate: &CandidateRecord, criteria: &TargetingCriteria) -> f64 {
    match (&criteria.industry, &candidate.industry) {
        (None, _) => INDUSTRY_WEIGHT,
        (Some(want), Some(have)) if have.eq_ignore_ascii_case(want) => INDUSTRY_WEIGHT,
        _ => 0.0,
    }
}

fn size_points(candidate: &CandidateRecord, criteria: &TargetingCriteria) -> f64 {
    match (criteria.company_size, &candidate.company_size) {
        (None, _) => SIZE_WEIGHT,
        (Some(want), Some(have)) if have.trim() == want.as_str() => SIZE_WEIGHT,
        _ => 0.0,
    }
}

fn location_points(candidate: &CandidateRecord, criteria: &TargetingCriteria) -> f64 {
    match (&criteria.location, &candidate.location) {
        (None, _) => LOCATION_WEIGHT,
        (Some(want), Some(have)) if have.to_lowercase().contains(&want.to_lowercase()) => {
            LOCATION_WEIGHT
        }
        _ => 0.0,
    }
}

/// Fraction of keywords and technologies mentioned anywhere on the candidate.
fn relevance_points(candidate: &CandidateRecord, criteria: &TargetingCriteria) -> f64 {
    let terms: Vec<String> = criteria
        .keywords
        .iter()
        .chain(&criteria.technologies)
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if terms.is_empty() {
        return RELEVANCE_WEIGHT;
    }

    let haystack = [
        candidate.job_title.as_deref(),
        Some(candidate.company.as_str()),
        candidate.industry.as_deref(),
        candidate.notes.as_deref(),
    ]
    .into_iter()
    .flatten()
    .chain(candidate.tags.iter().map(String::as_str))
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();

    let hits = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
    RELEVANCE_WEIGHT * hits as f64 / terms.len() as f64
}
