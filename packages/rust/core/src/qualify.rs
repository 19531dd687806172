//! Scoring and persisting deduplicated candidates as leads.

use leadscout_shared::{CandidateRecord, Lead, Result, TargetingCriteria, TaskId};
use leadscout_storage::LeadRepository;
use tracing::{debug, warn};

use crate::scoring::Scorer;

/// Score substituted when the scorer fails.
pub const DEFAULT_NEUTRAL_SCORE: f64 = 50.0;

/// Bring a raw score into `[0, 100]`. `None` for NaN, which has no position
/// on the scale.
pub fn clamp_score(raw: f64) -> Option<f64> {
    if raw.is_nan() {
        None
    } else {
        Some(raw.clamp(0.0, 100.0))
    }
}

/// Turns candidates into persisted leads.
pub struct Qualifier<'a> {
    scorer: &'a dyn Scorer,
    leads: &'a dyn LeadRepository,
    neutral_score: f64,
}

impl<'a> Qualifier<'a> {
    pub fn new(scorer: &'a dyn Scorer, leads: &'a dyn LeadRepository) -> Self {
        Self {
            scorer,
            leads,
            neutral_score: DEFAULT_NEUTRAL_SCORE,
        }
    }

    pub fn with_neutral_score(mut self, score: f64) -> Self {
        self.neutral_score = clamp_score(score).unwrap_or(DEFAULT_NEUTRAL_SCORE);
        self
    }

    /// Score each candidate in order and persist it, stopping once
    /// `max_leads` leads exist. Candidates past the cap are never scored,
    /// whatever their quality. Scoring failures fall back to the neutral
    /// score; persistence failures abort the run.
    pub async fn qualify(
        &self,
        task_id: TaskId,
        candidates: Vec<CandidateRecord>,
        criteria: &TargetingCriteria,
        max_leads: usize,
    ) -> Result<Vec<Lead>> {
        let mut accepted = Vec::with_capacity(candidates.len().min(max_leads));

        for candidate in candidates.into_iter().take(max_leads) {
            let score = self.score(&candidate, criteria).await;
            let lead = Lead::from_candidate(candidate, task_id, score);
            self.leads.put_lead(&lead).await?;
            debug!(
                lead_id = %lead.id,
                score = lead.quality_score,
                tier = %lead.quality_tier,
                "lead accepted"
            );
            accepted.push(lead);
        }

        Ok(accepted)
    }

    async fn score(&self, candidate: &CandidateRecord, criteria: &TargetingCriteria) -> f64 {
        match self.scorer.score(candidate, criteria).await {
            Ok(raw) => clamp_score(raw).unwrap_or_else(|| {
                warn!(candidate = %candidate.display_name(), "scorer returned NaN, using neutral score");
                self.neutral_score
            }),
            Err(e) => {
                warn!(
                    candidate = %candidate.display_name(),
                    error = %e,
                    "scoring failed, using neutral score"
                );
                self.neutral_score
            }
        }
    }
}
