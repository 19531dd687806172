//! Run reports: deterministic aggregates plus an optional LLM narrative.

use std::collections::HashMap;

use async_trait::async_trait;
use leadscout_shared::{
    CompanyCount, Lead, Narrative, Result, SearchReport, SourceReport, TargetingCriteria,
    TierCounts,
};
use tracing::warn;

/// Companies listed in a report's `top_companies`.
pub const TOP_COMPANIES: usize = 10;

/// Produces a free-form analysis of a run's leads.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        leads: &[Lead],
        criteria: &TargetingCriteria,
    ) -> Result<serde_json::Value>;
}

/// Counts collected while sourcing, before any lead exists.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub raw_candidates: usize,
    pub unique_candidates: usize,
    pub sources: Vec<SourceReport>,
}

/// Aggregate `leads` into a report. The narrative comes from `summarizer`
/// when one is given and succeeds; otherwise it is marked unavailable.
pub async fn build_report(
    leads: &[Lead],
    criteria: &TargetingCriteria,
    stats: RunStats,
    summarizer: Option<&dyn Summarizer>,
) -> SearchReport {
    let narrative = match summarizer {
        None => Narrative::Unavailable {
            reason: "no summarizer configured".into(),
        },
        Some(_) if leads.is_empty() => Narrative::Unavailable {
            reason: "no leads to analyze".into(),
        },
        Some(summarizer) => match summarizer.summarize(leads, criteria).await {
            Ok(analysis) => Narrative::Available { analysis },
            Err(e) => {
                warn!(error = %e, "summary generation failed");
                Narrative::Unavailable {
                    reason: e.to_string(),
                }
            }
        },
    };

    aggregate(leads, stats, narrative)
}

/// The deterministic part of a report.
pub fn aggregate(leads: &[Lead], stats: RunStats, narrative: Narrative) -> SearchReport {
    let mut tiers = TierCounts::default();
    for lead in leads {
        tiers.record(lead.quality_tier);
    }

    let average_score = if leads.is_empty() {
        0.0
    } else {
        let total: f64 = leads.iter().map(|l| l.quality_score).sum();
        round_tenth(total / leads.len() as f64)
    };

    SearchReport {
        raw_candidates: stats.raw_candidates,
        unique_candidates: stats.unique_candidates,
        total_leads: leads.len(),
        tiers,
        average_score,
        top_companies: top_companies(leads, TOP_COMPANIES),
        sources: stats.sources,
        narrative,
    }
}

/// Most frequent companies, ties broken by first appearance.
pub(crate) fn top_companies(leads: &[Lead], limit: usize) -> Vec<CompanyCount> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for lead in leads {
        let company = lead.company.trim();
        if company.is_empty() {
            continue;
        }
        let count = counts.entry(company).or_insert_with(|| {
            order.push(company);
            0
        });
        *count += 1;
    }

    let mut ranked: Vec<CompanyCount> = order
        .into_iter()
        .map(|company| CompanyCount {
            company: company.to_string(),
            leads: counts[company],
        })
        .collect();
    // Stable sort keeps first-seen order among equal counts.
    ranked.sort_by(|a, b| b.leads.cmp(&a.leads));
    ranked.truncate(limit);
    ranked
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
