//! File-backed source: candidates are read from `<dir>/<kind>.json`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use leadscout_shared::{CandidateRecord, LeadScoutError, Result, SourceKind, TargetingCriteria};
use tracing::debug;

use crate::SourceSearch;

/// Serves candidates from a JSON array on disk, re-read on every search.
///
/// Candidates whose industry or location contradict the criteria are skipped;
/// candidates that leave those fields blank are kept.
#[derive(Debug, Clone)]
pub struct FixtureSource {
    kind: SourceKind,
    path: PathBuf,
}

impl FixtureSource {
    /// Source for `kind` reading `<dir>/<kind>.json`.
    pub fn new(kind: SourceKind, dir: &Path) -> Self {
        Self {
            kind,
            path: dir.join(format!("{}.json", kind.as_str())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<CandidateRecord>> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| LeadScoutError::io(&self.path, e))?;

        let entries: Vec<serde_json::Map<String, serde_json::Value>> =
            serde_json::from_str(&content).map_err(|e| {
                LeadScoutError::parse(format!("{}: {e}", self.path.display()))
            })?;

        entries
            .into_iter()
            .map(|mut entry| {
                entry.insert(
                    "source".into(),
                    serde_json::Value::String(self.kind.as_str().into()),
                );
                serde_json::from_value(serde_json::Value::Object(entry)).map_err(|e| {
                    LeadScoutError::parse(format!("{}: {e}", self.path.display()))
                })
            })
            .collect()
    }
}

#[async_trait]
impl SourceSearch for FixtureSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn search(
        &self,
        criteria: &TargetingCriteria,
        max_results: usize,
    ) -> Result<Vec<CandidateRecord>> {
        let all = self
            .load()
            .await
            .map_err(|e| LeadScoutError::source_failure(self.kind.as_str(), e.to_string()))?;
        let total = all.len();

        let matched: Vec<CandidateRecord> = all
            .into_iter()
            .filter(|c| compatible(c, criteria))
            .take(max_results)
            .collect();

        debug!(
            source = %self.kind,
            total,
            returned = matched.len(),
            "fixture search"
        );
        Ok(matched)
    }
}

fn compatible(candidate: &CandidateRecord, criteria: &TargetingCriteria) -> bool {
    let industry_ok = match (&candidate.industry, &criteria.industry) {
        (Some(have), Some(want)) => have.eq_ignore_ascii_case(want),
        _ => true,
    };
    let location_ok = match (&candidate.location, &criteria.location) {
        (Some(have), Some(want)) => have.to_lowercase().contains(&want.to_lowercase()),
        _ => true,
    };
    industry_ok && location_ok
}
