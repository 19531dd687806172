use async_trait::async_trait;
use leadscout_shared::{CandidateRecord, Result, SourceKind, TargetingCriteria};

use crate::SourceSearch;

/// A source that always answers with the same candidates.
///
/// Each returned candidate is stamped with this source's kind.
#[derive(Debug, Clone)]
pub struct StaticSource {
    kind: SourceKind,
    candidates: Vec<CandidateRecord>,
}

impl StaticSource {
    pub fn new(kind: SourceKind, candidates: Vec<CandidateRecord>) -> Self {
        Self { kind, candidates }
    }
}

#[async_trait]
impl SourceSearch for StaticSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn search(
        &self,
        _criteria: &TargetingCriteria,
        max_results: usize,
    ) -> Result<Vec<CandidateRecord>> {
        Ok(self
            .candidates
            .iter()
            .take(max_results)
            .cloned()
            .map(|mut c| {
                c.source = self.kind;
                c
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn truncates_and_stamps_kind() {
        let source = StaticSource::new(
            SourceKind::GoogleSearch,
            vec![
                CandidateRecord::new(SourceKind::Api, "Acme"),
                CandidateRecord::new(SourceKind::Api, "Globex"),
                CandidateRecord::new(SourceKind::Api, "Initech"),
            ],
        );

        let found = source
            .search(&TargetingCriteria::default(), 2)
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].company, "Acme");
        assert!(found.iter().all(|c| c.source == SourceKind::GoogleSearch));

        let none = source
            .search(&TargetingCriteria::default(), 0)
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
