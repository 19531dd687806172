//! Search execution: sources → dedup → qualify → summarize → complete.
//!
//! One call to [`execute_search`] drives a task from `pending` to a terminal
//! state. Task state in memory only advances once the repository has
//! accepted it, so a persistence failure never leaves the stored task behind
//! what was reported.

use std::sync::Arc;
use std::time::Instant;

use leadscout_shared::{
    CandidateRecord, LeadScoutError, Result, SearchTask, SourceKind, SourceReport, TaskStatus,
};
use leadscout_sources::SourceRegistry;
use leadscout_storage::{LeadRepository, TaskRepository};
use tokio::task::AbortHandle;
use tracing::{error, info, instrument, warn};

use crate::dedup;
use crate::qualify::{DEFAULT_NEUTRAL_SCORE, Qualifier};
use crate::scoring::Scorer;
use crate::summary::{self, RunStats, Summarizer};

/// Observer for search progress, e.g. a terminal progress bar.
pub trait ProgressReporter: Send + Sync {
    /// The task moved to `running`.
    fn started(&self, task: &SearchTask);
    /// One source finished and the new progress was persisted.
    fn source_done(&self, task: &SearchTask, report: &SourceReport);
    /// The task reached a terminal state.
    fn finished(&self, task: &SearchTask);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn started(&self, _task: &SearchTask) {}
    fn source_done(&self, _task: &SearchTask, _report: &SourceReport) {}
    fn finished(&self, _task: &SearchTask) {}
}

/// Everything a search run needs, shared by all runs of one orchestrator.
pub struct SearchContext {
    pub sources: SourceRegistry,
    pub scorer: Arc<dyn Scorer>,
    pub summarizer: Option<Arc<dyn Summarizer>>,
    pub tasks: Arc<dyn TaskRepository>,
    pub leads: Arc<dyn LeadRepository>,
    pub progress: Arc<dyn ProgressReporter>,
    pub neutral_score: f64,
}

impl SearchContext {
    pub fn new(
        sources: SourceRegistry,
        scorer: Arc<dyn Scorer>,
        tasks: Arc<dyn TaskRepository>,
        leads: Arc<dyn LeadRepository>,
    ) -> Self {
        Self {
            sources,
            scorer,
            summarizer: None,
            tasks,
            leads,
            progress: Arc::new(SilentProgress),
            neutral_score: DEFAULT_NEUTRAL_SCORE,
        }
    }

    /// Apply `change` to a copy of `task`, persist the copy, then commit it.
    async fn checkpoint(
        &self,
        task: &mut SearchTask,
        change: impl FnOnce(&mut SearchTask) -> Result<()>,
    ) -> Result<()> {
        let mut next = task.clone();
        change(&mut next)?;
        self.tasks.put_task(&next).await?;
        *task = next;
        Ok(())
    }
}

/// Per-source result budget: the cap split evenly, remainder dropped.
///
/// With 10 leads over 3 sources each source gets 3, so at most 9 candidates
/// can arrive even though 10 were asked for.
pub fn source_budget(max_leads: usize, source_count: usize) -> usize {
    if source_count == 0 {
        0
    } else {
        max_leads / source_count
    }
}

/// Run `task` to a terminal state and return it as last persisted.
///
/// Any failure outside the per-source calls fails the task with the error's
/// description. This never returns an error itself; if even the failure
/// record cannot be stored, that is logged.
#[instrument(skip_all, fields(task_id = %task.id, name = %task.name))]
pub async fn execute_search(ctx: &SearchContext, mut task: SearchTask) -> SearchTask {
    let start = Instant::now();

    match run(ctx, &mut task).await {
        Ok(()) => {
            info!(
                leads = task.leads_found,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "search completed"
            );
        }
        Err(e) => {
            error!(error = %e, progress = task.progress, "search failed");
            if let Err(e) = fail_task(ctx.tasks.as_ref(), &mut task, e.to_string()).await {
                error!(error = %e, "could not record task failure");
            }
        }
    }

    ctx.progress.finished(&task);
    task
}

/// Mark `task` failed and persist it. Already-terminal tasks are left alone.
///
/// A task that never left `pending` is first recorded as `running`, so the
/// stored history always follows pending → running → failed.
pub async fn fail_task(
    tasks: &dyn TaskRepository,
    task: &mut SearchTask,
    reason: impl Into<String>,
) -> Result<()> {
    if task.status.is_terminal() {
        return Ok(());
    }
    if task.status == TaskStatus::Pending {
        task.mark_running()?;
        tasks.put_task(task).await?;
    }
    task.mark_failed(reason)?;
    tasks.put_task(task).await
}

async fn run(ctx: &SearchContext, task: &mut SearchTask) -> Result<()> {
    ctx.checkpoint(task, SearchTask::mark_running).await?;
    ctx.progress.started(task);
    info!(sources = task.sources.len(), max_leads = task.max_leads, "search started");

    // --- Sourcing ---
    let total = task.sources.len();
    if total == 0 {
        return Err(LeadScoutError::validation("task has no sources"));
    }
    let budget = source_budget(task.max_leads, total);
    let kinds = task.sources.clone();

    let mut candidates: Vec<CandidateRecord> = Vec::new();
    let mut reports = Vec::with_capacity(total);
    for (index, kind) in kinds.into_iter().enumerate() {
        let report = match search_source(ctx, task, kind, budget).await {
            Ok(found) => {
                info!(source = %kind, budget, found = found.len(), "source searched");
                let report = SourceReport {
                    source: kind,
                    budget,
                    candidates: found.len(),
                    error: None,
                };
                candidates.extend(found);
                report
            }
            Err(e) => {
                warn!(source = %kind, error = %e, "source failed, continuing without it");
                SourceReport {
                    source: kind,
                    budget,
                    candidates: 0,
                    error: Some(e.to_string()),
                }
            }
        };

        let percent = (index + 1) as f64 / total as f64 * 100.0;
        ctx.checkpoint(task, |t| {
            t.advance_progress(percent);
            Ok(())
        })
        .await?;
        ctx.progress.source_done(task, &report);
        reports.push(report);
    }

    // --- Dedup + qualification ---
    let raw_candidates = candidates.len();
    let unique = dedup::deduplicate(candidates);
    let unique_candidates = unique.len();
    info!(raw_candidates, unique_candidates, "candidates deduplicated");

    let qualifier =
        Qualifier::new(ctx.scorer.as_ref(), ctx.leads.as_ref()).with_neutral_score(ctx.neutral_score);
    let leads = qualifier
        .qualify(task.id, unique, &task.criteria, task.max_leads)
        .await?;

    // --- Summary + completion ---
    let stats = RunStats {
        raw_candidates,
        unique_candidates,
        sources: reports,
    };
    let report =
        summary::build_report(&leads, &task.criteria, stats, ctx.summarizer.as_deref()).await;

    let leads_found = leads.len();
    ctx.checkpoint(task, |t| t.mark_completed(leads_found, report))
        .await
}

/// Call one source in isolation. Errors and panics both come back as a
/// source failure.
async fn search_source(
    ctx: &SearchContext,
    task: &SearchTask,
    kind: SourceKind,
    budget: usize,
) -> Result<Vec<CandidateRecord>> {
    let source = ctx.sources.resolve(kind)?;
    let criteria = task.criteria.clone();

    let handle = tokio::spawn(async move { source.search(&criteria, budget).await });
    let _guard = AbortOnDrop(handle.abort_handle());
    match handle.await {
        Ok(result) => result,
        Err(join) => Err(LeadScoutError::source_failure(
            kind.as_str(),
            format!("search aborted: {join}"),
        )),
    }
}

/// Aborts the source call if the run itself is cancelled mid-search.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use leadscout_shared::{
        Lead, LeadFilter, Narrative, ResultsSummary, TargetingCriteria, TaskId, TaskStatus,
    };
    use leadscout_sources::{SourceSearch, StaticSource};
    use leadscout_storage::MemoryStore;

    use super::*;
    use crate::scoring::HeuristicScorer;

    // --- Test doubles ---

    struct FailingSource(SourceKind);

    #[async_trait]
    impl SourceSearch for FailingSource {
        fn kind(&self) -> SourceKind {
            self.0
        }

        async fn search(
            &self,
            _criteria: &TargetingCriteria,
            _max_results: usize,
        ) -> Result<Vec<CandidateRecord>> {
            Err(LeadScoutError::Network("connection refused".into()))
        }
    }

    struct PanickingSource(SourceKind);

    #[async_trait]
    impl SourceSearch for PanickingSource {
        fn kind(&self) -> SourceKind {
            self.0
        }

        async fn search(
            &self,
            _criteria: &TargetingCriteria,
            _max_results: usize,
        ) -> Result<Vec<CandidateRecord>> {
            panic!("source blew up");
        }
    }

    /// Records the budget it was asked for.
    struct BudgetRecorder {
        kind: SourceKind,
        seen: Arc<Mutex<Vec<usize>>>,
    }

    #[async_trait]
    impl SourceSearch for BudgetRecorder {
        fn kind(&self) -> SourceKind {
            self.kind
        }

        async fn search(
            &self,
            _criteria: &TargetingCriteria,
            max_results: usize,
        ) -> Result<Vec<CandidateRecord>> {
            self.seen.lock().unwrap().push(max_results);
            Ok((0..max_results)
                .map(|i| CandidateRecord::new(self.kind, format!("{}-{i}", self.kind)))
                .collect())
        }
    }

    /// Returns its whole list whatever budget it is given.
    struct Unbounded(SourceKind, Vec<CandidateRecord>);

    #[async_trait]
    impl SourceSearch for Unbounded {
        fn kind(&self) -> SourceKind {
            self.0
        }

        async fn search(
            &self,
            _criteria: &TargetingCriteria,
            _max_results: usize,
        ) -> Result<Vec<CandidateRecord>> {
            Ok(self.1.clone())
        }
    }

    struct FixedScore(f64);

    #[async_trait]
    impl Scorer for FixedScore {
        async fn score(
            &self,
            _candidate: &CandidateRecord,
            _criteria: &TargetingCriteria,
        ) -> Result<f64> {
            Ok(self.0)
        }
    }

    /// Task repository that fails the Nth put (1-based) and records the
    /// status of every put it accepts.
    struct FlakyTasks {
        inner: MemoryStore,
        puts: AtomicUsize,
        fail_on: usize,
        history: Mutex<Vec<TaskStatus>>,
    }

    impl FlakyTasks {
        fn failing_on(fail_on: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                puts: AtomicUsize::new(0),
                fail_on,
                history: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TaskRepository for FlakyTasks {
        async fn put_task(&self, task: &SearchTask) -> Result<()> {
            let n = self.puts.fetch_add(1, Ordering::SeqCst) + 1;
            if n == self.fail_on {
                return Err(LeadScoutError::Storage("disk full".into()));
            }
            self.history.lock().unwrap().push(task.status);
            self.inner.put_task(task).await
        }

        async fn get_task(&self, id: &TaskId) -> Result<Option<SearchTask>> {
            self.inner.get_task(id).await
        }

        async fn list_tasks(&self) -> Result<Vec<SearchTask>> {
            self.inner.list_tasks().await
        }
    }

    /// Records every progress value it is shown.
    #[derive(Default)]
    struct Recorder {
        progress: Mutex<Vec<f64>>,
        finished: AtomicUsize,
    }

    impl ProgressReporter for Recorder {
        fn started(&self, _task: &SearchTask) {}
        fn source_done(&self, task: &SearchTask, _report: &SourceReport) {
            self.progress.lock().unwrap().push(task.progress);
        }
        fn finished(&self, _task: &SearchTask) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn candidate(kind: SourceKind, email: &str, company: &str) -> CandidateRecord {
        CandidateRecord::new(kind, company).with_email(email)
    }

    fn context(sources: SourceRegistry, scorer: Arc<dyn Scorer>) -> (SearchContext, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let ctx = SearchContext::new(sources, scorer, store.clone(), store.clone());
        (ctx, store)
    }

    fn task(sources: Vec<SourceKind>, max_leads: usize) -> SearchTask {
        SearchTask::new("test", TargetingCriteria::default(), sources, max_leads)
    }

    fn report(task: &SearchTask) -> &leadscout_shared::SearchReport {
        match task.results_summary.as_ref() {
            Some(ResultsSummary::Completed(report)) => report,
            other => panic!("expected completed summary, got {other:?}"),
        }
    }

    // --- Tests ---

    #[test]
    fn budget_is_floor_division() {
        assert_eq!(source_budget(10, 3), 3);
        assert_eq!(source_budget(100, 2), 50);
        assert_eq!(source_budget(1, 2), 0);
        assert_eq!(source_budget(10, 0), 0);
    }

    #[tokio::test]
    async fn two_sources_with_duplicates() {
        let registry = SourceRegistry::new()
            .with(StaticSource::new(
                SourceKind::LinkedIn,
                vec![
                    candidate(SourceKind::LinkedIn, "x@y.com", "Acme"),
                    candidate(SourceKind::LinkedIn, "ann@globex.com", "Globex"),
                ],
            ))
            .with(StaticSource::new(
                SourceKind::GoogleSearch,
                vec![
                    candidate(SourceKind::GoogleSearch, "x@y.com", "Acme"),
                    candidate(SourceKind::GoogleSearch, "bo@initech.com", "Initech"),
                ],
            ));
        let (mut ctx, store) = context(registry, Arc::new(HeuristicScorer));
        let recorder = Arc::new(Recorder::default());
        ctx.progress = recorder.clone();

        let task = task(vec![SourceKind::LinkedIn, SourceKind::GoogleSearch], 4);
        let task_id = task.id;
        let done = execute_search(&ctx, task).await;

        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.progress, 100.0);
        assert_eq!(done.leads_found, 3);
        assert!(done.completed_at.is_some());
        assert_eq!(*recorder.progress.lock().unwrap(), vec![50.0, 100.0]);
        assert_eq!(recorder.finished.load(Ordering::SeqCst), 1);

        let report = report(&done);
        assert_eq!(report.raw_candidates, 4);
        assert_eq!(report.unique_candidates, 3);
        assert_eq!(report.sources.len(), 2);
        assert!(report.sources.iter().all(|s| s.budget == 2 && s.error.is_none()));

        let stored: Vec<Lead> = store
            .list_leads(&LeadFilter {
                task_id: Some(task_id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(stored.len(), 3);
        // First-seen copy of the duplicate wins.
        let acme = stored.iter().find(|l| l.company == "Acme").unwrap();
        assert_eq!(acme.source, SourceKind::LinkedIn);

        let persisted = store.get_task(&task_id).await.unwrap().unwrap();
        assert_eq!(persisted, done);
    }

    #[tokio::test]
    async fn acme_scenario() {
        let with_contact = candidate(SourceKind::LinkedIn, "x@y.com", "Acme");
        let without_contact = CandidateRecord::new(SourceKind::LinkedIn, "Acme");
        let registry = SourceRegistry::new()
            .with(Unbounded(
                SourceKind::LinkedIn,
                vec![with_contact, without_contact],
            ))
            .with(Unbounded(
                SourceKind::Database,
                vec![candidate(SourceKind::Database, "x@y.com", "Acme")],
            ));
        let (mut ctx, store) = context(registry, Arc::new(HeuristicScorer));
        let recorder = Arc::new(Recorder::default());
        ctx.progress = recorder.clone();

        let criteria = TargetingCriteria {
            industry: Some("SaaS".into()),
            job_titles: vec!["CTO".into()],
            ..Default::default()
        };
        let task = SearchTask::new(
            "acme",
            criteria,
            vec![SourceKind::LinkedIn, SourceKind::Database],
            2,
        );
        let done = execute_search(&ctx, task).await;

        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.leads_found, 2);
        assert_eq!(*recorder.progress.lock().unwrap(), vec![50.0, 100.0]);
        let report = report(&done);
        assert_eq!(report.raw_candidates, 3);
        assert_eq!(report.unique_candidates, 2);

        let stored = store.list_leads(&LeadFilter::default()).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().any(|l| l.email.as_deref() == Some("x@y.com")));
        assert!(stored.iter().any(|l| l.email.is_none()));
        assert!(stored.iter().all(|l| l.source == SourceKind::LinkedIn));
    }

    #[tokio::test]
    async fn failing_source_still_completes() {
        let registry = SourceRegistry::new().with(FailingSource(SourceKind::Api));
        let (ctx, _store) = context(registry, Arc::new(HeuristicScorer));

        let done = execute_search(&ctx, task(vec![SourceKind::Api], 10)).await;

        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.leads_found, 0);
        assert_eq!(done.progress, 100.0);
        let report = report(&done);
        assert_eq!(report.total_leads, 0);
        assert!(report.sources[0].error.as_deref().unwrap().contains("connection refused"));
        assert!(matches!(report.narrative, Narrative::Unavailable { .. }));
    }

    #[tokio::test]
    async fn panicking_source_is_isolated() {
        let registry = SourceRegistry::new()
            .with(PanickingSource(SourceKind::SocialMedia))
            .with(StaticSource::new(
                SourceKind::Database,
                vec![candidate(SourceKind::Database, "a@b.com", "B")],
            ));
        let (ctx, _store) = context(registry, Arc::new(FixedScore(70.0)));

        let done = execute_search(
            &ctx,
            task(vec![SourceKind::SocialMedia, SourceKind::Database], 10),
        )
        .await;

        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.leads_found, 1);
        assert!(report(&done).sources[0].error.is_some());
    }

    #[tokio::test]
    async fn one_progress_update_per_source_despite_failures() {
        let registry = SourceRegistry::new()
            .with(FailingSource(SourceKind::Api))
            .with(PanickingSource(SourceKind::SocialMedia))
            .with(StaticSource::new(
                SourceKind::Database,
                vec![candidate(SourceKind::Database, "a@b.com", "B")],
            ));
        let (mut ctx, _store) = context(registry, Arc::new(FixedScore(70.0)));
        let recorder = Arc::new(Recorder::default());
        ctx.progress = recorder.clone();

        let done = execute_search(
            &ctx,
            task(
                vec![SourceKind::Api, SourceKind::SocialMedia, SourceKind::Database],
                9,
            ),
        )
        .await;

        assert_eq!(done.status, TaskStatus::Completed);
        assert_eq!(done.leads_found, 1);
        let progress = recorder.progress.lock().unwrap().clone();
        assert_eq!(progress.len(), 3);
        assert!(progress.windows(2).all(|w| w[0] < w[1]), "{progress:?}");
        assert!(progress[0] > 0.0);
        assert_eq!(progress[2], 100.0);

        let errors: Vec<bool> = report(&done).sources.iter().map(|s| s.error.is_some()).collect();
        assert_eq!(errors, vec![true, true, false]);
    }

    #[tokio::test]
    async fn uneven_split_drops_remainder() {
        // 10 leads over 3 sources: each is asked for 3, so only 9 can arrive.
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SourceRegistry::new();
        for kind in [SourceKind::LinkedIn, SourceKind::Database, SourceKind::Api] {
            registry.register(BudgetRecorder {
                kind,
                seen: seen.clone(),
            });
        }
        let (ctx, _store) = context(registry, Arc::new(FixedScore(90.0)));

        let done = execute_search(
            &ctx,
            task(
                vec![SourceKind::LinkedIn, SourceKind::Database, SourceKind::Api],
                10,
            ),
        )
        .await;

        assert_eq!(*seen.lock().unwrap(), vec![3, 3, 3]);
        assert_eq!(done.leads_found, 9);
    }

    #[tokio::test]
    async fn scorer_out_of_range_is_clamped() {
        let registry = SourceRegistry::new().with(StaticSource::new(
            SourceKind::LinkedIn,
            vec![candidate(SourceKind::LinkedIn, "x@y.com", "Acme")],
        ));
        let (ctx, store) = context(registry, Arc::new(FixedScore(150.0)));

        let done = execute_search(&ctx, task(vec![SourceKind::LinkedIn], 5)).await;
        let leads = store.list_leads(&LeadFilter::default()).await.unwrap();
        assert_eq!(done.leads_found, 1);
        assert_eq!(leads[0].quality_score, 100.0);
        assert_eq!(leads[0].quality_tier, leadscout_shared::QualityTier::Hot);
        assert_eq!(report(&done).tiers.hot, 1);
    }

    #[tokio::test]
    async fn persistence_failure_fails_task_with_last_progress() {
        let registry = SourceRegistry::new()
            .with(StaticSource::new(SourceKind::LinkedIn, vec![]))
            .with(StaticSource::new(SourceKind::Database, vec![]));
        // 1: running, 2: first source, 3: second source.
        let tasks = Arc::new(FlakyTasks::failing_on(3));
        let leads = Arc::new(MemoryStore::new());
        let ctx = SearchContext::new(registry, Arc::new(HeuristicScorer), tasks.clone(), leads);

        let task = task(vec![SourceKind::LinkedIn, SourceKind::Database], 10);
        let task_id = task.id;
        let done = execute_search(&ctx, task).await;

        assert_eq!(done.status, TaskStatus::Failed);
        assert_eq!(done.progress, 50.0);
        let persisted = tasks.get_task(&task_id).await.unwrap().unwrap();
        assert_eq!(persisted.status, TaskStatus::Failed);
        assert_eq!(persisted.progress, 50.0);
        assert!(matches!(
            persisted.results_summary,
            Some(ResultsSummary::Failed { ref error }) if error.contains("disk full")
        ));
    }

    #[tokio::test]
    async fn failure_after_sourcing_keeps_full_progress() {
        let registry = SourceRegistry::new().with(StaticSource::new(SourceKind::LinkedIn, vec![]));
        // 1: running, 2: progress, 3: completion.
        let tasks = Arc::new(FlakyTasks::failing_on(3));
        let ctx = SearchContext::new(
            registry,
            Arc::new(HeuristicScorer),
            tasks.clone(),
            Arc::new(MemoryStore::new()),
        );

        let done = execute_search(&ctx, task(vec![SourceKind::LinkedIn], 10)).await;
        assert_eq!(done.status, TaskStatus::Failed);
        assert_eq!(done.progress, 100.0);
    }

    #[tokio::test]
    async fn failure_before_start_still_passes_through_running() {
        let registry = SourceRegistry::new().with(StaticSource::new(SourceKind::LinkedIn, vec![]));
        // The `running` checkpoint itself is rejected.
        let tasks = Arc::new(FlakyTasks::failing_on(1));
        let ctx = SearchContext::new(
            registry,
            Arc::new(HeuristicScorer),
            tasks.clone(),
            Arc::new(MemoryStore::new()),
        );

        let task = task(vec![SourceKind::LinkedIn], 10);
        let task_id = task.id;
        let done = execute_search(&ctx, task).await;

        assert_eq!(done.status, TaskStatus::Failed);
        assert_eq!(done.progress, 0.0);
        assert_eq!(
            *tasks.history.lock().unwrap(),
            vec![TaskStatus::Running, TaskStatus::Failed]
        );
        let persisted = tasks.get_task(&task_id).await.unwrap().unwrap();
        assert_eq!(persisted.status, TaskStatus::Failed);
    }
}
