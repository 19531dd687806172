//! The public entry point for search tasks: validate, persist, dispatch.

use std::sync::Arc;
use std::time::Duration;

use leadscout_shared::{
    LeadScoutError, Result, SearchTask, SourceKind, TargetingCriteria, TaskId,
};
use leadscout_sources::SourceRegistry;
use leadscout_storage::{LeadRepository, TaskRepository};
use tracing::{error, info, instrument};

use crate::leads::LeadStore;
use crate::pipeline::{self, ProgressReporter, SearchContext};
use crate::qualify::clamp_score;
use crate::scoring::Scorer;
use crate::summary::Summarizer;
use crate::supervisor::TaskSupervisor;

/// Builder for [`Orchestrator`].
pub struct OrchestratorBuilder {
    ctx: SearchContext,
}

impl OrchestratorBuilder {
    pub fn summarizer(mut self, summarizer: Arc<dyn Summarizer>) -> Self {
        self.ctx.summarizer = Some(summarizer);
        self
    }

    pub fn progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.ctx.progress = progress;
        self
    }

    /// Score used when the scorer fails. Out-of-range values are clamped.
    pub fn neutral_score(mut self, score: f64) -> Self {
        if let Some(score) = clamp_score(score) {
            self.ctx.neutral_score = score;
        }
        self
    }

    pub fn build(self) -> Orchestrator {
        Orchestrator {
            ctx: Arc::new(self.ctx),
            supervisor: Arc::new(TaskSupervisor::new()),
        }
    }
}

/// Accepts search requests and runs each one in the background.
///
/// `create_task` returns as soon as the pending task is stored; callers
/// follow the run through [`get_task`](Self::get_task).
pub struct Orchestrator {
    ctx: Arc<SearchContext>,
    supervisor: Arc<TaskSupervisor>,
}

impl Orchestrator {
    pub fn builder(
        sources: SourceRegistry,
        scorer: Arc<dyn Scorer>,
        tasks: Arc<dyn TaskRepository>,
        leads: Arc<dyn LeadRepository>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            ctx: SearchContext::new(sources, scorer, tasks, leads),
        }
    }

    /// Validate a request, persist it as `pending`, and start its run.
    ///
    /// Fails without persisting anything when `sources` is empty or names
    /// an unregistered kind.
    #[instrument(skip(self, criteria))]
    pub async fn create_task(
        &self,
        name: &str,
        criteria: TargetingCriteria,
        sources: Vec<SourceKind>,
        max_leads: usize,
    ) -> Result<SearchTask> {
        self.ctx.sources.validate(&sources)?;

        let task = SearchTask::new(name, criteria, sources, max_leads);
        self.ctx.tasks.put_task(&task).await?;
        info!(task_id = %task.id, "search task created");

        self.dispatch(task.clone())?;
        Ok(task)
    }

    /// Start the background run of a stored `pending` task.
    fn dispatch(&self, task: SearchTask) -> Result<()> {
        let id = task.id;
        let ctx = Arc::clone(&self.ctx);
        let recovery_repo = Arc::clone(&self.ctx.tasks);

        self.supervisor.submit(
            id,
            async move {
                pipeline::execute_search(&ctx, task).await;
            },
            move |exit| async move {
                let reason = exit.describe();
                match recovery_repo.get_task(&id).await {
                    Ok(Some(mut task)) => {
                        if let Err(e) =
                            pipeline::fail_task(recovery_repo.as_ref(), &mut task, reason).await
                        {
                            error!(task_id = %id, error = %e, "could not record task failure");
                        }
                    }
                    Ok(None) => error!(task_id = %id, "task vanished before recovery"),
                    Err(e) => error!(task_id = %id, error = %e, "could not reload task"),
                }
            },
        )
    }

    /// Current stored state of a task.
    pub async fn get_task(&self, id: &TaskId) -> Result<SearchTask> {
        self.ctx
            .tasks
            .get_task(id)
            .await?
            .ok_or_else(|| LeadScoutError::task_not_found(id))
    }

    pub async fn list_tasks(&self) -> Result<Vec<SearchTask>> {
        self.ctx.tasks.list_tasks().await
    }

    /// Abort a running task; it is recorded as failed. Returns `false` when
    /// no run is in flight for `id`.
    pub fn cancel(&self, id: &TaskId) -> bool {
        self.supervisor.cancel(id)
    }

    /// Poll until the task is terminal.
    pub async fn wait_for_terminal(&self, id: &TaskId, poll: Duration) -> Result<SearchTask> {
        loop {
            let task = self.get_task(id).await?;
            if task.status.is_terminal() {
                return Ok(task);
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Lead operations over the same lead repository.
    pub fn leads(&self) -> LeadStore {
        LeadStore::new(Arc::clone(&self.ctx.leads))
    }
}
