//! Background execution of search runs.
//!
//! Every accepted task gets exactly one supervised execution. A second
//! submission for the same id is refused for the lifetime of the
//! supervisor, whether or not the first run has finished.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use leadscout_shared::{LeadScoutError, Result, TaskId};
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// How a supervised execution ended when it did not return normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbnormalExit {
    /// The execution panicked with this message.
    Panicked(String),
    /// The execution was aborted via [`TaskSupervisor::cancel`].
    Cancelled,
}

impl AbnormalExit {
    /// Failure description recorded on the task.
    pub fn describe(&self) -> String {
        match self {
            Self::Panicked(message) => format!("execution panicked: {message}"),
            Self::Cancelled => "execution cancelled".to_string(),
        }
    }
}

#[derive(Default)]
struct State {
    /// Every id ever submitted. Never pruned, so it grows by one entry per
    /// task for the life of the supervisor; long-lived embedders should
    /// scope a supervisor to a bounded batch of tasks.
    claimed: HashSet<TaskId>,
    running: HashMap<TaskId, AbortHandle>,
}

/// Spawns executions, tracks them by task id, and routes panics and
/// cancellations to a recovery callback.
#[derive(Default)]
pub struct TaskSupervisor {
    state: Mutex<State>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start `work` for task `id` in the background.
    ///
    /// If `work` panics or is cancelled, `recover` runs with the reason so
    /// the task can still be moved to a terminal state.
    pub fn submit<W, R, RF>(self: &Arc<Self>, id: TaskId, work: W, recover: R) -> Result<()>
    where
        W: Future<Output = ()> + Send + 'static,
        R: FnOnce(AbnormalExit) -> RF + Send + 'static,
        RF: Future<Output = ()> + Send + 'static,
    {
        let mut state = self.state();
        if !state.claimed.insert(id) {
            return Err(LeadScoutError::DuplicateExecution(id.to_string()));
        }

        let handle = tokio::spawn(work);
        state.running.insert(id, handle.abort_handle());
        drop(state);
        debug!(task_id = %id, "execution started");

        let supervisor = Arc::clone(self);
        tokio::spawn(async move {
            let exit = match handle.await {
                Ok(()) => None,
                Err(e) if e.is_cancelled() => Some(AbnormalExit::Cancelled),
                Err(e) => Some(AbnormalExit::Panicked(panic_message(e.into_panic()))),
            };
            supervisor.state().running.remove(&id);

            if let Some(exit) = exit {
                warn!(task_id = %id, reason = %exit.describe(), "execution ended abnormally");
                recover(exit).await;
            }
        });

        Ok(())
    }

    /// Abort the execution of `id`. Returns `false` if it is not running.
    pub fn cancel(&self, id: &TaskId) -> bool {
        match self.state().running.get(id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, id: &TaskId) -> bool {
        self.state().running.contains_key(id)
    }

    /// Number of executions still in flight.
    pub fn active(&self) -> usize {
        self.state().running.len()
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
