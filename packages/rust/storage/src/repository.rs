//! Repository interfaces the discovery pipeline persists through.
//!
//! Pipeline code only sees these traits, so the in-memory store and the
//! libSQL store are interchangeable.

use async_trait::async_trait;
use leadscout_shared::{Lead, LeadFilter, LeadId, Result, SearchTask, TaskId};

/// Keyed persistence for search tasks.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Insert or replace the task keyed by `task.id`.
    async fn put_task(&self, task: &SearchTask) -> Result<()>;

    async fn get_task(&self, id: &TaskId) -> Result<Option<SearchTask>>;

    /// All tasks, oldest first.
    async fn list_tasks(&self) -> Result<Vec<SearchTask>>;
}

/// Keyed persistence for accepted leads.
#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Insert or replace the lead keyed by `lead.id`.
    async fn put_lead(&self, lead: &Lead) -> Result<()>;

    async fn get_lead(&self, id: &LeadId) -> Result<Option<Lead>>;

    /// Leads passing `filter`, highest `quality_score` first (ties keep
    /// creation order), truncated to `filter.limit` when set.
    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>>;
}
