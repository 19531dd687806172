//! In-memory repository backed by ordered maps.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use leadscout_shared::{Lead, LeadFilter, LeadId, Result, SearchTask, TaskId};

use crate::repository::{LeadRepository, TaskRepository};

/// Process-local store for tasks and leads.
///
/// Ids are UUID v7, so map order is creation order.
#[derive(Default)]
pub struct MemoryStore {
    tasks: RwLock<BTreeMap<TaskId, SearchTask>>,
    leads: RwLock<BTreeMap<LeadId, Lead>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn put_task(&self, task: &SearchTask) -> Result<()> {
        self.tasks
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(task.id, task.clone());
        Ok(())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<SearchTask>> {
        Ok(self
            .tasks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned())
    }

    async fn list_tasks(&self) -> Result<Vec<SearchTask>> {
        Ok(self
            .tasks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LeadRepository for MemoryStore {
    async fn put_lead(&self, lead: &Lead) -> Result<()> {
        self.leads
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(lead.id, lead.clone());
        Ok(())
    }

    async fn get_lead(&self, id: &LeadId) -> Result<Option<Lead>> {
        Ok(self
            .leads
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned())
    }

    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>> {
        let mut leads: Vec<Lead> = self
            .leads
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();

        // Stable sort keeps creation order among equal scores.
        leads.sort_by(|a, b| b.quality_score.total_cmp(&a.quality_score));
        if let Some(limit) = filter.limit {
            leads.truncate(limit);
        }
        Ok(leads)
    }
}
