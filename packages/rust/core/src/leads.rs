//! Lead queries and follow-up status updates.

use std::sync::Arc;

use chrono::Utc;
use leadscout_shared::{Lead, LeadFilter, LeadId, LeadScoutError, LeadStatus, Result};
use leadscout_storage::LeadRepository;
use tracing::info;

use crate::export::{self, ExportFormat};

/// Lead operations over a [`LeadRepository`].
#[derive(Clone)]
pub struct LeadStore {
    repo: Arc<dyn LeadRepository>,
}

impl LeadStore {
    pub fn new(repo: Arc<dyn LeadRepository>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: &LeadId) -> Result<Lead> {
        self.repo
            .get_lead(id)
            .await?
            .ok_or_else(|| LeadScoutError::lead_not_found(id))
    }

    /// Leads passing `filter`, best score first.
    pub async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>> {
        self.repo.list_leads(filter).await
    }

    /// Move a lead to `status`.
    ///
    /// `contacted` counts as a contact attempt and stamps `last_contacted`.
    /// Non-empty `notes` replace any existing notes.
    pub async fn update_status(
        &self,
        id: &LeadId,
        status: LeadStatus,
        notes: Option<String>,
    ) -> Result<Lead> {
        let mut lead = self.get(id).await?;
        let now = Utc::now();

        lead.status = status;
        if status == LeadStatus::Contacted {
            lead.contact_attempts += 1;
            lead.last_contacted = Some(now);
        }
        if let Some(notes) = notes.filter(|n| !n.is_empty()) {
            lead.notes = Some(notes);
        }
        lead.updated_at = now;

        self.repo.put_lead(&lead).await?;
        info!(lead_id = %id, %status, attempts = lead.contact_attempts, "lead status updated");
        Ok(lead)
    }

    /// Serialize the leads passing `filter`.
    pub async fn export(
        &self,
        filter: &LeadFilter,
        format: ExportFormat,
        fields: Option<&[String]>,
    ) -> Result<String> {
        let leads = self.list(filter).await?;
        export::export_leads(&leads, format, fields)
    }
}
