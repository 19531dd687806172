//! Persistence for search tasks and leads.
//!
//! Pipeline code talks to the [`TaskRepository`] and [`LeadRepository`]
//! traits. Two implementations ship here:
//! - [`MemoryStore`]: process-local maps, for embedding and tests
//! - [`Storage`]: a libSQL (Turso Embedded) database file
//!
//! **Access rules for [`Storage`]:**
//! - search runs: read-write via [`Storage::open`]
//! - query-only commands: read-only via [`Storage::open_readonly`]

mod memory;
mod migrations;
mod repository;

use std::path::Path;

use async_trait::async_trait;
use leadscout_shared::{Lead, LeadFilter, LeadId, LeadScoutError, Result, SearchTask, TaskId};
use libsql::{Connection, Database, params};

pub use memory::MemoryStore;
pub use repository::{LeadRepository, TaskRepository};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LeadScoutError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LeadScoutError::Storage(format!(
                "no database at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        LeadScoutError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(LeadScoutError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    /// Run a query whose first column is a JSON document and decode each row.
    async fn query_json<T: serde::de::DeserializeOwned>(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<T>> {
        let mut rows = self.conn.query(sql, params).await.map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            let json: String = row.get(0).map_err(storage_err)?;
            let value = serde_json::from_str(&json)
                .map_err(|e| LeadScoutError::Storage(format!("corrupt row: {e}")))?;
            results.push(value);
        }
        Ok(results)
    }
}

// ---------------------------------------------------------------------------
// Task operations
// ---------------------------------------------------------------------------

#[async_trait]
impl TaskRepository for Storage {
    async fn put_task(&self, task: &SearchTask) -> Result<()> {
        self.check_writable()?;
        let task_json = to_json(task)?;
        self.conn
            .execute(
                "INSERT INTO search_tasks (id, name, status, progress, leads_found, created_at, completed_at, task_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(id) DO UPDATE SET
                   status = excluded.status,
                   progress = excluded.progress,
                   leads_found = excluded.leads_found,
                   completed_at = excluded.completed_at,
                   task_json = excluded.task_json",
                params![
                    task.id.to_string(),
                    task.name.as_str(),
                    task.status.as_str(),
                    task.progress,
                    task.leads_found as i64,
                    task.created_at.to_rfc3339(),
                    task.completed_at.map(|t| t.to_rfc3339()),
                    task_json,
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Option<SearchTask>> {
        let mut found = self
            .query_json(
                "SELECT task_json FROM search_tasks WHERE id = ?1",
                params![id.to_string()],
            )
            .await?;
        Ok(found.pop())
    }

    async fn list_tasks(&self) -> Result<Vec<SearchTask>> {
        self.query_json(
            "SELECT task_json FROM search_tasks ORDER BY created_at, id",
            params![],
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Lead operations
// ---------------------------------------------------------------------------

#[async_trait]
impl LeadRepository for Storage {
    async fn put_lead(&self, lead: &Lead) -> Result<()> {
        self.check_writable()?;
        let lead_json = to_json(lead)?;
        self.conn
            .execute(
                "INSERT INTO leads (id, task_id, quality_score, quality_tier, status, source, created_at, updated_at, lead_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                   status = excluded.status,
                   updated_at = excluded.updated_at,
                   lead_json = excluded.lead_json",
                params![
                    lead.id.to_string(),
                    lead.task_id.to_string(),
                    lead.quality_score,
                    lead.quality_tier.as_str(),
                    lead.status.as_str(),
                    lead.source.as_str(),
                    lead.created_at.to_rfc3339(),
                    lead.updated_at.to_rfc3339(),
                    lead_json,
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn get_lead(&self, id: &LeadId) -> Result<Option<Lead>> {
        let mut found = self
            .query_json(
                "SELECT lead_json FROM leads WHERE id = ?1",
                params![id.to_string()],
            )
            .await?;
        Ok(found.pop())
    }

    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>> {
        // SQLite treats a negative LIMIT as "no limit".
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        self.query_json(
            "SELECT lead_json FROM leads
             WHERE (?1 IS NULL OR quality_tier = ?1)
               AND (?2 IS NULL OR status = ?2)
               AND (?3 IS NULL OR source = ?3)
               AND (?4 IS NULL OR task_id = ?4)
             ORDER BY quality_score DESC, id ASC
             LIMIT ?5",
            params![
                filter.tier.map(|t| t.as_str()),
                filter.status.map(|s| s.as_str()),
                filter.source.map(|s| s.as_str()),
                filter.task_id.map(|id| id.to_string()),
                limit,
            ],
        )
        .await
    }
}

fn storage_err(e: libsql::Error) -> LeadScoutError {
    LeadScoutError::Storage(e.to_string())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| LeadScoutError::Storage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscout_shared::{
        CandidateRecord, LeadStatus, QualityTier, SourceKind, TargetingCriteria, TaskStatus,
    };
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("ls_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn lead(task_id: TaskId, company: &str, score: f64) -> Lead {
        let candidate = CandidateRecord::new(SourceKind::LinkedIn, company)
            .with_email(format!("ceo@{}.com", company.to_lowercase()));
        Lead::from_candidate(candidate, task_id, score)
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let version = storage.get_schema_version().await;
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("ls_test_{}.db", Uuid::now_v7()));
        let _s1 = Storage::open(&tmp).await.expect("first open");
        drop(_s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn task_lifecycle_persists() {
        let storage = test_storage().await;
        let criteria = TargetingCriteria {
            industry: Some("SaaS".into()),
            job_titles: vec!["CTO".into()],
            ..Default::default()
        };
        let mut task = SearchTask::new("saas-ctos", criteria, vec![SourceKind::LinkedIn], 10);
        storage.put_task(&task).await.expect("insert task");

        task.mark_running().unwrap();
        task.advance_progress(100.0);
        storage.put_task(&task).await.expect("update task");

        let found = storage
            .get_task(&task.id)
            .await
            .expect("get task")
            .expect("task exists");
        assert_eq!(found.status, TaskStatus::Running);
        assert_eq!(found.progress, 100.0);
        assert_eq!(found.criteria.industry.as_deref(), Some("SaaS"));

        let tasks = storage.list_tasks().await.expect("list tasks");
        assert_eq!(tasks.len(), 1);
        assert!(storage.get_task(&TaskId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn lead_upsert_and_query() {
        let storage = test_storage().await;
        let task_id = TaskId::new();
        let mut acme = lead(task_id, "Acme", 55.0);
        storage.put_lead(&acme).await.expect("insert lead");
        storage
            .put_lead(&lead(task_id, "Globex", 91.0))
            .await
            .expect("insert lead");
        storage
            .put_lead(&lead(TaskId::new(), "Initech", 72.0))
            .await
            .expect("insert lead");

        acme.status = LeadStatus::Contacted;
        acme.contact_attempts = 1;
        storage.put_lead(&acme).await.expect("update lead");

        let found = storage.get_lead(&acme.id).await.unwrap().unwrap();
        assert_eq!(found.status, LeadStatus::Contacted);
        assert_eq!(found.contact_attempts, 1);

        let all = storage.list_leads(&LeadFilter::default()).await.unwrap();
        let companies: Vec<&str> = all.iter().map(|l| l.company.as_str()).collect();
        assert_eq!(companies, vec!["Globex", "Initech", "Acme"]);

        let for_task = storage
            .list_leads(&LeadFilter {
                task_id: Some(task_id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(for_task.len(), 2);

        let hot = storage
            .list_leads(&LeadFilter {
                tier: Some(QualityTier::Hot),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].company, "Globex");

        let contacted = storage
            .list_leads(&LeadFilter {
                status: Some(LeadStatus::Contacted),
                limit: Some(5),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(contacted.len(), 1);

        let top_one = storage
            .list_leads(&LeadFilter {
                limit: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(top_one.len(), 1);
        assert_eq!(top_one[0].company, "Globex");
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("ls_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        rw.put_lead(&lead(TaskId::new(), "Acme", 80.0)).await.unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert_eq!(ro.list_leads(&LeadFilter::default()).await.unwrap().len(), 1);
        let result = ro.put_lead(&lead(TaskId::new(), "Globex", 80.0)).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }

    #[tokio::test]
    async fn readonly_requires_existing_file() {
        let tmp = std::env::temp_dir().join(format!("ls_missing_{}.db", Uuid::now_v7()));
        assert!(Storage::open_readonly(&tmp).await.is_err());
    }
}
