//! SQL migration definitions for the LeadScout database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: search_tasks, leads",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Search tasks. Queryable columns are mirrored out of task_json.
CREATE TABLE IF NOT EXISTS search_tasks (
    id           TEXT PRIMARY KEY,
    name         TEXT NOT NULL,
    status       TEXT NOT NULL,
    progress     REAL NOT NULL,
    leads_found  INTEGER NOT NULL,
    created_at   TEXT NOT NULL,
    completed_at TEXT,
    task_json    TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_search_tasks_created ON search_tasks(created_at);

-- Accepted leads. Filter/sort columns are mirrored out of lead_json.
CREATE TABLE IF NOT EXISTS leads (
    id            TEXT PRIMARY KEY,
    task_id       TEXT NOT NULL,
    quality_score REAL NOT NULL,
    quality_tier  TEXT NOT NULL,
    status        TEXT NOT NULL,
    source        TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    lead_json     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_leads_task_id ON leads(task_id);
CREATE INDEX IF NOT EXISTS idx_leads_score ON leads(quality_score DESC);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
