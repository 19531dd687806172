//! Core domain types for LeadScout: targeting profiles, candidates, leads,
//! and search tasks.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LeadScoutError, Result};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new time-sortable identifier.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

uuid_id!(
    /// A UUID v7 identifier for a search task.
    TaskId
);

uuid_id!(
    /// A UUID v7 identifier for an accepted lead.
    LeadId
);

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// The data-origin kinds a search can draw candidates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    WebsiteScraping,
    #[serde(rename = "linkedin")]
    LinkedIn,
    GoogleSearch,
    SocialMedia,
    Database,
    Api,
}

impl SourceKind {
    /// Every known source kind, in declaration order.
    pub const ALL: [SourceKind; 6] = [
        Self::WebsiteScraping,
        Self::LinkedIn,
        Self::GoogleSearch,
        Self::SocialMedia,
        Self::Database,
        Self::Api,
    ];

    /// Stable tag used in config, storage, and CLI flags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WebsiteScraping => "website_scraping",
            Self::LinkedIn => "linkedin",
            Self::GoogleSearch => "google_search",
            Self::SocialMedia => "social_media",
            Self::Database => "database",
            Self::Api => "api",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = LeadScoutError;

    fn from_str(s: &str) -> Result<Self> {
        let tag = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == tag)
            .ok_or_else(|| LeadScoutError::validation(format!("unrecognized source tag '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// TargetingCriteria
// ---------------------------------------------------------------------------

/// Company headcount buckets used for targeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanySize {
    #[serde(rename = "1-10")]
    Micro,
    #[serde(rename = "11-50")]
    Small,
    #[serde(rename = "51-200")]
    Medium,
    #[serde(rename = "201-1000")]
    Large,
    #[serde(rename = "1000+")]
    Enterprise,
}

impl CompanySize {
    /// The bucket label, e.g. `"51-200"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Micro => "1-10",
            Self::Small => "11-50",
            Self::Medium => "51-200",
            Self::Large => "201-1000",
            Self::Enterprise => "1000+",
        }
    }
}

impl std::fmt::Display for CompanySize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CompanySize {
    type Err = LeadScoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "1-10" => Ok(Self::Micro),
            "11-50" => Ok(Self::Small),
            "51-200" => Ok(Self::Medium),
            "201-1000" => Ok(Self::Large),
            "1000+" => Ok(Self::Enterprise),
            other => Err(LeadScoutError::validation(format!(
                "unknown company size bucket '{other}': expected 1-10, 11-50, 51-200, 201-1000, or 1000+"
            ))),
        }
    }
}

/// The targeting profile of a search. Immutable once a task is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetingCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_size: Option<CompanySize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub job_titles: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_range: Option<String>,
    #[serde(default = "default_exclude_competitors")]
    pub exclude_competitors: bool,
}

fn default_exclude_competitors() -> bool {
    true
}

impl Default for TargetingCriteria {
    fn default() -> Self {
        Self {
            industry: None,
            company_size: None,
            location: None,
            job_titles: Vec::new(),
            keywords: Vec::new(),
            technologies: Vec::new(),
            revenue_range: None,
            exclude_competitors: default_exclude_competitors(),
        }
    }
}

// ---------------------------------------------------------------------------
// CandidateRecord
// ---------------------------------------------------------------------------

/// A raw, unscored contact/company tuple as returned by a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// Primary contact channel; also half of the dedup identity key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
    #[serde(default)]
    pub company: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linkedin_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source: SourceKind,
}

impl CandidateRecord {
    /// A bare candidate for `company` found via `source`.
    pub fn new(source: SourceKind, company: impl Into<String>) -> Self {
        Self {
            first_name: String::new(),
            last_name: String::new(),
            email: None,
            phone: None,
            job_title: None,
            company: company.into(),
            company_website: None,
            company_size: None,
            industry: None,
            location: None,
            linkedin_url: None,
            notes: None,
            tags: Vec::new(),
            source,
        }
    }

    pub fn with_name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = first.into();
        self.last_name = last.into();
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_job_title(mut self, title: impl Into<String>) -> Self {
        self.job_title = Some(title.into());
        self
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    /// Display name, falling back to the email, then the company.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if !full.is_empty() {
            full.to_string()
        } else if let Some(email) = &self.email {
            email.clone()
        } else {
            self.company.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Lead
// ---------------------------------------------------------------------------

/// Follow-up lifecycle of an accepted lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Qualified,
    Contacted,
    Interested,
    NotInterested,
    Converted,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Qualified => "qualified",
            Self::Contacted => "contacted",
            Self::Interested => "interested",
            Self::NotInterested => "not_interested",
            Self::Converted => "converted",
        }
    }
}

impl std::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LeadStatus {
    type Err = LeadScoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "qualified" => Ok(Self::Qualified),
            "contacted" => Ok(Self::Contacted),
            "interested" => Ok(Self::Interested),
            "not_interested" | "not-interested" => Ok(Self::NotInterested),
            "converted" => Ok(Self::Converted),
            other => Err(LeadScoutError::validation(format!(
                "unknown lead status '{other}'"
            ))),
        }
    }
}

/// Quality bucket derived from a lead's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Hot,
    Warm,
    Cold,
    Unqualified,
}

impl QualityTier {
    /// Fixed thresholds: hot ≥ 80, warm ≥ 60, cold ≥ 40, else unqualified.
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            Self::Hot
        } else if score >= 60.0 {
            Self::Warm
        } else if score >= 40.0 {
            Self::Cold
        } else {
            Self::Unqualified
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Cold => "cold",
            Self::Unqualified => "unqualified",
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QualityTier {
    type Err = LeadScoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hot" => Ok(Self::Hot),
            "warm" => Ok(Self::Warm),
            "cold" => Ok(Self::Cold),
            "unqualified" => Ok(Self::Unqualified),
            other => Err(LeadScoutError::validation(format!(
                "unknown quality tier '{other}'"
            ))),
        }
    }
}

/// An accepted, scored candidate persisted for follow-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    /// The search task whose run created this lead.
    pub task_id: TaskId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub job_title: Option<String>,
    pub company: String,
    pub company_website: Option<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub linkedin_url: Option<String>,
    pub source: SourceKind,
    pub quality_score: f64,
    pub quality_tier: QualityTier,
    pub status: LeadStatus,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub contact_attempts: u32,
    pub last_contacted: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub custom_fields: BTreeMap<String, serde_json::Value>,
}

impl Lead {
    /// Accept `candidate` with an already-clamped `score`. The tier is derived
    /// from the score and never recomputed.
    pub fn from_candidate(candidate: CandidateRecord, task_id: TaskId, score: f64) -> Self {
        let now = Utc::now();
        Self {
            id: LeadId::new(),
            task_id,
            first_name: candidate.first_name,
            last_name: candidate.last_name,
            email: candidate.email,
            phone: candidate.phone,
            job_title: candidate.job_title,
            company: candidate.company,
            company_website: candidate.company_website,
            company_size: candidate.company_size,
            industry: candidate.industry,
            location: candidate.location,
            linkedin_url: candidate.linkedin_url,
            source: candidate.source,
            quality_score: score,
            quality_tier: QualityTier::from_score(score),
            status: LeadStatus::New,
            notes: candidate.notes,
            tags: candidate.tags,
            contact_attempts: 0,
            last_contacted: None,
            created_at: now,
            updated_at: now,
            custom_fields: BTreeMap::new(),
        }
    }
}

/// Query filters for listing leads. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadFilter {
    pub tier: Option<QualityTier>,
    pub status: Option<LeadStatus>,
    pub source: Option<SourceKind>,
    pub task_id: Option<TaskId>,
    pub limit: Option<usize>,
}

impl LeadFilter {
    /// Whether `lead` passes every set filter (ignores `limit`).
    pub fn matches(&self, lead: &Lead) -> bool {
        self.tier.is_none_or(|t| lead.quality_tier == t)
            && self.status.is_none_or(|s| lead.status == s)
            && self.source.is_none_or(|s| lead.source == s)
            && self.task_id.is_none_or(|id| lead.task_id == id)
    }
}

// ---------------------------------------------------------------------------
// SearchTask
// ---------------------------------------------------------------------------

/// Life-cycle state of a search task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// pending → running → {completed, failed}.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = LeadScoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(LeadScoutError::parse(format!("unknown task status '{other}'"))),
        }
    }
}

/// One execution of the discovery pipeline against one targeting profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTask {
    pub id: TaskId,
    pub name: String,
    pub criteria: TargetingCriteria,
    pub sources: Vec<SourceKind>,
    pub max_leads: usize,
    pub status: TaskStatus,
    /// Percentage in `[0, 100]`; never decreases.
    pub progress: f64,
    pub leads_found: usize,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results_summary: Option<ResultsSummary>,
}

impl SearchTask {
    /// A fresh `pending` task.
    pub fn new(
        name: impl Into<String>,
        criteria: TargetingCriteria,
        sources: Vec<SourceKind>,
        max_leads: usize,
    ) -> Self {
        Self {
            id: TaskId::new(),
            name: name.into(),
            criteria,
            sources,
            max_leads,
            status: TaskStatus::Pending,
            progress: 0.0,
            leads_found: 0,
            created_at: Utc::now(),
            completed_at: None,
            results_summary: None,
        }
    }

    fn transition(&mut self, next: TaskStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(LeadScoutError::validation(format!(
                "task {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn mark_running(&mut self) -> Result<()> {
        self.transition(TaskStatus::Running)
    }

    /// Raise progress to `percent` (clamped to 100). Lower values are ignored.
    pub fn advance_progress(&mut self, percent: f64) {
        let percent = percent.min(100.0);
        if percent > self.progress {
            self.progress = percent;
        }
    }

    pub fn mark_completed(&mut self, leads_found: usize, report: SearchReport) -> Result<()> {
        self.transition(TaskStatus::Completed)?;
        self.progress = 100.0;
        self.leads_found = leads_found;
        self.completed_at = Some(Utc::now());
        self.results_summary = Some(ResultsSummary::Completed(report));
        Ok(())
    }

    /// Terminal failure. Progress stays at its last value.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<()> {
        self.transition(TaskStatus::Failed)?;
        self.completed_at = Some(Utc::now());
        self.results_summary = Some(ResultsSummary::Failed {
            error: error.into(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Results summary
// ---------------------------------------------------------------------------

/// What a finished task reports back through `results_summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResultsSummary {
    Completed(SearchReport),
    Failed { error: String },
}

/// Aggregate report over the leads accepted by one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    /// Candidates returned by all sources before dedup.
    pub raw_candidates: usize,
    /// Candidates remaining after dedup.
    pub unique_candidates: usize,
    pub total_leads: usize,
    pub tiers: TierCounts,
    pub average_score: f64,
    pub top_companies: Vec<CompanyCount>,
    /// One entry per requested source, in request order.
    pub sources: Vec<SourceReport>,
    pub narrative: Narrative,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub hot: usize,
    pub warm: usize,
    pub cold: usize,
    pub unqualified: usize,
}

impl TierCounts {
    pub fn record(&mut self, tier: QualityTier) {
        match tier {
            QualityTier::Hot => self.hot += 1,
            QualityTier::Warm => self.warm += 1,
            QualityTier::Cold => self.cold += 1,
            QualityTier::Unqualified => self.unqualified += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyCount {
    pub company: String,
    pub leads: usize,
}

/// Contribution of a single source attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: SourceKind,
    /// Result budget the source was asked for.
    pub budget: usize,
    pub candidates: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// LLM narrative analysis, or an explicit marker that none is available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Narrative {
    Available { analysis: serde_json::Value },
    Unavailable { reason: String },
}

impl Narrative {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}
