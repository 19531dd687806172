//! Shared types, error model, and configuration for LeadScout.
//!
//! This crate is the foundation depended on by all other LeadScout crates.
//! It provides:
//! - [`LeadScoutError`]: the unified error type
//! - Domain types ([`TargetingCriteria`], [`CandidateRecord`], [`Lead`], [`SearchTask`])
//! - Configuration ([`AppConfig`], [`DiscoveryConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, DiscoveryConfig, OpenRouterConfig, ScoringConfig, ScoringMode,
    SourcesConfig, config_dir, config_file_path, expand_home, init_config, load_config,
    load_config_from, resolve_api_key,
};
pub use error::{LeadScoutError, Result};
pub use types::{
    CandidateRecord, CompanyCount, CompanySize, Lead, LeadFilter, LeadId, LeadStatus, Narrative,
    QualityTier, ResultsSummary, SearchReport, SearchTask, SourceKind, SourceReport,
    TargetingCriteria, TaskId, TaskStatus, TierCounts,
};
