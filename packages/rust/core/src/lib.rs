//! Lead discovery engine for LeadScout.
//!
//! This crate ties sources, scoring, and persistence together: the
//! [`Orchestrator`] accepts a search request, stores it as a pending task,
//! and runs it in the background through [`pipeline::execute_search`]
//! (sources → dedup → qualify → summarize). [`LeadStore`] serves the
//! resulting leads.

pub mod dedup;
pub mod export;
pub mod leads;
pub mod openrouter;
pub mod orchestrator;
pub mod pipeline;
pub mod qualify;
pub mod scoring;
pub mod summary;
pub mod supervisor;

pub use export::{DEFAULT_FIELDS, ExportFormat, export_leads};
pub use leads::LeadStore;
pub use openrouter::OpenRouterClient;
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use pipeline::{ProgressReporter, SearchContext, SilentProgress, execute_search};
pub use scoring::{HeuristicScorer, Scorer};
pub use summary::Summarizer;
pub use supervisor::{AbnormalExit, TaskSupervisor};
