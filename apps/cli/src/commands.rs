//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use leadscout_core::{
    ExportFormat, HeuristicScorer, LeadStore, OpenRouterClient, Orchestrator, ProgressReporter,
    Scorer, Summarizer,
};
use leadscout_shared::{
    AppConfig, CompanySize, DiscoveryConfig, Lead, LeadFilter, LeadId, LeadStatus, Narrative,
    QualityTier, ResultsSummary, ScoringMode, SearchReport, SearchTask, SourceKind, SourceReport,
    TargetingCriteria, TaskId, expand_home, init_config, load_config, load_config_from,
    resolve_api_key,
};
use leadscout_sources::{FixtureSource, SourceRegistry};
use leadscout_storage::{Storage, TaskRepository};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// LeadScout: find and track sales leads.
#[derive(Parser)]
#[command(
    name = "leadscout",
    version,
    about = "Search lead sources against a targeting profile, score the results, and track follow-up.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.leadscout/leadscout.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run a lead search and wait for it to finish.
    Search(SearchArgs),

    /// Inspect search tasks.
    Tasks {
        #[command(subcommand)]
        action: TasksAction,
    },

    /// Query, update, and export leads.
    Leads {
        #[command(subcommand)]
        action: LeadsAction,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Targeting profile and run options for `search`.
#[derive(Args)]
pub(crate) struct SearchArgs {
    /// Human-readable task name.
    #[arg(short, long, default_value = "lead search")]
    pub name: String,

    /// Target industry.
    #[arg(long)]
    pub industry: Option<String>,

    /// Company size bucket: 1-10, 11-50, 51-200, 201-1000, 1000+.
    #[arg(long)]
    pub company_size: Option<CompanySize>,

    /// Target location.
    #[arg(long)]
    pub location: Option<String>,

    /// Job title to target (repeatable).
    #[arg(long = "job-title")]
    pub job_titles: Vec<String>,

    /// Keyword to look for (repeatable).
    #[arg(long = "keyword")]
    pub keywords: Vec<String>,

    /// Technology to look for (repeatable).
    #[arg(long = "technology")]
    pub technologies: Vec<String>,

    /// Revenue range, free-form.
    #[arg(long)]
    pub revenue_range: Option<String>,

    /// Keep competitors in the results.
    #[arg(long)]
    pub include_competitors: bool,

    /// Source to search, in order (repeatable). Defaults to the config.
    #[arg(short, long = "source")]
    pub sources: Vec<SourceKind>,

    /// Lead cap. Defaults to the config.
    #[arg(short, long)]
    pub max_leads: Option<usize>,
}

impl SearchArgs {
    fn criteria(&self) -> TargetingCriteria {
        TargetingCriteria {
            industry: self.industry.clone(),
            company_size: self.company_size,
            location: self.location.clone(),
            job_titles: self.job_titles.clone(),
            keywords: self.keywords.clone(),
            technologies: self.technologies.clone(),
            revenue_range: self.revenue_range.clone(),
            exclude_competitors: !self.include_competitors,
        }
    }
}

/// Task subcommands.
#[derive(Subcommand)]
pub(crate) enum TasksAction {
    /// List all search tasks.
    List,
    /// Show one task and its results summary.
    Show {
        /// Task ID.
        id: TaskId,
    },
}

/// Lead filters shared by `leads list` and `leads export`.
#[derive(Args)]
pub(crate) struct LeadFilterArgs {
    /// Only this quality tier: hot, warm, cold, unqualified.
    #[arg(long)]
    pub tier: Option<QualityTier>,

    /// Only this lifecycle status.
    #[arg(long)]
    pub status: Option<LeadStatus>,

    /// Only leads from this source.
    #[arg(long)]
    pub source: Option<SourceKind>,

    /// Only leads created by this task.
    #[arg(long)]
    pub task: Option<TaskId>,

    /// Maximum number of leads.
    #[arg(long, default_value = "100")]
    pub limit: usize,
}

impl From<&LeadFilterArgs> for LeadFilter {
    fn from(args: &LeadFilterArgs) -> Self {
        Self {
            tier: args.tier,
            status: args.status,
            source: args.source,
            task_id: args.task,
            limit: Some(args.limit),
        }
    }
}

/// Lead subcommands.
#[derive(Subcommand)]
pub(crate) enum LeadsAction {
    /// List leads, best score first.
    List(LeadFilterArgs),
    /// Show one lead.
    Show {
        /// Lead ID.
        id: LeadId,
    },
    /// Change a lead's follow-up status.
    Status {
        /// Lead ID.
        id: LeadId,
        /// New status: new, qualified, contacted, interested, not_interested, converted.
        status: LeadStatus,
        /// Replace the lead's notes.
        #[arg(long)]
        notes: Option<String>,
    },
    /// Export leads as CSV or JSON.
    Export {
        /// Output format: csv or json.
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
        /// Comma-separated field list.
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        filter: LeadFilterArgs,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "leadscout=warn",
        1 => "leadscout=info",
        2 => "leadscout=debug",
        _ => "leadscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };

    match cli.command {
        Command::Search(args) => cmd_search(&config, args).await,
        Command::Tasks { action } => match action {
            TasksAction::List => cmd_tasks_list(&config).await,
            TasksAction::Show { id } => cmd_tasks_show(&config, &id).await,
        },
        Command::Leads { action } => match action {
            LeadsAction::List(filter) => cmd_leads_list(&config, &filter).await,
            LeadsAction::Show { id } => cmd_leads_show(&config, &id).await,
            LeadsAction::Status { id, status, notes } => {
                cmd_leads_status(&config, &id, status, notes).await
            }
            LeadsAction::Export {
                format,
                fields,
                out,
                filter,
            } => cmd_leads_export(&config, format, &fields, out.as_deref(), &filter).await,
        },
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

fn database_path(config: &AppConfig) -> Result<PathBuf> {
    Ok(expand_home(&config.defaults.database_path)?)
}

async fn open_storage(config: &AppConfig) -> Result<Arc<Storage>> {
    let path = database_path(config)?;
    Ok(Arc::new(Storage::open(&path).await?))
}

async fn open_storage_readonly(config: &AppConfig) -> Result<Arc<Storage>> {
    let path = database_path(config)?;
    Storage::open_readonly(&path)
        .await
        .map(Arc::new)
        .map_err(|e| eyre!("{e}. Run `leadscout search` first to create it."))
}

/// One fixture-backed source per kind when `[sources] fixtures_dir` is set.
fn build_registry(config: &AppConfig) -> Result<SourceRegistry> {
    let mut registry = SourceRegistry::new();
    if let Some(dir) = &config.sources.fixtures_dir {
        let dir = expand_home(dir)?;
        for kind in SourceKind::ALL {
            registry.register(FixtureSource::new(kind, &dir));
        }
    }
    Ok(registry)
}

fn openrouter_client(config: &AppConfig) -> Result<Option<OpenRouterClient>> {
    match resolve_api_key(config) {
        Ok(key) => Ok(Some(OpenRouterClient::new(&config.openrouter, key)?)),
        Err(_) => Ok(None),
    }
}

fn build_scorer(config: &AppConfig, client: Option<&OpenRouterClient>) -> Result<Arc<dyn Scorer>> {
    match config.scoring.mode {
        ScoringMode::Heuristic => Ok(Arc::new(HeuristicScorer::new())),
        ScoringMode::Llm => match client {
            Some(client) => Ok(Arc::new(client.clone())),
            None => {
                let reason = resolve_api_key(config)
                    .err()
                    .map(|e| e.to_string())
                    .unwrap_or_default();
                Err(eyre!("scoring mode is llm but no OpenRouter client is available. {reason}"))
            }
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_search(config: &AppConfig, args: SearchArgs) -> Result<()> {
    let discovery = DiscoveryConfig::from(config);
    let registry = build_registry(config)?;
    if registry.kinds().is_empty() {
        return Err(eyre!(
            "no lead sources configured. Set [sources] fixtures_dir in the config file."
        ));
    }

    let client = openrouter_client(config)?;
    let scorer = build_scorer(config, client.as_ref())?;
    let storage = open_storage(config).await?;
    let progress = Arc::new(CliProgress::new()?);

    let mut builder = Orchestrator::builder(registry, scorer, storage.clone(), storage.clone())
        .progress(progress.clone())
        .neutral_score(discovery.neutral_score);
    match client {
        Some(client) => {
            let summarizer: Arc<dyn Summarizer> = Arc::new(client);
            builder = builder.summarizer(summarizer);
        }
        None => warn!("no OpenRouter API key; summaries will omit the narrative"),
    }
    let orchestrator = builder.build();

    let sources = if args.sources.is_empty() {
        discovery.sources.clone()
    } else {
        args.sources.clone()
    };
    let max_leads = args.max_leads.unwrap_or(discovery.max_leads);

    info!(name = %args.name, ?sources, max_leads, "starting search");
    let task = orchestrator
        .create_task(&args.name, args.criteria(), sources, max_leads)
        .await?;

    let poll = Duration::from_millis(discovery.poll_interval_ms.max(10));
    let done = orchestrator.wait_for_terminal(&task.id, poll).await?;
    progress.clear();

    print_task(&done);
    if let Some(ResultsSummary::Completed(_)) = &done.results_summary {
        let top = orchestrator
            .leads()
            .list(&LeadFilter {
                task_id: Some(done.id),
                limit: Some(10),
                ..Default::default()
            })
            .await?;
        if !top.is_empty() {
            println!("  Top leads:");
            print_lead_table(&top);
            println!();
        }
    }
    Ok(())
}

async fn cmd_tasks_list(config: &AppConfig) -> Result<()> {
    let storage = open_storage_readonly(config).await?;
    let tasks = storage.list_tasks().await?;
    if tasks.is_empty() {
        println!("No search tasks yet.");
        return Ok(());
    }

    println!(
        "{:<36}  {:<10}  {:>8}  {:>6}  NAME",
        "ID", "STATUS", "PROGRESS", "LEADS"
    );
    for task in &tasks {
        println!(
            "{:<36}  {:<10}  {:>7.0}%  {:>6}  {}",
            task.id, task.status, task.progress, task.leads_found, task.name
        );
    }
    Ok(())
}

async fn cmd_tasks_show(config: &AppConfig, id: &TaskId) -> Result<()> {
    let storage = open_storage_readonly(config).await?;
    let task = storage
        .get_task(id)
        .await?
        .ok_or_else(|| eyre!("search task not found: {id}"))?;
    print_task(&task);
    Ok(())
}

async fn cmd_leads_list(config: &AppConfig, filter: &LeadFilterArgs) -> Result<()> {
    let store = LeadStore::new(open_storage_readonly(config).await?);
    let leads = store.list(&filter.into()).await?;
    if leads.is_empty() {
        println!("No leads match.");
    } else {
        print_lead_table(&leads);
    }
    Ok(())
}

async fn cmd_leads_show(config: &AppConfig, id: &LeadId) -> Result<()> {
    let store = LeadStore::new(open_storage_readonly(config).await?);
    let lead = store.get(id).await?;
    println!("{}", serde_json::to_string_pretty(&lead)?);
    Ok(())
}

async fn cmd_leads_status(
    config: &AppConfig,
    id: &LeadId,
    status: LeadStatus,
    notes: Option<String>,
) -> Result<()> {
    let store = LeadStore::new(open_storage(config).await?);
    let lead = store.update_status(id, status, notes).await?;
    println!(
        "{} → {} (contact attempts: {})",
        lead_name(&lead),
        lead.status,
        lead.contact_attempts
    );
    Ok(())
}

async fn cmd_leads_export(
    config: &AppConfig,
    format: ExportFormat,
    fields: &[String],
    out: Option<&Path>,
    filter: &LeadFilterArgs,
) -> Result<()> {
    let store = LeadStore::new(open_storage_readonly(config).await?);
    let fields = (!fields.is_empty()).then_some(fields);
    let content = store.export(&filter.into(), format, fields).await?;

    match out {
        Some(path) => {
            std::fs::write(path, &content)
                .map_err(|e| eyre!("failed to write {}: {e}", path.display()))?;
            info!(path = %path.display(), bytes = content.len(), %format, "leads exported");
            println!("Exported to {}", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

fn lead_name(lead: &Lead) -> String {
    let full = format!("{} {}", lead.first_name, lead.last_name);
    match full.trim() {
        "" => lead.email.clone().unwrap_or_else(|| lead.company.clone()),
        name => name.to_string(),
    }
}

fn print_lead_table(leads: &[Lead]) {
    println!(
        "  {:<36}  {:>5}  {:<11}  {:<14}  {:<24}  NAME",
        "ID", "SCORE", "TIER", "STATUS", "COMPANY"
    );
    for lead in leads {
        println!(
            "  {:<36}  {:>5.1}  {:<11}  {:<14}  {:<24}  {}",
            lead.id,
            lead.quality_score,
            lead.quality_tier,
            lead.status,
            truncate(&lead.company, 24),
            lead_name(lead)
        );
    }
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let cut: String = s.chars().take(width.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn print_task(task: &SearchTask) {
    println!();
    println!("  Task:     {} ({})", task.name, task.id);
    println!("  Status:   {}", task.status);
    println!("  Progress: {:.0}%", task.progress);
    println!("  Leads:    {}", task.leads_found);
    println!("  Sources:  {}", join_sources(&task.sources));
    match &task.results_summary {
        Some(ResultsSummary::Completed(report)) => print_report(report),
        Some(ResultsSummary::Failed { error }) => println!("  Error:    {error}"),
        None => {}
    }
    println!();
}

fn join_sources(sources: &[SourceKind]) -> String {
    sources
        .iter()
        .map(SourceKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_report(report: &SearchReport) {
    println!(
        "  Found:    {} raw, {} unique",
        report.raw_candidates, report.unique_candidates
    );
    println!(
        "  Tiers:    {} hot, {} warm, {} cold, {} unqualified",
        report.tiers.hot, report.tiers.warm, report.tiers.cold, report.tiers.unqualified
    );
    println!("  Average:  {:.1}", report.average_score);
    if !report.top_companies.is_empty() {
        let companies: Vec<String> = report
            .top_companies
            .iter()
            .map(|c| format!("{} ({})", c.company, c.leads))
            .collect();
        println!("  Top:      {}", companies.join(", "));
    }
    for source in &report.sources {
        match &source.error {
            Some(error) => println!("  - {}: failed ({error})", source.source),
            None => println!(
                "  - {}: {} of {} requested",
                source.source, source.candidates, source.budget
            ),
        }
    }
    match &report.narrative {
        Narrative::Available { analysis } => {
            println!("  Analysis:");
            let text = serde_json::to_string_pretty(analysis).unwrap_or_else(|_| analysis.to_string());
            for line in text.lines() {
                println!("    {line}");
            }
        }
        Narrative::Unavailable { reason } => println!("  Analysis: unavailable ({reason})"),
    }
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter: a percentage bar that advances once per source.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Result<Self> {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos:>3}% {msg}")?
                .progress_chars("=> ")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        bar.set_message("Queued");
        Ok(Self { bar })
    }

    fn clear(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliProgress {
    fn started(&self, task: &SearchTask) {
        self.bar
            .set_message(format!("Searching {}", join_sources(&task.sources)));
    }

    fn source_done(&self, task: &SearchTask, report: &SourceReport) {
        self.bar.set_position(task.progress.round() as u64);
        self.bar.set_message(match &report.error {
            Some(_) => format!("{} failed", report.source),
            None => format!("{}: {} candidates", report.source, report.candidates),
        });
    }

    fn finished(&self, _task: &SearchTask) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_args_build_criteria() {
        let cli = Cli::parse_from([
            "leadscout",
            "search",
            "--industry",
            "SaaS",
            "--company-size",
            "51-200",
            "--job-title",
            "CTO",
            "--job-title",
            "VP Engineering",
            "--source",
            "linkedin",
            "--source",
            "database",
            "--max-leads",
            "20",
        ]);
        let Command::Search(args) = cli.command else {
            panic!("expected search");
        };
        let criteria = args.criteria();
        assert_eq!(criteria.industry.as_deref(), Some("SaaS"));
        assert_eq!(criteria.company_size, Some(CompanySize::Medium));
        assert_eq!(criteria.job_titles, vec!["CTO", "VP Engineering"]);
        assert!(criteria.exclude_competitors);
        assert_eq!(args.sources, vec![SourceKind::LinkedIn, SourceKind::Database]);
        assert_eq!(args.max_leads, Some(20));
    }

    #[test]
    fn unknown_source_tag_is_rejected() {
        assert!(Cli::try_parse_from(["leadscout", "search", "--source", "fax"]).is_err());
    }

    #[test]
    fn export_args() {
        let cli = Cli::parse_from([
            "leadscout",
            "leads",
            "export",
            "--format",
            "json",
            "--fields",
            "email,company",
            "--tier",
            "hot",
        ]);
        let Command::Leads {
            action:
                LeadsAction::Export {
                    format,
                    fields,
                    filter,
                    ..
                },
        } = cli.command
        else {
            panic!("expected leads export");
        };
        assert_eq!(format, ExportFormat::Json);
        assert_eq!(fields, vec!["email", "company"]);
        let filter = LeadFilter::from(&filter);
        assert_eq!(filter.tier, Some(QualityTier::Hot));
        assert_eq!(filter.limit, Some(100));
    }

    #[test]
    fn llm_mode_without_key_is_an_error() {
        let mut config = AppConfig::default();
        config.scoring.mode = ScoringMode::Llm;
        config.openrouter.api_key_env = "LEADSCOUT_TEST_UNSET_KEY".into();
        assert!(build_scorer(&config, None).is_err());
        config.scoring.mode = ScoringMode::Heuristic;
        assert!(build_scorer(&config, None).is_ok());
    }

    #[test]
    fn registry_from_fixtures_dir() {
        let mut config = AppConfig::default();
        assert!(build_registry(&config).unwrap().kinds().is_empty());
        config.sources.fixtures_dir = Some("/tmp/leadscout-fixtures".into());
        assert_eq!(build_registry(&config).unwrap().kinds().len(), SourceKind::ALL.len());
    }
}
