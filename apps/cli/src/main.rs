//! LeadScout CLI: lead discovery from the terminal.
//!
//! Runs searches against configured lead sources, scores the candidates,
//! and manages the resulting leads in a local libSQL database.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
