//! ekyc CLI: identity-document onboarding from extracted text.
//!
//! Extracts identity fields, verifies them against the registry and either
//! onboards the customer or routes the case to human review.

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
