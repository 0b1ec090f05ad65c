//! scripturekit CLI: download scripture publications as structured JSON.
//!
//! Each (publication, language) pair becomes one document holding the
//! publication's navigation tree and the parsed text of every page.

mod commands;
mod sink;

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
