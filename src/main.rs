mod cli;
mod client;
#[cfg(feature = "tui")]
mod config;
mod model;
mod orchestrator;
mod render;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_one_shot = args.json || args.plain || args.clear_db;

    cli::run(args).await?;

    // Explicitly exit with code 0 on success, especially for one-shot modes
    if is_one_shot {
        std::process::exit(0);
    }
    Ok(())
}
