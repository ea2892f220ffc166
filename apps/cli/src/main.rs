//! cs2stat CLI: per-team stat averages from top players' recent matches.
//!
//! Pulls the regional leaderboard, resolves each player's Steam profile,
//! scrapes their recent match pages, and stores winner/loser averages.

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
