//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use cs2stat_core::{Collaborators, ProgressReporter, RunSummary, StageReport, harvest};
use cs2stat_identity::FaceitClient;
use cs2stat_oracle::{HtmlOracle, OracleOptions};
use cs2stat_shared::{
    AppConfig, PipelineConfig, RunContext, database_path, init_config, load_config,
    resolve_api_key,
};
use cs2stat_storage::Storage;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// cs2stat: winning vs losing team averages from top-ranked players' matches.
#[derive(Parser)]
#[command(
    name = "cs2stat",
    version,
    about = "Harvest recent matches of top-ranked CS2 players and store per-team stat averages.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

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
    /// Run a full harvest: leaderboard, players, matches, averages.
    Run {
        /// Leaderboard region (overrides config).
        #[arg(long)]
        region: Option<String>,

        /// Number of top players to harvest (overrides config).
        #[arg(long)]
        top: Option<u32>,

        /// Leaderboard offset (overrides config).
        #[arg(long)]
        offset: Option<u32>,

        /// Whole-run deadline in seconds (overrides config).
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Database file (defaults to the configured path).
        #[arg(long, env = "DATABASE_URL")]
        db: Option<PathBuf>,
    },

    /// Print stored match averages, most recent first.
    Matches {
        /// Maximum rows to print.
        #[arg(short, long, default_value = "20")]
        limit: u32,

        /// Database file (defaults to the configured path).
        #[arg(long, env = "DATABASE_URL")]
        db: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
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
        0 => "cs2stat=info",
        1 => "cs2stat=debug",
        _ => "cs2stat=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            region,
            top,
            offset,
            timeout_secs,
            db,
        } => cmd_run(region, top, offset, timeout_secs, db).await,
        Command::Matches { limit, db } => cmd_matches(limit, db).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

fn resolve_db_path(config: &AppConfig, db: Option<PathBuf>) -> Result<PathBuf> {
    match db {
        Some(path) => Ok(path),
        None => Ok(database_path(config)?),
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(
    region: Option<String>,
    top: Option<u32>,
    offset: Option<u32>,
    timeout_secs: Option<u64>,
    db: Option<PathBuf>,
) -> Result<()> {
    // Fail on a missing key before touching the network or the database
    let config = load_config()?;
    let api_key = resolve_api_key(&config)?;

    let mut pipeline = PipelineConfig::from(&config);
    if let Some(region) = region {
        pipeline.region = region;
    }
    if let Some(top) = top {
        pipeline.top_players = top;
    }
    if let Some(offset) = offset {
        pipeline.offset = offset;
    }
    if let Some(secs) = timeout_secs {
        pipeline.run_timeout = std::time::Duration::from_secs(secs);
    }

    let db_path = resolve_db_path(&config, db)?;
    let storage = Arc::new(Storage::open(&db_path).await?);

    let deps = Collaborators {
        identity: Arc::new(FaceitClient::new(config.faceit.base_url.clone(), api_key)?),
        oracle: Arc::new(HtmlOracle::new(OracleOptions {
            page_timeout: pipeline.page_timeout,
            settle_delay: pipeline.settle_delay,
        })?),
        store: storage.clone(),
    };

    info!(
        region = %pipeline.region,
        top = pipeline.top_players,
        offset = pipeline.offset,
        db = %db_path.display(),
        "starting harvest"
    );

    let ctx = RunContext::with_timeout(pipeline.run_timeout);
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        let mut count = 0;
        while tokio::signal::ctrl_c().await.is_ok() {
            count += 1;
            match interrupt_action(count) {
                InterruptAction::Cancel => {
                    warn!("interrupt received, cancelling run; press Ctrl-C again to force exit");
                    interrupt.cancel();
                }
                InterruptAction::Exit => {
                    warn!("second interrupt, exiting without waiting for the run");
                    std::process::exit(130);
                }
            }
        }
    });

    let run_id = storage.insert_scrape_run().await?;
    let reporter = CliProgress::new();
    let summary = harvest(&ctx, &pipeline, &deps, &reporter).await?;

    // Stats are informational; the averages are already stored
    match serde_json::to_string(&summary) {
        Ok(stats) => storage.finish_scrape_run(&run_id, &stats).await?,
        Err(e) => warn!(error = %e, "could not encode run stats"),
    }

    print_summary(&summary);
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum InterruptAction {
    Cancel,
    Exit,
}

/// The first Ctrl-C cancels gracefully, any later one exits at once.
fn interrupt_action(count: usize) -> InterruptAction {
    if count <= 1 {
        InterruptAction::Cancel
    } else {
        InterruptAction::Exit
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    if summary.cancelled {
        println!("  Harvest cancelled.");
    } else if summary.timed_out {
        println!("  Harvest hit its deadline; partial results saved.");
    } else {
        println!("  Harvest complete!");
    }
    println!("  Players: {}", summary.players_saved);
    println!("  Matches: {}", summary.matches_saved);
    for stage in &summary.stages {
        println!(
            "  {:<12} {}/{} ok, {} skipped",
            stage.stage,
            stage.succeeded,
            stage.attempted,
            stage.skipped.len()
        );
    }
    println!("  Time:    {:.1}s", summary.elapsed.as_secs_f64());
    println!();
}

async fn cmd_matches(limit: u32, db: Option<PathBuf>) -> Result<()> {
    let config = load_config()?;
    let db_path = resolve_db_path(&config, db)?;
    if !db_path.exists() {
        return Err(eyre!(
            "no database at '{}'; run `cs2stat run` first",
            db_path.display()
        ));
    }

    let storage = Storage::open_readonly(&db_path).await?;
    let rows = storage.list_match_averages(limit).await?;

    if rows.is_empty() {
        println!("No match averages stored yet.");
        return Ok(());
    }

    println!(
        "{:<60} {:>7} {:>7} {:>7} {:>7}",
        "match", "w.rate", "l.rate", "w.kd", "l.kd"
    );
    for avg in &rows {
        println!(
            "{:<60} {:>7.3} {:>7.3} {:>7.2} {:>7.2}",
            avg.match_url,
            avg.win_avg_leetify_rating,
            avg.loss_avg_leetify_rating,
            avg.win_avg_kd,
            avg.loss_avg_kd
        );
    }
    println!();
    println!(
        "  {} players, {} matches stored",
        storage.count_players().await?,
        storage.count_match_averages().await?
    );
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn stage_done(&self, report: &StageReport) {
        self.spinner.println(format!(
            "  {}: {}/{} ok",
            report.stage, report.succeeded, report.attempted
        ));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "cs2stat", "-vv", "run", "--region", "NA", "--top", "10", "--timeout-secs", "60",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Run {
                region,
                top,
                timeout_secs,
                offset,
                ..
            } => {
                assert_eq!(region.as_deref(), Some("NA"));
                assert_eq!(top, Some(10));
                assert_eq!(timeout_secs, Some(60));
                assert_eq!(offset, None);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn second_interrupt_forces_exit() {
        assert_eq!(interrupt_action(1), InterruptAction::Cancel);
        assert_eq!(interrupt_action(2), InterruptAction::Exit);
        assert_eq!(interrupt_action(3), InterruptAction::Exit);
    }
}
