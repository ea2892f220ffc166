//! End-to-end runs: profiles → averages, and the full leaderboard harvest.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument};

use cs2stat_identity::IdentitySource;
use cs2stat_oracle::ExtractionOracle;
use cs2stat_shared::{Locator, MatchAverages, PipelineConfig, Result, RunContext};
use cs2stat_storage::StatsStore;

use crate::aggregation::aggregate_matches;
use crate::assembly::assemble_matches;
use crate::discovery::discover_matches;
use crate::extraction::extract_tables;
use crate::players::fetch_identities;
use crate::report::{RunSummary, StageReport};

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a stage has finished with its counts.
    fn stage_done(&self, report: &StageReport);
    /// Called when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn stage_done(&self, _report: &StageReport) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// The external systems a harvest talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentitySource>,
    pub oracle: Arc<dyn ExtractionOracle>,
    pub store: Arc<dyn StatsStore>,
}

/// Averages produced by [`run_pipeline`] plus one report per stage.
#[derive(Debug)]
pub struct PipelineOutput {
    pub averages: Vec<MatchAverages>,
    pub reports: Vec<StageReport>,
}

/// Discovery → extraction → assembly → aggregation for a set of profiles.
///
/// Stages run strictly in sequence. Per-item failures are recorded in the
/// reports; only pool-level hard errors are returned.
#[instrument(skip_all, fields(profiles = profiles.len()))]
pub async fn run_pipeline(
    ctx: &RunContext,
    config: &PipelineConfig,
    oracle: Arc<dyn ExtractionOracle>,
    profiles: Vec<Locator>,
    progress: &dyn ProgressReporter,
) -> Result<PipelineOutput> {
    let mut reports = Vec::with_capacity(4);

    progress.phase("discovering matches");
    let (links, report) = discover_matches(
        ctx,
        Arc::clone(&oracle),
        profiles,
        config.discovery_workers,
        config.max_links_per_profile,
    )
    .await?;
    progress.stage_done(&report);
    reports.push(report);

    progress.phase("extracting match pages");
    let (tables, report) = extract_tables(ctx, oracle, links, config.extraction_workers).await?;
    progress.stage_done(&report);
    reports.push(report);

    progress.phase("assembling matches");
    let (matches, report) = assemble_matches(&tables);
    progress.stage_done(&report);
    reports.push(report);

    progress.phase("computing averages");
    let (averages, report) = aggregate_matches(&matches);
    progress.stage_done(&report);
    reports.push(report);

    Ok(PipelineOutput { averages, reports })
}

/// Full run: leaderboard → identities → players saved → pipeline → averages saved.
///
/// The leaderboard call and storage writes are hard failures. Everything
/// between them degrades to per-item skips.
#[instrument(skip_all, fields(region = %config.region, top = config.top_players))]
pub async fn harvest(
    ctx: &RunContext,
    config: &PipelineConfig,
    deps: &Collaborators,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let start = Instant::now();
    let mut stages = Vec::with_capacity(5);

    progress.phase("fetching leaderboard");
    let ranked = ctx
        .bound(
            deps.identity
                .list_top_players(&config.region, config.top_players, config.offset),
        )
        .await?;
    info!(players = ranked.len(), "leaderboard fetched");

    progress.phase("fetching player details");
    let player_ids = ranked.into_iter().map(|p| p.player_id).collect();
    let (identities, report) = fetch_identities(
        ctx,
        Arc::clone(&deps.identity),
        player_ids,
        config.identity_workers,
    )
    .await?;
    progress.stage_done(&report);
    stages.push(report);

    progress.phase("saving players");
    for identity in &identities {
        deps.store.upsert_player(&identity.to_record()).await?;
    }
    let players_saved = identities.len();

    let profiles = identities
        .iter()
        .map(|i| config.profile_locator(&i.steam_id))
        .collect();

    let output = run_pipeline(ctx, config, Arc::clone(&deps.oracle), profiles, progress).await?;
    stages.extend(output.reports);

    progress.phase("saving match averages");
    deps.store
        .batch_upsert_match_averages(&output.averages)
        .await?;

    let summary = RunSummary {
        stages,
        players_saved,
        matches_saved: output.averages.len(),
        elapsed: start.elapsed(),
        timed_out: ctx.is_expired(),
        cancelled: ctx.is_cancelled(),
    };

    info!(
        players = summary.players_saved,
        matches = summary.matches_saved,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        timed_out = summary.timed_out,
        "harvest complete"
    );
    progress.done(&summary);

    Ok(summary)
}
