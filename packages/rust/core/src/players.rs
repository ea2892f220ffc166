//! Player identity stage: leaderboard ids → detailed identities.

use std::sync::Arc;

use tracing::{info, instrument};

use cs2stat_identity::{IdentitySource, is_valid_steam_id};
use cs2stat_shared::{PlayerIdentity, Result, RunContext, SkipReason};

use crate::pool::{JobOutcome, WorkerPool};
use crate::report::StageReport;

/// Fetch details for every player id. Failed lookups and identities
/// without a usable Steam id are skipped.
#[instrument(skip_all, fields(players = player_ids.len(), workers = workers))]
pub async fn fetch_identities(
    ctx: &RunContext,
    source: Arc<dyn IdentitySource>,
    player_ids: Vec<String>,
    workers: usize,
) -> Result<(Vec<PlayerIdentity>, StageReport)> {
    let pool = WorkerPool::new("identity", workers);

    let output = pool
        .run(ctx, player_ids, move |player_id: String, ctx: RunContext| {
            let source = Arc::clone(&source);
            async move {
                let identity = match ctx.bound(source.get_player_details(&player_id)).await {
                    Ok(identity) => identity,
                    Err(e) => return Ok(JobOutcome::Skipped(SkipReason::from_error(&e))),
                };
                if !is_valid_steam_id(&identity.steam_id) {
                    return Ok(JobOutcome::Skipped(SkipReason::InvalidIdentity(format!(
                        "steam id {:?}",
                        identity.steam_id
                    ))));
                }
                Ok(JobOutcome::one(identity))
            }
        })
        .await?;

    let (identities, report) = output.into_report("identity");
    info!(
        attempted = report.attempted,
        found = identities.len(),
        skipped = report.skipped.len(),
        "player identities fetched"
    );
    Ok((identities, report))
}
