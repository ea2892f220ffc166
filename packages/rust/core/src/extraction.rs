//! Extraction stage: match locators → raw row tables, ties removed.

use std::sync::Arc;

use tracing::{info, instrument};

use cs2stat_oracle::ExtractionOracle;
use cs2stat_shared::{Locator, RawRowTable, Result, RunContext, SkipReason};

use crate::pool::{JobOutcome, WorkerPool};
use crate::report::StageReport;

/// Result phrase shown on drawn matches.
pub const TIE_PHRASE: &str = "TIE";

/// Exact, case-sensitive match against [`TIE_PHRASE`]. Only surrounding
/// whitespace from the page text is ignored.
pub fn is_tie(result_phrase: &str) -> bool {
    result_phrase.trim() == TIE_PHRASE
}

#[instrument(skip_all, fields(matches = locators.len(), workers = workers))]
pub async fn extract_tables(
    ctx: &RunContext,
    oracle: Arc<dyn ExtractionOracle>,
    locators: Vec<Locator>,
    workers: usize,
) -> Result<(Vec<RawRowTable>, StageReport)> {
    let pool = WorkerPool::new("extraction", workers);

    let output = pool
        .run(ctx, locators, move |locator: Locator, ctx: RunContext| {
            let oracle = Arc::clone(&oracle);
            async move {
                let page = match ctx.bound(oracle.extract_match_rows(&locator)).await {
                    Ok(page) => page,
                    Err(e) => return Ok(JobOutcome::Skipped(SkipReason::from_error(&e))),
                };
                if is_tie(&page.result_phrase) {
                    return Ok(JobOutcome::Skipped(SkipReason::Tie));
                }
                Ok(JobOutcome::one(RawRowTable {
                    locator,
                    rows: page.rows,
                }))
            }
        })
        .await?;

    let (tables, report) = output.into_report("extraction");
    info!(
        attempted = report.attempted,
        extracted = tables.len(),
        ties = report.count_skipped(|r| *r == SkipReason::Tie),
        "match tables extracted"
    );
    Ok((tables, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeOracle, win_page};
    use cs2stat_shared::MatchPage;
    use std::time::Duration;

    #[test]
    fn tie_detection_is_exact() {
        assert!(is_tie("TIE"));
        assert!(is_tie("  TIE\n"));
        assert!(!is_tie("tie"));
        assert!(!is_tie("Tie"));
        assert!(!is_tie("WIN"));
        assert!(!is_tie("TIED GAME"));
    }

    #[tokio::test]
    async fn ties_and_failures_are_dropped() {
        let tie = MatchPage {
            result_phrase: "TIE".into(),
            ..win_page()
        };
        let oracle = FakeOracle::default()
            .with_page("m1", win_page())
            .with_page("m2", tie);
        let ctx = RunContext::with_timeout(Duration::from_secs(10));

        let (tables, report) = extract_tables(
            &ctx,
            Arc::new(oracle),
            vec!["m1".into(), "m2".into(), "m3".into()],
            5,
        )
        .await
        .unwrap();

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].locator, "m1");
        assert_eq!(tables[0].rows.len(), 10);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.count_skipped(|r| *r == SkipReason::Tie), 1);
        assert_eq!(
            report.count_skipped(|r| matches!(r, SkipReason::Fetch(_))),
            1
        );
    }

    #[tokio::test]
    async fn deadline_turns_slow_pages_into_skips() {
        let oracle = FakeOracle {
            delay: Duration::from_secs(5),
            ..Default::default()
        }
        .with_page("m1", win_page());
        let ctx = RunContext::with_timeout(Duration::from_millis(50));

        let (tables, report) = extract_tables(&ctx, Arc::new(oracle), vec!["m1".into()], 1)
            .await
            .unwrap();

        assert!(tables.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::Timeout);
    }
}
