//! Link discovery stage: profile locators → unique match locators.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, instrument};

use cs2stat_oracle::ExtractionOracle;
use cs2stat_shared::{Locator, Result, RunContext, SkipReason};

use crate::pool::{JobOutcome, WorkerPool};
use crate::report::StageReport;

/// Drop repeated locators, keeping the first occurrence of each.
pub fn dedup_locators(locators: impl IntoIterator<Item = Locator>) -> Vec<Locator> {
    let mut seen = HashSet::new();
    locators
        .into_iter()
        .filter(|l| seen.insert(l.clone()))
        .collect()
}

/// Collect up to `max_links` match links from every profile, then dedup.
///
/// A profile that fails, times out, or lists no matches contributes nothing.
#[instrument(skip_all, fields(profiles = profiles.len(), workers = workers, max_links = max_links))]
pub async fn discover_matches(
    ctx: &RunContext,
    oracle: Arc<dyn ExtractionOracle>,
    profiles: Vec<Locator>,
    workers: usize,
    max_links: usize,
) -> Result<(Vec<Locator>, StageReport)> {
    let pool = WorkerPool::new("discovery", workers);

    let output = pool
        .run(ctx, profiles, move |profile: Locator, ctx: RunContext| {
            let oracle = Arc::clone(&oracle);
            async move {
                match ctx
                    .bound(oracle.discover_match_links(&profile, max_links))
                    .await
                {
                    Ok(links) if links.is_empty() => {
                        Ok(JobOutcome::Skipped(SkipReason::NoMatchLinks))
                    }
                    Ok(mut links) => {
                        links.truncate(max_links);
                        Ok(JobOutcome::Done(links))
                    }
                    Err(e) => Ok(JobOutcome::Skipped(SkipReason::from_error(&e))),
                }
            }
        })
        .await?;

    let (links, report) = output.into_report("discovery");
    let found = links.len();
    let unique = dedup_locators(links);

    info!(
        attempted = report.attempted,
        found,
        unique = unique.len(),
        "match links discovered"
    );
    Ok((unique, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeOracle;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::time::Duration;

    fn ctx() -> RunContext {
        RunContext::with_timeout(Duration::from_secs(10))
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let input = ["m2", "m1", "m2", "m3", "m1"].map(String::from);
        assert_eq!(dedup_locators(input), vec!["m2", "m1", "m3"]);
    }

    #[test]
    fn dedup_of_empty_is_empty() {
        assert!(dedup_locators(Vec::new()).is_empty());
    }

    #[tokio::test]
    async fn shared_matches_are_deduplicated() {
        let oracle = FakeOracle::default()
            .with_links("p1", &["m1", "m2", "m3"])
            .with_links("p2", &["m2", "m3", "m4"]);

        let (links, report) = discover_matches(
            &ctx(),
            Arc::new(oracle),
            vec!["p1".into(), "p2".into()],
            5,
            5,
        )
        .await
        .unwrap();

        let mut sorted = links.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["m1", "m2", "m3", "m4"]);
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 2);
    }

    #[tokio::test]
    async fn per_profile_cap_is_enforced() {
        let oracle =
            FakeOracle::default().with_links("p1", &["m1", "m2", "m3", "m4", "m5", "m6", "m7"]);

        let (links, _) = discover_matches(&ctx(), Arc::new(oracle), vec!["p1".into()], 1, 5)
            .await
            .unwrap();

        assert_eq!(links, vec!["m1", "m2", "m3", "m4", "m5"]);
    }

    #[tokio::test]
    async fn empty_and_failing_profiles_contribute_nothing() {
        let oracle = FakeOracle::default()
            .with_links("p1", &["m1"])
            .with_links("empty", &[]);

        let (links, report) = discover_matches(
            &ctx(),
            Arc::new(oracle),
            vec!["p1".into(), "empty".into(), "unknown".into()],
            3,
            5,
        )
        .await
        .unwrap();

        assert_eq!(links, vec!["m1"]);
        assert_eq!(report.attempted, 3);
        assert_eq!(report.count_skipped(|r| *r == SkipReason::NoMatchLinks), 1);
        assert_eq!(
            report.count_skipped(|r| matches!(r, SkipReason::Fetch(_))),
            1
        );
    }

    proptest! {
        #[test]
        fn dedup_keeps_each_value_once_in_first_seen_order(
            input in prop::collection::vec("[a-d]{1,2}", 0..40)
        ) {
            let out = dedup_locators(input.clone());

            let unique: HashSet<&String> = out.iter().collect();
            prop_assert_eq!(unique.len(), out.len());

            let expected: HashSet<&String> = input.iter().collect();
            prop_assert_eq!(unique, expected);

            let first_seen = |l: &String| input.iter().position(|x| x == l);
            prop_assert!(out.windows(2).all(|w| first_seen(&w[0]) < first_seen(&w[1])));
        }
    }
}
