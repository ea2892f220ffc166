//! Per-stage counts and skip records.

use std::fmt::Display;
use std::time::Duration;

use serde::Serialize;

use cs2stat_shared::SkipReason;

use crate::pool::PoolOutput;

/// One dropped item and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Skip {
    pub item: String,
    pub reason: SkipReason,
}

/// Attempted vs succeeded counts for one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: &'static str,
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: Vec<Skip>,
}

impl StageReport {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            attempted: 0,
            succeeded: 0,
            skipped: Vec::new(),
        }
    }

    pub fn skip(&mut self, item: impl Into<String>, reason: SkipReason) {
        self.skipped.push(Skip {
            item: item.into(),
            reason,
        });
    }

    /// Number of skips matching `pred`.
    pub fn count_skipped(&self, pred: impl Fn(&SkipReason) -> bool) -> usize {
        self.skipped.iter().filter(|s| pred(&s.reason)).count()
    }
}

impl<J: Display, R> PoolOutput<J, R> {
    /// Split a pool run into its results and a report for `stage`.
    pub fn into_report(self, stage: &'static str) -> (Vec<R>, StageReport) {
        let mut report = StageReport::new(stage);
        report.attempted = self.attempted;
        report.succeeded = self.completed;
        for (job, reason) in self.skipped {
            report.skip(job.to_string(), reason);
        }
        (self.results, report)
    }
}

/// Outcome of a full harvest run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub stages: Vec<StageReport>,
    pub players_saved: usize,
    pub matches_saved: usize,
    pub elapsed: Duration,
    /// The run deadline passed before the pipeline finished.
    pub timed_out: bool,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_with_fetch_skip_serializes() {
        let mut report = StageReport::new("discovery");
        report.attempted = 2;
        report.succeeded = 1;
        report.skip("p1", SkipReason::Fetch("HTTP 404".into()));
        report.skip("p2", SkipReason::InvalidIdentity("steam id \"\"".into()));

        let summary = RunSummary {
            stages: vec![report],
            players_saved: 2,
            matches_saved: 1,
            elapsed: Duration::from_millis(1500),
            timed_out: false,
            cancelled: false,
        };

        let json: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&summary).unwrap()).unwrap();
        let skipped = &json["stages"][0]["skipped"];
        assert_eq!(skipped[0]["item"], "p1");
        assert_eq!(skipped[0]["reason"]["kind"], "fetch");
        assert_eq!(skipped[0]["reason"]["detail"], "HTTP 404");
        assert_eq!(skipped[1]["reason"]["kind"], "invalid_identity");
        assert_eq!(json["matches_saved"], 1);
    }
}
