//! Aggregation: per-team means of the six numeric stats.

use tracing::{info, warn};

use cs2stat_shared::{Match, MatchAverages, SkipReason, TEAM_SIZE, Team};

use crate::report::StageReport;

/// Sums of the aggregated fields for one team. ADR is not aggregated.
#[derive(Debug, Default)]
struct TeamSums {
    leetify_rating: f64,
    personal_performance: f64,
    hltv_rating: f64,
    kd: f64,
    aim: f64,
    utility: f64,
}

impl TeamSums {
    fn mean(&self) -> Self {
        let n = TEAM_SIZE as f64;
        Self {
            leetify_rating: self.leetify_rating / n,
            personal_performance: self.personal_performance / n,
            hltv_rating: self.hltv_rating / n,
            kd: self.kd / n,
            aim: self.aim / n,
            utility: self.utility / n,
        }
    }
}

fn parse_stat(
    team: usize,
    player: usize,
    field: &'static str,
    value: &str,
) -> Result<f64, SkipReason> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SkipReason::NonNumeric {
            team,
            player,
            field,
            value: value.to_string(),
        })
}

fn sum_team(index: usize, team: &Team) -> Result<TeamSums, SkipReason> {
    let mut sums = TeamSums::default();
    for (i, p) in team.players.iter().enumerate() {
        sums.leetify_rating += parse_stat(index, i, "leetify_rating", &p.leetify_rating)?;
        sums.personal_performance +=
            parse_stat(index, i, "personal_performance", &p.personal_performance)?;
        sums.hltv_rating += parse_stat(index, i, "hltv_rating", &p.hltv_rating)?;
        sums.kd += parse_stat(index, i, "kd", &p.kd)?;
        sums.aim += parse_stat(index, i, "aim", &p.aim)?;
        sums.utility += parse_stat(index, i, "utility", &p.utility)?;
    }
    Ok(sums)
}

/// Average each stat over the winning and losing team.
///
/// All-or-nothing: the first value that is not a finite number drops the
/// whole match.
pub fn aggregate_match(m: &Match) -> Result<MatchAverages, SkipReason> {
    let win = sum_team(0, m.winner())?.mean();
    let loss = sum_team(1, m.loser())?.mean();

    Ok(MatchAverages {
        match_url: m.locator.clone(),
        win_avg_leetify_rating: win.leetify_rating,
        win_avg_personal_performance: win.personal_performance,
        win_avg_hltv_rating: win.hltv_rating,
        win_avg_kd: win.kd,
        win_avg_aim: win.aim,
        win_avg_utility: win.utility,
        loss_avg_leetify_rating: loss.leetify_rating,
        loss_avg_personal_performance: loss.personal_performance,
        loss_avg_hltv_rating: loss.hltv_rating,
        loss_avg_kd: loss.kd,
        loss_avg_aim: loss.aim,
        loss_avg_utility: loss.utility,
    })
}

pub fn aggregate_matches(matches: &[Match]) -> (Vec<MatchAverages>, StageReport) {
    let mut report = StageReport::new("aggregation");
    let mut averages = Vec::with_capacity(matches.len());

    for m in matches {
        report.attempted += 1;
        match aggregate_match(m) {
            Ok(avg) => averages.push(avg),
            Err(reason) => {
                warn!(locator = %m.locator, %reason, "match dropped");
                report.skip(m.locator.clone(), reason);
            }
        }
    }

    report.succeeded = averages.len();
    info!(
        attempted = report.attempted,
        aggregated = report.succeeded,
        "match averages computed"
    );
    (averages, report)
}
