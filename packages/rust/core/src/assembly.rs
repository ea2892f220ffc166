//! Match assembly: raw rows → two teams of five.

use tracing::{debug, info, warn};

use cs2stat_shared::{MATCH_ROWS, Match, PlayerRow, RawRowTable, SkipReason, TEAM_SIZE, Team};

use crate::report::StageReport;

/// Build a [`Match`] from the first ten non-empty rows of a table.
///
/// Rows 0-4 are the winning team and rows 5-9 the losing team. Rows past
/// the tenth are ignored. Cell values are not validated here.
pub fn assemble_match(table: &RawRowTable) -> Result<Match, SkipReason> {
    let rows: Vec<&Vec<String>> = table.rows.iter().filter(|r| !r.is_empty()).collect();
    if rows.len() < MATCH_ROWS {
        return Err(SkipReason::TooFewRows { found: rows.len() });
    }

    let winners = team(&rows[..TEAM_SIZE], 0, true)?;
    let losers = team(&rows[TEAM_SIZE..MATCH_ROWS], TEAM_SIZE, false)?;

    Ok(Match {
        teams: [winners, losers],
        locator: table.locator.clone(),
    })
}

fn team(rows: &[&Vec<String>], first_row: usize, won: bool) -> Result<Team, SkipReason> {
    let players = rows
        .iter()
        .enumerate()
        .map(|(i, cells)| {
            PlayerRow::from_cells(cells).ok_or(SkipReason::ShortRow {
                row: first_row + i,
                cells: cells.len(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let players: [PlayerRow; TEAM_SIZE] = players
        .try_into()
        .map_err(|p: Vec<PlayerRow>| SkipReason::TooFewRows {
            found: first_row + p.len(),
        })?;

    Ok(Team { players, won })
}

/// Assemble every table, dropping the ones that do not form a match.
pub fn assemble_matches(tables: &[RawRowTable]) -> (Vec<Match>, StageReport) {
    let mut report = StageReport::new("assembly");
    let mut matches = Vec::with_capacity(tables.len());

    for table in tables {
        report.attempted += 1;
        match assemble_match(table) {
            Ok(m) => {
                debug!(locator = %table.locator, "match assembled");
                matches.push(m);
            }
            Err(reason) => {
                warn!(locator = %table.locator, %reason, "match dropped");
                report.skip(table.locator.clone(), reason);
            }
        }
    }

    report.succeeded = matches.len();
    info!(
        attempted = report.attempted,
        assembled = report.succeeded,
        "matches assembled"
    );
    (matches, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{player_cells, table, ten_rows};
    use proptest::prelude::*;

    #[test]
    fn ten_rows_split_five_and_five() {
        let m = assemble_match(&table("m1", ten_rows())).unwrap();

        assert_eq!(m.locator, "m1");
        assert!(m.winner().won);
        assert!(!m.loser().won);
        assert_eq!(m.winner().players[0].name, "p0");
        assert_eq!(m.winner().players[4].name, "p4");
        assert_eq!(m.loser().players[0].name, "p5");
        assert_eq!(m.loser().players[4].name, "p9");
    }

    #[test]
    fn fewer_than_ten_rows_is_dropped() {
        let mut rows = ten_rows();
        rows.truncate(9);

        assert_eq!(
            assemble_match(&table("m1", rows)),
            Err(SkipReason::TooFewRows { found: 9 })
        );
    }

    #[test]
    fn empty_rows_do_not_count() {
        let mut rows = ten_rows();
        rows.truncate(8);
        rows.insert(3, Vec::new());
        rows.push(Vec::new());
        rows.push(Vec::new());

        assert_eq!(
            assemble_match(&table("m1", rows)),
            Err(SkipReason::TooFewRows { found: 8 })
        );
    }

    #[test]
    fn empty_rows_are_skipped_before_splitting() {
        let mut rows = ten_rows();
        rows.insert(0, Vec::new());
        rows.insert(6, Vec::new());

        let m = assemble_match(&table("m1", rows)).unwrap();
        assert_eq!(m.winner().players[0].name, "p0");
        assert_eq!(m.loser().players[0].name, "p5");
    }

    #[test]
    fn extra_rows_are_ignored() {
        let mut rows = ten_rows();
        for i in 10..13 {
            rows.push(player_cells(&format!("p{i}"), "9.99"));
        }

        let m = assemble_match(&table("m1", rows)).unwrap();
        assert_eq!(m.loser().players[4].name, "p9");
        assert!(
            m.teams
                .iter()
                .flat_map(|t| t.players.iter())
                .all(|p| p.leetify_rating != "9.99")
        );
    }

    #[test]
    fn short_row_is_dropped() {
        let mut rows = ten_rows();
        rows[7].truncate(5);

        assert_eq!(
            assemble_match(&table("m1", rows)),
            Err(SkipReason::ShortRow { row: 7, cells: 5 })
        );
    }

    #[test]
    fn batch_reports_each_drop() {
        let mut short = ten_rows();
        short.truncate(4);
        let tables = vec![table("good", ten_rows()), table("short", short)];

        let (matches, report) = assemble_matches(&tables);
        assert_eq!(matches.len(), 1);
        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.skipped[0].item, "short");
        assert_eq!(report.skipped[0].reason, SkipReason::TooFewRows { found: 4 });
    }

    /// `full` non-empty rows of `cells` and up to `max_empty` empty rows, in random order.
    fn mixed_rows(
        full: std::ops::Range<usize>,
        cells: std::ops::RangeInclusive<usize>,
        max_empty: usize,
    ) -> impl Strategy<Value = Vec<Vec<String>>> {
        (
            prop::collection::vec(prop::collection::vec("[a-z0-9.]{0,5}", cells), full),
            0..=max_empty,
        )
            .prop_flat_map(|(mut rows, empty)| {
                rows.extend(std::iter::repeat_with(Vec::new).take(empty));
                Just(rows).prop_shuffle()
            })
    }

    proptest! {
        #[test]
        fn under_ten_non_empty_rows_never_assemble(rows in mixed_rows(0..10, 1..=12, 8)) {
            let found = rows.iter().filter(|r| !r.is_empty()).count();
            prop_assert!(found < MATCH_ROWS);
            prop_assert_eq!(
                assemble_match(&table("m", rows)),
                Err(SkipReason::TooFewRows { found })
            );
        }

        #[test]
        fn match_uses_first_ten_non_empty_rows(rows in mixed_rows(10..16, 8..=10, 6)) {
            let m = assemble_match(&table("m", rows.clone())).unwrap();

            let expected: Vec<PlayerRow> = rows
                .iter()
                .filter(|r| !r.is_empty())
                .take(MATCH_ROWS)
                .map(|r| PlayerRow::from_cells(r).unwrap())
                .collect();
            let actual: Vec<PlayerRow> = m
                .teams
                .iter()
                .flat_map(|t| t.players.iter().cloned())
                .collect();

            prop_assert_eq!(actual, expected);
            prop_assert!(m.winner().won);
            prop_assert!(!m.loser().won);
        }
    }
}
