//! SQL migration definitions for the cs2stat database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Initial schema: players, match_averages",
            sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Harvested players, keyed by Steam id
CREATE TABLE IF NOT EXISTS players (
    steam_id    TEXT PRIMARY KEY CHECK (steam_id <> ''),
    name        TEXT NOT NULL,
    country     TEXT NOT NULL,
    profile_url TEXT NOT NULL,
    avatar      TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

-- Per-team averages, one row per match page
CREATE TABLE IF NOT EXISTS match_averages (
    match_url                  TEXT PRIMARY KEY CHECK (match_url <> ''),
    w_avg_leetify_rating       REAL NOT NULL,
    w_avg_personal_performance REAL NOT NULL,
    w_avg_hltv_rating          REAL NOT NULL,
    w_avg_kd                   REAL NOT NULL,
    w_avg_aim                  REAL NOT NULL,
    w_avg_utility              REAL NOT NULL,
    l_avg_leetify_rating       REAL NOT NULL,
    l_avg_personal_performance REAL NOT NULL,
    l_avg_hltv_rating          REAL NOT NULL,
    l_avg_kd                   REAL NOT NULL,
    l_avg_aim                  REAL NOT NULL,
    l_avg_utility              REAL NOT NULL,
    updated_at                 TEXT NOT NULL
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
        },
        Migration {
            version: 2,
            description: "Scrape run history",
            sql: r#"
CREATE TABLE IF NOT EXISTS scrape_runs (
    id          TEXT PRIMARY KEY,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    stats_json  TEXT
);

INSERT INTO schema_migrations (version) VALUES (2);
"#,
        },
    ]
}
