//! libSQL storage layer for harvested players and match averages.
//!
//! The pipeline writes through the [`StatsStore`] trait; [`Storage`] is the
//! embedded libSQL implementation.
//!
//! **Write rules:**
//! - players are upserted one by one, keyed by Steam id
//! - match averages are written as one transaction per run: any failing
//!   record rolls back the whole batch

mod migrations;

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use cs2stat_shared::{Cs2StatError, MatchAverages, PlayerRecord, Result};
use libsql::{Connection, Database, params};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Persistence operations the pipeline needs.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// Insert or update a player keyed by `steam_id`.
    async fn upsert_player(&self, player: &PlayerRecord) -> Result<()>;

    /// Insert or update every record in one all-or-nothing transaction.
    async fn batch_upsert_match_averages(&self, batch: &[MatchAverages]) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

fn storage_err(e: impl std::fmt::Display) -> Cs2StatError {
    Cs2StatError::Storage(e.to_string())
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Cs2StatError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode (for reporting commands).
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;

        let conn = db.connect().map_err(storage_err)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        Cs2StatError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(Cs2StatError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Player operations
    // -----------------------------------------------------------------------

    /// Get a player by Steam id.
    pub async fn get_player(&self, steam_id: &str) -> Result<Option<PlayerRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT steam_id, name, country, profile_url, avatar
                 FROM players WHERE steam_id = ?1",
                params![steam_id],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(PlayerRecord {
                steam_id: row.get::<String>(0).map_err(storage_err)?,
                name: row.get::<String>(1).map_err(storage_err)?,
                country: row.get::<String>(2).map_err(storage_err)?,
                profile_url: row.get::<String>(3).map_err(storage_err)?,
                avatar: row.get::<String>(4).map_err(storage_err)?,
            })),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Number of stored players.
    pub async fn count_players(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM players").await
    }

    // -----------------------------------------------------------------------
    // Match average operations
    // -----------------------------------------------------------------------

    /// Get the averages stored for one match page.
    pub async fn get_match_averages(&self, match_url: &str) -> Result<Option<MatchAverages>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {MATCH_COLUMNS} FROM match_averages WHERE match_url = ?1"),
                params![match_url],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_match_averages(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    /// Most recently written match averages, newest first.
    pub async fn list_match_averages(&self, limit: u32) -> Result<Vec<MatchAverages>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {MATCH_COLUMNS} FROM match_averages
                     ORDER BY updated_at DESC, match_url
                     LIMIT ?1"
                ),
                params![limit],
            )
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_match_averages(&row)?);
        }
        Ok(results)
    }

    /// Number of stored matches.
    pub async fn count_match_averages(&self) -> Result<u64> {
        self.count("SELECT COUNT(*) FROM match_averages").await
    }

    // -----------------------------------------------------------------------
    // Scrape run operations
    // -----------------------------------------------------------------------

    /// Record the start of a scrape run. Returns the generated run ID.
    pub async fn insert_scrape_run(&self) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO scrape_runs (id, started_at) VALUES (?1, ?2)",
                params![id.as_str(), now.as_str()],
            )
            .await
            .map_err(storage_err)?;
        Ok(id)
    }

    /// Mark a scrape run finished with its stage counts.
    pub async fn finish_scrape_run(&self, run_id: &str, stats_json: &str) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "UPDATE scrape_runs SET finished_at = ?1, stats_json = ?2 WHERE id = ?3",
                params![now.as_str(), stats_json, run_id],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Stats JSON of a finished run, if any.
    pub async fn get_scrape_run_stats(&self, run_id: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query(
                "SELECT stats_json FROM scrape_runs WHERE id = ?1",
                params![run_id],
            )
            .await
            .map_err(storage_err)?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<String>(0).ok()),
            Ok(None) => Ok(None),
            Err(e) => Err(storage_err(e)),
        }
    }

    async fn count(&self, sql: &str) -> Result<u64> {
        let mut rows = self.conn.query(sql, params![]).await.map_err(storage_err)?;
        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).map_err(storage_err)? as u64),
            Ok(None) => Ok(0),
            Err(e) => Err(storage_err(e)),
        }
    }
}

#[async_trait]
impl StatsStore for Storage {
    async fn upsert_player(&self, player: &PlayerRecord) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO players (steam_id, name, country, profile_url, avatar, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(steam_id) DO UPDATE SET
                   name = excluded.name,
                   country = excluded.country,
                   profile_url = excluded.profile_url,
                   avatar = excluded.avatar,
                   updated_at = excluded.updated_at",
                params![
                    player.steam_id.as_str(),
                    player.name.as_str(),
                    player.country.as_str(),
                    player.profile_url.as_str(),
                    player.avatar.as_str(),
                    now.as_str(),
                ],
            )
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    async fn batch_upsert_match_averages(&self, batch: &[MatchAverages]) -> Result<()> {
        self.check_writable()?;
        if batch.is_empty() {
            return Ok(());
        }

        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction().await.map_err(storage_err)?;

        for m in batch {
            let inserted = tx
                .execute(
                    "INSERT INTO match_averages (
                       match_url,
                       w_avg_leetify_rating, w_avg_personal_performance, w_avg_hltv_rating,
                       w_avg_kd, w_avg_aim, w_avg_utility,
                       l_avg_leetify_rating, l_avg_personal_performance, l_avg_hltv_rating,
                       l_avg_kd, l_avg_aim, l_avg_utility,
                       updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                     ON CONFLICT(match_url) DO UPDATE SET
                       w_avg_leetify_rating = excluded.w_avg_leetify_rating,
                       w_avg_personal_performance = excluded.w_avg_personal_performance,
                       w_avg_hltv_rating = excluded.w_avg_hltv_rating,
                       w_avg_kd = excluded.w_avg_kd,
                       w_avg_aim = excluded.w_avg_aim,
                       w_avg_utility = excluded.w_avg_utility,
                       l_avg_leetify_rating = excluded.l_avg_leetify_rating,
                       l_avg_personal_performance = excluded.l_avg_personal_performance,
                       l_avg_hltv_rating = excluded.l_avg_hltv_rating,
                       l_avg_kd = excluded.l_avg_kd,
                       l_avg_aim = excluded.l_avg_aim,
                       l_avg_utility = excluded.l_avg_utility,
                       updated_at = excluded.updated_at",
                    params![
                        m.match_url.as_str(),
                        m.win_avg_leetify_rating,
                        m.win_avg_personal_performance,
                        m.win_avg_hltv_rating,
                        m.win_avg_kd,
                        m.win_avg_aim,
                        m.win_avg_utility,
                        m.loss_avg_leetify_rating,
                        m.loss_avg_personal_performance,
                        m.loss_avg_hltv_rating,
                        m.loss_avg_kd,
                        m.loss_avg_aim,
                        m.loss_avg_utility,
                        now.as_str(),
                    ],
                )
                .await;

            if let Err(e) = inserted {
                tracing::warn!(match_url = %m.match_url, error = %e, "batch insert failed, rolling back");
                tx.rollback().await.map_err(storage_err)?;
                return Err(Cs2StatError::Storage(format!(
                    "failed to store {}: {e}",
                    m.match_url
                )));
            }
        }

        tx.commit().await.map_err(storage_err)?;
        Ok(())
    }
}

/// Column list shared by match average queries, in [`row_to_match_averages`] order.
const MATCH_COLUMNS: &str = "match_url,
    w_avg_leetify_rating, w_avg_personal_performance, w_avg_hltv_rating,
    w_avg_kd, w_avg_aim, w_avg_utility,
    l_avg_leetify_rating, l_avg_personal_performance, l_avg_hltv_rating,
    l_avg_kd, l_avg_aim, l_avg_utility";

/// Convert a database row to [`MatchAverages`].
fn row_to_match_averages(row: &libsql::Row) -> Result<MatchAverages> {
    let real = |idx: i32| row.get::<f64>(idx).map_err(storage_err);
    Ok(MatchAverages {
        match_url: row.get::<String>(0).map_err(storage_err)?,
        win_avg_leetify_rating: real(1)?,
        win_avg_personal_performance: real(2)?,
        win_avg_hltv_rating: real(3)?,
        win_avg_kd: real(4)?,
        win_avg_aim: real(5)?,
        win_avg_utility: real(6)?,
        loss_avg_leetify_rating: real(7)?,
        loss_avg_personal_performance: real(8)?,
        loss_avg_hltv_rating: real(9)?,
        loss_avg_kd: real(10)?,
        loss_avg_aim: real(11)?,
        loss_avg_utility: real(12)?,
    })
}
