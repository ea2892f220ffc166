//! In-memory collaborators for pipeline tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use cs2stat_identity::IdentitySource;
use cs2stat_oracle::ExtractionOracle;
use cs2stat_shared::{
    Cs2StatError, MatchAverages, MatchPage, PlayerIdentity, PlayerRecord, RankedPlayer,
    RawRowTable, Result,
};
use cs2stat_storage::StatsStore;

pub(crate) fn player_cells(name: &str, rating: &str) -> Vec<String> {
    [name, rating, "60", "1.10", "1.20", "85", "70", "50"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Ten well-formed rows: five winners then five losers.
pub(crate) fn ten_rows() -> Vec<Vec<String>> {
    (0..10)
        .map(|i| player_cells(&format!("p{i}"), if i < 5 { "1.20" } else { "0.80" }))
        .collect()
}

pub(crate) fn win_page() -> MatchPage {
    MatchPage {
        result_phrase: "WIN".into(),
        rows: ten_rows(),
    }
}

pub(crate) fn table(locator: &str, rows: Vec<Vec<String>>) -> RawRowTable {
    RawRowTable {
        locator: locator.into(),
        rows,
    }
}

pub(crate) fn identity(player_id: &str, steam_id: &str) -> PlayerIdentity {
    PlayerIdentity {
        player_id: player_id.into(),
        nickname: format!("nick-{player_id}"),
        avatar: String::new(),
        country: "fr".into(),
        steam_id: steam_id.into(),
        profile_url_template: format!("https://www.faceit.com/{{lang}}/players/{player_id}"),
    }
}

/// Oracle backed by fixed maps. Unknown locators fail like an HTTP 404.
#[derive(Default)]
pub(crate) struct FakeOracle {
    pub links: HashMap<String, Vec<String>>,
    pub pages: HashMap<String, MatchPage>,
    pub delay: Duration,
    pub page_calls: AtomicUsize,
}

impl FakeOracle {
    pub fn with_links(mut self, profile: &str, links: &[&str]) -> Self {
        self.links.insert(
            profile.into(),
            links.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn with_page(mut self, url: &str, page: MatchPage) -> Self {
        self.pages.insert(url.into(), page);
        self
    }

    pub fn page_calls(&self) -> usize {
        self.page_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionOracle for FakeOracle {
    // Ignores `limit` so callers' own caps are exercised.
    async fn discover_match_links(&self, profile_url: &str, _limit: usize) -> Result<Vec<String>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.links
            .get(profile_url)
            .cloned()
            .ok_or_else(|| Cs2StatError::Network(format!("{profile_url}: HTTP 404")))
    }

    async fn extract_match_rows(&self, match_url: &str) -> Result<MatchPage> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.pages
            .get(match_url)
            .cloned()
            .ok_or_else(|| Cs2StatError::Network(format!("{match_url}: HTTP 404")))
    }
}

#[derive(Default)]
pub(crate) struct FakeIdentity {
    pub players: Vec<PlayerIdentity>,
    pub unreachable: bool,
    pub broken: HashSet<String>,
}

#[async_trait]
impl IdentitySource for FakeIdentity {
    async fn list_top_players(
        &self,
        _region: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RankedPlayer>> {
        if self.unreachable {
            return Err(Cs2StatError::Network("connection refused".into()));
        }
        Ok(self
            .players
            .iter()
            .enumerate()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|(i, p)| RankedPlayer {
                player_id: p.player_id.clone(),
                nickname: p.nickname.clone(),
                country: p.country.clone(),
                position: i as u32 + 1,
                faceit_elo: 3000,
                game_skill_level: 10,
            })
            .collect())
    }

    async fn get_player_details(&self, player_id: &str) -> Result<PlayerIdentity> {
        if self.broken.contains(player_id) {
            return Err(Cs2StatError::Network(format!("players/{player_id}: HTTP 500")));
        }
        self.players
            .iter()
            .find(|p| p.player_id == player_id)
            .cloned()
            .ok_or_else(|| Cs2StatError::Network(format!("players/{player_id}: HTTP 404")))
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    pub players: Mutex<Vec<PlayerRecord>>,
    pub averages: Mutex<Vec<MatchAverages>>,
    pub fail_batch: bool,
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn upsert_player(&self, player: &PlayerRecord) -> Result<()> {
        let mut players = self.players.lock().unwrap();
        players.retain(|p| p.steam_id != player.steam_id);
        players.push(player.clone());
        Ok(())
    }

    async fn batch_upsert_match_averages(&self, batch: &[MatchAverages]) -> Result<()> {
        if self.fail_batch {
            return Err(Cs2StatError::Storage("database is locked".into()));
        }
        self.averages.lock().unwrap().extend_from_slice(batch);
        Ok(())
    }
}
