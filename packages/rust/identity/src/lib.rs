//! Leaderboard and player identity lookups against the FACEIT data API.
//!
//! The pipeline only sees the [`IdentitySource`] trait; [`FaceitClient`] is
//! the production implementation. Every call is a single request with no
//! retry: callers decide whether a failure is fatal (leaderboard) or a soft
//! drop (one player's details).

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use cs2stat_shared::{Cs2StatError, PlayerIdentity, RankedPlayer, Result};

/// The leaderboard endpoint never returns more than this many entries.
pub const MAX_LEADERBOARD_LIMIT: u32 = 50;

/// Default timeout in seconds for a single API request.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User-Agent string for API requests.
const USER_AGENT: &str = "cs2-stat";

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Source of ranked players and their identities.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Fetch one page of the regional leaderboard.
    async fn list_top_players(
        &self,
        region: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RankedPlayer>>;

    /// Fetch the detailed identity (Steam id, profile URL) of one player.
    async fn get_player_details(&self, player_id: &str) -> Result<PlayerIdentity>;
}

// ---------------------------------------------------------------------------
// FACEIT client
// ---------------------------------------------------------------------------

/// Leaderboard response envelope.
#[derive(Debug, Deserialize)]
struct RankingsResponse {
    #[serde(default)]
    items: Vec<RankedPlayer>,
    #[serde(default)]
    start: u32,
    #[serde(default)]
    end: u32,
}

/// HTTP client for the FACEIT data API v4.
#[derive(Debug, Clone)]
pub struct FaceitClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl FaceitClient {
    /// Build a client for `base_url` (e.g. `https://open.faceit.com/data/v4`).
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| Cs2StatError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn rankings_url(&self, region: &str, limit: u32, offset: u32) -> String {
        let limit = limit.min(MAX_LEADERBOARD_LIMIT);
        format!(
            "{}/rankings/games/cs2/regions/{region}?offset={offset}&limit={limit}",
            self.base_url
        )
    }

    fn player_url(&self, player_id: &str) -> String {
        format!("{}/players/{player_id}", self.base_url)
    }

    /// GET `url` with the bearer token and decode the JSON body.
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| Cs2StatError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Cs2StatError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Cs2StatError::parse(format!("{url}: invalid JSON body: {e}")))
    }
}

#[async_trait]
impl IdentitySource for FaceitClient {
    #[instrument(skip(self))]
    async fn list_top_players(
        &self,
        region: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RankedPlayer>> {
        let url = self.rankings_url(region, limit, offset);
        let page: RankingsResponse = self.get_json(&url).await?;

        debug!(
            start = page.start,
            end = page.end,
            count = page.items.len(),
            "leaderboard page fetched"
        );

        Ok(page.items)
    }

    #[instrument(skip(self))]
    async fn get_player_details(&self, player_id: &str) -> Result<PlayerIdentity> {
        let url = self.player_url(player_id);
        self.get_json(&url).await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A Steam id usable for profile locators: 17 decimal digits.
pub fn is_valid_steam_id(steam_id: &str) -> bool {
    static STEAM_ID: OnceLock<Regex> = OnceLock::new();
    STEAM_ID
        .get_or_init(|| Regex::new(r"^\d{17}$").expect("static regex"))
        .is_match(steam_id)
}
