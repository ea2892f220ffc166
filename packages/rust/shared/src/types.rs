//! Core domain types for the match-statistics pipeline.

use serde::{Deserialize, Serialize};

/// Number of players on each side of a supported match.
pub const TEAM_SIZE: usize = 5;

/// Number of player rows a match page must yield (two full teams).
pub const MATCH_ROWS: usize = TEAM_SIZE * 2;

/// Number of positional cells mapped into a [`PlayerRow`].
pub const PLAYER_ROW_CELLS: usize = 8;

/// A URL identifying one external page (profile or match).
pub type Locator = String;

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// One leaderboard entry from the identity source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedPlayer {
    pub player_id: String,
    pub nickname: String,
    pub country: String,
    /// Leaderboard rank.
    pub position: u32,
    /// Rating on the identity platform.
    pub faceit_elo: u32,
    pub game_skill_level: u32,
}

/// Detailed identity of a single player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub player_id: String,
    pub nickname: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub country: String,
    /// 64-bit Steam id; the persistence key.
    #[serde(default, rename = "steam_id_64")]
    pub steam_id: String,
    /// Profile URL with a `{lang}` placeholder.
    #[serde(default, rename = "faceit_url")]
    pub profile_url_template: String,
}

impl PlayerIdentity {
    /// The profile URL with the language placeholder resolved to English.
    pub fn profile_url(&self) -> String {
        self.profile_url_template.replace("{lang}", "en")
    }

    /// The record shape persisted for this player.
    pub fn to_record(&self) -> PlayerRecord {
        PlayerRecord {
            steam_id: self.steam_id.clone(),
            name: self.nickname.clone(),
            country: self.country.clone(),
            profile_url: self.profile_url(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Persisted player shape, keyed by `steam_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub steam_id: String,
    pub name: String,
    pub country: String,
    pub profile_url: String,
    pub avatar: String,
}

// ---------------------------------------------------------------------------
// Extraction output
// ---------------------------------------------------------------------------

/// What the extraction oracle returns for one match page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchPage {
    /// Result banner text, e.g. `"WIN"` or `"TIE"`.
    pub result_phrase: String,
    /// Table rows as trimmed cell text.
    pub rows: Vec<Vec<String>>,
}

/// Raw rows for one match, tagged with the page they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRowTable {
    pub locator: Locator,
    pub rows: Vec<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Matches
// ---------------------------------------------------------------------------

/// One player's stat line, still as page text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRow {
    pub name: String,
    pub leetify_rating: String,
    pub personal_performance: String,
    pub hltv_rating: String,
    pub kd: String,
    pub adr: String,
    pub aim: String,
    pub utility: String,
}

impl PlayerRow {
    /// Map a row's cells by position. Returns `None` when the row is short.
    ///
    /// Cell order: name, leetify rating, personal performance, HLTV rating,
    /// K/D, ADR, aim, utility. Extra cells are ignored.
    pub fn from_cells(cells: &[String]) -> Option<Self> {
        if cells.len() < PLAYER_ROW_CELLS {
            return None;
        }
        Some(Self {
            name: cells[0].clone(),
            leetify_rating: cells[1].clone(),
            personal_performance: cells[2].clone(),
            hltv_rating: cells[3].clone(),
            kd: cells[4].clone(),
            adr: cells[5].clone(),
            aim: cells[6].clone(),
            utility: cells[7].clone(),
        })
    }
}

/// Five players and whether they won.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub players: [PlayerRow; TEAM_SIZE],
    pub won: bool,
}

/// A structurally valid match: `teams[0]` won, `teams[1]` lost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub teams: [Team; 2],
    pub locator: Locator,
}

impl Match {
    pub fn winner(&self) -> &Team {
        &self.teams[0]
    }

    pub fn loser(&self) -> &Team {
        &self.teams[1]
    }
}

/// Per-team averages for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAverages {
    pub match_url: Locator,
    pub win_avg_leetify_rating: f64,
    pub win_avg_personal_performance: f64,
    pub win_avg_hltv_rating: f64,
    pub win_avg_kd: f64,
    pub win_avg_aim: f64,
    pub win_avg_utility: f64,
    pub loss_avg_leetify_rating: f64,
    pub loss_avg_personal_performance: f64,
    pub loss_avg_hltv_rating: f64,
    pub loss_avg_kd: f64,
    pub loss_avg_aim: f64,
    pub loss_avg_utility: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn player_row_maps_by_position() {
        let row = PlayerRow::from_cells(&cells(&[
            "s1mple", "1.10", "62", "1.25", "1.4", "88", "79", "55", "extra",
        ]))
        .expect("eight cells");

        assert_eq!(row.name, "s1mple");
        assert_eq!(row.leetify_rating, "1.10");
        assert_eq!(row.personal_performance, "62");
        assert_eq!(row.hltv_rating, "1.25");
        assert_eq!(row.kd, "1.4");
        assert_eq!(row.adr, "88");
        assert_eq!(row.aim, "79");
        assert_eq!(row.utility, "55");
    }

    #[test]
    fn player_row_rejects_short_rows() {
        assert!(PlayerRow::from_cells(&cells(&["a", "1", "2"])).is_none());
    }

    #[test]
    fn identity_deserializes_from_api_shape() {
        let json = r#"{
            "player_id": "abc-123",
            "nickname": "ropz",
            "avatar": "https://cdn.example.com/a.png",
            "country": "ee",
            "steam_id_64": "76561197991272318",
            "faceit_url": "https://www.faceit.com/{lang}/players/ropz",
            "games": {}
        }"#;

        let identity: PlayerIdentity = serde_json::from_str(json).expect("deserialize");
        assert_eq!(identity.steam_id, "76561197991272318");
        assert_eq!(
            identity.profile_url(),
            "https://www.faceit.com/en/players/ropz"
        );

        let record = identity.to_record();
        assert_eq!(record.name, "ropz");
        assert_eq!(record.profile_url, "https://www.faceit.com/en/players/ropz");
    }
}
