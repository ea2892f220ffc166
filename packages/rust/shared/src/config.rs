//! Application configuration for cs2stat.
//!
//! User config lives at `~/.cs2stat/cs2stat.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Cs2StatError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "cs2stat.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".cs2stat";

/// Default database file name inside the config directory.
const DATABASE_FILE_NAME: &str = "cs2stat.db";

// ---------------------------------------------------------------------------
// Config structs (matching cs2stat.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Leaderboard / identity source settings.
    #[serde(default)]
    pub faceit: FaceitConfig,

    /// Worker counts, delays and the run budget.
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Database location.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[faceit]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceitConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Data API base URL.
    #[serde(default = "default_faceit_base_url")]
    pub base_url: String,

    /// Leaderboard region.
    #[serde(default = "default_region")]
    pub region: String,

    /// How many top players to harvest.
    #[serde(default = "default_top_players")]
    pub top_players: u32,

    /// Leaderboard offset.
    #[serde(default)]
    pub offset: u32,
}

impl Default for FaceitConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_faceit_base_url(),
            region: default_region(),
            top_players: default_top_players(),
            offset: 0,
        }
    }
}

fn default_api_key_env() -> String {
    "FACEIT_API_KEY".into()
}
fn default_faceit_base_url() -> String {
    "https://open.faceit.com/data/v4".into()
}
fn default_region() -> String {
    "EU".into()
}
fn default_top_players() -> u32 {
    5
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Workers used for player detail lookups.
    #[serde(default = "default_workers")]
    pub identity_workers: usize,

    /// Workers used for profile → match link discovery.
    #[serde(default = "default_workers")]
    pub discovery_workers: usize,

    /// Workers used for match page extraction.
    #[serde(default = "default_workers")]
    pub extraction_workers: usize,

    /// Most recent matches taken from each profile.
    #[serde(default = "default_max_links")]
    pub max_links_per_profile: usize,

    /// Wait after a match page is ready before reading it.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Per-request timeout for page loads.
    #[serde(default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,

    /// Wall-clock budget for a whole run.
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// Prefix that a Steam id is appended to for the stats profile page.
    #[serde(default = "default_profile_base_url")]
    pub profile_base_url: String,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            identity_workers: default_workers(),
            discovery_workers: default_workers(),
            extraction_workers: default_workers(),
            max_links_per_profile: default_max_links(),
            settle_delay_ms: default_settle_delay_ms(),
            page_timeout_secs: default_page_timeout_secs(),
            run_timeout_secs: default_run_timeout_secs(),
            profile_base_url: default_profile_base_url(),
        }
    }
}

fn default_workers() -> usize {
    5
}
fn default_max_links() -> usize {
    5
}
fn default_settle_delay_ms() -> u64 {
    1000
}
fn default_page_timeout_secs() -> u64 {
    30
}
fn default_run_timeout_secs() -> u64 {
    300
}
fn default_profile_base_url() -> String {
    "https://leetify.com/app/profile/".into()
}

/// `[storage]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database file. Defaults to `~/.cs2stat/cs2stat.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub region: String,
    pub top_players: u32,
    pub offset: u32,
    pub identity_workers: usize,
    pub discovery_workers: usize,
    pub extraction_workers: usize,
    pub max_links_per_profile: usize,
    pub settle_delay: Duration,
    pub page_timeout: Duration,
    pub run_timeout: Duration,
    pub profile_base_url: String,
}

impl PipelineConfig {
    /// Stats profile locator for a Steam id.
    pub fn profile_locator(&self, steam_id: &str) -> String {
        format!("{}{steam_id}", self.profile_base_url)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        let p = &config.pipeline;
        Self {
            region: config.faceit.region.clone(),
            top_players: config.faceit.top_players,
            offset: config.faceit.offset,
            identity_workers: p.identity_workers,
            discovery_workers: p.discovery_workers,
            extraction_workers: p.extraction_workers,
            max_links_per_profile: p.max_links_per_profile,
            settle_delay: Duration::from_millis(p.settle_delay_ms),
            page_timeout: Duration::from_secs(p.page_timeout_secs),
            run_timeout: Duration::from_secs(p.run_timeout_secs),
            profile_base_url: p.profile_base_url.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.cs2stat/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| Cs2StatError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.cs2stat/cs2stat.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Resolve the database path: explicit config value, else the config dir.
pub fn database_path(config: &AppConfig) -> Result<PathBuf> {
    match &config.storage.database_path {
        Some(p) => Ok(PathBuf::from(p)),
        None => Ok(config_dir()?.join(DATABASE_FILE_NAME)),
    }
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| Cs2StatError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| Cs2StatError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| Cs2StatError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| Cs2StatError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| Cs2StatError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the FACEIT API key from the env var named in the config.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.faceit.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(Cs2StatError::config(format!(
            "FACEIT API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://developers.faceit.com"
        ))),
    }
}
