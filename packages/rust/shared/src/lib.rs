//! Shared types, error model, run context, and configuration for cs2stat.
//!
//! This crate is the foundation depended on by all other cs2stat crates.
//! It provides:
//! - [`Cs2StatError`]: the unified error type, and [`SkipReason`] for soft drops
//! - Domain types ([`PlayerIdentity`], [`RawRowTable`], [`Match`], [`MatchAverages`])
//! - [`RunContext`]: the per-run deadline and cancellation signal
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)

pub mod config;
pub mod context;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FaceitConfig, PipelineConfig, PipelineSection, StorageConfig, config_dir,
    config_file_path, database_path, init_config, load_config, load_config_from,
    resolve_api_key,
};
pub use context::RunContext;
pub use error::{Cs2StatError, Result, SkipReason};
pub use types::{
    Locator, MATCH_ROWS, Match, MatchAverages, MatchPage, PLAYER_ROW_CELLS, PlayerIdentity,
    PlayerRecord, PlayerRow, RankedPlayer, RawRowTable, TEAM_SIZE, Team,
};
