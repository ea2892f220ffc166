//! Error types for cs2stat.
//!
//! Library crates use [`Cs2StatError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-item failures inside the pipeline are not errors: they are reported
//! as [`SkipReason`] values so a single bad page never aborts a run.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// Top-level error type for all cs2stat operations.
#[derive(Debug, thiserror::Error)]
pub enum Cs2StatError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to the identity source or a page.
    #[error("network error: {0}")]
    Network(String),

    /// Response body or page content could not be interpreted.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The run deadline expired before the operation finished.
    #[error("run deadline exceeded")]
    Timeout,

    /// The run was cancelled.
    #[error("run cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, Cs2StatError>;

impl Cs2StatError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Soft skips
// ---------------------------------------------------------------------------

/// Why a single pipeline item was dropped without failing the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// The external call did not finish before the run deadline.
    Timeout,
    /// The run was cancelled before or during the call.
    Cancelled,
    /// The external call failed (network, HTTP status, missing selector).
    Fetch(String),
    /// The identity record cannot be used to build a profile locator.
    InvalidIdentity(String),
    /// A profile page produced no match links.
    NoMatchLinks,
    /// The match ended in a tie.
    Tie,
    /// Fewer than ten non-empty rows were extracted.
    TooFewRows { found: usize },
    /// A non-empty row had fewer cells than a player row needs.
    ShortRow { row: usize, cells: usize },
    /// A numeric field failed to parse.
    NonNumeric {
        team: usize,
        player: usize,
        field: &'static str,
        value: String,
    },
}

impl SkipReason {
    /// Classify an error from an external call into a skip reason.
    pub fn from_error(err: &Cs2StatError) -> Self {
        match err {
            Cs2StatError::Timeout => Self::Timeout,
            Cs2StatError::Cancelled => Self::Cancelled,
            other => Self::Fetch(other.to_string()),
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "timed out"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Fetch(msg) => write!(f, "fetch failed: {msg}"),
            Self::InvalidIdentity(msg) => write!(f, "invalid identity: {msg}"),
            Self::NoMatchLinks => write!(f, "no match links found"),
            Self::Tie => write!(f, "match was a tie"),
            Self::TooFewRows { found } => {
                write!(f, "only {found} valid players (need 10)")
            }
            Self::ShortRow { row, cells } => {
                write!(f, "row {row} has {cells} cells (need 8)")
            }
            Self::NonNumeric {
                team,
                player,
                field,
                value,
            } => write!(
                f,
                "team {team} player {player}: {field} {value:?} is not a number"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = Cs2StatError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = Cs2StatError::validation("steam id is empty");
        assert!(err.to_string().contains("steam id"));
    }

    #[test]
    fn skip_reason_from_error() {
        assert_eq!(
            SkipReason::from_error(&Cs2StatError::Timeout),
            SkipReason::Timeout
        );
        assert_eq!(
            SkipReason::from_error(&Cs2StatError::Cancelled),
            SkipReason::Cancelled
        );
        match SkipReason::from_error(&Cs2StatError::Network("HTTP 503".into())) {
            SkipReason::Fetch(msg) => assert!(msg.contains("503")),
            other => panic!("expected Fetch, got {other:?}"),
        }
    }

    #[test]
    fn skip_reason_display() {
        let reason = SkipReason::TooFewRows { found: 7 };
        assert_eq!(reason.to_string(), "only 7 valid players (need 10)");

        let reason = SkipReason::NonNumeric {
            team: 0,
            player: 4,
            field: "leetify_rating",
            value: "bad".into(),
        };
        assert!(reason.to_string().contains("leetify_rating"));
    }

    #[test]
    fn skip_reasons_serialize_with_detail() {
        let json = serde_json::to_value(SkipReason::Fetch("HTTP 404".into())).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "fetch", "detail": "HTTP 404"}));

        let json = serde_json::to_value(SkipReason::InvalidIdentity("steam id \"\"".into())).unwrap();
        assert_eq!(json["kind"], "invalid_identity");

        let json = serde_json::to_value(SkipReason::Tie).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "tie"}));

        let json = serde_json::to_value(SkipReason::ShortRow { row: 7, cells: 5 }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "short_row", "detail": {"row": 7, "cells": 5}})
        );
    }
}
