//! Error types for rule loading, position storage and scanning

use std::path::PathBuf;
use thiserror::Error;

/// The rules file itself could not be used. This is the only fatal error.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read rules file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot create rules file {path}: {source}")]
    Bootstrap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to persist a scan position
#[derive(Debug, Error)]
pub enum PositionError {
    #[error("cannot create state directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write position file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-rule scan failure. Reported for the rule, never aborts the run.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid keyword pattern \"{pattern}\": {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error(transparent)]
    Position(#[from] PositionError),
}

/// Discovery output could not be produced
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid filename pattern \"{pattern}\": {source}")]
    FilenamePattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("cannot serialize discovery items: {0}")]
    Json(#[from] serde_json::Error),
}
