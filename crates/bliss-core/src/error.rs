//! Error types shared by the catalog, resolver and token layers.

use std::path::PathBuf;

use thiserror::Error;

/// HTTP-layer failure. Timeouts and connection faults both land in `Transport`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("upstream responded with HTTP {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Status(status.as_u16()),
            None => FetchError::Transport(err.to_string()),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("catalog is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub(crate) enum ResolveError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("malformed build index: {0}")]
    Decode(String),
}

/// A callback payload that does not match the token grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid callback token: {token:?}")]
pub struct InvalidToken {
    pub token: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}
