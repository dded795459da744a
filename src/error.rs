//! Error types for coalesce-rs.
//!
//! Consumer failures are not represented here: they are opaque
//! `anyhow::Error` values that the engine logs and counts, never surfaces.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("no tokio runtime available: {0}")]
    Runtime(String),

    #[error("unsupported event: {0}")]
    UnsupportedEvent(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
