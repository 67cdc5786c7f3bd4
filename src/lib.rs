//! Jerry Dash - the normalization proxy behind the Jerry OS dashboard.
//!
//! This library shells out to the OpenClaw CLI and the OpenRouter billing
//! API, strips the decorative noise those tools print around their JSON,
//! and reshapes the result into the documents the browser UI polls.

pub mod api;
pub mod billing;
pub mod cli;
pub mod config;
pub mod history;
pub mod models;
pub mod normalize;
pub mod platform;
pub mod runner;
pub mod views;
pub mod workspace;


/// Library-level error type for Jerry Dash operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Path escapes the memory directory: {0}")]
    PathEscape(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Jerry Dash operations.
pub type Result<T> = std::result::Result<T, Error>;
