//! Tasklist - a small to-do list service and its offline-tolerant client.
//!
//! The library provides the pieces behind the `tasklist` binary:
//! the SQLite-backed task store, the task service and its HTTP routes,
//! and a client controller that falls back to a local cache file when
//! the service cannot be reached.

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod models;
#[cfg(feature = "server")]
pub mod server;
#[cfg(feature = "server")]
pub mod service;
pub mod storage;


/// Library-level error type for Tasklist operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Tasklist operations.
pub type Result<T> = std::result::Result<T, Error>;
