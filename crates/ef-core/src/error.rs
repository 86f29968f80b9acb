//! Error types for ef-core

use thiserror::Error;

/// Main error type for ef-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ef-core
pub type Result<T> = std::result::Result<T, Error>;
