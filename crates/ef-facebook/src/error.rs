//! Error types for ef-facebook

use thiserror::Error;

/// ef-facebook error type
#[derive(Error, Debug)]
pub enum FacebookError {
    #[error("Facebook API error: {0}")]
    Api(String),

    #[error("Facebook API request failed: {0}")]
    Request(String),

    #[error("Invalid Graph API response: {0}")]
    InvalidResponse(String),

    #[error("Store error: {0}")]
    Store(#[from] ef_core::Error),
}

impl From<reqwest::Error> for FacebookError {
    fn from(err: reqwest::Error) -> Self {
        FacebookError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for FacebookError {
    fn from(err: serde_json::Error) -> Self {
        FacebookError::InvalidResponse(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FacebookError>;
