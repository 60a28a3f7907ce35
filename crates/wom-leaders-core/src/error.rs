use thiserror::Error;

/// Application-wide error types for wom-leaders.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request returned an unexpected status.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// A remote answered with a non-success status.
    #[error("HTTP {status_code} for {url}")]
    HttpStatus { status_code: u16, url: String },

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded (HTTP 429).
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// The leaderboard service rejected our credentials.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A hiscore page could not be parsed into ranked entries.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The leaderboard API answered with an error payload.
    #[error("Leaderboard error (HTTP {status_code}): {message}")]
    LeaderboardError { message: String, status_code: u16 },

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl AppError {
    /// Returns true if this error is transient and likely to clear up by
    /// the next cycle.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) | AppError::RateLimitExceeded => true,
            AppError::LeaderboardError { status_code, .. }
            | AppError::HttpStatus { status_code, .. } => *status_code >= 500,
            AppError::HttpError(msg) => {
                msg.contains("timeout") || msg.contains("connect") || msg.contains("reset")
            }
            _ => false,
        }
    }
}
