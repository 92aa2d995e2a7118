//! Error types for the schedule feed and the notification backend.

use thiserror::Error;

/// Errors raised while loading the daily schedule feed.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("JSON fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON fetch failed: {status}")]
    Status { status: u16 },

    #[error("JSON parse failed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors raised by calls to the notification backend.
///
/// None of these are fatal: callers log them and keep local state as is.
#[derive(Error, Debug)]
pub enum ApiError {
    /// No backend base was configured at build time.
    #[error("API not configured")]
    NotConfigured,

    #[error("{endpoint} request failed: {source}")]
    Http {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} failed: {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("{endpoint} returned a malformed body: {message}")]
    Decode {
        endpoint: &'static str,
        message: String,
    },
}
