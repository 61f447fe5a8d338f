// src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} answered with status {status}")]
    Status { url: String, status: reqwest::StatusCode },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{url} answered with an empty body")]
    EmptyBody { url: String },

    #[error("gave up on {url} after {attempts} attempts")]
    Exhausted { url: String, attempts: u32 },
}

/// Why a single upstream record was left out of the schedule.
/// Never surfaced as an error, only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingStart,
    EmptyTitle,
    BadTime,
    OutOfRange,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DropReason::MissingStart => "missing start",
            DropReason::EmptyTitle => "empty title",
            DropReason::BadTime => "unparsable time",
            DropReason::OutOfRange => "time out of range",
        };
        f.write_str(s)
    }
}
