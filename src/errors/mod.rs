use reqwest::StatusCode;
use thiserror::Error;

/// Fatal outcomes of talking to the match API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{url} returned {status} after {attempts} attempt(s)")]
    Status {
        url: String,
        status: StatusCode,
        attempts: u32,
    },
    #[error("request to {url} failed after {attempts} attempt(s)")]
    Transport {
        url: String,
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected response body from {url}: {reason}")]
    Body { url: String, reason: String },
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
