use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("http status {status} for {url}")]
    HttpStatus { status: u16, url: String },
    #[error("request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("no references found")]
    NoReferencesFound,
    #[error("parse error: {0}")]
    Parse(String),
    #[error("hls playlist error: {0}")]
    HlsPlaylistError(String),
    #[error("other error: {0}")]
    Other(String),
}

impl ExtractorError {
    pub fn timeout(duration: std::time::Duration) -> Self {
        Self::Timeout {
            seconds: duration.as_secs(),
        }
    }

    /// Maps the error onto the per-item reason tag reported to callers.
    pub fn reason(&self) -> FailureReason {
        match self {
            ExtractorError::InvalidUrl(_)
            | ExtractorError::HttpError(_)
            | ExtractorError::HttpStatus { .. }
            | ExtractorError::Timeout { .. } => FailureReason::Fetch,
            ExtractorError::NoReferencesFound => FailureReason::NotFound,
            ExtractorError::JsonError(_)
            | ExtractorError::Decode(_)
            | ExtractorError::Parse(_)
            | ExtractorError::HlsPlaylistError(_)
            | ExtractorError::Other(_) => FailureReason::Decode,
        }
    }
}

/// Why an item produced no references.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    Fetch,
    Decode,
    NotFound,
}

impl FailureReason {
    pub fn as_str(&self) -> &str {
        match self {
            FailureReason::Fetch => "fetch",
            FailureReason::Decode => "decode",
            FailureReason::NotFound => "not-found",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
