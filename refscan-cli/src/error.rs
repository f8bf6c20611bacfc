use refscan_parser::extractor::{ExtractorError, FailureReason};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Extractor error: {0}")]
    Extractor(#[from] ExtractorError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No references found ({reason}): {detail}")]
    NoReferences {
        reason: FailureReason,
        detail: String,
    },
}

impl CliError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn no_references(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self::NoReferences {
            reason,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
